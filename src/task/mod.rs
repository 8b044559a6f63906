use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod tree;

pub use tree::{NodeId, TaskList, TaskNode};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("task `{action}` has no type")]
    MissingType { action: String },
    #[error("task `{action}` of type `{task_type}` cannot own subtasks")]
    LeafWithSubtasks { action: String, task_type: TaskType },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Config,
    Plan,
    Execute,
    Answer,
    Introspect,
    Report,
    Define,
    Ignore,
    Select,
    Discard,
    Group,
    Schedule,
}

impl TaskType {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Config => "config",
            TaskType::Plan => "plan",
            TaskType::Execute => "execute",
            TaskType::Answer => "answer",
            TaskType::Introspect => "introspect",
            TaskType::Report => "report",
            TaskType::Define => "define",
            TaskType::Ignore => "ignore",
            TaskType::Select => "select",
            TaskType::Discard => "discard",
            TaskType::Group => "group",
            TaskType::Schedule => "schedule",
        }
    }

    /// Types that are dropped before confirmation.
    pub fn is_filtered(self) -> bool {
        matches!(self, TaskType::Ignore | TaskType::Discard)
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A leaf task: the unit the router dispatches and the pipeline runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub action: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub config: Vec<String>,
}

impl Task {
    pub fn new(action: impl Into<String>, task_type: TaskType) -> Self {
        Self {
            action: action.into(),
            task_type,
            params: Map::new(),
            config: Vec::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn skill_name(&self) -> Option<&str> {
        self.param_str("skill")
    }

    pub fn variant(&self) -> Option<&str> {
        self.param_str("variant")
    }

    pub fn command(&self) -> Option<&str> {
        self.param_str("command")
    }

    /// Choices offered by a `Define` task.
    pub fn options(&self) -> Vec<String> {
        match self.params.get("options") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(text) => Some(text.clone()),
                    Value::Object(object) => object
                        .get("label")
                        .or_else(|| object.get("name"))
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    _ => None,
                })
                .filter(|option| !option.trim().is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Configuration key paths named by a `Config` task, in declaration order.
    pub fn config_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        if let Some(key) = self.param_str("key") {
            keys.push(key.to_string());
        }
        if let Some(Value::Array(items)) = self.params.get("keys") {
            for key in items.iter().filter_map(Value::as_str).map(str::trim) {
                if !key.is_empty() {
                    keys.push(key.to_string());
                }
            }
        }
        let mut seen = std::collections::HashSet::new();
        keys.retain(|key| seen.insert(key.clone()));
        keys
    }

    /// Appends `path` to `config` unless already present.
    pub fn add_config_path(&mut self, path: &str) {
        if !self.config.iter().any(|existing| existing == path) {
            self.config.push(path.to_string());
        }
    }
}

/// Wire form of a task as emitted by the advisory service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTask {
    pub action: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<TaskType>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<RawTask>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_type_uses_lowercase_wire_names() {
        let parsed: TaskType = serde_json::from_value(json!("introspect")).expect("parse");
        assert_eq!(parsed, TaskType::Introspect);
        assert_eq!(
            serde_json::to_value(TaskType::Execute).expect("encode"),
            json!("execute")
        );
    }

    #[test]
    fn config_keys_merge_key_and_keys_without_duplicates() {
        let task = Task::new("set the model", TaskType::Config)
            .with_param("key", "anthropic.model")
            .with_param("keys", json!(["anthropic.model", "settings.debug", " "]));
        assert_eq!(
            task.config_keys(),
            vec!["anthropic.model".to_string(), "settings.debug".to_string()]
        );
    }

    #[test]
    fn options_accept_strings_and_labelled_objects() {
        let task = Task::new("pick env", TaskType::Define)
            .with_param("options", json!(["staging", {"label": "production"}, 3]));
        assert_eq!(task.options(), vec!["staging", "production"]);
    }
}
