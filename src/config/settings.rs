use super::ConfigValueType;
use crate::shared::DebugLevel;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVICE_MODEL: &str = "claude-haiku-4-5";

fn default_model() -> String {
    DEFAULT_SERVICE_MODEL.to_string()
}

/// The `anthropic` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSettings {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            key: None,
            model: default_model(),
        }
    }
}

impl ServiceSettings {
    pub fn api_key(&self) -> Option<&str> {
        self.key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

/// The `settings` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralSettings {
    #[serde(default)]
    pub debug: DebugLevel,
}

/// A key the user can be asked to provide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigKey {
    pub path: String,
    pub value_type: ConfigValueType,
    #[serde(default)]
    pub description: Option<String>,
}

impl ConfigKey {
    pub fn new(path: impl Into<String>, value_type: ConfigValueType) -> Self {
        Self {
            path: path.into(),
            value_type,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn prompt(&self) -> String {
        match &self.description {
            Some(description) => format!("{description} ({})", self.path),
            None => format!("Value for {}", self.path),
        }
    }
}

pub fn core_config_keys() -> Vec<ConfigKey> {
    vec![
        ConfigKey::new("anthropic.key", ConfigValueType::String)
            .with_description("Anthropic API key"),
        ConfigKey::new("anthropic.model", ConfigValueType::String)
            .with_description("Model used to plan requests"),
        ConfigKey::new("settings.debug", ConfigValueType::String)
            .with_description("Debug level: none, info or verbose"),
    ]
}

/// Type of a core key, when `path` names one.
pub fn core_key_type(path: &str) -> Option<ConfigValueType> {
    core_config_keys()
        .into_iter()
        .find(|key| key.path == path)
        .map(|key| key.value_type)
}
