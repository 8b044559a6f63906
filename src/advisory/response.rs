use super::{AdvisoryError, AdvisoryResponse, Capability, ToolName};
use crate::executor::ExecuteCommand;
use crate::task::{RawTask, TaskList};
use serde_json::{Map, Value};

fn unrecognized(reason: &str) -> AdvisoryError {
    AdvisoryError::UnrecognizedResponse {
        reason: reason.to_string(),
    }
}

fn malformed(field: &str, err: impl std::fmt::Display) -> AdvisoryError {
    AdvisoryError::Malformed {
        field: field.to_string(),
        reason: err.to_string(),
    }
}

fn optional_text(input: &Map<String, Value>, field: &str) -> Result<Option<String>, AdvisoryError> {
    match input.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(other) => Err(malformed(field, format!("expected a string, got {other}"))),
    }
}

fn has_action(entry: &Value) -> bool {
    let Some(action) = entry.get("action").and_then(Value::as_str) else {
        return false;
    };
    if action.trim().is_empty() {
        return false;
    }
    match entry.get("subtasks") {
        Some(Value::Array(children)) => children.iter().all(has_action),
        _ => true,
    }
}

fn parse_tasks(value: Option<&Value>) -> Result<TaskList, AdvisoryError> {
    let entries = match value {
        None | Some(Value::Null) => return Ok(TaskList::default()),
        Some(Value::Array(entries)) => entries,
        Some(_) => return Err(AdvisoryError::InvalidTasks),
    };

    let mut raw = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        if !has_action(entry) {
            return Err(AdvisoryError::InvalidTask {
                index,
                reason: "task must have a non-empty action".to_string(),
            });
        }
        let task: RawTask =
            serde_json::from_value(entry.clone()).map_err(|err| AdvisoryError::InvalidTask {
                index,
                reason: err.to_string(),
            })?;
        raw.push(task);
    }
    Ok(TaskList::from_raw(raw)?)
}

fn parse_list<T: serde::de::DeserializeOwned>(
    input: &Map<String, Value>,
    field: &str,
) -> Result<Vec<T>, AdvisoryError> {
    match input.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value @ Value::Array(_)) => {
            serde_json::from_value(value.clone()).map_err(|err| malformed(field, err))
        }
        Some(_) => Err(malformed(field, "expected a list")),
    }
}

/// Validates a Messages API response body and extracts the input of the
/// `tool` call.
pub fn parse_tool_response(body: &Value, tool: ToolName) -> Result<AdvisoryResponse, AdvisoryError> {
    if body.get("stop_reason").and_then(Value::as_str) == Some("max_tokens") {
        return Err(AdvisoryError::Truncated);
    }

    let blocks = body
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| unrecognized("response has no content blocks"))?;
    let tool_uses: Vec<&Value> = blocks
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("tool_use"))
        .collect();
    let block = tool_uses
        .iter()
        .find(|block| block.get("name").and_then(Value::as_str) == Some(tool.as_str()))
        .or_else(|| tool_uses.first())
        .ok_or_else(|| unrecognized("response has no tool call"))?;
    let input = block
        .get("input")
        .and_then(Value::as_object)
        .ok_or_else(|| unrecognized("tool call input is not an object"))?;

    let capabilities: Vec<Capability> = parse_list(input, "capabilities")?;
    let commands: Vec<ExecuteCommand> = parse_list(input, "commands")?;

    Ok(AdvisoryResponse {
        message: optional_text(input, "message")?.unwrap_or_default(),
        tasks: parse_tasks(input.get("tasks"))?,
        capabilities,
        answer: optional_text(input, "answer")?,
        commands,
        summary: optional_text(input, "summary")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool_body(input: Value) -> Value {
        json!({
            "stop_reason": "tool_use",
            "content": [
                {"type": "text", "text": "thinking"},
                {"type": "tool_use", "name": "plan", "input": input}
            ]
        })
    }

    #[test]
    fn empty_action_reports_task_index() {
        let body = tool_body(json!({
            "message": "plan",
            "tasks": [
                {"action": "build", "type": "execute"},
                {"action": "  ", "type": "execute"}
            ]
        }));
        match parse_tool_response(&body, ToolName::Plan) {
            Err(AdvisoryError::InvalidTask { index, .. }) => assert_eq!(index, 1),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn nested_subtask_without_action_is_rejected() {
        let body = tool_body(json!({
            "tasks": [
                {"action": "release", "type": "group", "subtasks": [{"type": "execute"}]}
            ]
        }));
        assert!(matches!(
            parse_tool_response(&body, ToolName::Plan),
            Err(AdvisoryError::InvalidTask { index: 0, .. })
        ));
    }

    #[test]
    fn absent_tasks_is_an_empty_list() {
        let body = tool_body(json!({"message": "hello"}));
        let response = parse_tool_response(&body, ToolName::Plan).expect("parse");
        assert!(response.tasks.is_empty());
        assert_eq!(response.message, "hello");
    }
}
