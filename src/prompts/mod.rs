use crate::advisory::ToolName;
use serde_json::{json, Value};

const PLAN_INSTRUCTIONS: &str = include_str!("assets/plan.md");
const EXECUTE_INSTRUCTIONS: &str = include_str!("assets/execute.md");
const ANSWER_INSTRUCTIONS: &str = include_str!("assets/answer.md");
const INTROSPECT_INSTRUCTIONS: &str = include_str!("assets/introspect.md");
const CONFIG_INSTRUCTIONS: &str = include_str!("assets/config.md");

const TASK_TYPES: [&str; 12] = [
    "config",
    "plan",
    "execute",
    "answer",
    "introspect",
    "report",
    "define",
    "ignore",
    "select",
    "discard",
    "group",
    "schedule",
];

pub fn instructions(tool: ToolName) -> &'static str {
    match tool {
        ToolName::Plan => PLAN_INSTRUCTIONS,
        ToolName::Execute => EXECUTE_INSTRUCTIONS,
        ToolName::Answer => ANSWER_INSTRUCTIONS,
        ToolName::Introspect => INTROSPECT_INSTRUCTIONS,
        ToolName::Config => CONFIG_INSTRUCTIONS,
    }
}

fn description(tool: ToolName) -> &'static str {
    match tool {
        ToolName::Plan => "Break the user's request into typed tasks.",
        ToolName::Execute => "Turn confirmed tasks into shell commands.",
        ToolName::Answer => "Answer the user's question.",
        ToolName::Introspect => "List what the assistant can do.",
        ToolName::Config => "Name the configuration keys the user wants to set.",
    }
}

fn task_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "action": {"type": "string"},
            "type": {"type": "string", "enum": TASK_TYPES},
            "params": {"type": "object"},
            "config": {"type": "array", "items": {"type": "string"}},
            "subtasks": {"type": "array", "items": {"type": "object"}}
        },
        "required": ["action", "type"]
    })
}

fn input_schema(tool: ToolName) -> Value {
    let properties = match tool {
        ToolName::Plan | ToolName::Config => json!({
            "message": {"type": "string"},
            "tasks": {"type": "array", "items": task_schema()}
        }),
        ToolName::Execute => json!({
            "message": {"type": "string"},
            "summary": {"type": "string"},
            "commands": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "description": {"type": "string"},
                        "command": {"type": "string"},
                        "critical": {"type": "boolean"}
                    },
                    "required": ["description", "command"]
                }
            }
        }),
        ToolName::Answer => json!({
            "message": {"type": "string"},
            "answer": {"type": "string"}
        }),
        ToolName::Introspect => json!({
            "message": {"type": "string"},
            "capabilities": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "description": {"type": "string"}
                    },
                    "required": ["name", "description"]
                }
            }
        }),
    };
    let required: Vec<&str> = match tool {
        ToolName::Plan | ToolName::Config => vec!["message", "tasks"],
        ToolName::Execute => vec!["message", "commands"],
        ToolName::Answer => vec!["message", "answer"],
        ToolName::Introspect => vec!["message", "capabilities"],
    };
    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

/// Tool definition in the Messages API shape.
pub fn tool_definition(tool: ToolName) -> Value {
    json!({
        "name": tool.as_str(),
        "description": description(tool),
        "input_schema": input_schema(tool)
    })
}

/// Instructions for `tool` followed by the caller's context. A `skills`
/// string in the context is appended as its own section.
pub fn system_prompt(tool: ToolName, context: Option<&Value>) -> String {
    let mut prompt = instructions(tool).trim_end().to_string();
    let Some(context) = context else {
        return prompt;
    };
    if let Some(skills) = context.get("skills").and_then(Value::as_str) {
        if !skills.trim().is_empty() {
            prompt.push_str("\n\n## Available skills\n\n");
            prompt.push_str(skills.trim());
        }
    }
    let rest: serde_json::Map<String, Value> = context
        .as_object()
        .map(|object| {
            object
                .iter()
                .filter(|(key, _)| key.as_str() != "skills")
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .unwrap_or_default();
    if !rest.is_empty() {
        prompt.push_str("\n\n## Context\n\n");
        prompt.push_str(&Value::Object(rest).to_string());
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tool_has_instructions_and_schema() {
        for tool in ToolName::ALL {
            assert!(!instructions(tool).trim().is_empty());
            let definition = tool_definition(tool);
            assert_eq!(definition["name"], json!(tool.as_str()));
            assert_eq!(definition["input_schema"]["type"], json!("object"));
        }
    }

    #[test]
    fn system_prompt_appends_skill_catalogue() {
        let prompt = system_prompt(
            ToolName::Plan,
            Some(&json!({"skills": "### Build\nCompiles the project", "cwd": "/tmp"})),
        );
        assert!(prompt.contains("## Available skills"));
        assert!(prompt.contains("### Build"));
        assert!(prompt.contains("\"cwd\":\"/tmp\""));
    }
}
