use super::validate::skill_issues;
use super::{SchemaNode, SkillConfigSchema, SkillDefinition};
use crate::config::ConfigValueType;
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Descriptions shorter than this mark a skill as incomplete.
pub const MIN_DESCRIPTION_LENGTH: usize = 20;

#[derive(Debug, Default)]
struct Sections {
    name: Option<Vec<String>>,
    description: Option<Vec<String>>,
    aliases: Option<Vec<String>>,
    config: Option<Vec<String>>,
    steps: Option<Vec<String>>,
    execution: Option<Vec<String>>,
}

impl Sections {
    fn slot(&mut self, title: &str) -> Option<&mut Option<Vec<String>>> {
        match title.trim().to_ascii_lowercase().as_str() {
            "name" => Some(&mut self.name),
            "description" => Some(&mut self.description),
            "aliases" => Some(&mut self.aliases),
            "config" => Some(&mut self.config),
            "steps" => Some(&mut self.steps),
            "execution" => Some(&mut self.execution),
            _ => None,
        }
    }
}

fn split_sections(raw: &str) -> Option<Sections> {
    let mut sections = Sections::default();
    let mut current: Option<String> = None;
    let mut seen_any = false;

    for line in raw.lines() {
        if let Some(title) = line.trim_start().strip_prefix("### ") {
            let title = title.trim().to_string();
            if let Some(slot) = sections.slot(&title) {
                slot.get_or_insert_with(Vec::new);
                seen_any = true;
                current = Some(title);
            } else {
                current = None;
            }
            continue;
        }
        if line.trim_start().starts_with("##") {
            current = None;
            continue;
        }
        if let Some(title) = current.as_deref() {
            if let Some(Some(lines)) = sections.slot(title).map(|slot| slot.as_mut()) {
                lines.push(line.to_string());
            }
        }
    }

    seen_any.then_some(sections)
}

fn joined_text(lines: &[String]) -> String {
    lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_bullet(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    for marker in ["- ", "* ", "+ "] {
        if let Some(rest) = trimmed.strip_prefix(marker) {
            return Some(rest.trim());
        }
    }
    let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &trimmed[digits..];
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return Some(rest.trim());
        }
    }
    None
}

/// Bullet items; unbulleted lines continue the previous item.
fn list_items(lines: &[String]) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        match strip_bullet(line) {
            Some(item) => items.push(item.to_string()),
            None => match items.last_mut() {
                Some(last) => {
                    last.push(' ');
                    last.push_str(line.trim());
                }
                None => items.push(line.trim().to_string()),
            },
        }
    }
    items.retain(|item| !item.is_empty());
    items
}

/// Drops a leading `Label: ` from an execution entry.
pub(crate) fn strip_label(entry: &str) -> &str {
    let entry = entry.trim();
    if entry.starts_with('[') {
        return entry;
    }
    let Some(position) = entry.find(": ") else {
        return entry;
    };
    let label = &entry[..position];
    let starts_upper = label
        .chars()
        .next()
        .is_some_and(|ch| ch.is_ascii_uppercase());
    let plain = label
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == ' ' || ch == '-' || ch == '_');
    let command = entry[position + 2..].trim();
    if starts_upper && plain && !command.is_empty() {
        command
    } else {
        entry
    }
}

fn schema_node(value: &Value) -> Option<SchemaNode> {
    match value {
        Value::String(tag) => Some(SchemaNode::Leaf(
            ConfigValueType::from_tag(tag).unwrap_or_default(),
        )),
        Value::Null => Some(SchemaNode::Leaf(ConfigValueType::String)),
        Value::Mapping(mapping) => {
            let mut children = BTreeMap::new();
            for (key, child) in mapping {
                let Some(key) = key.as_str() else {
                    continue;
                };
                if let Some(node) = schema_node(child) {
                    children.insert(key.to_string(), node);
                }
            }
            Some(SchemaNode::Branch(children))
        }
        _ => None,
    }
}

fn parse_config_schema(lines: &[String]) -> SkillConfigSchema {
    let body: Vec<&str> = lines
        .iter()
        .map(String::as_str)
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect();
    let Ok(Value::Mapping(mapping)) = serde_yaml::from_str::<Value>(&body.join("\n")) else {
        return SkillConfigSchema::default();
    };
    match schema_node(&Value::Mapping(mapping)) {
        Some(SchemaNode::Branch(root)) => SkillConfigSchema::new(root),
        _ => SkillConfigSchema::default(),
    }
}

/// Parses one skill document. Returns `None` when the text has no
/// recognizable sections.
pub fn parse_skill_document(key: &str, raw: &str) -> Option<SkillDefinition> {
    let sections = split_sections(raw)?;

    let name = sections
        .name
        .as_deref()
        .map(joined_text)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| key.to_string());
    let description = sections
        .description
        .as_deref()
        .map(joined_text)
        .unwrap_or_default();
    let aliases = sections
        .aliases
        .as_deref()
        .map(|lines| {
            list_items(lines)
                .into_iter()
                .flat_map(|item| {
                    item.split(',')
                        .map(|alias| alias.trim().to_string())
                        .collect::<Vec<_>>()
                })
                .filter(|alias| !alias.is_empty())
                .collect()
        })
        .unwrap_or_default();
    let steps = sections.steps.as_deref().map(list_items).unwrap_or_default();
    let execution = sections
        .execution
        .as_deref()
        .map(|lines| {
            list_items(lines)
                .iter()
                .map(|entry| strip_label(entry).to_string())
                .collect()
        })
        .unwrap_or_default();
    let config = sections
        .config
        .as_deref()
        .map(parse_config_schema)
        .unwrap_or_default();

    let mut skill = SkillDefinition {
        key: key.to_string(),
        name,
        is_incomplete: description.trim().chars().count() < MIN_DESCRIPTION_LENGTH,
        description,
        aliases,
        steps,
        execution,
        has_execution_section: sections.execution.is_some(),
        config,
        is_valid: false,
    };
    skill.is_valid = skill_issues(&skill).is_empty();
    Some(skill)
}
