use crate::config::ConfigValueType;
use crate::shared::Logger;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

pub mod expand;
pub mod parse;
pub mod validate;

pub use expand::{
    collect_placeholders, expand_commands, expand_skill, parse_skill_reference, resolve_variant,
    substitute_placeholders, surface_placeholders, ExpandError, ExpandedStep, VARIANT_SEGMENT,
};
pub use parse::{parse_skill_document, MIN_DESCRIPTION_LENGTH};
pub use validate::{
    skill_issues, validate_execution, ExecutionValidation, MissingConfig, SkillValidationError,
};

#[derive(Debug, thiserror::Error)]
pub enum SkillError {
    #[error("failed to read skills directory {path}: {source}")]
    ReadDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Nested `key: type` declarations from a skill's Config section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaNode {
    Leaf(ConfigValueType),
    Branch(BTreeMap<String, SchemaNode>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillConfigSchema {
    root: BTreeMap<String, SchemaNode>,
}

impl SkillConfigSchema {
    pub fn new(root: BTreeMap<String, SchemaNode>) -> Self {
        Self { root }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Declared type of `path`. A `VARIANT` segment in the declaration
    /// matches any concrete segment.
    pub fn type_of(&self, path: &str) -> Option<ConfigValueType> {
        let mut level = &self.root;
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            let node = level
                .get(segment)
                .or_else(|| level.get(expand::VARIANT_SEGMENT))?;
            match node {
                SchemaNode::Leaf(value_type) if segments.peek().is_none() => {
                    return Some(*value_type)
                }
                SchemaNode::Leaf(_) => return None,
                SchemaNode::Branch(children) => level = children,
            }
        }
        None
    }
}

/// A workflow definition loaded from one skill document. Never mutated after
/// load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillDefinition {
    pub key: String,
    pub name: String,
    pub description: String,
    pub aliases: Vec<String>,
    pub steps: Vec<String>,
    pub execution: Vec<String>,
    pub has_execution_section: bool,
    pub config: SkillConfigSchema,
    pub is_valid: bool,
    pub is_incomplete: bool,
}

impl SkillDefinition {
    pub fn matches(&self, name: &str) -> bool {
        let wanted = normalize_name(name);
        normalize_name(&self.name) == wanted
            || normalize_name(&self.key) == wanted
            || self.aliases.iter().any(|alias| normalize_name(alias) == wanted)
    }
}

pub(crate) fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Clone, Default)]
pub struct SkillLibrary {
    skills: Vec<SkillDefinition>,
    index: BTreeMap<String, usize>,
}

impl SkillLibrary {
    pub fn from_skills(skills: Vec<SkillDefinition>) -> Self {
        let mut index = BTreeMap::new();
        for (position, skill) in skills.iter().enumerate() {
            let names = std::iter::once(&skill.name)
                .chain(std::iter::once(&skill.key))
                .chain(skill.aliases.iter());
            for name in names {
                index.entry(normalize_name(name)).or_insert(position);
            }
        }
        Self { skills, index }
    }

    /// Loads every `*.md` document in `dir`, sorted by file name. A missing
    /// directory yields an empty library; unreadable documents are skipped.
    pub fn load_dir(dir: &Path, logger: &Logger) -> Result<Self, SkillError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(SkillError::ReadDir {
                    path: dir.display().to_string(),
                    source,
                })
            }
        };

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| SkillError::ReadDir {
                path: dir.display().to_string(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("md") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut skills = Vec::new();
        for path in paths {
            let key = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or_default()
                .to_string();
            match fs::read_to_string(&path) {
                Ok(raw) => match parse_skill_document(&key, &raw) {
                    Some(skill) => {
                        if !skill.is_valid {
                            logger.info(
                                "skills.invalid",
                                &format!("skill `{}` at {} is invalid", skill.name, path.display()),
                            );
                        }
                        skills.push(skill);
                    }
                    None => logger.info(
                        "skills.skipped",
                        &format!("{} has no recognizable skill sections", path.display()),
                    ),
                },
                Err(err) => logger.info(
                    "skills.unreadable",
                    &format!("failed to read {}: {err}", path.display()),
                ),
            }
        }
        Ok(Self::from_skills(skills))
    }

    pub fn lookup(&self, name: &str) -> Option<&SkillDefinition> {
        self.index
            .get(&normalize_name(name))
            .and_then(|position| self.skills.get(*position))
    }

    pub fn skills(&self) -> &[SkillDefinition] {
        &self.skills
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// Text listing of valid skills, as given to the advisory service.
    pub fn catalogue(&self) -> String {
        let mut lines = Vec::new();
        for skill in self.skills.iter().filter(|skill| skill.is_valid) {
            lines.push(format!("### {}", skill.name));
            lines.push(skill.description.clone());
            if !skill.aliases.is_empty() {
                lines.push(format!("Aliases: {}", skill.aliases.join(", ")));
            }
            for step in &skill.steps {
                lines.push(format!("- {step}"));
            }
            lines.push(String::new());
        }
        lines.join("\n").trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> SkillConfigSchema {
        SkillConfigSchema::new(BTreeMap::from([(
            "project".to_string(),
            SchemaNode::Branch(BTreeMap::from([(
                "VARIANT".to_string(),
                SchemaNode::Branch(BTreeMap::from([
                    (
                        "repo".to_string(),
                        SchemaNode::Leaf(ConfigValueType::String),
                    ),
                    (
                        "replicas".to_string(),
                        SchemaNode::Leaf(ConfigValueType::Number),
                    ),
                ])),
            )])),
        )]))
    }

    #[test]
    fn schema_type_lookup_matches_variant_segment() {
        let schema = schema();
        assert_eq!(
            schema.type_of("project.alpha.replicas"),
            Some(ConfigValueType::Number)
        );
        assert_eq!(
            schema.type_of("project.VARIANT.repo"),
            Some(ConfigValueType::String)
        );
        assert_eq!(schema.type_of("project.alpha"), None);
        assert_eq!(schema.type_of("other.key"), None);
    }

    #[test]
    fn normalize_name_collapses_case_and_spaces() {
        assert_eq!(normalize_name("  Deploy   Service "), "deploy service");
    }
}
