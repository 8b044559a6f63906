use super::{normalize_name, SkillDefinition};
use crate::config::ConfigDocument;
use crate::task::Task;

/// Placeholder segment replaced by the caller-supplied variant name.
pub const VARIANT_SEGMENT: &str = "VARIANT";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpandError {
    #[error("skill reference not found: {name}")]
    ReferenceNotFound { name: String },
    #[error("circular skill reference: {}", .chain.join(" -> "))]
    CircularReference { chain: Vec<String> },
    #[error("missing config value for {path}")]
    MissingConfig { path: String },
}

/// One concrete command paired with the step text it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedStep {
    pub description: String,
    pub command: String,
}

/// Name inside a `[ Skill Name ]` execution entry.
pub fn parse_skill_reference(entry: &str) -> Option<&str> {
    let inner = entry.trim().strip_prefix('[')?.strip_suffix(']')?.trim();
    if inner.is_empty() {
        None
    } else {
        Some(inner)
    }
}

struct Walker<'a, F> {
    lookup: F,
    path: Vec<String>,
    visited: Vec<&'a SkillDefinition>,
}

impl<'a, F> Walker<'a, F>
where
    F: Fn(&str) -> Option<&'a SkillDefinition>,
{
    fn new(lookup: F) -> Self {
        Self {
            lookup,
            path: Vec::new(),
            visited: Vec::new(),
        }
    }

    fn splice(&mut self, name: &str, out: &mut Vec<ExpandedStep>) -> Result<(), ExpandError> {
        let skill = (self.lookup)(name).ok_or_else(|| ExpandError::ReferenceNotFound {
            name: name.to_string(),
        })?;
        self.enter(skill, out)
    }

    fn enter(
        &mut self,
        skill: &'a SkillDefinition,
        out: &mut Vec<ExpandedStep>,
    ) -> Result<(), ExpandError> {
        let key = normalize_name(&skill.name);
        if self.path.iter().any(|name| normalize_name(name) == key) {
            let mut chain = self.path.clone();
            chain.push(skill.name.clone());
            return Err(ExpandError::CircularReference { chain });
        }

        self.path.push(skill.name.clone());
        if !self
            .visited
            .iter()
            .any(|seen| normalize_name(&seen.name) == key)
        {
            self.visited.push(skill);
        }
        for (index, entry) in skill.execution.iter().enumerate() {
            match parse_skill_reference(entry) {
                Some(name) => self.splice(name, out)?,
                None => out.push(ExpandedStep {
                    description: skill
                        .steps
                        .get(index)
                        .cloned()
                        .unwrap_or_else(|| entry.clone()),
                    command: entry.clone(),
                }),
            }
        }
        self.path.pop();
        Ok(())
    }
}

/// Replaces skill references in `commands` with the referenced skills'
/// execution entries, recursively. Plain commands pass through in order.
pub fn expand_commands<'a, F>(commands: &[String], lookup: F) -> Result<Vec<String>, ExpandError>
where
    F: Fn(&str) -> Option<&'a SkillDefinition>,
{
    let mut walker = Walker::new(lookup);
    let mut expanded = Vec::with_capacity(commands.len());
    for entry in commands {
        match parse_skill_reference(entry) {
            Some(name) => {
                let mut steps = Vec::new();
                walker.splice(name, &mut steps)?;
                expanded.extend(steps.into_iter().map(|step| step.command));
            }
            None => expanded.push(entry.clone()),
        }
    }
    Ok(expanded)
}

/// Flattens `skill` into concrete steps. The skill itself counts as the first
/// entry on the reference path, so self-references are circular.
pub fn expand_skill<'a, F>(
    skill: &'a SkillDefinition,
    lookup: F,
) -> Result<Vec<ExpandedStep>, ExpandError>
where
    F: Fn(&str) -> Option<&'a SkillDefinition>,
{
    let mut steps = Vec::new();
    Walker::new(lookup).enter(skill, &mut steps)?;
    Ok(steps)
}

/// Every skill reachable from `skill` through references, `skill` first,
/// each once.
pub(crate) fn reachable_skills<'a, F>(
    skill: &'a SkillDefinition,
    lookup: F,
) -> Result<Vec<&'a SkillDefinition>, ExpandError>
where
    F: Fn(&str) -> Option<&'a SkillDefinition>,
{
    let mut walker = Walker::new(lookup);
    let mut steps = Vec::new();
    walker.enter(skill, &mut steps)?;
    Ok(walker.visited)
}

struct Placeholder<'c> {
    start: usize,
    end: usize,
    path: &'c str,
}

fn is_config_path(candidate: &str) -> bool {
    candidate.contains('.')
        && candidate.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
        })
}

/// `{a.b.c}` tokens in `command`. Shell expansions such as `${HOME}` and
/// braces around anything other than a dotted path are not placeholders.
fn placeholders(command: &str) -> Vec<Placeholder<'_>> {
    let mut found = Vec::new();
    let mut cursor = 0;
    while let Some(offset) = command[cursor..].find('{') {
        let start = cursor + offset;
        let Some(close) = command[start + 1..].find('}') else {
            break;
        };
        let end = start + 1 + close;
        let path = &command[start + 1..end];
        let shell_expansion = command[..start].ends_with('$');
        if !shell_expansion && is_config_path(path) {
            found.push(Placeholder {
                start,
                end: end + 1,
                path,
            });
            cursor = end + 1;
        } else {
            cursor = start + 1;
        }
    }
    found
}

fn rewrite<E>(
    command: &str,
    mut replace: impl FnMut(&str) -> Result<String, E>,
) -> Result<String, E> {
    let mut rendered = String::with_capacity(command.len());
    let mut cursor = 0;
    for placeholder in placeholders(command) {
        rendered.push_str(&command[cursor..placeholder.start]);
        rendered.push_str(&replace(placeholder.path)?);
        cursor = placeholder.end;
    }
    rendered.push_str(&command[cursor..]);
    Ok(rendered)
}

/// Distinct placeholder paths across `commands`, in order of first occurrence.
pub fn collect_placeholders(commands: &[String]) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();
    for command in commands {
        for placeholder in placeholders(command) {
            if !paths.iter().any(|path| path == placeholder.path) {
                paths.push(placeholder.path.to_string());
            }
        }
    }
    paths
}

/// Records each placeholder path from `commands` in the task's `config` list.
pub fn surface_placeholders(task: &mut Task, commands: &[String]) {
    for path in collect_placeholders(commands) {
        task.add_config_path(&path);
    }
}

pub(crate) fn has_variant_segment(path: &str) -> bool {
    path.split('.').any(|segment| segment == VARIANT_SEGMENT)
}

pub(crate) fn resolve_variant_path(path: &str, variant: &str) -> String {
    let variant = variant.trim().to_lowercase();
    path.split('.')
        .map(|segment| {
            if segment == VARIANT_SEGMENT {
                variant.as_str()
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Replaces `VARIANT` segments inside placeholders with `variant`, lowercased.
pub fn resolve_variant(command: &str, variant: &str) -> String {
    let resolved: Result<String, std::convert::Infallible> = rewrite(command, |path| {
        Ok(format!("{{{}}}", resolve_variant_path(path, variant)))
    });
    match resolved {
        Ok(text) => text,
        Err(never) => match never {},
    }
}

/// Replaces each placeholder with its configured value.
pub fn substitute_placeholders(
    command: &str,
    config: &ConfigDocument,
) -> Result<String, ExpandError> {
    rewrite(command, |path| {
        config
            .get_text(path)
            .ok_or_else(|| ExpandError::MissingConfig {
                path: path.to_string(),
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skill_reference_requires_brackets_and_name() {
        assert_eq!(parse_skill_reference("[ Build Project ]"), Some("Build Project"));
        assert_eq!(parse_skill_reference("[Deploy]"), Some("Deploy"));
        assert_eq!(parse_skill_reference("[ ]"), None);
        assert_eq!(parse_skill_reference("make [target]"), None);
    }

    #[test]
    fn placeholders_skip_shell_and_json_braces() {
        let commands = vec![
            "echo ${HOME} {project.alpha.repo}".to_string(),
            "awk '{print $1}' {project.alpha.repo} {x}".to_string(),
            "curl -d '{\"a\": 1}' {api.url}".to_string(),
        ];
        assert_eq!(
            collect_placeholders(&commands),
            vec!["project.alpha.repo".to_string(), "api.url".to_string()]
        );
    }

    #[test]
    fn resolve_variant_only_touches_placeholders() {
        assert_eq!(
            resolve_variant("deploy VARIANT {env.VARIANT.host}", "Staging"),
            "deploy VARIANT {env.staging.host}"
        );
    }

    #[test]
    fn substitute_reports_first_missing_path() {
        let config = ConfigDocument::from_yaml_str("env:\n  staging:\n    host: s1\n", "inline")
            .expect("config");
        assert_eq!(
            substitute_placeholders("ssh {env.staging.host}", &config).expect("render"),
            "ssh s1"
        );
        assert_eq!(
            substitute_placeholders("ssh {env.prod.host}", &config),
            Err(ExpandError::MissingConfig {
                path: "env.prod.host".to_string()
            })
        );
    }

    #[test]
    fn circular_error_message_shows_chain() {
        let err = ExpandError::CircularReference {
            chain: vec!["A".to_string(), "B".to_string(), "A".to_string()],
        };
        assert_eq!(err.to_string(), "circular skill reference: A -> B -> A");
    }
}
