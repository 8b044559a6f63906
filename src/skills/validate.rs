use super::expand::{
    collect_placeholders, expand_skill, has_variant_segment, reachable_skills, resolve_variant,
    resolve_variant_path, surface_placeholders, ExpandError,
};
use super::{SkillDefinition, SkillLibrary};
use crate::config::settings::core_key_type;
use crate::config::{ConfigDocument, ConfigValueType};
use crate::task::Task;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillValidationError {
    pub skill: String,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingConfig {
    pub path: String,
    pub value_type: ConfigValueType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionValidation {
    pub validation_errors: Vec<SkillValidationError>,
    pub missing_config: Vec<MissingConfig>,
}

impl ExecutionValidation {
    pub fn is_ready(&self) -> bool {
        self.validation_errors.is_empty() && self.missing_config.is_empty()
    }

    /// One line per skill, as shown to the user.
    pub fn error_summary(&self) -> String {
        self.validation_errors
            .iter()
            .map(|error| format!("{}: {}", error.skill, error.issues.join("; ")))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{count} {one}")
    } else {
        format!("{count} {many}")
    }
}

/// Structural problems that make a skill unusable.
pub fn skill_issues(skill: &SkillDefinition) -> Vec<String> {
    let mut issues = Vec::new();
    if !skill.has_execution_section {
        issues.push("skill has no execution section".to_string());
        return issues;
    }
    if skill.steps.len() != skill.execution.len() {
        issues.push(format!(
            "skill declares {} but {}",
            plural(skill.steps.len(), "step", "steps"),
            plural(
                skill.execution.len(),
                "execution entry",
                "execution entries"
            )
        ));
    } else if skill.execution.is_empty() {
        issues.push("skill execution section has no entries".to_string());
    }
    issues
}

struct Collector<'v> {
    validation: &'v mut ExecutionValidation,
    seen: BTreeSet<String>,
}

impl Collector<'_> {
    fn reject(&mut self, skill: &str, issues: Vec<String>) {
        if let Some(existing) = self
            .validation
            .validation_errors
            .iter_mut()
            .find(|error| error.skill == skill)
        {
            for issue in issues {
                if !existing.issues.contains(&issue) {
                    existing.issues.push(issue);
                }
            }
            return;
        }
        self.validation.validation_errors.push(SkillValidationError {
            skill: skill.to_string(),
            issues,
        });
    }

    fn require(&mut self, path: &str, value_type: ConfigValueType) {
        if self.seen.insert(path.to_string()) {
            self.validation.missing_config.push(MissingConfig {
                path: path.to_string(),
                value_type,
            });
        }
    }
}

/// Checks the skills referenced by `tasks` and collects every configuration
/// path they need that `config` does not provide yet. Placeholder paths found
/// while expanding are recorded in each task's `config` list.
///
/// Composition failures (unknown or circular references) are returned as
/// errors; malformed skills are reported in the result.
pub fn validate_execution(
    tasks: &mut [Task],
    library: &SkillLibrary,
    config: &ConfigDocument,
) -> Result<ExecutionValidation, ExpandError> {
    let mut validation = ExecutionValidation::default();
    let mut collector = Collector {
        validation: &mut validation,
        seen: BTreeSet::new(),
    };

    for task in tasks.iter_mut() {
        let mut schemas: Vec<&SkillDefinition> = Vec::new();

        if let Some(name) = task.skill_name().map(str::to_string) {
            let Some(skill) = library.lookup(&name) else {
                collector.reject(&name, vec!["skill not found".to_string()]);
                continue;
            };
            let issues = skill_issues(skill);
            if !issues.is_empty() {
                collector.reject(&skill.name, issues);
                continue;
            }

            let reachable = reachable_skills(skill, |name| library.lookup(name))?;
            let mut nested_invalid = false;
            for nested in reachable.iter().skip(1) {
                let issues = skill_issues(nested);
                if !issues.is_empty() {
                    collector.reject(&nested.name, issues);
                    nested_invalid = true;
                }
            }
            if nested_invalid {
                continue;
            }

            let mut commands: Vec<String> = expand_skill(skill, |name| library.lookup(name))?
                .into_iter()
                .map(|step| step.command)
                .collect();
            match task.variant().map(str::to_string) {
                Some(variant) => {
                    for command in &mut commands {
                        *command = resolve_variant(command, &variant);
                    }
                }
                None => {
                    if collect_placeholders(&commands)
                        .iter()
                        .any(|path| has_variant_segment(path))
                    {
                        collector.reject(
                            &skill.name,
                            vec!["skill needs a variant but the task names none".to_string()],
                        );
                        continue;
                    }
                }
            }
            surface_placeholders(task, &commands);
            schemas = reachable;
        } else if let Some(command) = task.command().map(str::to_string) {
            surface_placeholders(task, &[command]);
        }

        let variant = task.variant().map(str::to_string);
        for path in &task.config {
            let path = match (&variant, has_variant_segment(path)) {
                (Some(variant), true) => resolve_variant_path(path, variant),
                (None, true) => continue,
                _ => path.clone(),
            };
            if config.contains(&path) {
                continue;
            }
            let value_type = schemas
                .iter()
                .find_map(|skill| skill.config.type_of(&path))
                .or_else(|| core_key_type(&path))
                .unwrap_or_default();
            collector.require(&path, value_type);
        }
    }

    Ok(validation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::SkillConfigSchema;

    fn skill(name: &str, steps: usize, execution: &[&str]) -> SkillDefinition {
        SkillDefinition {
            key: name.to_lowercase(),
            name: name.to_string(),
            description: "A skill used in validator tests".to_string(),
            aliases: Vec::new(),
            steps: (0..steps).map(|index| format!("Step {index}")).collect(),
            execution: execution.iter().map(|entry| entry.to_string()).collect(),
            has_execution_section: true,
            config: SkillConfigSchema::default(),
            is_valid: true,
            is_incomplete: false,
        }
    }

    #[test]
    fn count_mismatch_is_a_single_issue() {
        assert_eq!(
            skill_issues(&skill("Build", 3, &["a", "b"])),
            vec!["skill declares 3 steps but 2 execution entries".to_string()]
        );
        assert_eq!(
            skill_issues(&skill("Build", 1, &["a", "b"])),
            vec!["skill declares 1 step but 2 execution entries".to_string()]
        );
        assert!(skill_issues(&skill("Build", 2, &["a", "b"])).is_empty());
    }

    #[test]
    fn missing_execution_section_is_reported() {
        let mut definition = skill("Build", 0, &[]);
        definition.has_execution_section = false;
        assert_eq!(
            skill_issues(&definition),
            vec!["skill has no execution section".to_string()]
        );
    }
}
