use super::{RouteContext, RouterError, RouterPhase};
use crate::config::settings::core_key_type;
use crate::config::{core_config_keys, ConfigKey};
use crate::lifecycle::{Component, Unit};
use crate::skills::validate_execution;
use crate::task::{Task, TaskType};

/// The single type shared by `tasks`.
pub fn ensure_uniform(tasks: &[Task]) -> Result<TaskType, RouterError> {
    let first = tasks.first().ok_or(RouterError::NoTasks)?.task_type;
    let mut types = vec![first];
    for task in tasks {
        if !types.contains(&task.task_type) {
            types.push(task.task_type);
        }
    }
    if types.len() > 1 {
        return Err(RouterError::MixedTaskTypes { types });
    }
    Ok(first)
}

/// Keys named by Config tasks, or the core keys when none are named.
pub fn keys_for_config_tasks(tasks: &[Task]) -> Vec<ConfigKey> {
    let core = core_config_keys();
    let mut keys: Vec<ConfigKey> = Vec::new();
    for task in tasks {
        for path in task.config_keys() {
            if keys.iter().any(|key| key.path == path) {
                continue;
            }
            let key = core
                .iter()
                .find(|key| key.path == path)
                .cloned()
                .unwrap_or_else(|| {
                    ConfigKey::new(path.as_str(), core_key_type(&path).unwrap_or_default())
                });
            keys.push(key);
        }
    }
    if keys.is_empty() {
        core
    } else {
        keys
    }
}

/// Units for the confirmed, now uniform task list.
pub fn dispatch(
    mut tasks: Vec<Task>,
    ctx: &RouteContext<'_>,
) -> Result<(RouterPhase, Vec<Unit>), RouterError> {
    match ensure_uniform(&tasks)? {
        TaskType::Answer => {
            let question = tasks[0].action.clone();
            Ok((
                RouterPhase::Answering,
                vec![Unit::new(Component::Answer { question })],
            ))
        }
        TaskType::Introspect => Ok((
            RouterPhase::Introspecting,
            vec![Unit::new(Component::Introspect { tasks })],
        )),
        TaskType::Config => Ok((
            RouterPhase::Configuring,
            vec![Unit::new(Component::Config {
                keys: keys_for_config_tasks(&tasks),
            })],
        )),
        _ => {
            let validation = validate_execution(&mut tasks, ctx.library, ctx.config)?;
            if !validation.validation_errors.is_empty() {
                return Err(RouterError::InvalidSkills {
                    summary: validation.error_summary(),
                });
            }
            let mut units = Vec::with_capacity(2);
            if !validation.missing_config.is_empty() {
                ctx.logger.info(
                    "router.missing_config",
                    &validation
                        .missing_config
                        .iter()
                        .map(|missing| missing.path.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                );
                units.push(Unit::new(Component::Config {
                    keys: validation
                        .missing_config
                        .iter()
                        .map(|missing| ConfigKey::new(missing.path.as_str(), missing.value_type))
                        .collect(),
                }));
            }
            units.push(Unit::new(Component::Execute { tasks }));
            Ok((RouterPhase::Executing, units))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn uniform_check_lists_every_type_once() {
        let tasks = vec![
            Task::new("a", TaskType::Execute),
            Task::new("b", TaskType::Answer),
            Task::new("c", TaskType::Execute),
        ];
        match ensure_uniform(&tasks) {
            Err(RouterError::MixedTaskTypes { types }) => {
                assert_eq!(types, vec![TaskType::Execute, TaskType::Answer])
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(ensure_uniform(&[]), Err(RouterError::NoTasks)));
    }

    #[test]
    fn config_tasks_without_keys_fall_back_to_core_keys() {
        let bare = vec![Task::new("configure", TaskType::Config)];
        assert_eq!(keys_for_config_tasks(&bare), core_config_keys());

        let named = vec![Task::new("set model", TaskType::Config)
            .with_param("keys", json!(["anthropic.model", "project.alpha.repo"]))];
        let paths: Vec<String> = keys_for_config_tasks(&named)
            .into_iter()
            .map(|key| key.path)
            .collect();
        assert_eq!(paths, vec!["anthropic.model", "project.alpha.repo"]);
    }
}
