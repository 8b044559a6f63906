use super::SessionError;
use crate::advisory::{AdvisoryError, AdvisoryService, ToolName};
use crate::app::interaction::Interaction;
use crate::config::{parse_config_value, save_config, ConfigDocument, ConfigKey};
use crate::execution::{ExecutionPipeline, PipelineEvent, PipelineOutcome};
use crate::executor::{CancellationToken, CommandExecutor, ExecuteCommand};
use crate::lifecycle::{Component, Handlers, Unit, UnitState};
use crate::router::{route_response, RouteContext, RouterPhase};
use crate::shared::Logger;
use crate::skills::{
    expand_skill, resolve_variant, substitute_placeholders, ExpandError, SkillLibrary,
};
use crate::task::{Task, TaskList, TaskType};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;

const SECRET_MASK: &str = "********";

fn skills_context(library: &SkillLibrary) -> Value {
    json!({ "skills": library.catalogue() })
}

fn require(advisory: Option<&dyn AdvisoryService>) -> Result<&dyn AdvisoryService, AdvisoryError> {
    advisory.ok_or(AdvisoryError::MissingApiKey)
}

/// The original request followed by the user's choices.
pub(crate) fn refined_request(request: &str, selections: &[String]) -> String {
    let mut lines = vec![request.trim().to_string(), String::new(), "User selections:".to_string()];
    lines.extend(selections.iter().map(|selection| format!("- {selection}")));
    lines.join("\n")
}

fn is_secret(path: &str) -> bool {
    path.rsplit('.').next() == Some("key")
}

pub(super) fn plan_request(
    mut handlers: Handlers<'_>,
    request: &str,
    advisory: Option<&dyn AdvisoryService>,
    route: &RouteContext<'_>,
) -> RouterPhase {
    let context = skills_context(route.library);
    let result = require(advisory)
        .and_then(|advisory| advisory.process_with_tool(request, ToolName::Plan, Some(&context)));
    match result {
        Ok(response) => route_response(handlers, request, &response, route),
        Err(err) => {
            handlers.update_state(UnitState::Command {
                error: Some(err.to_string()),
            });
            handlers.on_error(&err.to_string());
            RouterPhase::Done
        }
    }
}

pub(super) fn select_options(
    mut handlers: Handlers<'_>,
    interaction: &mut dyn Interaction,
    request: &str,
    tasks: &TaskList,
) -> RouterPhase {
    let mut selections = Vec::new();
    for task in tasks
        .leaves()
        .into_iter()
        .filter(|task| task.task_type == TaskType::Define)
    {
        let options = task.options();
        let choice = if options.is_empty() {
            interaction.ask(&task.action, None)
        } else {
            interaction.select(&task.action, &options).map(|picked| {
                picked
                    .iter()
                    .filter_map(|index| options.get(*index).cloned())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
        };
        match choice {
            Some(choice) if !choice.trim().is_empty() => {
                selections.push(format!("{}: {}", task.action, choice.trim()))
            }
            _ => {
                handlers.on_aborted("selection");
                return RouterPhase::Done;
            }
        }
    }

    handlers.update_state(UnitState::Plan {
        selections: selections.clone(),
    });
    handlers.add_to_queue(vec![Unit::new(Component::Refinement {
        request: request.to_string(),
        selections,
    })]);
    handlers.complete_active();
    RouterPhase::Drafting
}

pub(super) fn refine_request(
    mut handlers: Handlers<'_>,
    request: &str,
    selections: &[String],
    advisory: Option<&dyn AdvisoryService>,
    route: &RouteContext<'_>,
) -> RouterPhase {
    let refined = refined_request(request, selections);
    let context = skills_context(route.library);
    let result = require(advisory)
        .and_then(|advisory| advisory.process_with_tool(&refined, ToolName::Plan, Some(&context)));
    match result {
        Ok(mut response) => {
            response.tasks = response
                .tasks
                .retain_leaves(|task| task.task_type != TaskType::Define);
            route_response(handlers, request, &response, route)
        }
        Err(err) => {
            handlers.update_state(UnitState::Refinement {
                error: Some(err.to_string()),
            });
            handlers.on_error(&err.to_string());
            RouterPhase::Done
        }
    }
}

pub(super) fn collect_config(
    handlers: Handlers<'_>,
    interaction: &mut dyn Interaction,
    keys: &[ConfigKey],
    config: &mut ConfigDocument,
    config_path: &Path,
    logger: &Logger,
) -> RouterPhase {
    let mut updated = config.clone();
    let mut values = BTreeMap::new();

    for key in keys {
        let current = updated.get_text(&key.path).filter(|text| !text.trim().is_empty());
        let secret = is_secret(&key.path);
        let default = if secret { None } else { current.as_deref() };
        let Some(answer) = interaction.ask(&key.prompt(), default) else {
            handlers.on_aborted("configuration");
            return RouterPhase::Done;
        };
        let raw = if answer.trim().is_empty() {
            match &current {
                Some(current) => current.clone(),
                None => {
                    handlers.on_error(&format!("a value for {} is required", key.path));
                    return RouterPhase::Done;
                }
            }
        } else {
            answer
        };
        let stored = parse_config_value(&key.path, &raw, key.value_type)
            .and_then(|value| updated.set(&key.path, value));
        if let Err(err) = stored {
            handlers.on_error(&err.to_string());
            return RouterPhase::Done;
        }
        let shown = if secret {
            SECRET_MASK.to_string()
        } else {
            updated.get_text(&key.path).unwrap_or_default()
        };
        values.insert(key.path.clone(), shown);
    }

    if let Err(err) = save_config(config_path, &updated) {
        handlers.on_error(&err.to_string());
        return RouterPhase::Done;
    }
    *config = updated;
    logger.reconfigure(config.debug_level());
    logger.info(
        "session.config_saved",
        &values.keys().cloned().collect::<Vec<_>>().join(", "),
    );
    handlers.on_completed(UnitState::Config { values });
    RouterPhase::Done
}

pub(super) struct ExecuteParts<'p> {
    pub advisory: Option<&'p dyn AdvisoryService>,
    pub executor: &'p dyn CommandExecutor,
    pub interaction: &'p mut dyn Interaction,
    pub library: &'p SkillLibrary,
    pub config: &'p ConfigDocument,
    pub cancel: &'p CancellationToken,
    pub logger: &'p Logger,
}

fn task_critical(task: &Task) -> Option<bool> {
    task.params.get("critical").and_then(Value::as_bool)
}

fn skill_commands(
    task: &Task,
    name: &str,
    library: &SkillLibrary,
    config: &ConfigDocument,
) -> Result<Vec<ExecuteCommand>, SessionError> {
    let skill = library
        .lookup(name)
        .ok_or_else(|| SessionError::UnknownSkill {
            name: name.to_string(),
        })?;
    let mut commands = Vec::new();
    for step in expand_skill(skill, |name| library.lookup(name))? {
        let command = match task.variant() {
            Some(variant) => resolve_variant(&step.command, variant),
            None => step.command,
        };
        let mut resolved =
            ExecuteCommand::new(step.description, substitute_placeholders(&command, config)?);
        resolved.critical = task_critical(task);
        commands.push(resolved);
    }
    Ok(commands)
}

fn advisory_commands(
    batch: &[&Task],
    parts: &ExecuteParts<'_>,
    commands: &mut Vec<ExecuteCommand>,
    summary: &mut Option<String>,
) -> Result<(), SessionError> {
    if batch.is_empty() {
        return Ok(());
    }
    let advisory = require(parts.advisory)?;
    let request = serde_json::to_string(batch)?;
    let response = advisory.process_with_tool(
        &request,
        ToolName::Execute,
        Some(&skills_context(parts.library)),
    )?;
    for command in response.commands {
        let rendered = substitute_placeholders(&command.command, parts.config)
            .or_else(|err| match err {
                ExpandError::MissingConfig { .. } => Ok(command.command.clone()),
                other => Err(other),
            })?;
        commands.push(ExecuteCommand {
            command: rendered,
            ..command
        });
    }
    if let Some(text) = response.summary.filter(|text| !text.trim().is_empty()) {
        *summary = Some(text);
    }
    Ok(())
}

/// Concrete commands for `tasks`, in task order. Skill and literal-command
/// tasks resolve locally; runs of other tasks go to the advisory service.
fn resolve_commands(
    tasks: &[Task],
    parts: &ExecuteParts<'_>,
) -> Result<(Vec<ExecuteCommand>, Option<String>), SessionError> {
    let mut commands = Vec::new();
    let mut summary = None;
    let mut batch: Vec<&Task> = Vec::new();

    for task in tasks {
        if let Some(name) = task.skill_name() {
            advisory_commands(&batch, parts, &mut commands, &mut summary)?;
            batch.clear();
            commands.extend(skill_commands(task, name, parts.library, parts.config)?);
        } else if let Some(command) = task.command() {
            advisory_commands(&batch, parts, &mut commands, &mut summary)?;
            batch.clear();
            let mut resolved = ExecuteCommand::new(
                task.action.clone(),
                substitute_placeholders(command, parts.config)?,
            );
            resolved.critical = task_critical(task);
            commands.push(resolved);
        } else {
            batch.push(task);
        }
    }
    advisory_commands(&batch, parts, &mut commands, &mut summary)?;

    if commands.is_empty() {
        return Err(SessionError::NoCommands);
    }
    Ok((commands, summary))
}

pub(super) fn execute_tasks(
    mut handlers: Handlers<'_>,
    tasks: &[Task],
    parts: ExecuteParts<'_>,
) -> RouterPhase {
    let (commands, summary) = match resolve_commands(tasks, &parts) {
        Ok(resolved) => resolved,
        Err(err) => {
            handlers.on_error(&err.to_string());
            return RouterPhase::Done;
        }
    };

    let ExecuteParts {
        executor,
        interaction,
        cancel,
        logger,
        ..
    } = parts;
    let mut pipeline = ExecutionPipeline::new(commands, summary);
    handlers.update_state(UnitState::Execute {
        message: None,
        tasks: pipeline.tasks().to_vec(),
        error: None,
    });

    interaction.watch_cancel(cancel);
    let outcome = pipeline.run(executor, cancel, &mut |event, tasks| match event {
        PipelineEvent::Started { index } => {
            interaction.show(&format!("Running: {}", tasks[index].command.description));
            handlers.update_state(UnitState::Execute {
                message: None,
                tasks: tasks.to_vec(),
                error: None,
            });
        }
        PipelineEvent::Progress { line, .. } => interaction.progress(line),
        PipelineEvent::Finished { index, status } => {
            logger.info(
                "session.command_finished",
                &format!("{} -> {status}", tasks[index].command.description),
            );
            handlers.update_state(UnitState::Execute {
                message: None,
                tasks: tasks.to_vec(),
                error: None,
            });
        }
    });
    interaction.stop_watching();

    let tasks = pipeline.into_tasks();
    match outcome {
        PipelineOutcome::Completed { message, .. } => {
            handlers.on_completed(UnitState::Execute {
                message: Some(message),
                tasks,
                error: None,
            });
        }
        PipelineOutcome::Failed { .. } => {
            let error = outcome
                .failure_message()
                .unwrap_or_else(|| "execution failed".to_string());
            handlers.update_state(UnitState::Execute {
                message: None,
                tasks,
                error: Some(error.clone()),
            });
            handlers.on_error(&error);
        }
        PipelineOutcome::Cancelled { .. } => {
            handlers.update_state(UnitState::Execute {
                message: None,
                tasks,
                error: None,
            });
            handlers.on_aborted("execution");
        }
    }
    RouterPhase::Done
}

pub(super) fn answer_question(
    handlers: Handlers<'_>,
    question: &str,
    advisory: Option<&dyn AdvisoryService>,
) -> RouterPhase {
    match require(advisory).and_then(|advisory| {
        advisory.process_with_tool(question, ToolName::Answer, None)
    }) {
        Ok(response) => {
            let answer = response
                .answer
                .filter(|answer| !answer.trim().is_empty())
                .unwrap_or(response.message);
            handlers.on_completed(UnitState::Answer {
                answer: Some(answer),
            });
        }
        Err(err) => handlers.on_error(&err.to_string()),
    }
    RouterPhase::Done
}

pub(super) fn introspect(
    handlers: Handlers<'_>,
    tasks: &[Task],
    advisory: Option<&dyn AdvisoryService>,
    library: &SkillLibrary,
) -> RouterPhase {
    let request = tasks
        .iter()
        .map(|task| task.action.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let context = skills_context(library);
    match require(advisory).and_then(|advisory| {
        advisory.process_with_tool(&request, ToolName::Introspect, Some(&context))
    }) {
        Ok(response) => handlers.on_completed(UnitState::Introspect {
            message: Some(response.message),
            capabilities: response.capabilities,
        }),
        Err(err) => handlers.on_error(&err.to_string()),
    }
    RouterPhase::Done
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refined_request_lists_selections() {
        assert_eq!(
            refined_request("deploy the app", &["Pick environment: staging".to_string()]),
            "deploy the app\n\nUser selections:\n- Pick environment: staging"
        );
    }

    #[test]
    fn key_paths_are_secret() {
        assert!(is_secret("anthropic.key"));
        assert!(!is_secret("anthropic.model"));
        assert!(!is_secret("project.keys"));
    }
}
