use crate::advisory::AdvisoryResponse;
use crate::config::ConfigDocument;
use crate::lifecycle::{Component, Handlers, Unit, UnitState};
use crate::shared::Logger;
use crate::skills::{ExpandError, SkillLibrary};
use crate::task::{Task, TaskList, TaskType};

pub mod dispatch;

pub use dispatch::{dispatch, ensure_uniform, keys_for_config_tasks};

pub const UNRECOGNIZED_REQUEST: &str = "Sorry, I couldn't find anything to do for that request.";
pub const CONFIRM_PROMPT: &str = "Would you like to proceed?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterPhase {
    Drafting,
    Refining,
    Confirming,
    Routing,
    Executing,
    Answering,
    Introspecting,
    Configuring,
    Done,
}

impl RouterPhase {
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (RouterPhase::Drafting, RouterPhase::Refining)
                | (RouterPhase::Drafting, RouterPhase::Confirming)
                | (RouterPhase::Drafting, RouterPhase::Done)
                | (RouterPhase::Refining, RouterPhase::Drafting)
                | (RouterPhase::Refining, RouterPhase::Done)
                | (RouterPhase::Confirming, RouterPhase::Routing)
                | (RouterPhase::Confirming, RouterPhase::Done)
                | (RouterPhase::Routing, RouterPhase::Executing)
                | (RouterPhase::Routing, RouterPhase::Answering)
                | (RouterPhase::Routing, RouterPhase::Introspecting)
                | (RouterPhase::Routing, RouterPhase::Configuring)
                | (RouterPhase::Routing, RouterPhase::Done)
                | (RouterPhase::Executing, RouterPhase::Done)
                | (RouterPhase::Answering, RouterPhase::Done)
                | (RouterPhase::Introspecting, RouterPhase::Done)
                | (RouterPhase::Configuring, RouterPhase::Done)
        )
    }
}

impl std::fmt::Display for RouterPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RouterPhase::Drafting => "drafting",
            RouterPhase::Refining => "refining",
            RouterPhase::Confirming => "confirming",
            RouterPhase::Routing => "routing",
            RouterPhase::Executing => "executing",
            RouterPhase::Answering => "answering",
            RouterPhase::Introspecting => "introspecting",
            RouterPhase::Configuring => "configuring",
            RouterPhase::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("there are no tasks to run")]
    NoTasks,
    #[error(
        "tasks must all share one type, but the plan mixes {}",
        .types.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", ")
    )]
    MixedTaskTypes { types: Vec<TaskType> },
    #[error("some skills cannot be used:\n{summary}")]
    InvalidSkills { summary: String },
    #[error(transparent)]
    Composition(#[from] ExpandError),
}

/// Collaborators the router reads while dispatching.
#[derive(Clone, Copy)]
pub struct RouteContext<'a> {
    pub library: &'a SkillLibrary,
    pub config: &'a ConfigDocument,
    pub logger: &'a Logger,
}

/// `introspection` when every task introspects, `answer` when every task
/// answers, otherwise `execution`.
pub fn operation_name(tasks: &[Task]) -> &'static str {
    if !tasks.is_empty() && tasks.iter().all(|t| t.task_type == TaskType::Introspect) {
        "introspection"
    } else if !tasks.is_empty() && tasks.iter().all(|t| t.task_type == TaskType::Answer) {
        "answer"
    } else {
        "execution"
    }
}

pub fn has_define(tasks: &TaskList) -> bool {
    tasks.any_leaf(|task| task.task_type == TaskType::Define)
}

/// Turns a fresh advisory result into units for the Active unit (a Command
/// or a Refinement) and completes it.
pub fn route_response(
    mut handlers: Handlers<'_>,
    request: &str,
    response: &AdvisoryResponse,
    ctx: &RouteContext<'_>,
) -> RouterPhase {
    if has_define(&response.tasks) {
        ctx.logger
            .info("router.refining", "plan needs a selection before confirmation");
        handlers.add_to_queue(vec![Unit::new(Component::Plan {
            request: request.to_string(),
            message: response.message.clone(),
            tasks: response.tasks.clone(),
            select: true,
        })]);
        handlers.complete_active();
        return RouterPhase::Refining;
    }

    let kept = response.tasks.retain_leaves(|task| !task.task_type.is_filtered());
    if kept.is_empty() {
        ctx.logger
            .info("router.unrecognized", "no actionable tasks after filtering");
        handlers.add_to_queue(vec![Unit::message(UNRECOGNIZED_REQUEST)]);
        handlers.complete_active();
        return RouterPhase::Done;
    }

    let leaves = kept.to_leaves();
    let operation = operation_name(&leaves);
    ctx.logger.info(
        "router.confirming",
        &format!("{} task(s) for {operation}", leaves.len()),
    );
    handlers.add_to_queue(vec![
        Unit::new(Component::Plan {
            request: request.to_string(),
            message: response.message.clone(),
            tasks: kept,
            select: false,
        }),
        Unit::new(Component::Confirm {
            message: CONFIRM_PROMPT.to_string(),
            operation: operation.to_string(),
            tasks: leaves,
        }),
    ]);
    handlers.complete_active();
    RouterPhase::Confirming
}

/// Applies the user's answer to the Active Confirm unit. Type uniformity is
/// only checked here, after the user has seen the plan.
pub fn confirm_decision(
    mut handlers: Handlers<'_>,
    confirmed: bool,
    operation: &str,
    tasks: &[Task],
    ctx: &RouteContext<'_>,
) -> RouterPhase {
    handlers.update_state(UnitState::Confirm {
        confirmed: Some(confirmed),
    });
    if !confirmed {
        ctx.logger
            .info("router.aborted", &format!("{operation} cancelled by user"));
        handlers.on_aborted(operation);
        return RouterPhase::Done;
    }

    match dispatch(tasks.to_vec(), ctx) {
        Ok((phase, units)) => {
            ctx.logger.info("router.dispatch", &format!("phase={phase}"));
            handlers.add_to_queue(units);
            handlers.complete_active_and_pending();
            phase
        }
        Err(err) => {
            ctx.logger.info("router.rejected", &err.to_string());
            handlers.on_error(&err.to_string());
            RouterPhase::Done
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_name_follows_task_composition() {
        let answer = Task::new("what is rust", TaskType::Answer);
        let introspect = Task::new("list skills", TaskType::Introspect);
        let execute = Task::new("build", TaskType::Execute);
        assert_eq!(operation_name(&[answer.clone(), answer.clone()]), "answer");
        assert_eq!(operation_name(&[introspect.clone()]), "introspection");
        assert_eq!(operation_name(&[answer, introspect]), "execution");
        assert_eq!(operation_name(&[execute]), "execution");
        assert_eq!(operation_name(&[]), "execution");
    }

    #[test]
    fn phases_only_move_forward() {
        assert!(RouterPhase::Drafting.can_transition_to(RouterPhase::Refining));
        assert!(RouterPhase::Refining.can_transition_to(RouterPhase::Drafting));
        assert!(RouterPhase::Confirming.can_transition_to(RouterPhase::Routing));
        assert!(!RouterPhase::Drafting.can_transition_to(RouterPhase::Routing));
        assert!(!RouterPhase::Done.can_transition_to(RouterPhase::Drafting));
    }
}
