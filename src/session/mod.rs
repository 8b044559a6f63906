use crate::advisory::{AdvisoryError, AdvisoryService};
use crate::app::interaction::Interaction;
use crate::app::render::render_unit;
use crate::config::{ConfigDocument, ConfigError, ConfigKey};
use crate::executor::{CancellationToken, CommandExecutor};
use crate::lifecycle::{Component, Lifecycle, Unit, UnitStatus};
use crate::router::RouterPhase;
use crate::shared::{Logger, UnitId};
use crate::skills::{ExpandError, SkillLibrary};
use std::collections::HashSet;
use std::path::PathBuf;

mod steps;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Advisory(#[from] AdvisoryError),
    #[error(transparent)]
    Expand(#[from] ExpandError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("skill `{name}` was not found")]
    UnknownSkill { name: String },
    #[error("failed to encode tasks: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("there are no commands to run")]
    NoCommands,
    #[error("{kind} unit did not complete")]
    Stalled { kind: String },
}

/// Everything a session needs, supplied once by the caller.
pub struct SessionContext<'a> {
    /// `None` when no API key is configured; units that need the service fail.
    pub advisory: Option<&'a dyn AdvisoryService>,
    pub executor: &'a dyn CommandExecutor,
    pub interaction: &'a mut dyn Interaction,
    pub library: &'a SkillLibrary,
    pub config: ConfigDocument,
    pub config_path: PathBuf,
    pub cancel: CancellationToken,
    pub logger: Logger,
}

/// Drives units one at a time until nothing is left to run.
pub struct Session<'a> {
    advisory: Option<&'a dyn AdvisoryService>,
    executor: &'a dyn CommandExecutor,
    interaction: &'a mut dyn Interaction,
    library: &'a SkillLibrary,
    config: ConfigDocument,
    config_path: PathBuf,
    cancel: CancellationToken,
    logger: Logger,
    lifecycle: Lifecycle,
    phase: RouterPhase,
    presented: HashSet<UnitId>,
}

impl<'a> Session<'a> {
    pub fn new(context: SessionContext<'a>) -> Self {
        Self {
            lifecycle: Lifecycle::new(context.logger.clone()),
            advisory: context.advisory,
            executor: context.executor,
            interaction: context.interaction,
            library: context.library,
            config: context.config,
            config_path: context.config_path,
            cancel: context.cancel,
            logger: context.logger,
            phase: RouterPhase::Drafting,
            presented: HashSet::new(),
        }
    }

    pub fn submit_request(&mut self, request: &str) {
        self.logger.info("session.request", request);
        self.lifecycle.enqueue(vec![Unit::new(Component::Command {
            request: request.trim().to_string(),
        })]);
    }

    pub fn submit_config(&mut self, keys: Vec<ConfigKey>) {
        self.lifecycle
            .enqueue(vec![Unit::new(Component::Config { keys })]);
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn config(&self) -> &ConfigDocument {
        &self.config
    }

    pub fn phase(&self) -> RouterPhase {
        self.phase
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn exit_code(&self) -> i32 {
        self.lifecycle.exit_code()
    }

    /// Runs until no unit is Active and returns the process exit code.
    pub fn run(&mut self) -> i32 {
        while let Some(unit) = self.lifecycle.active().cloned() {
            self.step(&unit);
            if let Some(still) = self.lifecycle.active() {
                if still.id == unit.id && still.status == UnitStatus::Active {
                    let err = SessionError::Stalled {
                        kind: unit.kind().to_string(),
                    };
                    if let Some(handlers) = self.lifecycle.handlers() {
                        handlers.on_error(&err.to_string());
                    }
                }
            }
            self.present();
        }
        self.present();
        self.logger.info(
            "session.finished",
            &format!("exit_code={}", self.lifecycle.exit_code()),
        );
        self.lifecycle.exit_code()
    }

    fn step(&mut self, unit: &Unit) {
        let Some(handlers) = self.lifecycle.handlers() else {
            return;
        };
        let route = crate::router::RouteContext {
            library: self.library,
            config: &self.config,
            logger: &self.logger,
        };
        let next = match &unit.component {
            Component::Message { .. } | Component::Feedback { .. } => {
                handlers.complete_active();
                None
            }
            Component::Command { request } => {
                Some(steps::plan_request(handlers, request, self.advisory, &route))
            }
            Component::Plan {
                request,
                tasks,
                select: true,
                ..
            } => {
                self.interaction
                    .show(&render_unit(unit).unwrap_or_default());
                self.presented.insert(unit.id.clone());
                Some(steps::select_options(
                    handlers,
                    &mut *self.interaction,
                    request,
                    tasks,
                ))
            }
            Component::Plan { .. } => {
                self.interaction
                    .show(&render_unit(unit).unwrap_or_default());
                self.presented.insert(unit.id.clone());
                handlers.pend_active();
                None
            }
            Component::Refinement {
                request,
                selections,
            } => Some(steps::refine_request(
                handlers,
                request,
                selections,
                self.advisory,
                &route,
            )),
            Component::Confirm {
                message,
                operation,
                tasks,
            } => {
                let confirmed = self.interaction.confirm(message).unwrap_or(false);
                Some(crate::router::confirm_decision(
                    handlers, confirmed, operation, tasks, &route,
                ))
            }
            Component::Config { keys } => Some(steps::collect_config(
                handlers,
                &mut *self.interaction,
                keys,
                &mut self.config,
                &self.config_path,
                &self.logger,
            )),
            Component::Execute { tasks } => Some(steps::execute_tasks(
                handlers,
                tasks,
                steps::ExecuteParts {
                    advisory: self.advisory,
                    executor: self.executor,
                    interaction: &mut *self.interaction,
                    library: self.library,
                    config: &self.config,
                    cancel: &self.cancel,
                    logger: &self.logger,
                },
            )),
            Component::Answer { question } => {
                Some(steps::answer_question(handlers, question, self.advisory))
            }
            Component::Introspect { tasks } => Some(steps::introspect(
                handlers,
                tasks,
                self.advisory,
                self.library,
            )),
        };
        if let Some(next) = next {
            if next != self.phase {
                self.logger
                    .info("session.phase", &format!("{} -> {next}", self.phase));
            }
            self.phase = next;
        }
    }

    fn present(&mut self) {
        let fresh: Vec<&Unit> = self
            .lifecycle
            .timeline()
            .iter()
            .filter(|unit| !self.presented.contains(&unit.id))
            .collect();
        let mut shown = Vec::with_capacity(fresh.len());
        for unit in fresh {
            if let Some(text) = render_unit(unit) {
                self.interaction.show(&text);
            }
            shown.push(unit.id.clone());
        }
        self.presented.extend(shown);
    }
}
