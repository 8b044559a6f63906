use crate::shared::Logger;

pub mod handlers;
pub mod state;
pub mod unit;

pub use handlers::Handlers;
pub use state::{aborted_message, LifecycleState};
pub use unit::{Component, FeedbackKind, Unit, UnitState, UnitStatus};

/// Owner of the [`LifecycleState`]; the only place transitions are applied.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: LifecycleState,
    logger: Logger,
}

impl Lifecycle {
    pub fn new(logger: Logger) -> Self {
        Self {
            state: LifecycleState::default(),
            logger,
        }
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    pub fn active(&self) -> Option<&Unit> {
        self.state.active()
    }

    pub fn timeline(&self) -> &[Unit] {
        self.state.timeline()
    }

    pub fn exit_code(&self) -> i32 {
        self.state.exit_code()
    }

    pub fn enqueue(&mut self, units: Vec<Unit>) {
        self.apply("enqueue", |state| state.enqueue(units));
    }

    /// Handlers bound to the Active unit, if any.
    pub fn handlers(&mut self) -> Option<Handlers<'_>> {
        let id = self.state.active_id()?.clone();
        Some(Handlers::new(self, id))
    }

    pub(crate) fn apply(
        &mut self,
        transition: &str,
        next: impl FnOnce(LifecycleState) -> LifecycleState,
    ) {
        let before = self.state.active_id().cloned();
        self.state = next(std::mem::take(&mut self.state));
        if transition == "update_state" {
            return;
        }
        let after = self.state.active().map(|unit| (unit.id.clone(), unit.kind()));
        let message = match (&before, &after) {
            (Some(from), Some((to, kind))) if from != to => {
                format!("{transition}: {from} -> {to} ({kind})")
            }
            (None, Some((to, kind))) => format!("{transition}: -> {to} ({kind})"),
            (Some(from), None) => format!("{transition}: {from} -> idle"),
            _ => transition.to_string(),
        };
        self.logger.info("lifecycle.transition", &message);
    }
}
