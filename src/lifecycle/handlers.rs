use super::unit::{Unit, UnitState};
use super::Lifecycle;
use crate::shared::UnitId;

/// Capabilities handed to the Active unit. Built fresh for each unit; calls
/// made after the unit stopped being Active are ignored.
pub struct Handlers<'a> {
    lifecycle: &'a mut Lifecycle,
    unit: UnitId,
}

impl<'a> Handlers<'a> {
    pub(super) fn new(lifecycle: &'a mut Lifecycle, unit: UnitId) -> Self {
        Self { lifecycle, unit }
    }

    pub fn unit_id(&self) -> &UnitId {
        &self.unit
    }

    pub fn unit(&self) -> Option<&Unit> {
        self.lifecycle
            .state()
            .active()
            .filter(|unit| unit.id == self.unit)
    }

    fn is_current(&self) -> bool {
        self.lifecycle.state().active_id() == Some(&self.unit)
    }

    pub fn add_to_queue(&mut self, units: Vec<Unit>) {
        if self.is_current() {
            self.lifecycle.apply("enqueue", |state| state.enqueue(units));
        }
    }

    pub fn add_to_timeline(&mut self, units: Vec<Unit>) {
        if self.is_current() {
            self.lifecycle
                .apply("add_to_timeline", |state| state.add_to_timeline(units));
        }
    }

    pub fn update_state(&mut self, state: UnitState) {
        if self.is_current() {
            self.lifecycle
                .apply("update_state", |current| current.update_active_state(state));
        }
    }

    pub fn pend_active(self) {
        if self.is_current() {
            self.lifecycle.apply("pend_active", |state| state.pend_active());
        }
    }

    pub fn complete_active(self) {
        if self.is_current() {
            self.lifecycle
                .apply("complete_active", |state| state.complete_active(None));
        }
    }

    pub fn complete_active_and_pending(self) {
        if self.is_current() {
            self.lifecycle.apply("complete_active_and_pending", |state| {
                state.complete_active_and_pending(None)
            });
        }
    }

    pub fn on_completed(self, final_state: UnitState) {
        if self.is_current() {
            self.lifecycle.apply("complete_active", |state| {
                state.complete_active(Some(final_state))
            });
        }
    }

    pub fn on_error(self, message: &str) {
        if self.is_current() {
            self.lifecycle
                .apply("fail_active", |state| state.fail_active(message));
        }
    }

    pub fn on_aborted(self, operation: &str) {
        if self.is_current() {
            self.lifecycle
                .apply("abort_active", |state| state.abort_active(operation));
        }
    }
}
