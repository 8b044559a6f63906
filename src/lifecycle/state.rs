use super::unit::{FeedbackKind, Unit, UnitState, UnitStatus};
use crate::shared::UnitId;
use std::collections::VecDeque;

/// Queue, Active unit and Timeline. Every transition consumes the state and
/// returns the next one; promotion runs after each of them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LifecycleState {
    queue: VecDeque<Unit>,
    active: Option<Unit>,
    timeline: Vec<Unit>,
}

pub fn aborted_message(operation: &str) -> String {
    format!("The {operation} was cancelled.")
}

impl LifecycleState {
    pub fn queue(&self) -> &VecDeque<Unit> {
        &self.queue
    }

    pub fn active(&self) -> Option<&Unit> {
        self.active.as_ref()
    }

    pub fn active_id(&self) -> Option<&UnitId> {
        self.active.as_ref().map(|unit| &unit.id)
    }

    pub fn timeline(&self) -> &[Unit] {
        &self.timeline
    }

    /// Nothing active and nothing left to promote.
    pub fn is_idle(&self) -> bool {
        self.active.is_none()
            && !self
                .queue
                .iter()
                .any(|unit| unit.status == UnitStatus::Awaiting)
    }

    /// 1 when the last Timeline unit reports a failure, otherwise 0.
    pub fn exit_code(&self) -> i32 {
        match self.timeline.last() {
            Some(unit) if unit.is_failure_feedback() => 1,
            _ => 0,
        }
    }

    pub fn enqueue(mut self, units: Vec<Unit>) -> Self {
        for mut unit in units {
            unit.status = UnitStatus::Awaiting;
            self.queue.push_back(unit);
        }
        self.promote()
    }

    pub fn add_to_timeline(mut self, units: Vec<Unit>) -> Self {
        for mut unit in units {
            unit.status = UnitStatus::Done;
            self.timeline.push(unit);
        }
        self.promote()
    }

    pub fn update_active_state(mut self, state: UnitState) -> Self {
        if let Some(active) = self.active.as_mut() {
            if active.state.is_some() {
                active.state = Some(state);
            }
        }
        self
    }

    pub fn complete_active(mut self, final_state: Option<UnitState>) -> Self {
        self.finish_active(final_state);
        self.promote()
    }

    /// Resolves every Pending unit, then the Active one.
    pub fn complete_active_and_pending(mut self, final_state: Option<UnitState>) -> Self {
        self.finish_pending();
        self.finish_active(final_state);
        self.promote()
    }

    /// Keeps the Active unit visible as Pending at the queue head while the
    /// next unit runs.
    pub fn pend_active(mut self) -> Self {
        if let Some(mut unit) = self.active.take() {
            unit.status = UnitStatus::Pending;
            self.queue.push_front(unit);
        }
        self.promote()
    }

    /// Ends the flow with a failure: remaining Awaiting units are dropped.
    pub fn fail_active(self, message: &str) -> Self {
        self.terminate(FeedbackKind::Failed, message.to_string())
    }

    pub fn abort_active(self, operation: &str) -> Self {
        self.terminate(FeedbackKind::Aborted, aborted_message(operation))
    }

    fn terminate(mut self, kind: FeedbackKind, message: String) -> Self {
        self.finish_pending();
        self.finish_active(None);
        self.queue.clear();
        self.enqueue(vec![Unit::feedback(kind, message)])
    }

    fn finish_active(&mut self, final_state: Option<UnitState>) {
        let Some(mut unit) = self.active.take() else {
            return;
        };
        if let Some(state) = final_state {
            if unit.state.is_some() {
                unit.state = Some(state);
            }
        }
        unit.status = UnitStatus::Done;
        self.timeline.push(unit);
    }

    fn finish_pending(&mut self) {
        let mut remaining = VecDeque::with_capacity(self.queue.len());
        for mut unit in self.queue.drain(..) {
            if unit.status == UnitStatus::Pending {
                unit.status = UnitStatus::Done;
                self.timeline.push(unit);
            } else {
                remaining.push_back(unit);
            }
        }
        self.queue = remaining;
    }

    /// Promotes the first Awaiting unit when nothing is Active. A stateless
    /// unit goes straight to the Timeline before the next one is considered.
    fn promote(mut self) -> Self {
        while self.active.is_none() {
            let Some(position) = self
                .queue
                .iter()
                .position(|unit| unit.status == UnitStatus::Awaiting)
            else {
                break;
            };
            let Some(mut unit) = self.queue.remove(position) else {
                break;
            };
            if unit.is_stateless() {
                unit.status = UnitStatus::Done;
                self.timeline.push(unit);
            } else {
                unit.status = UnitStatus::Active;
                self.active = Some(unit);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::unit::Component;

    fn command(request: &str) -> Unit {
        Unit::new(Component::Command {
            request: request.to_string(),
        })
    }

    #[test]
    fn promotion_skips_pending_units() {
        let state = LifecycleState::default()
            .enqueue(vec![command("first"), command("second")])
            .pend_active();
        let statuses: Vec<UnitStatus> = state.queue().iter().map(|unit| unit.status).collect();
        assert_eq!(statuses, vec![UnitStatus::Pending]);
        assert_eq!(
            state.active().map(|unit| unit.status),
            Some(UnitStatus::Active)
        );
        assert!(state.timeline().is_empty());
    }

    #[test]
    fn stateless_burst_lands_in_timeline_in_order() {
        let state = LifecycleState::default().enqueue(vec![
            Unit::message("one"),
            Unit::message("two"),
            command("three"),
            Unit::message("four"),
        ]);
        let kinds: Vec<&str> = state.timeline().iter().map(Unit::kind).collect();
        assert_eq!(kinds, vec!["message", "message"]);
        assert_eq!(state.active().map(Unit::kind), Some("command"));
        assert_eq!(state.queue().len(), 1);
    }
}
