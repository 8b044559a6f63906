use crate::advisory::Capability;
use crate::config::ConfigKey;
use crate::execution::PipelineTask;
use crate::shared::UnitId;
use crate::task::{Task, TaskList};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Awaiting,
    Active,
    Pending,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    Succeeded,
    Aborted,
    Failed,
    Info,
}

/// What a unit is, with its immutable props.
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    Message {
        text: String,
    },
    Feedback {
        kind: FeedbackKind,
        message: String,
    },
    Command {
        request: String,
    },
    Plan {
        request: String,
        message: String,
        tasks: TaskList,
        select: bool,
    },
    Refinement {
        request: String,
        selections: Vec<String>,
    },
    Confirm {
        message: String,
        operation: String,
        tasks: Vec<Task>,
    },
    Config {
        keys: Vec<ConfigKey>,
    },
    Execute {
        tasks: Vec<Task>,
    },
    Answer {
        question: String,
    },
    Introspect {
        tasks: Vec<Task>,
    },
}

impl Component {
    pub fn kind(&self) -> &'static str {
        match self {
            Component::Message { .. } => "message",
            Component::Feedback { .. } => "feedback",
            Component::Command { .. } => "command",
            Component::Plan { .. } => "plan",
            Component::Refinement { .. } => "refinement",
            Component::Confirm { .. } => "confirm",
            Component::Config { .. } => "config",
            Component::Execute { .. } => "execute",
            Component::Answer { .. } => "answer",
            Component::Introspect { .. } => "introspect",
        }
    }

    pub fn is_stateless(&self) -> bool {
        matches!(self, Component::Message { .. } | Component::Feedback { .. })
    }

    fn initial_state(&self) -> Option<UnitState> {
        match self {
            Component::Message { .. } | Component::Feedback { .. } => None,
            Component::Command { .. } => Some(UnitState::Command { error: None }),
            Component::Plan { .. } => Some(UnitState::Plan {
                selections: Vec::new(),
            }),
            Component::Refinement { .. } => Some(UnitState::Refinement { error: None }),
            Component::Confirm { .. } => Some(UnitState::Confirm { confirmed: None }),
            Component::Config { .. } => Some(UnitState::Config {
                values: BTreeMap::new(),
            }),
            Component::Execute { .. } => Some(UnitState::Execute {
                message: None,
                tasks: Vec::new(),
                error: None,
            }),
            Component::Answer { .. } => Some(UnitState::Answer { answer: None }),
            Component::Introspect { .. } => Some(UnitState::Introspect {
                message: None,
                capabilities: Vec::new(),
            }),
        }
    }
}

/// Mutable state of a stateful unit while it is active.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitState {
    Command {
        error: Option<String>,
    },
    Plan {
        selections: Vec<String>,
    },
    Refinement {
        error: Option<String>,
    },
    Confirm {
        confirmed: Option<bool>,
    },
    Config {
        values: BTreeMap<String, String>,
    },
    Execute {
        message: Option<String>,
        tasks: Vec<PipelineTask>,
        error: Option<String>,
    },
    Answer {
        answer: Option<String>,
    },
    Introspect {
        message: Option<String>,
        capabilities: Vec<Capability>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub id: UnitId,
    pub status: UnitStatus,
    pub component: Component,
    pub state: Option<UnitState>,
}

impl Unit {
    pub fn new(component: Component) -> Self {
        Self {
            id: UnitId::generate(),
            status: UnitStatus::Awaiting,
            state: component.initial_state(),
            component,
        }
    }

    pub fn message(text: impl Into<String>) -> Self {
        Self::new(Component::Message { text: text.into() })
    }

    pub fn feedback(kind: FeedbackKind, message: impl Into<String>) -> Self {
        Self::new(Component::Feedback {
            kind,
            message: message.into(),
        })
    }

    pub fn kind(&self) -> &'static str {
        self.component.kind()
    }

    pub fn is_stateless(&self) -> bool {
        self.component.is_stateless()
    }

    pub fn is_failure_feedback(&self) -> bool {
        matches!(
            self.component,
            Component::Feedback {
                kind: FeedbackKind::Failed,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stateless_units_carry_no_state() {
        assert!(Unit::message("hi").state.is_none());
        assert!(Unit::feedback(FeedbackKind::Info, "note").state.is_none());
        let command = Unit::new(Component::Command {
            request: "list files".to_string(),
        });
        assert_eq!(command.state, Some(UnitState::Command { error: None }));
        assert_eq!(command.status, UnitStatus::Awaiting);
    }
}
