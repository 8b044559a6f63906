use crate::execution::{PipelineTask, TaskStatus};
use crate::lifecycle::{Component, FeedbackKind, Unit, UnitState};
use crate::shared::format_duration;
use crate::task::{NodeId, TaskList, TaskNode};

fn render_node(tasks: &TaskList, id: NodeId, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    match tasks.node(id) {
        TaskNode::Leaf(task) => lines.push(format!("{indent}- {} ({})", task.action, task.task_type)),
        TaskNode::Group { action, children } => {
            lines.push(format!("{indent}- {action}"));
            for child in children {
                render_node(tasks, *child, depth + 1, lines);
            }
        }
    }
}

pub fn render_plan(message: &str, tasks: &TaskList) -> String {
    let mut lines = Vec::new();
    if !message.trim().is_empty() {
        lines.push(message.trim().to_string());
    }
    for root in tasks.roots() {
        render_node(tasks, *root, 0, &mut lines);
    }
    lines.join("\n")
}

fn render_pipeline_task(task: &PipelineTask) -> String {
    let elapsed = task
        .elapsed_ms
        .map(|ms| format!(" ({})", format_duration(ms)))
        .unwrap_or_default();
    match task.status {
        TaskStatus::Success => format!("  ok      {}{elapsed}", task.command.description),
        TaskStatus::Failed => format!(
            "  failed  {}{elapsed}: {}",
            task.command.description,
            task.error.as_deref().unwrap_or("command failed")
        ),
        TaskStatus::Aborted => format!("  aborted {}", task.command.description),
        TaskStatus::Cancelled => format!("  skipped {}", task.command.description),
        TaskStatus::Pending | TaskStatus::Running => {
            format!("  pending {}", task.command.description)
        }
    }
}

/// Text for a unit, or `None` when the unit has nothing to show.
pub fn render_unit(unit: &Unit) -> Option<String> {
    match (&unit.component, &unit.state) {
        (Component::Message { text }, _) => Some(text.clone()),
        (Component::Feedback { kind, message }, _) => Some(match kind {
            FeedbackKind::Failed => format!("Error: {message}"),
            _ => message.clone(),
        }),
        (Component::Plan { message, tasks, .. }, _) => Some(render_plan(message, tasks)),
        (Component::Config { .. }, Some(UnitState::Config { values })) if !values.is_empty() => {
            let mut lines = vec!["Configuration saved.".to_string()];
            lines.extend(
                values
                    .iter()
                    .map(|(path, value)| format!("  {path} = {value}")),
            );
            Some(lines.join("\n"))
        }
        (Component::Execute { .. }, Some(UnitState::Execute { message, tasks, .. })) => {
            let mut lines: Vec<String> = tasks.iter().map(render_pipeline_task).collect();
            if let Some(message) = message {
                lines.push(message.clone());
            }
            (!lines.is_empty()).then(|| lines.join("\n"))
        }
        (Component::Answer { .. }, Some(UnitState::Answer { answer: Some(answer) })) => {
            Some(answer.clone())
        }
        (
            Component::Introspect { .. },
            Some(UnitState::Introspect {
                message,
                capabilities,
            }),
        ) => {
            let mut lines = Vec::new();
            if let Some(message) = message.as_deref().filter(|m| !m.trim().is_empty()) {
                lines.push(message.to_string());
            }
            lines.extend(capabilities.iter().map(|capability| {
                if capability.description.is_empty() {
                    format!("- {}", capability.name)
                } else {
                    format!("- {}: {}", capability.name, capability.description)
                }
            }));
            (!lines.is_empty()).then(|| lines.join("\n"))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{RawTask, TaskType};

    fn raw(action: &str, task_type: Option<TaskType>, subtasks: Vec<RawTask>) -> RawTask {
        RawTask {
            action: action.to_string(),
            task_type,
            params: Default::default(),
            config: Vec::new(),
            subtasks,
        }
    }

    #[test]
    fn plan_renders_groups_indented() {
        let tasks = TaskList::from_raw(vec![
            raw(
                "Release",
                Some(TaskType::Group),
                vec![raw("Build", Some(TaskType::Execute), Vec::new())],
            ),
            raw("Announce", Some(TaskType::Execute), Vec::new()),
        ])
        .expect("tasks");
        assert_eq!(
            render_plan("Here is the plan.", &tasks),
            "Here is the plan.\n- Release\n  - Build (execute)\n- Announce (execute)"
        );
    }

    #[test]
    fn failure_feedback_is_prefixed() {
        let unit = Unit::feedback(FeedbackKind::Failed, "boom");
        assert_eq!(render_unit(&unit).as_deref(), Some("Error: boom"));
        let command = Unit::new(Component::Command {
            request: "hi".to_string(),
        });
        assert!(render_unit(&command).is_none());
    }
}
