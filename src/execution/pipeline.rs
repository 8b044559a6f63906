use crate::executor::{CancellationToken, CommandExecutor, ExecuteCommand};
use crate::shared::format_duration;
use serde::{Deserialize, Serialize};

/// Used in the completion message when no summary text was supplied.
pub const DEFAULT_SUMMARY: &str = "Execution completed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Success,
    Failed,
    Aborted,
    Cancelled,
}

impl TaskStatus {
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Running)
                | (TaskStatus::Pending, TaskStatus::Cancelled)
                | (TaskStatus::Running, TaskStatus::Success)
                | (TaskStatus::Running, TaskStatus::Failed)
                | (TaskStatus::Running, TaskStatus::Aborted)
        )
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskStatus::Pending | TaskStatus::Running)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Success => write!(f, "success"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Aborted => write!(f, "aborted"),
            TaskStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineTask {
    pub command: ExecuteCommand,
    pub status: TaskStatus,
    #[serde(default)]
    pub elapsed_ms: Option<u64>,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl PipelineTask {
    fn new(command: ExecuteCommand) -> Self {
        Self {
            command,
            status: TaskStatus::Pending,
            elapsed_ms: None,
            output: String::new(),
            error: None,
        }
    }

    fn transition(&mut self, next: TaskStatus) {
        if self.status.can_transition_to(next) {
            self.status = next;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Completed {
        message: String,
        total_elapsed_ms: u64,
    },
    /// A critical task failed; later tasks were never started.
    Failed {
        index: usize,
        description: String,
        error: String,
    },
    /// `index` is the task that was running when cancellation was observed.
    Cancelled { index: Option<usize> },
}

impl PipelineOutcome {
    pub fn failure_message(&self) -> Option<String> {
        match self {
            PipelineOutcome::Failed {
                description, error, ..
            } => Some(format!("{description} failed: {error}")),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineEvent<'e> {
    Started { index: usize },
    Progress { index: usize, line: &'e str },
    Finished { index: usize, status: TaskStatus },
}

/// Sequential runner for one resolved command list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPipeline {
    tasks: Vec<PipelineTask>,
    summary: Option<String>,
}

impl ExecutionPipeline {
    pub fn new(commands: Vec<ExecuteCommand>, summary: Option<String>) -> Self {
        Self {
            tasks: commands.into_iter().map(PipelineTask::new).collect(),
            summary,
        }
    }

    pub fn tasks(&self) -> &[PipelineTask] {
        &self.tasks
    }

    pub fn into_tasks(self) -> Vec<PipelineTask> {
        self.tasks
    }

    pub fn statuses(&self) -> Vec<TaskStatus> {
        self.tasks.iter().map(|task| task.status).collect()
    }

    pub fn total_elapsed_ms(&self) -> u64 {
        self.tasks.iter().filter_map(|task| task.elapsed_ms).sum()
    }

    pub fn completion_message(&self) -> String {
        let summary = self
            .summary
            .as_deref()
            .map(str::trim)
            .filter(|summary| !summary.is_empty())
            .unwrap_or(DEFAULT_SUMMARY);
        format!("{summary} in {}.", format_duration(self.total_elapsed_ms()))
    }

    /// Freezes a running task as aborted and every pending task as cancelled.
    pub fn abort(&mut self) {
        for task in &mut self.tasks {
            match task.status {
                TaskStatus::Running => task.transition(TaskStatus::Aborted),
                TaskStatus::Pending => task.transition(TaskStatus::Cancelled),
                _ => {}
            }
        }
    }

    /// Runs every task in order. Cancellation is checked before each task
    /// starts and again when the executor returns.
    pub fn run(
        &mut self,
        executor: &dyn CommandExecutor,
        cancel: &CancellationToken,
        observer: &mut dyn FnMut(PipelineEvent<'_>, &[PipelineTask]),
    ) -> PipelineOutcome {
        for index in 0..self.tasks.len() {
            if cancel.is_cancelled() {
                self.abort();
                return PipelineOutcome::Cancelled { index: None };
            }

            self.tasks[index].transition(TaskStatus::Running);
            observer(PipelineEvent::Started { index }, &self.tasks);

            let command = self.tasks[index].command.clone();
            let outcome = {
                let tasks = &self.tasks;
                executor.execute(&command, cancel, &mut |line| {
                    observer(PipelineEvent::Progress { index, line }, tasks)
                })
            };

            let task = &mut self.tasks[index];
            task.elapsed_ms = Some(outcome.elapsed_ms);
            task.output = outcome.output.clone();
            task.error = outcome.error.clone();

            if cancel.is_cancelled() {
                self.abort();
                observer(
                    PipelineEvent::Finished {
                        index,
                        status: TaskStatus::Aborted,
                    },
                    &self.tasks,
                );
                return PipelineOutcome::Cancelled { index: Some(index) };
            }

            let status = if outcome.is_success() {
                TaskStatus::Success
            } else {
                TaskStatus::Failed
            };
            self.tasks[index].transition(status);
            observer(PipelineEvent::Finished { index, status }, &self.tasks);

            if status == TaskStatus::Failed && command.is_critical() {
                return PipelineOutcome::Failed {
                    index,
                    description: command.description.clone(),
                    error: outcome
                        .error
                        .unwrap_or_else(|| "command failed".to_string()),
                };
            }
        }

        PipelineOutcome::Completed {
            message: self.completion_message(),
            total_elapsed_ms: self.total_elapsed_ms(),
        }
    }
}
