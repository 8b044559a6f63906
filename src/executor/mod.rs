use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub mod shell;

pub use shell::{ShellExecutor, DEFAULT_COMMAND_TIMEOUT};

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("shell `{shell}` was not found")]
    MissingShell { shell: String },
    #[error("command timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("command was cancelled")]
    Cancelled,
    #[error("command exited with status {exit_code}")]
    NonZeroExit { exit_code: i32 },
}

pub(crate) fn io_error(path: &Path, source: std::io::Error) -> ExecutorError {
    ExecutorError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// One concrete command handed to a [`CommandExecutor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteCommand {
    pub description: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl ExecuteCommand {
    pub fn new(description: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            command: command.into(),
            critical: None,
            workdir: None,
            timeout_ms: None,
        }
    }

    pub fn with_critical(mut self, critical: bool) -> Self {
        self.critical = Some(critical);
        self
    }

    /// Absent means critical; only an explicit `false` lets the run continue
    /// past a failure.
    pub fn is_critical(&self) -> bool {
        self.critical != Some(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionResult {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutcome {
    pub output: String,
    pub errors: String,
    pub result: ExecutionResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl CommandOutcome {
    pub fn success(output: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            output: output.into(),
            errors: String::new(),
            result: ExecutionResult::Success,
            error: None,
            elapsed_ms,
        }
    }

    pub fn failure(error: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            output: String::new(),
            errors: String::new(),
            result: ExecutionResult::Error,
            error: Some(error.into()),
            elapsed_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == ExecutionResult::Success
    }
}

/// Cooperative cancellation flag shared between the driver and an executor.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub trait CommandExecutor {
    /// Runs one command to completion. Failures are reported in the outcome,
    /// never as a panic. `on_progress` receives output lines as they arrive.
    fn execute(
        &self,
        command: &ExecuteCommand,
        cancel: &CancellationToken,
        on_progress: &mut dyn FnMut(&str),
    ) -> CommandOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn critical_defaults_to_true_when_absent() {
        let command: ExecuteCommand =
            serde_json::from_value(json!({"description": "Build", "command": "make"}))
                .expect("parse");
        assert!(command.is_critical());
        assert!(command.clone().with_critical(true).is_critical());
        assert!(!command.with_critical(false).is_critical());
    }

    #[test]
    fn cancellation_token_is_shared_between_clones() {
        let token = CancellationToken::new();
        let observer = token.clone();
        token.cancel();
        assert!(observer.is_cancelled());
    }
}
