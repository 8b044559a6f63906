use crate::executor::ExecuteCommand;
use crate::task::{TaskError, TaskList};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod anthropic;
pub mod response;

pub use anthropic::{AnthropicAdvisory, ANTHROPIC_VERSION, DEFAULT_API_BASE};
pub use response::parse_tool_response;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolName {
    Plan,
    Execute,
    Answer,
    Introspect,
    Config,
}

impl ToolName {
    pub const ALL: [ToolName; 5] = [
        ToolName::Plan,
        ToolName::Execute,
        ToolName::Answer,
        ToolName::Introspect,
        ToolName::Config,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::Plan => "plan",
            ToolName::Execute => "execute",
            ToolName::Answer => "answer",
            ToolName::Introspect => "introspect",
            ToolName::Config => "config",
        }
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Validated result of one advisory call. Fields the tool did not return are
/// empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdvisoryResponse {
    pub message: String,
    pub tasks: TaskList,
    pub capabilities: Vec<Capability>,
    pub answer: Option<String>,
    pub commands: Vec<ExecuteCommand>,
    pub summary: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AdvisoryError {
    #[error("anthropic api key is not configured")]
    MissingApiKey,
    #[error("advisory request failed: {reason}")]
    Request { reason: String },
    #[error("advisory request returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("advisory response was truncated by the token limit")]
    Truncated,
    #[error("advisory response was not recognized: {reason}")]
    UnrecognizedResponse { reason: String },
    #[error("advisory response field `tasks` must be a list")]
    InvalidTasks,
    #[error("advisory task {index} is invalid: {reason}")]
    InvalidTask { index: usize, reason: String },
    #[error("advisory response field `{field}` is malformed: {reason}")]
    Malformed { field: String, reason: String },
    #[error(transparent)]
    Task(#[from] TaskError),
}

/// The language-model-backed planner.
pub trait AdvisoryService {
    fn process_with_tool(
        &self,
        request: &str,
        tool: ToolName,
        context: Option<&Value>,
    ) -> Result<AdvisoryResponse, AdvisoryError>;
}
