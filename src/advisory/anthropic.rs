use super::{parse_tool_response, AdvisoryError, AdvisoryResponse, AdvisoryService, ToolName};
use crate::config::ServiceSettings;
use crate::prompts::{system_prompt, tool_definition};
use crate::shared::Logger;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.anthropic.com";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

const MAX_TOKENS: u32 = 4096;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Messages API client. One blocking request per call.
#[derive(Debug, Clone)]
pub struct AnthropicAdvisory {
    api_base: String,
    api_key: String,
    model: String,
    logger: Logger,
}

impl AnthropicAdvisory {
    pub fn new(settings: &ServiceSettings, logger: Logger) -> Result<Self, AdvisoryError> {
        let api_key = settings
            .api_key()
            .ok_or(AdvisoryError::MissingApiKey)?
            .to_string();
        let api_base = std::env::var("PLS_ANTHROPIC_API_BASE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        Ok(Self {
            api_base,
            api_key,
            model: settings.model.clone(),
            logger,
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.api_base.trim_end_matches('/'))
    }

    /// Request body forcing a call to `tool`.
    pub fn request_body(&self, request: &str, tool: ToolName, context: Option<&Value>) -> Value {
        json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "system": system_prompt(tool, context),
            "tools": [tool_definition(tool)],
            "tool_choice": {"type": "tool", "name": tool.as_str()},
            "messages": [
                {"role": "user", "content": request}
            ]
        })
    }
}

impl AdvisoryService for AnthropicAdvisory {
    fn process_with_tool(
        &self,
        request: &str,
        tool: ToolName,
        context: Option<&Value>,
    ) -> Result<AdvisoryResponse, AdvisoryError> {
        let body = self.request_body(request, tool, context);
        self.logger
            .info("advisory.request", &format!("tool={tool} model={}", self.model));
        self.logger.verbose("advisory.request_body", &body.to_string());

        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        let response = match agent
            .post(&self.endpoint())
            .set("x-api-key", &self.api_key)
            .set("anthropic-version", ANTHROPIC_VERSION)
            .set("content-type", "application/json")
            .send_json(body)
        {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                self.logger.info(
                    "advisory.status",
                    &format!("tool={tool} status={status}"),
                );
                return Err(AdvisoryError::Status { status, body });
            }
            Err(err) => {
                return Err(AdvisoryError::Request {
                    reason: err.to_string(),
                })
            }
        };

        let payload: Value = response
            .into_json()
            .map_err(|err| AdvisoryError::Request {
                reason: format!("failed to decode response body: {err}"),
            })?;
        self.logger
            .verbose("advisory.response_body", &payload.to_string());

        let parsed = parse_tool_response(&payload, tool);
        match &parsed {
            Ok(response) => self.logger.info(
                "advisory.response",
                &format!("tool={tool} tasks={}", response.tasks.leaf_count()),
            ),
            Err(err) => self
                .logger
                .info("advisory.invalid", &format!("tool={tool}: {err}")),
        }
        parsed
    }
}
