use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool call requested by the model. `arguments` is the raw JSON text the model produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Option<String>,
    pub tool_invocations: Vec<ToolInvocation>,
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    pub fn assistant_tool_calls(invocations: Vec<ToolInvocation>) -> Self {
        Self { role: Role::Assistant, content: None, tool_invocations: invocations, tool_call_id: None }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_invocations: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn text(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: Some(content.into()), tool_invocations: Vec::new(), tool_call_id: None }
    }
}

/// Function declaration offered to the model, with a JSON-schema `parameters` object.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolDeclaration {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlannerStep {
    FinalAnswer(String),
    ToolInvocations(Vec<ToolInvocation>),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("llm provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("llm authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("llm rate limit exceeded")]
    RateLimited,
    #[error("invalid llm request: {0}")]
    InvalidRequest(String),
    #[error("llm network error: {0}")]
    Network(String),
    #[error("llm request timed out")]
    Timeout,
    #[error("could not parse llm response: {0}")]
    Parse(String),
}

impl LlmError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable(_) | Self::RateLimited | Self::Network(_) | Self::Timeout
        )
    }
}

/// Decides the next step of a tool-calling conversation.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn next_step(
        &self,
        transcript: &[ChatMessage],
        tools: &[ToolDeclaration],
    ) -> Result<PlannerStep, LlmError>;
}

/// Plain single-turn completion.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::{ChatMessage, LlmError, Role};

    #[test]
    fn tool_result_message_carries_call_id() {
        let message = ChatMessage::tool_result("call_1", "{\"success\":true}");

        assert_eq!(message.role, Role::Tool);
        assert_eq!(message.tool_call_id.as_deref(), Some("call_1"));
        assert!(message.tool_invocations.is_empty());
    }

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(LlmError::RateLimited.is_retryable());
        assert!(LlmError::Timeout.is_retryable());
        assert!(LlmError::ProviderUnavailable("503".to_owned()).is_retryable());
        assert!(!LlmError::AuthenticationFailed("bad key".to_owned()).is_retryable());
        assert!(!LlmError::InvalidRequest("bad schema".to_owned()).is_retryable());
    }
}
