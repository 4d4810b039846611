//! Chat backend abstraction used by the agents.
//!
//! The agents speak in terms of [`ChatMessage`]s and [`ToolCall`]s; a
//! [`ChatBackend`] turns one request into one complete response.
pub mod openai_compat;

use serde_json::Value;
use thiserror::Error;

pub use openai_compat::{LlmSettings, OpenAiCompatClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

impl ChatRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::Tool => "tool",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw JSON arguments as produced by the model
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: ChatRole, content: &str) -> Self {
        Self { role, content: Some(content.to_string()), tool_calls: Vec::new(), tool_call_id: None }
    }

    pub fn system(content: &str) -> Self {
        Self::text(ChatRole::System, content)
    }

    pub fn user(content: &str) -> Self {
        Self::text(ChatRole::User, content)
    }

    pub fn assistant(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self { role: ChatRole::Assistant, content, tool_calls, tool_call_id: None }
    }

    pub fn tool_result(call_id: &str, content: &str) -> Self {
        Self {
            role: ChatRole::Tool,
            content: Some(content.to_string()),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.to_string()),
        }
    }
}

/// Function tool offered to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolChoice {
    Auto,
    /// Some tool call is mandatory
    Required,
    /// This exact tool must be called
    Named(String),
}

#[derive(Debug, Clone)]
pub struct ChatRequest<'a> {
    pub messages: &'a [ChatMessage],
    pub tools: &'a [ToolDefinition],
    pub tool_choice: ToolChoice,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

/// Typed error for backend calls.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Missing or invalid API key
    #[error("Auth error: {0}")]
    Auth(String),
    /// Network-level failure (DNS, connection, timeout)
    #[error("Network error: {0}")]
    Network(String),
    /// API returned a non-success HTTP status
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
    /// Failed to parse response JSON
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        LlmError::Network(e.to_string())
    }
}

/// One blocking request/response exchange with a chat model.
pub trait ChatBackend: Send + Sync {
    fn complete(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, LlmError>;
}
