//! OpenAI-compatible chat completions client.
//!
//! Works against any endpoint speaking the `/chat/completions` format with
//! function tools (OpenAI, Groq, a local proxy, ...).
use std::time::Duration;

use reqwest::blocking::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{ChatBackend, ChatMessage, ChatRequest, ChatResponse, LlmError, ToolCall, ToolChoice};

/// Connection and sampling settings for the chat model.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// `provider:model` or a bare model name
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl LlmSettings {
    /// Model name as sent to the API (provider prefix stripped).
    pub fn api_model(&self) -> &str {
        self.model.split_once(':').map_or(self.model.as_str(), |(_, m)| m)
    }
}

// ───────────────────────────────────────────────────────────────────
// Wire types
// ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
struct OaiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OaiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OaiToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: OaiFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OaiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct OaiTool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: OaiFunctionDef,
}

#[derive(Debug, Serialize)]
struct OaiFunctionDef {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
struct OaiRequest {
    model: String,
    messages: Vec<OaiMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OaiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parallel_tool_calls: Option<bool>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OaiResponse {
    choices: Vec<OaiChoice>,
}

#[derive(Debug, Deserialize)]
struct OaiChoice {
    message: OaiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OaiResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OaiToolCall>>,
}

fn to_wire(msg: &ChatMessage) -> OaiMessage {
    let tool_calls = (!msg.tool_calls.is_empty()).then(|| {
        msg.tool_calls
            .iter()
            .map(|c| OaiToolCall {
                id: c.id.clone(),
                call_type: "function".to_string(),
                function: OaiFunction { name: c.name.clone(), arguments: c.arguments.clone() },
            })
            .collect()
    });
    OaiMessage {
        role: msg.role.as_str().to_string(),
        content: msg.content.clone(),
        tool_calls,
        tool_call_id: msg.tool_call_id.clone(),
    }
}

fn build_request(settings: &LlmSettings, request: &ChatRequest<'_>) -> OaiRequest {
    let tools: Vec<OaiTool> = request
        .tools
        .iter()
        .map(|t| OaiTool {
            tool_type: "function",
            function: OaiFunctionDef {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.parameters.clone(),
            },
        })
        .collect();

    let has_tools = !tools.is_empty();
    let tool_choice = has_tools.then(|| match &request.tool_choice {
        ToolChoice::Auto => Value::from("auto"),
        ToolChoice::Required => Value::from("required"),
        ToolChoice::Named(name) => serde_json::json!({ "type": "function", "function": { "name": name } }),
    });

    OaiRequest {
        model: settings.api_model().to_string(),
        messages: request.messages.iter().map(to_wire).collect(),
        tools,
        tool_choice,
        parallel_tool_calls: has_tools.then_some(true),
        temperature: settings.temperature,
        max_tokens: settings.max_tokens,
    }
}

fn parse_response(body: &str) -> Result<ChatResponse, LlmError> {
    let resp: OaiResponse = serde_json::from_str(body).map_err(|e| LlmError::Parse(e.to_string()))?;
    let Some(choice) = resp.choices.into_iter().next() else {
        return Err(LlmError::Parse("response has no choices".to_string()));
    };
    Ok(ChatResponse {
        content: choice.message.content.filter(|c| !c.is_empty()),
        tool_calls: choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|c| ToolCall { id: c.id, name: c.function.name, arguments: c.function.arguments })
            .collect(),
    })
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ───────────────────────────────────────────────────────────────────
// Client
// ───────────────────────────────────────────────────────────────────

pub struct OpenAiCompatClient {
    client: Client,
    settings: LlmSettings,
    api_key: SecretString,
}

impl OpenAiCompatClient {
    pub fn new(settings: LlmSettings, api_key: SecretString) -> Result<Self, LlmError> {
        if api_key.expose_secret().trim().is_empty() {
            return Err(LlmError::Auth("API key is empty".to_string()));
        }
        let client = Client::builder().timeout(Duration::from_secs(settings.timeout_secs)).build()?;
        Ok(Self { client, settings, api_key })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'))
    }
}

impl ChatBackend for OpenAiCompatClient {
    /// POST with 5xx retry (2 retries, 1s delay).
    fn complete(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, LlmError> {
        let body = build_request(&self.settings, request);
        debug!(model = %body.model, messages = body.messages.len(), tools = body.tools.len(), "chat completion");

        for attempt in 0..3 {
            let resp = self
                .client
                .post(self.endpoint())
                .bearer_auth(self.api_key.expose_secret())
                .json(&body)
                .send()?;

            let status = resp.status().as_u16();
            let text = resp.text()?;

            match status {
                200..=299 => return parse_response(&text),
                401 | 403 => return Err(LlmError::Auth(format!("{} {}", status, truncate(&text, 200)))),
                500..=599 if attempt < 2 => {
                    warn!(status, attempt, "chat backend error, retrying");
                    std::thread::sleep(Duration::from_secs(1));
                    continue;
                }
                _ => return Err(LlmError::Api { status, body: truncate(&text, 500).to_string() }),
            }
        }
        Err(LlmError::Network("max retries exceeded".to_string()))
    }
}
