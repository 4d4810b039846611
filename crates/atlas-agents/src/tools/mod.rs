//! Tools agents can call. Each tool takes the model's JSON arguments and
//! returns text for the next model turn.
pub mod handoff;
pub(crate) mod http;
pub mod open_meteo;
pub mod think;
pub mod wikipedia;

use std::collections::HashMap;
use std::sync::Arc;

use atlas_base::{DecisionHook, PipelineError};
use serde_json::Value;
use thiserror::Error;

use crate::llm::ToolDefinition;
use crate::roster::ToolKind;

pub use handoff::HandoffTool;
pub use open_meteo::OpenMeteoTool;
pub use think::ThinkTool;
pub use wikipedia::WikipediaTool;

#[derive(Debug, Error)]
pub enum ToolError {
    /// Arguments missing or malformed; reported back to the model
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("request failed: {0}")]
    Http(String),
    #[error("no results for '{0}'")]
    NotFound(String),
    /// A delegated agent gave up without an answer
    #[error("{0}")]
    Agent(String),
    /// Unrecoverable; aborts the whole run
    #[error(transparent)]
    Fatal(#[from] PipelineError),
}

pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON schema of the arguments object.
    fn parameters(&self) -> Value;
    /// Run with parsed arguments. `hook` is passed through so nested agents
    /// can ask the human too.
    fn run(&self, input: &Value, hook: &dyn DecisionHook) -> Result<String, ToolError>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Required string argument.
pub(crate) fn str_arg<'a>(input: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    input
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolError::InvalidInput(format!("missing required parameter '{}'", key)))
}

/// Shared instances of the built-in tools.
#[derive(Clone)]
pub struct Toolbox {
    tools: HashMap<ToolKind, Arc<dyn Tool>>,
}

impl Toolbox {
    /// Built-ins backed by the public Wikipedia and Open-Meteo APIs.
    pub fn with_defaults(timeout_secs: u64) -> Result<Self, ToolError> {
        let mut tools: HashMap<ToolKind, Arc<dyn Tool>> = HashMap::new();
        tools.insert(ToolKind::Think, Arc::new(ThinkTool));
        tools.insert(ToolKind::Wikipedia, Arc::new(WikipediaTool::new(timeout_secs)?));
        tools.insert(ToolKind::OpenMeteo, Arc::new(OpenMeteoTool::new(timeout_secs)?));
        Ok(Self { tools })
    }

    pub fn empty() -> Self {
        Self { tools: HashMap::new() }
    }

    pub fn insert(&mut self, kind: ToolKind, tool: Arc<dyn Tool>) {
        self.tools.insert(kind, tool);
    }

    pub fn get(&self, kind: ToolKind) -> Option<Arc<dyn Tool>> {
        self.tools.get(&kind).cloned()
    }
}
