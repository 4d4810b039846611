//! Travel-planning agents: roster, requirement rules, tools, chat backend
//! and the pipeline the runner drives.
pub mod agent;
pub mod llm;
pub mod pipeline;
pub mod requirements;
pub mod roster;
pub mod tools;

pub use agent::{PermissionPolicy, RequirementAgent, permission_prompt};
pub use llm::{ChatBackend, LlmError, LlmSettings, OpenAiCompatClient};
pub use pipeline::{AgentOptions, TravelPipeline};
pub use roster::{Roster, RosterError, ToolKind};
pub use tools::{Tool, ToolError, Toolbox};
