use std::sync::Arc;

use atlas_base::{DecisionHook, PipelineError};
use serde_json::{Value, json};

use super::{Tool, ToolError, str_arg};
use crate::agent::RequirementAgent;

/// Exposes another agent as a tool: the model writes a task, the sub-agent
/// runs to completion and its answer becomes the tool result.
pub struct HandoffTool {
    name: String,
    description: String,
    target: Arc<RequirementAgent>,
}

impl HandoffTool {
    pub fn new(name: &str, description: &str, target: Arc<RequirementAgent>) -> Self {
        Self { name: name.to_string(), description: description.to_string(), target }
    }
}

impl Tool for HandoffTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task": { "type": "string", "description": "Clearly defined task for the agent to work on." }
            },
            "required": ["task"]
        })
    }

    fn run(&self, input: &Value, hook: &dyn DecisionHook) -> Result<String, ToolError> {
        let task = str_arg(input, "task")?;
        match self.target.run(task, hook) {
            Ok(answer) => Ok(answer),
            // the caller can still answer from what it has
            Err(e @ PipelineError::StepLimit { .. }) => Err(ToolError::Agent(e.to_string())),
            Err(e) => Err(ToolError::Fatal(e)),
        }
    }
}
