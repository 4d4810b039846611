use atlas_base::DecisionHook;
use serde_json::{Value, json};
use tracing::debug;

use super::{Tool, ToolError, str_arg};

/// Scratchpad for the model's reasoning. Echoes the thoughts back so they
/// stay in the conversation.
pub struct ThinkTool;

impl Tool for ThinkTool {
    fn name(&self) -> &str {
        "Think"
    }

    fn description(&self) -> &str {
        "Use when you want to think through a problem, clarify your assumptions, or break down complex steps before acting or responding."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "thoughts": { "type": "string", "description": "Precisely describe what you are thinking about." },
                "next_step": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Describe the tools you would need to use next and why."
                }
            },
            "required": ["thoughts"]
        })
    }

    fn run(&self, input: &Value, _hook: &dyn DecisionHook) -> Result<String, ToolError> {
        let thoughts = str_arg(input, "thoughts")?;
        debug!(thoughts, "think");
        let next: Vec<&str> = input
            .get("next_step")
            .and_then(Value::as_array)
            .map(|steps| steps.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        if next.is_empty() {
            Ok(thoughts.to_string())
        } else {
            Ok(format!("{}\nNext: {}", thoughts, next.join(", ")))
        }
    }
}
