//! Requirement-driven tool-calling agent.
//!
//! Each step the agent offers the model only the tools its
//! [`RequirementTracker`] currently allows, executes every tool call in the
//! response, and accepts a plain-text answer once all minimum invocation
//! counts are met.
use std::collections::HashSet;
use std::sync::Arc;

use atlas_base::{DecisionHook, PipelineError, is_affirmative};
use serde_json::Value;
use tracing::{debug, info, info_span, warn};

use crate::llm::{ChatBackend, ChatMessage, ChatRequest, ToolCall, ToolChoice, ToolDefinition};
use crate::requirements::RequirementTracker;
use crate::roster::ConditionalRequirement;
use crate::tools::{Tool, ToolError};

pub const DEFAULT_MAX_STEPS: usize = 20;

/// Tools that need a human decision before every invocation.
#[derive(Debug, Clone, Default)]
pub struct PermissionPolicy {
    tools: HashSet<String>,
}

impl PermissionPolicy {
    pub fn new<I, S>(tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { tools: tools.into_iter().map(Into::into).collect() }
    }

    pub fn requires(&self, tool: &str) -> bool {
        self.tools.contains(tool)
    }
}

/// Text shown to the human for one tool invocation.
pub fn permission_prompt(tool: &str, input: &Value) -> String {
    format!("Use {} tool?\ninput: {}", tool, input)
}

fn nudge(unmet: &[(String, usize)]) -> String {
    let owed: Vec<String> = unmet.iter().map(|(tool, n)| format!("{} ({} more call(s))", tool, n)).collect();
    format!("You cannot give a final answer yet. You still need to use: {}.", owed.join(", "))
}

pub struct RequirementAgent {
    name: String,
    instructions: String,
    tools: Vec<Arc<dyn Tool>>,
    rules: Vec<ConditionalRequirement>,
    permission: Arc<PermissionPolicy>,
    backend: Arc<dyn ChatBackend>,
    max_steps: usize,
}

impl RequirementAgent {
    pub fn new(
        name: &str,
        instructions: &str,
        tools: Vec<Arc<dyn Tool>>,
        rules: Vec<ConditionalRequirement>,
        backend: Arc<dyn ChatBackend>,
    ) -> Self {
        Self {
            name: name.to_string(),
            instructions: instructions.to_string(),
            tools,
            rules,
            permission: Arc::new(PermissionPolicy::default()),
            backend,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_permission(mut self, permission: Arc<PermissionPolicy>) -> Self {
        self.permission = permission;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    /// Run the agent on `task` until it produces a final answer.
    pub fn run(&self, task: &str, hook: &dyn DecisionHook) -> Result<String, PipelineError> {
        let span = info_span!("agent", name = %self.name);
        let _enter = span.enter();
        info!(task, "agent started");

        let mut tracker = RequirementTracker::new(self.rules.clone());
        let names = self.tool_names();
        let mut messages = vec![ChatMessage::system(&self.instructions), ChatMessage::user(task)];

        for step in 1..=self.max_steps {
            let plan = tracker.plan(step, &names);
            let defs: Vec<ToolDefinition> = self
                .tools
                .iter()
                .filter(|t| plan.allowed.iter().any(|a| a == t.name()))
                .map(|t| t.definition())
                .collect();
            let tool_choice = match plan.forced {
                Some(tool) => ToolChoice::Named(tool),
                None if !tracker.can_finish() && !defs.is_empty() => ToolChoice::Required,
                None => ToolChoice::Auto,
            };
            debug!(step, allowed = ?plan.allowed, ?tool_choice, "step");

            let request = ChatRequest { messages: &messages, tools: &defs, tool_choice };
            let response = self.backend.complete(&request).map_err(|e| PipelineError::Backend(e.to_string()))?;

            if response.tool_calls.is_empty() {
                let answer = response.content.unwrap_or_default();
                if tracker.can_finish() {
                    info!(step, "final answer");
                    return Ok(answer);
                }
                let unmet = tracker.unmet();
                debug!(step, ?unmet, "answer rejected, requirements unmet");
                if !answer.is_empty() {
                    messages.push(ChatMessage::assistant(Some(answer), Vec::new()));
                }
                messages.push(ChatMessage::user(&nudge(&unmet)));
                continue;
            }

            messages.push(ChatMessage::assistant(response.content.clone(), response.tool_calls.clone()));
            for call in &response.tool_calls {
                let output = self.invoke(call, &mut tracker, hook)?;
                messages.push(ChatMessage::tool_result(&call.id, &output));
            }
        }

        warn!(steps = self.max_steps, "step limit reached");
        Err(PipelineError::StepLimit { agent: self.name.clone(), steps: self.max_steps })
    }

    /// Execute one tool call. Anything the model can correct comes back as
    /// text; only fatal tool errors abort the run.
    fn invoke(
        &self,
        call: &ToolCall,
        tracker: &mut RequirementTracker,
        hook: &dyn DecisionHook,
    ) -> Result<String, PipelineError> {
        let Some(tool) = self.tools.iter().find(|t| t.name() == call.name) else {
            warn!(tool = %call.name, "unknown tool requested");
            return Ok(format!("Error: unknown tool '{}'", call.name));
        };
        if let Err(reason) = tracker.check(&call.name) {
            debug!(tool = %call.name, %reason, "tool call rejected");
            return Ok(format!("Error: {}", reason));
        }
        let input: Value = if call.arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            match serde_json::from_str(&call.arguments) {
                Ok(v) => v,
                Err(e) => return Ok(format!("Error: invalid arguments for {}: {}", call.name, e)),
            }
        };

        if self.permission.requires(&call.name) {
            let answer = hook.ask(&permission_prompt(&call.name, &input));
            if !is_affirmative(&answer) {
                info!(tool = %call.name, "permission denied");
                return Ok(format!("Permission to use the {} tool was denied by the user.", call.name));
            }
            info!(tool = %call.name, "permission granted");
        }

        tracker.record(&call.name);
        info!(tool = %call.name, %input, "tool call");
        match tool.run(&input, hook) {
            Ok(output) => {
                debug!(tool = %call.name, chars = output.len(), "tool result");
                Ok(output)
            }
            Err(ToolError::Fatal(e)) => Err(e),
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool failed");
                Ok(format!("Error: {}", e))
            }
        }
    }
}
