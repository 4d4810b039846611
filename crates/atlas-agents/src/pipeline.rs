//! Wires a [`Roster`] into a tree of [`RequirementAgent`]s rooted at the
//! coordinator.
use std::collections::HashMap;
use std::sync::Arc;

use atlas_base::{DecisionHook, Pipeline, PipelineError};
use tracing::info;

use crate::agent::{DEFAULT_MAX_STEPS, PermissionPolicy, RequirementAgent};
use crate::llm::ChatBackend;
use crate::roster::{Roster, RosterError};
use crate::tools::{HandoffTool, Tool, Toolbox};

#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub max_steps: usize,
    pub permission: Arc<PermissionPolicy>,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self { max_steps: DEFAULT_MAX_STEPS, permission: Arc::new(PermissionPolicy::default()) }
    }
}

pub struct TravelPipeline {
    coordinator: Arc<RequirementAgent>,
}

impl TravelPipeline {
    pub fn build(
        roster: &Roster,
        backend: Arc<dyn ChatBackend>,
        toolbox: &Toolbox,
        options: AgentOptions,
    ) -> Result<Self, RosterError> {
        roster.validate()?;
        let mut built = HashMap::new();
        let coordinator = build_agent(roster, &roster.coordinator, &backend, toolbox, &options, &mut built)?;
        info!(coordinator = %coordinator.name(), agents = built.len(), "pipeline ready");
        Ok(Self { coordinator })
    }
}

/// Depth-first; sub-agents shared by several parents are built once.
fn build_agent(
    roster: &Roster,
    id: &str,
    backend: &Arc<dyn ChatBackend>,
    toolbox: &Toolbox,
    options: &AgentOptions,
    built: &mut HashMap<String, Arc<RequirementAgent>>,
) -> Result<Arc<RequirementAgent>, RosterError> {
    if let Some(agent) = built.get(id) {
        return Ok(agent.clone());
    }
    let spec = roster.agent(id).ok_or_else(|| RosterError::UnknownCoordinator(id.to_string()))?;

    let mut tools: Vec<Arc<dyn Tool>> = Vec::new();
    for kind in &spec.tools {
        let tool = toolbox
            .get(*kind)
            .ok_or_else(|| RosterError::ToolUnavailable { agent: spec.id.clone(), tool: kind.name().to_string() })?;
        tools.push(tool);
    }
    for handoff in &spec.handoffs {
        let target = build_agent(roster, &handoff.agent, backend, toolbox, options, built)?;
        tools.push(Arc::new(HandoffTool::new(&handoff.name, &handoff.description, target)));
    }

    let agent = Arc::new(
        RequirementAgent::new(&spec.name, &spec.instructions, tools, spec.requirements.clone(), backend.clone())
            .with_permission(options.permission.clone())
            .with_max_steps(options.max_steps),
    );
    built.insert(id.to_string(), agent.clone());
    Ok(agent)
}

impl Pipeline for TravelPipeline {
    fn run(&self, query: &str, hook: &dyn DecisionHook) -> Result<String, PipelineError> {
        self.coordinator.run(query, hook)
    }
}
