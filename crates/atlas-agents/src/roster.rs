//! Agent roster: who the agents are, which tools they hold, and the rules
//! constraining when those tools may be used. Loaded from YAML.
use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use thiserror::Error;

/// Roster shipped with the binary.
pub const BUNDLED_ROSTER: &str = include_str!("../yamls/agents.yaml");

/// Built-in tools an agent can be given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum ToolKind {
    Think,
    Wikipedia,
    OpenMeteo,
}

impl ToolKind {
    /// Function name the model sees.
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Think => "Think",
            ToolKind::Wikipedia => "Wikipedia",
            ToolKind::OpenMeteo => "OpenMeteo",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Roster {
    /// Id of the agent that receives the user's query
    pub coordinator: String,
    pub agents: Vec<AgentSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentSpec {
    pub id: String,
    pub name: String,
    pub instructions: String,
    #[serde(default)]
    pub tools: Vec<ToolKind>,
    #[serde(default)]
    pub handoffs: Vec<HandoffSpec>,
    #[serde(default)]
    pub requirements: Vec<ConditionalRequirement>,
}

/// Exposes another agent as a tool named `name`.
#[derive(Debug, Clone, Deserialize)]
pub struct HandoffSpec {
    pub agent: String,
    pub name: String,
    pub description: String,
}

/// Usage rule for one tool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConditionalRequirement {
    pub tool: String,
    /// 1-based step at which the tool must be called
    #[serde(default)]
    pub force_at_step: Option<usize>,
    /// Calls needed before the agent may answer
    #[serde(default)]
    pub min_invocations: usize,
    #[serde(default)]
    pub max_invocations: Option<usize>,
    /// Tools that must each have been called at least once first
    #[serde(default)]
    pub only_after: Vec<String>,
    /// Whether the tool may be called twice in a row
    #[serde(default = "default_true")]
    pub consecutive_allowed: bool,
}

fn default_true() -> bool {
    true
}

impl ConditionalRequirement {
    pub fn new(tool: &str) -> Self {
        Self {
            tool: tool.to_string(),
            force_at_step: None,
            min_invocations: 0,
            max_invocations: None,
            only_after: Vec::new(),
            consecutive_allowed: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("failed to parse roster: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("duplicate agent id '{0}'")]
    DuplicateAgent(String),
    #[error("coordinator '{0}' is not defined")]
    UnknownCoordinator(String),
    #[error("agent '{agent}' hands off to unknown agent '{target}'")]
    UnknownHandoffTarget { agent: String, target: String },
    #[error("handoff cycle through agent '{0}'")]
    HandoffCycle(String),
    #[error("agent '{agent}' has a requirement on '{tool}', which it does not hold")]
    UnknownRequirementTool { agent: String, tool: String },
    #[error("agent '{agent}' declares tool '{tool}' twice")]
    DuplicateTool { agent: String, tool: String },
    #[error("agent '{agent}' needs tool '{tool}', which is not available")]
    ToolUnavailable { agent: String, tool: String },
}

impl Roster {
    pub fn bundled() -> Result<Self, RosterError> {
        Self::from_yaml(BUNDLED_ROSTER)
    }

    /// Parse and validate.
    pub fn from_yaml(text: &str) -> Result<Self, RosterError> {
        let roster: Roster = serde_yaml::from_str(text)?;
        roster.validate()?;
        Ok(roster)
    }

    pub fn agent(&self, id: &str) -> Option<&AgentSpec> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn validate(&self) -> Result<(), RosterError> {
        let mut ids = HashSet::new();
        for agent in &self.agents {
            if !ids.insert(agent.id.as_str()) {
                return Err(RosterError::DuplicateAgent(agent.id.clone()));
            }
        }
        if !ids.contains(self.coordinator.as_str()) {
            return Err(RosterError::UnknownCoordinator(self.coordinator.clone()));
        }

        for agent in &self.agents {
            let names = agent.tool_names();
            let mut seen = HashSet::new();
            for name in &names {
                if !seen.insert(name.as_str()) {
                    return Err(RosterError::DuplicateTool { agent: agent.id.clone(), tool: name.clone() });
                }
            }
            for handoff in &agent.handoffs {
                if !ids.contains(handoff.agent.as_str()) {
                    return Err(RosterError::UnknownHandoffTarget {
                        agent: agent.id.clone(),
                        target: handoff.agent.clone(),
                    });
                }
            }
            for req in &agent.requirements {
                for tool in std::iter::once(&req.tool).chain(req.only_after.iter()) {
                    if !seen.contains(tool.as_str()) {
                        return Err(RosterError::UnknownRequirementTool {
                            agent: agent.id.clone(),
                            tool: tool.clone(),
                        });
                    }
                }
            }
        }

        self.check_acyclic()
    }

    /// Handoffs run sub-agents synchronously, so the handoff graph must be a DAG.
    fn check_acyclic(&self) -> Result<(), RosterError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit<'a>(roster: &'a Roster, id: &'a str, marks: &mut HashMap<&'a str, Mark>) -> Result<(), RosterError> {
            match marks.get(id) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => return Err(RosterError::HandoffCycle(id.to_string())),
                None => {}
            }
            marks.insert(id, Mark::Visiting);
            if let Some(agent) = roster.agent(id) {
                for handoff in &agent.handoffs {
                    visit(roster, &handoff.agent, marks)?;
                }
            }
            marks.insert(id, Mark::Done);
            Ok(())
        }

        let mut marks = HashMap::new();
        for agent in &self.agents {
            visit(self, &agent.id, &mut marks)?;
        }
        Ok(())
    }
}

impl AgentSpec {
    /// Names of every tool this agent holds, built-ins first.
    pub fn tool_names(&self) -> Vec<String> {
        self.tools
            .iter()
            .map(|k| k.name().to_string())
            .chain(self.handoffs.iter().map(|h| h.name.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_roster_is_valid() {
        let roster = Roster::bundled().unwrap();
        assert_eq!(roster.coordinator, "atlas");
        assert_eq!(roster.agents.len(), 4);

        let atlas = roster.agent("atlas").unwrap();
        assert_eq!(
            atlas.tool_names(),
            vec!["Think", "DestinationResearch", "WeatherPlanning", "LanguageCulturalGuidance"]
        );

        let weather = roster.agent("travel_meteorologist").unwrap();
        let meteo = weather.requirements.iter().find(|r| r.tool == "OpenMeteo").unwrap();
        assert_eq!(meteo.only_after, vec!["Think"]);
        assert_eq!(meteo.max_invocations, Some(1));
        assert!(meteo.consecutive_allowed);
    }

    #[test]
    fn unknown_coordinator() {
        let yaml = "coordinator: nobody\nagents:\n  - id: a\n    name: A\n    instructions: hi\n";
        assert!(matches!(Roster::from_yaml(yaml), Err(RosterError::UnknownCoordinator(_))));
    }

    #[test]
    fn handoff_cycle_rejected() {
        let yaml = r#"
coordinator: a
agents:
  - id: a
    name: A
    instructions: x
    handoffs: [{ agent: b, name: ToB, description: d }]
  - id: b
    name: B
    instructions: x
    handoffs: [{ agent: a, name: ToA, description: d }]
"#;
        assert!(matches!(Roster::from_yaml(yaml), Err(RosterError::HandoffCycle(_))));
    }

    #[test]
    fn requirement_on_missing_tool_rejected() {
        let yaml = r#"
coordinator: a
agents:
  - id: a
    name: A
    instructions: x
    tools: [Think]
    requirements:
      - tool: Wikipedia
"#;
        let err = Roster::from_yaml(yaml).unwrap_err();
        assert_eq!(err.to_string(), "agent 'a' has a requirement on 'Wikipedia', which it does not hold");
    }

    #[test]
    fn unknown_handoff_target() {
        let yaml = r#"
coordinator: a
agents:
  - id: a
    name: A
    instructions: x
    handoffs: [{ agent: ghost, name: ToGhost, description: d }]
"#;
        assert!(matches!(Roster::from_yaml(yaml), Err(RosterError::UnknownHandoffTarget { .. })));
    }
}
