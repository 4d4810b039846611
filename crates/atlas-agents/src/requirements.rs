//! Enforcement of [`ConditionalRequirement`] rules across an agent run.
use crate::roster::ConditionalRequirement;

/// Tools the model may use this step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPlan {
    pub allowed: Vec<String>,
    /// Tool the model must call this step, if any
    pub forced: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RequirementTracker {
    rules: Vec<ConditionalRequirement>,
    /// Every successful invocation, in order
    history: Vec<String>,
}

impl RequirementTracker {
    pub fn new(rules: Vec<ConditionalRequirement>) -> Self {
        Self { rules, history: Vec::new() }
    }

    fn rule(&self, tool: &str) -> Option<&ConditionalRequirement> {
        self.rules.iter().find(|r| r.tool == tool)
    }

    pub fn count(&self, tool: &str) -> usize {
        self.history.iter().filter(|t| *t == tool).count()
    }

    pub fn record(&mut self, tool: &str) {
        self.history.push(tool.to_string());
    }

    /// Why `tool` may not be called right now, or `Ok` if it may.
    /// Tools without a rule are always allowed.
    pub fn check(&self, tool: &str) -> Result<(), String> {
        let Some(rule) = self.rule(tool) else { return Ok(()) };

        if let Some(max) = rule.max_invocations
            && self.count(tool) >= max
        {
            return Err(format!("{} may be used at most {} time(s)", tool, max));
        }
        if let Some(missing) = rule.only_after.iter().find(|t| self.count(t) == 0) {
            return Err(format!("{} must be used before {}", missing, tool));
        }
        if !rule.consecutive_allowed && self.history.last().is_some_and(|t| t == tool) {
            return Err(format!("{} cannot be used twice in a row", tool));
        }
        Ok(())
    }

    /// Allowed tools among `available` for 1-based `step`, plus a forced tool
    /// when a rule pins one to this step and it is currently allowed.
    pub fn plan(&self, step: usize, available: &[String]) -> StepPlan {
        let allowed: Vec<String> = available.iter().filter(|t| self.check(t).is_ok()).cloned().collect();
        let forced = self
            .rules
            .iter()
            .filter(|r| r.force_at_step == Some(step))
            .map(|r| r.tool.clone())
            .find(|t| allowed.contains(t));
        StepPlan { allowed, forced }
    }

    /// Rules whose minimum has not been reached, with the calls still owed.
    pub fn unmet(&self) -> Vec<(String, usize)> {
        self.rules
            .iter()
            .filter_map(|r| {
                let done = self.count(&r.tool);
                (done < r.min_invocations).then(|| (r.tool.clone(), r.min_invocations - done))
            })
            .collect()
    }

    /// Whether the agent may give its final answer.
    pub fn can_finish(&self) -> bool {
        self.unmet().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tools(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn destination_rules() -> Vec<ConditionalRequirement> {
        vec![
            ConditionalRequirement {
                force_at_step: Some(1),
                min_invocations: 1,
                max_invocations: Some(5),
                consecutive_allowed: false,
                ..ConditionalRequirement::new("Think")
            },
            ConditionalRequirement {
                only_after: vec!["Think".to_string()],
                min_invocations: 1,
                max_invocations: Some(4),
                consecutive_allowed: false,
                ..ConditionalRequirement::new("Wikipedia")
            },
        ]
    }

    #[test]
    fn first_step_forces_think_and_hides_wikipedia() {
        let t = RequirementTracker::new(destination_rules());
        let plan = t.plan(1, &tools(&["Think", "Wikipedia"]));
        assert_eq!(plan.allowed, tools(&["Think"]));
        assert_eq!(plan.forced.as_deref(), Some("Think"));
        assert!(!t.can_finish());
    }

    #[test]
    fn consecutive_and_only_after() {
        let mut t = RequirementTracker::new(destination_rules());
        t.record("Think");
        let plan = t.plan(2, &tools(&["Think", "Wikipedia"]));
        assert_eq!(plan.allowed, tools(&["Wikipedia"]));
        assert_eq!(plan.forced, None);
        assert_eq!(t.check("Think").unwrap_err(), "Think cannot be used twice in a row");

        t.record("Wikipedia");
        assert!(t.can_finish());
        assert_eq!(t.plan(3, &tools(&["Think", "Wikipedia"])).allowed, tools(&["Think"]));
    }

    #[test]
    fn max_invocations_caps_tool() {
        let rules = vec![ConditionalRequirement { max_invocations: Some(1), ..ConditionalRequirement::new("OpenMeteo") }];
        let mut t = RequirementTracker::new(rules);
        assert!(t.check("OpenMeteo").is_ok());
        t.record("OpenMeteo");
        assert_eq!(t.check("OpenMeteo").unwrap_err(), "OpenMeteo may be used at most 1 time(s)");
    }

    #[test]
    fn unruled_tools_always_allowed() {
        let t = RequirementTracker::new(Vec::new());
        assert!(t.check("DestinationResearch").is_ok());
        assert!(t.can_finish());
    }

    #[test]
    fn unmet_reports_remaining_calls() {
        let rules = vec![ConditionalRequirement { min_invocations: 2, ..ConditionalRequirement::new("Think") }];
        let mut t = RequirementTracker::new(rules);
        t.record("Think");
        assert_eq!(t.unmet(), vec![("Think".to_string(), 1)]);
        t.record("Think");
        assert!(t.unmet().is_empty());
    }
}
