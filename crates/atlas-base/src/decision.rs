//! Human decisions and the hook the worker calls to obtain them.

/// Token handed back to the worker when the human approves.
pub const APPROVE_TOKEN: &str = "y";
/// Token handed back to the worker when the human denies (or never answers).
pub const DENY_TOKEN: &str = "n";

/// Prompt shown when the worker asks without saying what for.
pub const DEFAULT_PROMPT: &str = "Agent requested permission.";

/// A single yes/no answer from the human.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Deny,
}

impl Decision {
    pub fn from_bool(approved: bool) -> Self {
        if approved { Decision::Approve } else { Decision::Deny }
    }

    /// Token expected by the worker's decision protocol.
    pub fn token(self) -> &'static str {
        match self {
            Decision::Approve => APPROVE_TOKEN,
            Decision::Deny => DENY_TOKEN,
        }
    }
}

/// Interpret a token returned by a [`DecisionHook`]. Anything that is not a
/// recognizable "yes" counts as a denial.
pub fn is_affirmative(token: &str) -> bool {
    matches!(token.trim().to_ascii_lowercase().as_str(), "y" | "yes" | "true" | "approve")
}

/// Called synchronously by the worker whenever it needs a human decision.
///
/// Implementations block until an answer is available and return a token
/// (`"y"` / `"n"`). The TUI runner and the headless stdin prompt both
/// implement this; pipelines only ever see the trait.
pub trait DecisionHook: Send + Sync {
    fn ask(&self, prompt: &str) -> String;
}

/// Hook that answers every request the same way. Useful for unattended runs.
pub struct FixedDecision(pub Decision);

impl DecisionHook for FixedDecision {
    fn ask(&self, _prompt: &str) -> String {
        self.0.token().to_string()
    }
}
