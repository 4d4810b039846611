//! YAML application config plus environment overrides.
//!
//! Every field has a default, so a missing `atlas.yaml` is fine. An explicit
//! `--config` path must exist.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use atlas_agents::{LlmError, LlmSettings, PermissionPolicy, Roster, RosterError, ToolError};
use atlas_base::RunnerOptions;
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

use super::constants::{
    API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_CONFIG_FILE, DEFAULT_GREETING, DEFAULT_LLM_TIMEOUT_SECS, DEFAULT_LOG_DIR,
    DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_POLL_INTERVAL_MS, MODEL_ENV,
};

/// Anything that stops the application from starting.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("{0} is not set (export it or add it to .env)")]
    MissingApiKey(&'static str),
    #[error("failed to load agent roster '{}': {source}", path.display())]
    RosterFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error("failed to set up LLM backend: {0}")]
    Backend(#[from] LlmError),
    #[error("failed to set up tools: {0}")]
    Tools(#[from] ToolError),
    #[error("failed to initialise logging in '{}': {message}", path.display())]
    Logging { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub ui: UiConfig,
    pub approval: ApprovalConfig,
    pub agents: AgentsConfig,
    pub log_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LlmConfig {
    /// `provider:model`
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UiConfig {
    /// Re-tick interval while the agent works
    pub poll_interval_ms: u64,
    /// First assistant message; empty disables it
    pub greeting: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApprovalConfig {
    /// Unanswered requests are denied after this long; absent waits forever
    pub timeout_secs: Option<u64>,
    /// Tools that need a human decision before each call
    pub tools: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentsConfig {
    /// Roster YAML replacing the bundled one
    pub roster: Option<PathBuf>,
    pub max_steps: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            ui: UiConfig::default(),
            approval: ApprovalConfig::default(),
            agents: AgentsConfig::default(),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.0,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { poll_interval_ms: DEFAULT_POLL_INTERVAL_MS, greeting: DEFAULT_GREETING.to_string() }
    }
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            tools: ["DestinationResearch", "WeatherPlanning", "LanguageCulturalGuidance"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self { roster: None, max_steps: atlas_agents::agent::DEFAULT_MAX_STEPS }
    }
}

impl AppConfig {
    /// Load `path`, or `atlas.yaml` in the working directory if present.
    /// Environment overrides are applied afterwards.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        let mut config = match fs::read_to_string(&path) {
            Ok(text) => Self::from_yaml(&text).map_err(|source| ConfigError::Parse { path: path.clone(), source })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound && !explicit => Self::default(),
            Err(source) => return Err(ConfigError::Read { path, source }),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// `LLM_CHAT_MODEL_NAME` wins over the file.
    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(model) = get(MODEL_ENV).filter(|m| !m.trim().is_empty()) {
            self.llm.model = model.trim().to_string();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Invalid("llm.model is empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Invalid(format!("llm.temperature {} is outside 0..2", self.llm.temperature)));
        }
        if self.ui.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("ui.poll_interval_ms must be positive".to_string()));
        }
        if self.agents.max_steps == 0 {
            return Err(ConfigError::Invalid("agents.max_steps must be positive".to_string()));
        }
        if self.approval.timeout_secs == Some(0) {
            return Err(ConfigError::Invalid("approval.timeout_secs must be positive when set".to_string()));
        }
        Ok(())
    }

    pub fn llm_settings(&self) -> LlmSettings {
        LlmSettings {
            model: self.llm.model.clone(),
            base_url: self.llm.base_url.clone(),
            temperature: self.llm.temperature,
            max_tokens: self.llm.max_tokens,
            timeout_secs: self.llm.timeout_secs,
        }
    }

    pub fn runner_options(&self) -> RunnerOptions {
        RunnerOptions { approval_timeout: self.approval.timeout_secs.map(Duration::from_secs) }
    }

    pub fn permission_policy(&self) -> PermissionPolicy {
        PermissionPolicy::new(self.approval.tools.iter().cloned())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.ui.poll_interval_ms)
    }

    /// Configured roster file, or the bundled one.
    pub fn roster(&self) -> Result<Roster, ConfigError> {
        match &self.agents.roster {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .map_err(|source| ConfigError::RosterFile { path: path.clone(), source })?;
                Ok(Roster::from_yaml(&text)?)
            }
            None => Ok(Roster::bundled()?),
        }
    }
}

/// API key for the chat backend.
pub fn api_key(get: impl Fn(&str) -> Option<String>) -> Result<SecretString, ConfigError> {
    get(API_KEY_ENV)
        .filter(|k| !k.trim().is_empty())
        .map(|k| SecretString::from(k.trim().to_string()))
        .ok_or(ConfigError::MissingApiKey(API_KEY_ENV))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults() {
        let c = AppConfig::default();
        assert_eq!(c.llm.model, "openai:gpt-4o-mini");
        assert_eq!(c.llm.temperature, 0.0);
        assert_eq!(c.ui.poll_interval_ms, 250);
        assert_eq!(c.log_dir, PathBuf::from("logs"));
        assert!(c.runner_options().approval_timeout.is_none());
        assert!(c.permission_policy().requires("WeatherPlanning"));
        assert!(!c.permission_policy().requires("Think"));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn load_file_with_partial_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "llm:\n  model: groq:llama-3.3-70b\n  temperature: 0.2\napproval:\n  timeout_secs: 30\n  tools: [Wikipedia]\nlog_dir: /tmp/atlas-logs\n"
        )
        .unwrap();

        let c = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(c.llm_settings().api_model(), "llama-3.3-70b");
        assert_eq!(c.llm.base_url, DEFAULT_BASE_URL);
        assert_eq!(c.runner_options().approval_timeout, Some(Duration::from_secs(30)));
        assert!(c.permission_policy().requires("Wikipedia"));
        assert!(!c.permission_policy().requires("WeatherPlanning"));
        assert_eq!(c.log_dir, PathBuf::from("/tmp/atlas-logs"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(Some(&dir.path().join("nope.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn unknown_field_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "ui:\n  colour: red\n").unwrap();
        let err = AppConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn empty_file_means_defaults() {
        let c = AppConfig::from_yaml("  \n").unwrap();
        assert_eq!(c.agents.max_steps, atlas_agents::agent::DEFAULT_MAX_STEPS);
    }

    #[test]
    fn env_model_overrides_file() {
        let mut c = AppConfig::from_yaml("llm:\n  model: openai:gpt-4o\n").unwrap();
        c.apply_env(|k| (k == "LLM_CHAT_MODEL_NAME").then(|| "openai:gpt-4.1-mini".to_string()));
        assert_eq!(c.llm.model, "openai:gpt-4.1-mini");
        c.apply_env(|_| Some("   ".to_string()));
        assert_eq!(c.llm.model, "openai:gpt-4.1-mini");
    }

    #[test]
    fn validation_rejects_zero_intervals() {
        let mut c = AppConfig::default();
        c.ui.poll_interval_ms = 0;
        assert_eq!(c.validate().unwrap_err().to_string(), "invalid config: ui.poll_interval_ms must be positive");

        let mut c = AppConfig::default();
        c.approval.timeout_secs = Some(0);
        assert!(c.validate().is_err());
    }

    #[test]
    fn api_key_from_env() {
        assert!(matches!(api_key(no_env), Err(ConfigError::MissingApiKey("OPENAI_API_KEY"))));
        let key = api_key(|_| Some(" sk-test ".to_string())).unwrap();
        assert_eq!(key.expose_secret(), "sk-test");
    }

    #[test]
    fn roster_file_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "coordinator: solo\nagents:\n  - id: solo\n    name: Solo\n    instructions: hi\n").unwrap();
        let mut c = AppConfig::default();
        c.agents.roster = Some(file.path().to_path_buf());
        assert_eq!(c.roster().unwrap().coordinator, "solo");

        c.agents.roster = None;
        assert_eq!(c.roster().unwrap().coordinator, "atlas");
    }
}
