// =============================================================================
// LLM
// =============================================================================

/// Model used when neither config nor `LLM_CHAT_MODEL_NAME` names one
pub const DEFAULT_MODEL: &str = "openai:gpt-4o-mini";

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Per-request HTTP timeout for the chat backend (seconds)
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;

/// Per-request HTTP timeout for Wikipedia / Open-Meteo (seconds)
pub const TOOL_TIMEOUT_SECS: u64 = 15;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const MODEL_ENV: &str = "LLM_CHAT_MODEL_NAME";

// =============================================================================
// CONFIG & LOGGING
// =============================================================================

pub const DEFAULT_CONFIG_FILE: &str = "atlas.yaml";
pub const DEFAULT_LOG_DIR: &str = "logs";

// =============================================================================
// UI TIMING
// =============================================================================

/// Re-tick interval while the worker runs (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Input poll while idle (milliseconds)
pub const IDLE_POLL_MS: u64 = 50;

/// Minimum time between renders (~28fps)
pub const RENDER_THROTTLE_MS: u64 = 36;

pub const SIDEBAR_WIDTH: u16 = 30;

/// Lines scrolled per PageUp/PageDown
pub const SCROLL_PAGE_AMOUNT: u16 = 10;

pub const DEFAULT_GREETING: &str =
    "Hi, I'm Atlas. Tell me where you're headed and I'll pull together destination, weather and culture tips.";
