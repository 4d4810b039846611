//! One log file per run under the configured log directory.
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use tracing_subscriber::EnvFilter;

use super::config::ConfigError;

/// Dependency targets that are only interesting when something is wrong.
const QUIET_TARGETS: &[&str] = &["reqwest", "hyper", "hyper_util"];

pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(format!("{}.log", Local::now().format("%Y-%m-%d_%H-%M-%S")))
}

fn filter_spec(rust_log: Option<&str>) -> String {
    let mut spec = rust_log.filter(|s| !s.trim().is_empty()).unwrap_or("info").to_string();
    for target in QUIET_TARGETS {
        spec.push_str(&format!(",{}=warn", target));
    }
    spec
}

/// Install the global subscriber. Returns the log file path.
pub fn init(log_dir: &Path) -> Result<PathBuf, ConfigError> {
    let fail = |message: String| ConfigError::Logging { path: log_dir.to_path_buf(), message };

    fs::create_dir_all(log_dir).map_err(|e| fail(e.to_string()))?;
    let path = log_file_path(log_dir);
    let file = File::create(&path).map_err(|e| fail(e.to_string()))?;

    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = EnvFilter::try_new(filter_spec(rust_log.as_deref())).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_thread_names(true)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|e| fail(e.to_string()))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_caps_http_crates() {
        assert_eq!(filter_spec(None), "info,reqwest=warn,hyper=warn,hyper_util=warn");
        assert_eq!(filter_spec(Some("  ")), "info,reqwest=warn,hyper=warn,hyper_util=warn");
        assert!(filter_spec(Some("atlas_base=debug")).starts_with("atlas_base=debug,"));
    }

    #[test]
    fn file_name_is_timestamped() {
        let path = log_file_path(Path::new("logs"));
        let name = path.file_name().unwrap().to_str().unwrap();
        // YYYY-MM-DD_HH-MM-SS.log
        assert_eq!(name.len(), 23);
        assert!(name.ends_with(".log"));
        assert_eq!(&name[10..11], "_");
        assert_eq!(path.parent().unwrap(), Path::new("logs"));
    }
}
