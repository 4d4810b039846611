use std::time::Duration;

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use tracing::warn;

use super::ToolError;

const USER_AGENT: &str = concat!("atlas-travel-planner/", env!("CARGO_PKG_VERSION"));

pub(crate) fn client(timeout_secs: u64) -> Result<Client, ToolError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ToolError::Http(e.to_string()))
}

/// GET JSON with 5xx retry (2 retries, 1s delay).
pub(crate) fn get_json<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T, ToolError> {
    for attempt in 0..3 {
        let resp = client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| ToolError::Http(e.to_string()))?;

        let status = resp.status().as_u16();
        let body = resp.text().map_err(|e| ToolError::Http(format!("failed to read response: {}", e)))?;

        match status {
            200..=299 => {
                return serde_json::from_str(&body)
                    .map_err(|e| ToolError::Http(format!("failed to parse response: {}", e)));
            }
            429 => return Err(ToolError::Http(format!("rate limited (429): {}", truncate(&body, 200)))),
            500..=599 if attempt < 2 => {
                warn!(status, attempt, url, "tool request failed, retrying");
                std::thread::sleep(Duration::from_secs(1));
                continue;
            }
            _ => return Err(ToolError::Http(format!("HTTP {}: {}", status, truncate(&body, 200)))),
        }
    }
    Err(ToolError::Http("max retries exceeded".to_string()))
}

/// Percent-encode a query parameter value.
pub(crate) fn urlenc(s: &str) -> String {
    let mut result = String::with_capacity(s.len() * 2);
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => result.push(b as char),
            _ => result.push_str(&format!("%{:02X}", b)),
        }
    }
    result
}

/// At most `max` chars of `s`.
pub(crate) fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
