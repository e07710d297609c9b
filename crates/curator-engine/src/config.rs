use std::env;
use std::time::Duration;

use curator_contracts::models::DEFAULT_HOSTED_MODEL;

pub const DEFAULT_HOSTED_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_LOCAL_HOST: &str = "http://127.0.0.1:11434";
pub const DEFAULT_REQUEST_TIMEOUT_S: f64 = 90.0;
const MIN_REQUEST_TIMEOUT_S: f64 = 5.0;
const MAX_REQUEST_TIMEOUT_S: f64 = 600.0;

/// Process-wide settings, resolved once and passed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub hosted_api_key: Option<String>,
    pub hosted_api_base: String,
    pub hosted_model: String,
    pub local_host: String,
    pub request_timeout: Duration,
    pub pro_agents_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hosted_api_key: None,
            hosted_api_base: DEFAULT_HOSTED_API_BASE.to_string(),
            hosted_model: DEFAULT_HOSTED_MODEL.to_string(),
            local_host: DEFAULT_LOCAL_HOST.to_string(),
            request_timeout: Duration::from_secs_f64(DEFAULT_REQUEST_TIMEOUT_S),
            pro_agents_enabled: false,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            hosted_api_key: first_non_empty_env(&["GEMINI_API_KEY", "GOOGLE_API_KEY"]),
            hosted_api_base: first_non_empty_env(&["GEMINI_API_BASE"])
                .map(|value| value.trim_end_matches('/').to_string())
                .unwrap_or(defaults.hosted_api_base),
            hosted_model: first_non_empty_env(&["CURATOR_HOSTED_MODEL"])
                .unwrap_or(defaults.hosted_model),
            local_host: normalize_local_host(
                first_non_empty_env(&["OLLAMA_HOST", "OLLAMA_URL"]).as_deref(),
            ),
            request_timeout: first_non_empty_env(&["CURATOR_REQUEST_TIMEOUT"])
                .and_then(|raw| raw.parse::<f64>().ok())
                .map(timeout_from_seconds)
                .unwrap_or(defaults.request_timeout),
            pro_agents_enabled: first_non_empty_env(&["CURATOR_PRO_AGENTS"])
                .map(|raw| parse_flag(&raw))
                .unwrap_or(false),
        }
    }

    pub fn hosted_available(&self) -> bool {
        self.hosted_api_key.is_some()
    }

    pub fn with_local_host(mut self, raw: &str) -> Self {
        self.local_host = normalize_local_host(Some(raw));
        self
    }

    pub fn with_timeout_seconds(mut self, seconds: f64) -> Self {
        self.request_timeout = timeout_from_seconds(seconds);
        self
    }
}

/// Adds `http://` to a bare `host:port` and drops trailing slashes.
pub fn normalize_local_host(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return DEFAULT_LOCAL_HOST.to_string();
    };
    let lowered = raw.to_ascii_lowercase();
    let host = if lowered.starts_with("http://") || lowered.starts_with("https://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };
    host.trim_end_matches('/').to_string()
}

fn timeout_from_seconds(seconds: f64) -> Duration {
    let clamped = if seconds.is_finite() {
        seconds.clamp(MIN_REQUEST_TIMEOUT_S, MAX_REQUEST_TIMEOUT_S)
    } else {
        DEFAULT_REQUEST_TIMEOUT_S
    };
    Duration::from_secs_f64(clamped)
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn first_non_empty_env(keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Ok(value) = env::var(key) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{normalize_local_host, EngineConfig, DEFAULT_LOCAL_HOST};

    #[test]
    fn local_host_gets_scheme_and_loses_trailing_slash() {
        assert_eq!(normalize_local_host(None), DEFAULT_LOCAL_HOST);
        assert_eq!(normalize_local_host(Some("  ")), DEFAULT_LOCAL_HOST);
        assert_eq!(
            normalize_local_host(Some("gpu-box:11434")),
            "http://gpu-box:11434"
        );
        assert_eq!(
            normalize_local_host(Some("HTTPS://models.lan/")),
            "HTTPS://models.lan"
        );
    }

    #[test]
    fn timeout_is_clamped() {
        let config = EngineConfig::default().with_timeout_seconds(1.0);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        let config = EngineConfig::default().with_timeout_seconds(f64::NAN);
        assert_eq!(config.request_timeout, Duration::from_secs(90));
    }

    #[test]
    fn hosted_availability_follows_credential() {
        let mut config = EngineConfig::default();
        assert!(!config.hosted_available());
        config.hosted_api_key = Some("key".to_string());
        assert!(config.hosted_available());
    }
}
