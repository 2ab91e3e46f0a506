//! Client configuration.
//!
//! Every knob has a default so an empty environment yields a usable config
//! pointing at a local backend.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

pub const ENV_API_URL: &str = "LABTRACK_API_URL";
pub const ENV_TOKEN_KEY: &str = "LABTRACK_TOKEN_KEY";
pub const ENV_DATA_DIR: &str = "LABTRACK_DATA_DIR";
pub const ENV_ENFORCE_EXPIRY: &str = "LABTRACK_ENFORCE_EXPIRY";
pub const ENV_EXPIRY_LEEWAY: &str = "LABTRACK_EXPIRY_LEEWAY_SECS";
pub const ENV_LOG_FORMAT: &str = "LABTRACK_LOG_FORMAT";

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_TOKEN_KEY: &str = "token";

/// Whether the token's `exp` claim is consulted when deciding if a session is live.
///
/// The backend enforces expiry on every API call; the client ignores the claim
/// unless told otherwise.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ExpiryPolicy {
    #[default]
    Ignore,
    Enforce {
        /// Seconds of clock skew tolerated past `exp`.
        leeway_secs: i64,
    },
}

impl ExpiryPolicy {
    pub fn is_enforced(&self) -> bool {
        matches!(self, Self::Enforce { .. })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend base URL, without a trailing slash.
    pub api_url: String,

    /// Storage key the bearer token is persisted under.
    pub token_key: String,

    /// Directory for persisted client state. `None` means the platform data dir.
    pub data_dir: Option<PathBuf>,

    pub expiry: ExpiryPolicy,

    pub log_format: LogFormat,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token_key: DEFAULT_TOKEN_KEY.to_string(),
            data_dir: None,
            expiry: ExpiryPolicy::Ignore,
            log_format: LogFormat::Text,
        }
    }
}

impl ClientConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL) {
            config = config.with_api_url(url)?;
        }

        if let Some(key) = lookup(ENV_TOKEN_KEY) {
            let key = key.trim();
            if key.is_empty() {
                return Err(ConfigError::invalid_value(ENV_TOKEN_KEY, key, "must not be empty"));
            }
            config.token_key = key.to_string();
        }

        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|d| !d.trim().is_empty()) {
            config.data_dir = Some(PathBuf::from(dir));
        }

        let enforce = match lookup(ENV_ENFORCE_EXPIRY) {
            Some(raw) => parse_bool(ENV_ENFORCE_EXPIRY, &raw)?,
            None => false,
        };
        if enforce {
            let leeway_secs = match lookup(ENV_EXPIRY_LEEWAY) {
                Some(raw) => raw.trim().parse::<i64>().map_err(|e| {
                    ConfigError::invalid_value(ENV_EXPIRY_LEEWAY, raw.clone(), e.to_string())
                })?,
                None => 0,
            };
            config.expiry = ExpiryPolicy::Enforce { leeway_secs };
        }

        if let Some(raw) = lookup(ENV_LOG_FORMAT) {
            config.log_format = match raw.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" | "" => LogFormat::Text,
                _ => {
                    return Err(ConfigError::invalid_value(ENV_LOG_FORMAT, raw, "expected `json` or `text`"));
                }
            };
        }

        tracing::debug!(api_url = %config.api_url, token_key = %config.token_key, "client configuration loaded");
        Ok(config)
    }

    /// Override the backend base URL.
    pub fn with_api_url(mut self, url: impl Into<String>) -> ConfigResult<Self> {
        let url = url.into();
        let trimmed = url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ConfigError::InvalidApiUrl(url));
        }
        if trimmed.split("://").nth(1).is_none_or(str::is_empty) {
            return Err(ConfigError::InvalidApiUrl(url));
        }
        self.api_url = trimmed.to_string();
        Ok(self)
    }

    /// Directory the token file lives in.
    pub fn resolve_data_dir(&self) -> ConfigResult<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_dir()
                .map(|d| d.join("labtrack"))
                .ok_or(ConfigError::NoDataDir),
        }
    }
}

fn parse_bool(key: &'static str, raw: &str) -> ConfigResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::invalid_value(key, other, "expected a boolean")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_points_at_local_backend() {
        let config = ClientConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.api_url, "http://localhost:8080");
        assert_eq!(config.token_key, "token");
        assert_eq!(config.expiry, ExpiryPolicy::Ignore);
        assert_eq!(config.data_dir, None);
    }

    #[test]
    fn api_url_override_strips_trailing_slash() {
        let config =
            ClientConfig::from_lookup(lookup_from(&[(ENV_API_URL, "https://api.example.org/")])).unwrap();
        assert_eq!(config.api_url, "https://api.example.org");
    }

    #[test]
    fn non_http_api_url_is_rejected() {
        let err = ClientConfig::from_lookup(lookup_from(&[(ENV_API_URL, "ftp://x")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidApiUrl(_)));

        let err = ClientConfig::default().with_api_url("http://").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidApiUrl(_)));
    }

    #[test]
    fn expiry_enforcement_is_opt_in() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            (ENV_ENFORCE_EXPIRY, "true"),
            (ENV_EXPIRY_LEEWAY, "30"),
        ]))
        .unwrap();
        assert_eq!(config.expiry, ExpiryPolicy::Enforce { leeway_secs: 30 });

        let config = ClientConfig::from_lookup(lookup_from(&[(ENV_EXPIRY_LEEWAY, "30")])).unwrap();
        assert_eq!(config.expiry, ExpiryPolicy::Ignore);
    }

    #[test]
    fn malformed_values_are_reported_with_their_key() {
        let err = ClientConfig::from_lookup(lookup_from(&[(ENV_ENFORCE_EXPIRY, "maybe")])).unwrap_err();
        match err {
            ConfigError::InvalidValue { key, .. } => assert_eq!(key, ENV_ENFORCE_EXPIRY),
            other => panic!("unexpected error: {other:?}"),
        }

        let err = ClientConfig::from_lookup(lookup_from(&[(ENV_TOKEN_KEY, "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: ENV_TOKEN_KEY, .. }));
    }

    #[test]
    fn explicit_data_dir_wins_over_platform_default() {
        let config = ClientConfig::from_lookup(lookup_from(&[(ENV_DATA_DIR, "/tmp/labtrack-test")])).unwrap();
        assert_eq!(config.resolve_data_dir().unwrap(), PathBuf::from("/tmp/labtrack-test"));
    }

    #[test]
    fn log_format_parses_json() {
        let config = ClientConfig::from_lookup(lookup_from(&[(ENV_LOG_FORMAT, "JSON")])).unwrap();
        assert_eq!(config.log_format, LogFormat::Json);
    }
}
