//! # Fetcher Configuration
//!
//! Settings for the upstream HTTPS key endpoint.

use super::{env_var_opt, env_var_or_default, ConfigError};
use crate::constants::DEFAULT_FETCH_TIMEOUT_SECS;
use crate::secret::SecretValue;
use std::time::Duration;

/// Upstream key endpoint configuration
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Full URL of the upstream key endpoint; `None` when not configured
    pub endpoint: Option<String>,
    /// Credential cookie forwarded upstream (e.g. a session cookie)
    pub cookie: Option<SecretValue>,
    /// Per-request timeout enforced by the HTTP client
    pub request_timeout: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            cookie: None,
            request_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

impl FetcherConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            endpoint: env_var_opt("KEY_FETCH_ENDPOINT"),
            cookie: env_var_opt("KEY_FETCH_COOKIE").map(SecretValue::from),
            request_timeout: Duration::from_secs(env_var_or_default(
                "KEY_FETCH_TIMEOUT_SECS",
                DEFAULT_FETCH_TIMEOUT_SECS,
            )),
        }
    }

    /// The configured endpoint, or an error naming the variable to set
    pub fn require_endpoint(&self) -> Result<&str, ConfigError> {
        self.endpoint
            .as_deref()
            .ok_or(ConfigError::Missing("KEY_FETCH_ENDPOINT"))
    }
}
