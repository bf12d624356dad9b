//! # Cache Configuration

use super::env_var_or_default;
use crate::constants::{DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_KEY_TTL_SECS};
use std::time::Duration;

/// Key cache configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// TTL applied when `put` is called without one and the upstream
    /// response carries no `expiresIn`
    pub default_ttl: Duration,
    /// Upper bound on a single fetch; expiry is reported as a fetch failure
    pub fetch_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(DEFAULT_KEY_TTL_SECS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

impl CacheConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            default_ttl: Duration::from_secs(env_var_or_default(
                "KEY_CACHE_DEFAULT_TTL_SECS",
                DEFAULT_KEY_TTL_SECS,
            )),
            fetch_timeout: Duration::from_secs(env_var_or_default(
                "KEY_CACHE_FETCH_TIMEOUT_SECS",
                DEFAULT_FETCH_TIMEOUT_SECS,
            )),
        }
    }

    #[must_use]
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}
