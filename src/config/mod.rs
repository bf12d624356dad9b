//! # Configuration
//!
//! Runtime configuration loaded from environment variables.
//!
//! All numeric settings have sensible defaults (see [`crate::constants`]) and can be
//! overridden via environment variables. A local `.env` file is honoured when present.
//! The only required setting is the upstream key endpoint, and only for code paths
//! that actually fetch.

mod cache;
mod fetcher;
mod server;

pub use cache::CacheConfig;
pub use fetcher::FetcherConfig;
pub use server::ServerConfig;

use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set (or is empty)
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),
}

/// Full runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub cache: CacheConfig,
    pub server: ServerConfig,
    pub fetcher: FetcherConfig,
}

/// Load configuration from environment variables with defaults
///
/// Loads `.env` first if one exists; variables already present in the
/// process environment take precedence over the file.
pub fn load_config() -> Config {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!("Loaded environment overrides from {}", path.display());
    }

    Config {
        cache: CacheConfig::from_env(),
        server: ServerConfig::from_env(),
        fetcher: FetcherConfig::from_env(),
    }
}

/// Read environment variable or return default value
///
/// Unparseable values fall back to the default rather than failing startup.
pub(crate) fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Read an optional, non-empty environment variable
pub(crate) fn env_var_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
