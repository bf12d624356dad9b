//! # Secure Key Cache
//!
//! In-process cache for short-lived API keys.
//!
//! ## Overview
//!
//! Front-end consumers need third-party keys (maps, payments, analytics) that
//! must not ship in bundles. This crate keeps them in memory keyed by service
//! id, each with a time-to-live, and refreshes them on demand from an
//! authenticated upstream:
//!
//! 1. **Cache** - [`KeyCache`] with lazy expiry on read and single-flight refresh-on-miss
//! 2. **Fetch** - pluggable [`KeyFetcher`]; [`HttpKeyFetcher`] talks to a JSON key endpoint
//! 3. **State** - [`KeyLoader`] publishes `Idle → Loading → Ready | Failed` transitions
//! 4. **Server** - caching key proxy with Prometheus metrics and health checks
//!
//! ## Example
//!
//! ```no_run
//! use secure_key_cache::{CacheConfig, FetchedKey, KeyCache};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), secure_key_cache::CacheError> {
//! let cache = KeyCache::new(CacheConfig::default());
//! let key = cache
//!     .get_or_fetch("maps", |_service_id| async {
//!         Ok(FetchedKey::new("AIza...", Some(Duration::from_secs(500))))
//!     })
//!     .await?;
//! assert_eq!(key.expose_secret(), "AIza...");
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod constants;
pub mod fetch;
pub mod observability;
pub mod runtime;
pub mod secret;
pub mod server;
pub mod state;

pub use cache::{CacheError, CachedKey, Clock, KeyCache, ManualClock, SystemClock};
pub use config::{load_config, CacheConfig, Config, FetcherConfig, ServerConfig};
pub use fetch::http::HttpKeyFetcher;
pub use fetch::{FetchError, FetchedKey, KeyFetcher};
pub use secret::SecretValue;
pub use state::{KeyLoader, KeyState};
