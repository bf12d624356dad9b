//! # Constants
//!
//! Shared defaults used throughout the key cache.
//!
//! These values represent reasonable defaults and can be overridden via
//! environment variables where applicable (see [`crate::config`]).

use std::net::{IpAddr, Ipv4Addr};

/// Default time-to-live for a cached key when neither the caller nor the
/// upstream supplies one (seconds)
pub const DEFAULT_KEY_TTL_SECS: u64 = 3600;

/// Default upper bound on a single upstream fetch (seconds)
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Default interface for the HTTP server: loopback only
pub const DEFAULT_SERVER_BIND_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Default HTTP server port for the key endpoint, metrics and health checks
pub const DEFAULT_SERVER_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Route serving keys to front-end consumers
pub const SECURE_KEY_ROUTE: &str = "/api/secure-key";

/// Header carrying the per-request correlation id sent upstream
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Default log filter when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "secure_key_cache=info,tower_http=info";
