//! Common test utilities for integration and Pact tests
//!
//! Provides rustls crypto provider setup and helpers for building fetchers
//! against Pact mock servers.

#![allow(dead_code, reason = "not every test binary uses every helper")]

use secure_key_cache::{FetcherConfig, HttpKeyFetcher, SecretValue};
use std::sync::Once;
use std::time::Duration;

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// Uses a `Once` to ensure it's only called once per test binary.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        // Matches the provider installed by the binary at startup
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Mock server URL with the trailing slash stripped and `path` appended
pub fn endpoint_url(base: &str, path: &str) -> String {
    format!("{}{path}", base.trim_end_matches('/'))
}

/// HTTP fetcher pointed at `endpoint`, optionally sending `cookie`
pub fn http_fetcher(endpoint: String, cookie: Option<&str>) -> HttpKeyFetcher {
    let config = FetcherConfig {
        endpoint: Some(endpoint),
        cookie: cookie.map(SecretValue::from),
        request_timeout: Duration::from_secs(5),
    };
    HttpKeyFetcher::new(&config).expect("Failed to create HTTP key fetcher")
}
