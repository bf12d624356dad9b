//! # Key Fetching
//!
//! The contract between the cache and whatever produces fresh keys.
//!
//! The cache does not know about transports, authentication or serialization.
//! It only needs something that, given a service id, eventually yields a
//! [`FetchedKey`] or a [`FetchError`]. [`http::HttpKeyFetcher`] is the reference
//! implementation talking to a JSON key endpoint.

mod error;
pub mod http;

pub use error::FetchError;

use crate::secret::SecretValue;
use async_trait::async_trait;
use std::time::Duration;

/// A freshly fetched key and the lifetime the upstream granted it
#[derive(Debug, Clone)]
pub struct FetchedKey {
    pub secret: SecretValue,
    /// `None` means the cache's configured default TTL applies
    pub ttl: Option<Duration>,
}

impl FetchedKey {
    pub fn new(secret: impl Into<SecretValue>, ttl: Option<Duration>) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }
}

/// Source of fresh keys
#[async_trait]
pub trait KeyFetcher: Send + Sync {
    /// Fetch the current key for `service_id`
    ///
    /// Called by the cache only on a miss. Implementations should not retry
    /// internally; the caller decides whether to retry.
    async fn fetch(&self, service_id: &str) -> Result<FetchedKey, FetchError>;
}
