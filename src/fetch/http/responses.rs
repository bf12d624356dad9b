//! # Response Types
//!
//! JSON payloads returned by the key endpoint.

use crate::fetch::{FetchError, FetchedKey};
use crate::secret::SecretValue;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Successful key response
///
/// `expiresIn` is in seconds. Upstreams may omit it, in which case the
/// cache's default TTL applies.
#[derive(Clone, Serialize, Deserialize)]
pub struct SecureKeyResponse {
    pub key: String,
    #[serde(rename = "expiresIn", default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

impl std::fmt::Debug for SecureKeyResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureKeyResponse")
            .field("key", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

impl SecureKeyResponse {
    /// Convert into a cacheable key, rejecting an empty key
    pub fn into_fetched_key(self) -> Result<FetchedKey, FetchError> {
        if self.key.is_empty() {
            return Err(FetchError::InvalidResponse(
                "response contained an empty key".to_string(),
            ));
        }
        Ok(FetchedKey {
            secret: SecretValue::from(self.key),
            ttl: self.expires_in.map(Duration::from_secs),
        })
    }
}

/// Error body returned by the key endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable reason, see [`FetchError::as_str`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
