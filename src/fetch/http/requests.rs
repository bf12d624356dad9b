//! # Request Types
//!
//! JSON payloads sent to the key endpoint.

use serde::{Deserialize, Serialize};

/// Request body for `POST /api/secure-key`
///
/// Same shape on both sides: the HTTP fetcher sends it upstream and the
/// server accepts it from consumers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecureKeyRequest {
    /// Identifier of the external service whose key is requested
    pub service: String,
}

impl SecureKeyRequest {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}
