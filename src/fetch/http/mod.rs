//! # HTTP Key Fetcher
//!
//! Reference [`KeyFetcher`] for a JSON key endpoint:
//!
//! ```text
//! POST {endpoint}
//! content-type: application/json
//! cookie: <configured credential>
//!
//! {"service": "maps"}
//!
//! 200 OK
//! {"key": "AIza...", "expiresIn": 3600}
//! ```
//!
//! Uses reqwest with rustls (no OpenSSL dependencies). Works directly against
//! Pact mock servers, which is how the contract is tested.

mod requests;
mod responses;

pub use requests::SecureKeyRequest;
pub use responses::{ErrorResponse, SecureKeyResponse};

use crate::config::FetcherConfig;
use crate::constants::REQUEST_ID_HEADER;
use crate::fetch::{FetchError, FetchedKey, KeyFetcher};
use crate::secret::SecretValue;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

/// Upstream error bodies are truncated to this many characters
const MAX_ERROR_BODY_CHARS: usize = 256;

/// Fetches keys from an HTTPS JSON endpoint
pub struct HttpKeyFetcher {
    http_client: Client,
    endpoint: String,
    cookie: Option<SecretValue>,
    request_timeout: Duration,
}

impl std::fmt::Debug for HttpKeyFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpKeyFetcher")
            .field("endpoint", &self.endpoint)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl HttpKeyFetcher {
    /// Create a fetcher from configuration
    ///
    /// # Errors
    ///
    /// Fails when no endpoint is configured or the HTTP client cannot be built.
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let endpoint = config.require_endpoint()?.to_string();
        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            endpoint,
            cookie: config.cookie.clone(),
            request_timeout: config.request_timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn classify_send_error(&self, error: &reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout(self.request_timeout)
        } else {
            FetchError::Transport(error.to_string())
        }
    }
}

#[async_trait]
impl KeyFetcher for HttpKeyFetcher {
    async fn fetch(&self, service_id: &str) -> Result<FetchedKey, FetchError> {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "key.fetch.http",
            service.id = service_id,
            request.id = %request_id
        );

        async move {
            let mut request = self
                .http_client
                .post(&self.endpoint)
                .header(REQUEST_ID_HEADER, request_id.to_string())
                .json(&SecureKeyRequest::new(service_id));
            if let Some(cookie) = &self.cookie {
                request = request.header(header::COOKIE, cookie.expose_secret());
            }

            let response = request
                .send()
                .await
                .map_err(|e| self.classify_send_error(&e))?;

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                warn!("Key endpoint rejected credentials for service {}", service_id);
                return Err(FetchError::Unauthorized {
                    status: status.as_u16(),
                });
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
                warn!(
                    "Key endpoint returned HTTP {} for service {}",
                    status.as_u16(),
                    service_id
                );
                return Err(FetchError::Status {
                    status: status.as_u16(),
                    message,
                });
            }

            let body: SecureKeyResponse = response.json().await.map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(self.request_timeout)
                } else {
                    FetchError::InvalidResponse(e.to_string())
                }
            })?;
            debug!(
                expires_in = ?body.expires_in,
                "Received key for service {}", service_id
            );
            body.into_fetched_key()
        }
        .instrument(span)
        .await
    }
}
