//! # Fetch Error Types
//!
//! Classified upstream failures. Every variant surfaces to the caller as a
//! fetch failure; the classification only drives metrics labels, HTTP status
//! mapping and retry hints.

use std::time::Duration;
use thiserror::Error;

/// Failure of a single fetch attempt
///
/// `Clone` so one in-flight fetch can hand the same outcome to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Connection, TLS or IO failure before a response arrived
    #[error("transport error: {0}")]
    Transport(String),
    /// Upstream refused the credentials (401/403)
    #[error("upstream rejected credentials (HTTP {status})")]
    Unauthorized { status: u16 },
    /// Any other non-success status
    #[error("upstream returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    /// No result within the allowed time
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),
    /// Response arrived but could not be used
    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),
    /// The fetch was abandoned before completing
    #[error("fetch was cancelled")]
    Cancelled,
}

impl FetchError {
    /// Whether retrying later may succeed without configuration changes
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport(_) | FetchError::Timeout(_) | FetchError::Cancelled => true,
            FetchError::Status { status, .. } => *status >= 500 || *status == 429,
            FetchError::Unauthorized { .. } | FetchError::InvalidResponse(_) => false,
        }
    }

    /// Stable reason string for metrics labels and error bodies
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchError::Transport(_) => "transport",
            FetchError::Unauthorized { .. } => "unauthorized",
            FetchError::Status { .. } => "status",
            FetchError::Timeout(_) => "timeout",
            FetchError::InvalidResponse(_) => "invalid_response",
            FetchError::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(FetchError::Transport("connection refused".into()).is_transient());
        assert!(FetchError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(FetchError::Cancelled.is_transient());
        assert!(FetchError::Status {
            status: 503,
            message: "unavailable".into()
        }
        .is_transient());
        assert!(FetchError::Status {
            status: 429,
            message: "slow down".into()
        }
        .is_transient());
    }

    #[test]
    fn test_permanent_classification() {
        assert!(!FetchError::Unauthorized { status: 401 }.is_transient());
        assert!(!FetchError::InvalidResponse("missing key".into()).is_transient());
        assert!(!FetchError::Status {
            status: 404,
            message: "unknown service".into()
        }
        .is_transient());
    }

    #[test]
    fn test_reason_labels() {
        assert_eq!(FetchError::Unauthorized { status: 403 }.as_str(), "unauthorized");
        assert_eq!(FetchError::Timeout(Duration::ZERO).as_str(), "timeout");
        assert_eq!(
            FetchError::InvalidResponse(String::new()).as_str(),
            "invalid_response"
        );
    }

    #[test]
    fn test_display_messages() {
        let err = FetchError::Status {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "upstream returned HTTP 500: boom");
        assert_eq!(
            FetchError::Unauthorized { status: 401 }.to_string(),
            "upstream rejected credentials (HTTP 401)"
        );
    }
}
