//! # Cache Error Types

use crate::fetch::FetchError;
use thiserror::Error;

/// Errors surfaced by [`super::KeyCache::get_or_fetch`]
///
/// A lookup miss is not an error; `get` reports it as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The fetch operation failed, timed out or was cancelled. Nothing was cached.
    #[error("failed to fetch key for service '{service_id}': {source}")]
    FetchFailed {
        service_id: String,
        #[source]
        source: FetchError,
    },
}

impl CacheError {
    /// The underlying fetch failure
    pub fn fetch_error(&self) -> &FetchError {
        match self {
            CacheError::FetchFailed { source, .. } => source,
        }
    }

    pub fn service_id(&self) -> &str {
        match self {
            CacheError::FetchFailed { service_id, .. } => service_id,
        }
    }
}
