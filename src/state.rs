//! # Key State
//!
//! Observable wrapper for consumers that render or react to key availability.
//!
//! A [`KeyLoader`] is bound to one service. [`KeyLoader::load`] moves its state
//! `Idle → Loading → Ready | Failed` and publishes every transition on a
//! `tokio::sync::watch` channel. Loading again after `Failed` is the retry
//! path; an expired value is never offered as a fallback.

use crate::cache::{CacheError, CachedKey, KeyCache};
use crate::fetch::KeyFetcher;
use crate::secret::SecretValue;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum KeyState {
    #[default]
    Idle,
    Loading,
    Ready(CachedKey),
    Failed(CacheError),
}

impl KeyState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Short label for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready(_) => "ready",
            Self::Failed(_) => "failed",
        }
    }
}

pub struct KeyLoader {
    cache: KeyCache,
    service_id: String,
    fetcher: Arc<dyn KeyFetcher>,
    state: watch::Sender<KeyState>,
}

impl KeyLoader {
    pub fn new(cache: KeyCache, service_id: impl Into<String>, fetcher: Arc<dyn KeyFetcher>) -> Self {
        let (state, _) = watch::channel(KeyState::Idle);
        Self {
            cache,
            service_id: service_id.into(),
            fetcher,
            state,
        }
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// Receiver observing every subsequent state transition
    pub fn subscribe(&self) -> watch::Receiver<KeyState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> KeyState {
        self.state.borrow().clone()
    }

    /// Resolve the key through the cache, publishing `Loading` then the outcome
    ///
    /// # Errors
    ///
    /// Returns the [`CacheError`] that was also published as `Failed`.
    pub async fn load(&self) -> Result<SecretValue, CacheError> {
        self.transition(KeyState::Loading);

        match self.cache.resolve_with(&self.service_id, &self.fetcher).await {
            Ok(key) => {
                let secret = key.secret.clone();
                self.transition(KeyState::Ready(key));
                Ok(secret)
            }
            Err(error) => {
                self.transition(KeyState::Failed(error.clone()));
                Err(error)
            }
        }
    }

    fn transition(&self, next: KeyState) {
        debug!(
            service.id = %self.service_id,
            state = next.as_str(),
            "Key state transition"
        );
        self.state.send_replace(next);
    }
}

impl std::fmt::Debug for KeyLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyLoader")
            .field("service_id", &self.service_id)
            .field("state", &self.state.borrow().as_str())
            .finish_non_exhaustive()
    }
}
