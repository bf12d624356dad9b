//! # Cache Entry

use crate::secret::SecretValue;
use std::time::{Duration, Instant};

const MAX_REPRESENTABLE_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// A cached key and its absolute expiry
///
/// Keyed by service id in the store; the store exclusively owns entries and
/// callers only ever receive clones of the secret.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub secret: SecretValue,
    pub stored_at: Instant,
    pub expires_at: Instant,
}

impl CacheEntry {
    /// Entry written at `now` living for `ttl`
    ///
    /// `None` when the entry would already be stale: a zero TTL, or an expiry
    /// that cannot be represented. TTLs too large to represent are clamped to
    /// roughly a century first.
    pub fn new(secret: SecretValue, now: Instant, ttl: Duration) -> Option<Self> {
        if ttl.is_zero() {
            return None;
        }
        let expires_at = now
            .checked_add(ttl)
            .or_else(|| now.checked_add(MAX_REPRESENTABLE_TTL))?;
        Some(Self {
            secret,
            stored_at: now,
            expires_at,
        })
    }

    /// Fresh strictly before `expires_at`
    pub fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    /// Time left before expiry, zero once stale
    pub fn remaining(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }
}
