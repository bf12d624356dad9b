//! # Key Cache
//!
//! In-process store of short-lived secrets keyed by service id.
//!
//! ## Semantics
//!
//! - [`KeyCache::put`] overwrites unconditionally; the entry expires `ttl`
//!   after the write (default TTL from [`CacheConfig`] when `None`).
//! - [`KeyCache::get`] returns the secret only while `now < expires_at`. A stale
//!   entry is evicted by the read that finds it; there is no background sweep.
//! - [`KeyCache::get_or_fetch`] serves hits from the store and, on a miss,
//!   awaits the supplied fetch operation, caches its result and returns it.
//!   A failed fetch writes nothing and is not retried.
//!
//! ## Concurrency
//!
//! `get` and `put` never suspend; the store is guarded by a mutex held only for
//! the synchronous read-evict-write sequence. Misses are single-flight:
//! concurrent `get_or_fetch` calls for the same service share one in-flight
//! fetch and all observe its outcome. The fetch runs on a spawned Tokio task,
//! so a caller that stops waiting does not stall it. Lock order is always
//! `in_flight` then `entries`.

mod clock;
mod entry;
mod error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use error::CacheError;

use crate::config::CacheConfig;
use crate::fetch::{FetchError, FetchedKey, KeyFetcher};
use crate::observability::metrics;
use crate::secret::SecretValue;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, warn, Instrument};

/// A key as handed to callers, with the time it remains valid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedKey {
    pub secret: SecretValue,
    pub expires_in: Duration,
}

type Flight = Shared<BoxFuture<'static, Result<CachedKey, FetchError>>>;

/// Shared, cloneable handle to one key store
///
/// Clones share state. Construct one per process (or per test) and inject it
/// where keys are needed.
#[derive(Clone)]
pub struct KeyCache {
    inner: Arc<Inner>,
}

struct Inner {
    entries: Mutex<HashMap<String, CacheEntry>>,
    in_flight: Mutex<HashMap<String, Flight>>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
}

impl std::fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCache")
            .field("entries", &self.len())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl Default for KeyCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

/// Lock ignoring poisoning; every critical section leaves the maps consistent
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl KeyCache {
    /// Cache backed by the system clock
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Cache backed by an explicit clock (tests use [`ManualClock`])
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                in_flight: Mutex::new(HashMap::new()),
                clock,
                config,
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Store `secret` for `service_id`, replacing any existing entry
    ///
    /// `ttl` defaults to the configured TTL. A zero TTL would produce an entry
    /// that is already stale, so it removes the existing entry instead.
    pub fn put(&self, service_id: &str, secret: impl Into<SecretValue>, ttl: Option<Duration>) {
        self.inner.store(service_id, secret.into(), ttl);
    }

    /// Cached secret for `service_id` if still fresh
    ///
    /// Never fetches. A stale entry is evicted and reported as `None`.
    pub fn get(&self, service_id: &str) -> Option<SecretValue> {
        self.lookup(service_id).map(|key| key.secret)
    }

    /// Like [`get`](Self::get) but also reports the remaining lifetime
    pub fn lookup(&self, service_id: &str) -> Option<CachedKey> {
        let now = self.inner.clock.now();
        let mut entries = lock(&self.inner.entries);

        if let Some(entry) = entries.get(service_id) {
            if entry.is_fresh(now) {
                metrics::record_lookup("hit");
                return Some(CachedKey {
                    secret: entry.secret.clone(),
                    expires_in: entry.remaining(now),
                });
            }
        } else {
            metrics::record_lookup("miss");
            return None;
        }

        entries.remove(service_id);
        metrics::record_lookup("expired");
        metrics::set_cache_entries(entries.len());
        debug!(service.id = service_id, "Evicted expired key");
        None
    }

    /// Cached secret, or the result of `fetch` on a miss
    ///
    /// `fetch` receives the service id and is invoked at most once per call,
    /// and not at all on a hit or when joining a fetch already in flight for
    /// the same service. On success the value is cached with the returned TTL.
    /// Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// [`CacheError::FetchFailed`] when the fetch fails or exceeds the
    /// configured fetch timeout. The cache is left unchanged.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        service_id: &str,
        fetch: F,
    ) -> Result<SecretValue, CacheError>
    where
        F: FnOnce(String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<FetchedKey, FetchError>> + Send + 'static,
    {
        self.resolve(service_id, fetch).await.map(|key| key.secret)
    }

    /// [`get_or_fetch`](Self::get_or_fetch) using a [`KeyFetcher`]
    ///
    /// # Errors
    ///
    /// See [`get_or_fetch`](Self::get_or_fetch).
    pub async fn get_or_fetch_with(
        &self,
        service_id: &str,
        fetcher: &Arc<dyn KeyFetcher>,
    ) -> Result<SecretValue, CacheError> {
        self.resolve_with(service_id, fetcher)
            .await
            .map(|key| key.secret)
    }

    /// [`get_or_fetch`](Self::get_or_fetch) that also reports the remaining lifetime
    ///
    /// # Errors
    ///
    /// See [`get_or_fetch`](Self::get_or_fetch).
    pub async fn resolve<F, Fut>(&self, service_id: &str, fetch: F) -> Result<CachedKey, CacheError>
    where
        F: FnOnce(String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<FetchedKey, FetchError>> + Send + 'static,
    {
        let flight = {
            let mut in_flight = lock(&self.inner.in_flight);

            // Checked under the in_flight lock so a flight that has just stored
            // its result is seen as a hit rather than triggering a second fetch
            if let Some(hit) = self.lookup(service_id) {
                return Ok(hit);
            }

            if let Some(existing) = in_flight.get(service_id) {
                metrics::increment_single_flight_joins();
                debug!(service.id = service_id, "Joining in-flight key fetch");
                existing.clone()
            } else {
                let flight = Inner::start_flight(
                    Arc::clone(&self.inner),
                    service_id.to_string(),
                    fetch,
                );
                in_flight.insert(service_id.to_string(), flight.clone());
                flight
            }
        };

        flight.await.map_err(|source| CacheError::FetchFailed {
            service_id: service_id.to_string(),
            source,
        })
    }

    /// [`resolve`](Self::resolve) using a [`KeyFetcher`]
    ///
    /// # Errors
    ///
    /// See [`get_or_fetch`](Self::get_or_fetch).
    pub async fn resolve_with(
        &self,
        service_id: &str,
        fetcher: &Arc<dyn KeyFetcher>,
    ) -> Result<CachedKey, CacheError> {
        let fetcher = Arc::clone(fetcher);
        self.resolve(service_id, move |id| async move { fetcher.fetch(&id).await })
            .await
    }

    /// Drop the entry for `service_id`; returns whether one existed
    pub fn invalidate(&self, service_id: &str) -> bool {
        let mut entries = lock(&self.inner.entries);
        let removed = entries.remove(service_id).is_some();
        metrics::set_cache_entries(entries.len());
        if removed {
            info!(service.id = service_id, "Invalidated cached key");
        }
        removed
    }

    pub fn clear(&self) {
        let mut entries = lock(&self.inner.entries);
        entries.clear();
        metrics::set_cache_entries(0);
        info!("Key cache cleared");
    }

    /// Number of stored entries, including stale ones not yet evicted
    pub fn len(&self) -> usize {
        lock(&self.inner.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Inner {
    fn store(&self, service_id: &str, secret: SecretValue, ttl: Option<Duration>) -> CachedKey {
        let ttl = ttl.unwrap_or(self.config.default_ttl);
        let mut entries = lock(&self.entries);

        match CacheEntry::new(secret.clone(), self.clock.now(), ttl) {
            Some(entry) => {
                entries.insert(service_id.to_string(), entry);
            }
            None => {
                entries.remove(service_id);
                debug!(service.id = service_id, "Zero TTL, key not cached");
            }
        }
        metrics::set_cache_entries(entries.len());

        CachedKey {
            secret,
            expires_in: ttl,
        }
    }

    /// Spawn the fetch for `service_id` and return a handle every waiter can share
    ///
    /// The fetch runs on its own task, so it completes (or times out), stores
    /// its result and deregisters itself even when every waiter has gone away.
    fn start_flight<F, Fut>(inner: Arc<Inner>, service_id: String, fetch: F) -> Flight
    where
        F: FnOnce(String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<FetchedKey, FetchError>> + Send + 'static,
    {
        let timeout = inner.config.fetch_timeout;
        let span = info_span!("key.fetch", service.id = %service_id);

        let task = tokio::spawn(
            async move {
                let _registration = FlightRegistration {
                    inner: Arc::clone(&inner),
                    service_id: service_id.clone(),
                };
                metrics::increment_fetches();
                let started = Instant::now();

                let outcome = match tokio::time::timeout(timeout, fetch(service_id.clone())).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout(timeout)),
                };
                metrics::observe_fetch_duration(started.elapsed().as_secs_f64());

                match outcome {
                    Ok(fetched) => {
                        let key = inner.store(&service_id, fetched.secret, fetched.ttl);
                        info!(
                            expires_in_secs = key.expires_in.as_secs(),
                            "Fetched key for service {}", service_id
                        );
                        Ok(key)
                    }
                    Err(error) => {
                        metrics::increment_fetch_errors(error.as_str());
                        warn!(
                            reason = error.as_str(),
                            transient = error.is_transient(),
                            "Failed to fetch key for service {}: {}",
                            service_id,
                            error
                        );
                        Err(error)
                    }
                }
            }
            .instrument(span),
        );

        async move {
            task.await.unwrap_or_else(|e| {
                warn!("Key fetch task did not complete: {}", e);
                metrics::increment_fetch_errors(FetchError::Cancelled.as_str());
                Err(FetchError::Cancelled)
            })
        }
        .boxed()
        .shared()
    }
}

/// Removes the flight from `in_flight` when its task ends, including by panic
///
/// Dropped after the result is stored, so a caller that finds no flight
/// registered also finds the stored key.
struct FlightRegistration {
    inner: Arc<Inner>,
    service_id: String,
}

impl Drop for FlightRegistration {
    fn drop(&mut self) {
        lock(&self.inner.in_flight).remove(&self.service_id);
    }
}
