//! # Metrics
//!
//! Prometheus metrics for the key cache and its upstream fetches.
//!
//! ## Metrics Exposed
//!
//! - `secure_key_cache_lookups_total{result}` - Cache lookups by result (`hit`, `miss`, `expired`)
//! - `secure_key_cache_fetches_total` - Upstream fetches started
//! - `secure_key_cache_fetch_errors_total{reason}` - Failed fetches by error reason
//! - `secure_key_cache_fetch_duration_seconds` - Duration of upstream fetches
//! - `secure_key_cache_single_flight_joins_total` - Misses that joined a fetch already in flight
//! - `secure_key_cache_entries` - Entries currently stored (including stale ones not yet evicted)

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, IntGauge, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static LOOKUPS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "secure_key_cache_lookups_total",
            "Total number of cache lookups by result",
        ),
        &["result"],
    )
    .expect("Failed to create LOOKUPS_TOTAL metric - this should never happen")
});

static FETCHES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "secure_key_cache_fetches_total",
        "Total number of upstream key fetches",
    )
    .expect("Failed to create FETCHES_TOTAL metric - this should never happen")
});

static FETCH_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "secure_key_cache_fetch_errors_total",
            "Total number of failed key fetches by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create FETCH_ERRORS_TOTAL metric - this should never happen")
});

static FETCH_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "secure_key_cache_fetch_duration_seconds",
            "Duration of upstream key fetches in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
    )
    .expect("Failed to create FETCH_DURATION metric - this should never happen")
});

static SINGLE_FLIGHT_JOINS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "secure_key_cache_single_flight_joins_total",
        "Total number of cache misses served by a fetch already in flight",
    )
    .expect("Failed to create SINGLE_FLIGHT_JOINS_TOTAL metric - this should never happen")
});

static CACHE_ENTRIES: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "secure_key_cache_entries",
        "Current number of entries in the key cache",
    )
    .expect("Failed to create CACHE_ENTRIES metric - this should never happen")
});

/// Register all metrics with the shared registry
///
/// # Errors
///
/// Fails if a metric is already registered, i.e. when called twice.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(LOOKUPS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(FETCHES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(FETCH_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(FETCH_DURATION.clone()))?;
    REGISTRY.register(Box::new(SINGLE_FLIGHT_JOINS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CACHE_ENTRIES.clone()))?;

    Ok(())
}

pub fn gather() -> Vec<prometheus::proto::MetricFamily> {
    REGISTRY.gather()
}

pub fn record_lookup(result: &str) {
    LOOKUPS_TOTAL.with_label_values(&[result]).inc();
}

pub fn increment_fetches() {
    FETCHES_TOTAL.inc();
}

pub fn increment_fetch_errors(reason: &str) {
    FETCH_ERRORS_TOTAL.with_label_values(&[reason]).inc();
}

pub fn observe_fetch_duration(duration: f64) {
    FETCH_DURATION.observe(duration);
}

pub fn increment_single_flight_joins() {
    SINGLE_FLIGHT_JOINS_TOTAL.inc();
}

pub fn set_cache_entries(count: usize) {
    CACHE_ENTRIES.set(i64::try_from(count).unwrap_or(i64::MAX));
}
