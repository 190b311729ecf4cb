//! Prometheus metrics
//!
//! Upstream traffic, cache effectiveness and sync health, exposed in the
//! Prometheus text format.

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

lazy_static! {
    /// Counter: upstream requests by collection and outcome
    pub static ref UPSTREAM_REQUESTS: CounterVec = register_counter_vec!(
        "holonet_upstream_requests_total",
        "Upstream HTTP requests by collection and outcome",
        &["collection", "outcome"]
    )
    .expect("Failed to create upstream_requests metric");

    /// Histogram: upstream request latency (seconds)
    pub static ref UPSTREAM_LATENCY: HistogramVec = register_histogram_vec!(
        "holonet_upstream_request_duration_seconds",
        "Latency of upstream HTTP requests",
        &["collection"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("Failed to create upstream_latency metric");

    /// Counter: cache operations (hit/miss/store/error)
    pub static ref CACHE_OPERATIONS: CounterVec = register_counter_vec!(
        "holonet_cache_operations_total",
        "Cache operations by type",
        &["operation"]
    )
    .expect("Failed to create cache_operations metric");

    /// Histogram: sync duration per collection (seconds)
    pub static ref SYNC_DURATION: HistogramVec = register_histogram_vec!(
        "holonet_sync_duration_seconds",
        "Duration of collection sync operations",
        &["collection"],
        vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("Failed to create sync_duration metric");

    /// Counter: sync outcomes by collection and status
    pub static ref SYNC_OUTCOMES: CounterVec = register_counter_vec!(
        "holonet_sync_outcomes_total",
        "Collection sync outcomes by status",
        &["collection", "status"]
    )
    .expect("Failed to create sync_outcomes metric");
}

/// Record an upstream request
pub fn record_upstream_request(collection: &str, outcome: &str, duration_secs: f64) {
    UPSTREAM_REQUESTS
        .with_label_values(&[collection, outcome])
        .inc();
    UPSTREAM_LATENCY
        .with_label_values(&[collection])
        .observe(duration_secs);
}

/// Record cache hit
pub fn record_cache_hit() {
    CACHE_OPERATIONS.with_label_values(&["hit"]).inc();
}

/// Record cache miss
pub fn record_cache_miss() {
    CACHE_OPERATIONS.with_label_values(&["miss"]).inc();
}

/// Record a successful cache write
pub fn record_cache_store() {
    CACHE_OPERATIONS.with_label_values(&["store"]).inc();
}

/// Record a cache store failure
pub fn record_cache_error() {
    CACHE_OPERATIONS.with_label_values(&["error"]).inc();
}

/// Record a collection sync
pub fn record_sync(collection: &str, success: bool, duration_secs: f64) {
    let status = if success { "success" } else { "failure" };
    SYNC_OUTCOMES
        .with_label_values(&[collection, status])
        .inc();
    SYNC_DURATION
        .with_label_values(&[collection])
        .observe(duration_secs);
}

/// Encode all metrics as Prometheus text format
pub fn encode_metrics() -> crate::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| crate::HolonetError::Other(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| crate::HolonetError::Other(format!("Metrics are not UTF-8: {}", e)))
}
