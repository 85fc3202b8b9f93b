//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring a packharvest process:
//! - HTTP request metrics (latency, counts)
//! - Harvest progress gauges (collected from the latest status snapshot)
//! - Core pipeline metrics (upstream calls, pack outcomes, transcodes)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, Gauge, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

use crate::state::AppState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "packharvest_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("packharvest_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "packharvest_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Harvest Progress
// =============================================================================

/// Percentage of the current locale x keyword cycle walked.
pub static CYCLE_PROGRESS: Lazy<Gauge> = Lazy::new(|| {
    Gauge::new(
        "packharvest_cycle_progress_percent",
        "Share of the current discovery cycle already walked",
    )
    .unwrap()
});

/// Packs committed since the process started.
pub static SESSION_PACKS_COMMITTED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "packharvest_session_packs_committed",
        "Packs committed during this session",
    )
    .unwrap()
});

/// Register all metrics with the registry.
fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Progress
    registry.register(Box::new(CYCLE_PROGRESS.clone())).unwrap();
    registry
        .register(Box::new(SESSION_PACKS_COMMITTED.clone()))
        .unwrap();

    // Core metrics (discovery, pipeline, state)
    for metric in packharvest_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Refresh the progress gauges from the latest status snapshot.
pub fn collect_dynamic_metrics(state: &AppState) {
    let status = state.status();
    CYCLE_PROGRESS.set(status.cycle_progress);
    SESSION_PACKS_COMMITTED.set(status.stats.processed as i64);
}
