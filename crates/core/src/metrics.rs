//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Discovery (upstream calls, strategy mode switches)
//! - Pipeline (pack outcomes, sticker transcodes, uploads)
//! - State (duplicate index size, cursor persistence, cycles)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

use crate::upstream::Endpoint;

// =============================================================================
// Discovery Metrics
// =============================================================================

/// Upstream API calls by endpoint and status.
pub static UPSTREAM_CALLS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "packharvest_upstream_calls_total",
            "Total upstream API calls",
        ),
        &["endpoint", "status"], // status: "success", "error"
    )
    .unwrap()
});

/// Strategy mode switches by target mode.
pub static MODE_SWITCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "packharvest_mode_switches_total",
            "Total discovery strategy mode switches",
        ),
        &["mode"], // "discovery", "efficiency"
    )
    .unwrap()
});

/// Currently active strategy mode (0 = discovery, 1 = efficiency).
pub static EFFICIENCY_MODE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "packharvest_efficiency_mode",
        "Whether the discovery strategy is in efficiency mode",
    )
    .unwrap()
});

// =============================================================================
// Pipeline Metrics
// =============================================================================

/// Packs by final outcome.
pub static PACK_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("packharvest_packs_total", "Total packs by outcome"),
        &["outcome"], // "committed", "duplicate", "rejected", "too_few_assets", "failed"
    )
    .unwrap()
});

/// Sticker transcodes by result.
pub static STICKER_TRANSCODES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "packharvest_sticker_transcodes_total",
            "Total sticker transcodes",
        ),
        &["result"], // "success", "corrupt", "codec", "over_budget", "download"
    )
    .unwrap()
});

/// Transcoded sticker sizes in bytes.
pub static STICKER_BYTES: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "packharvest_sticker_bytes",
            "Size of transcoded sticker assets",
        )
        .buckets(vec![
            5_000.0, 10_000.0, 25_000.0, 50_000.0, 100_000.0, 250_000.0, 500_000.0,
        ]),
        &["kind"], // "static", "animated"
    )
    .unwrap()
});

/// Assets written to the store.
pub static ASSETS_UPLOADED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "packharvest_assets_uploaded_total",
        "Total assets written to the store",
    )
    .unwrap()
});

/// Assets skipped because they were already present.
pub static ASSETS_SKIPPED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "packharvest_assets_skipped_total",
        "Total assets skipped because they already existed",
    )
    .unwrap()
});

// =============================================================================
// State Metrics
// =============================================================================

/// Identifiers in the duplicate index.
pub static DEDUP_INDEX_SIZE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "packharvest_dedup_index_size",
        "Number of committed identifiers in the duplicate index",
    )
    .unwrap()
});

/// Failed cursor writes.
pub static CURSOR_PERSIST_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "packharvest_cursor_persist_failures_total",
        "Total cursor persistence failures",
    )
    .unwrap()
});

/// Completed locale x keyword cycles.
pub static CYCLES_COMPLETED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "packharvest_cycles_completed_total",
        "Total completed iteration cycles",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

pub fn record_upstream_call(endpoint: Endpoint, success: bool) {
    let status = if success { "success" } else { "error" };
    UPSTREAM_CALLS
        .with_label_values(&[endpoint.as_str(), status])
        .inc();
}

pub fn record_mode_switch(efficiency: bool) {
    let mode = if efficiency { "efficiency" } else { "discovery" };
    MODE_SWITCHES.with_label_values(&[mode]).inc();
    EFFICIENCY_MODE.set(i64::from(efficiency));
}

pub fn record_pack_outcome(outcome: &str) {
    PACK_OUTCOMES.with_label_values(&[outcome]).inc();
}

pub fn record_sticker(result: &str) {
    STICKER_TRANSCODES.with_label_values(&[result]).inc();
}

pub fn observe_sticker_bytes(animated: bool, size: usize) {
    let kind = if animated { "animated" } else { "static" };
    STICKER_BYTES
        .with_label_values(&[kind])
        .observe(size as f64);
}

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Discovery
        Box::new(UPSTREAM_CALLS.clone()),
        Box::new(MODE_SWITCHES.clone()),
        Box::new(EFFICIENCY_MODE.clone()),
        // Pipeline
        Box::new(PACK_OUTCOMES.clone()),
        Box::new(STICKER_TRANSCODES.clone()),
        Box::new(STICKER_BYTES.clone()),
        Box::new(ASSETS_UPLOADED.clone()),
        Box::new(ASSETS_SKIPPED.clone()),
        // State
        Box::new(DEDUP_INDEX_SIZE.clone()),
        Box::new(CURSOR_PERSIST_FAILURES.clone()),
        Box::new(CYCLES_COMPLETED.clone()),
    ]
}
