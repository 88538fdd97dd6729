//! Prometheus metrics for the engine.
//!
//! Covers the search cycles, indexer traffic, match outcomes and
//! injections. The server crate registers and exposes these.

use once_cell::sync::Lazy;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry,
};

/// Search cycles started, by task.
pub static CYCLES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("reseed_cycles_total", "Search cycles started"),
        &["task"], // "search", "rss"
    )
    .unwrap()
});

/// Per-searchee search invocations (counted against the budget).
pub static SEARCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("reseed_searches_total", "Per-searchee search invocations"),
        &["task"],
    )
    .unwrap()
});

/// Candidates returned per indexer request.
pub static CANDIDATES_RETURNED: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "reseed_candidates_returned",
            "Candidates returned per indexer request",
        )
        .buckets(vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0]),
    )
    .unwrap()
});

/// Failed indexer requests by indexer.
pub static INDEXER_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("reseed_indexer_errors_total", "Failed indexer requests"),
        &["indexer"],
    )
    .unwrap()
});

/// Positive matches by confidence classification.
pub static MATCHES_FOUND: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("reseed_matches_found_total", "Positive matches"),
        &["confidence"], // "exact", "size_only"
    )
    .unwrap()
});

/// Injection attempts by outcome.
pub static INJECTIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("reseed_injections_total", "Injection attempts"),
        &["outcome"], // "injected", "saved", "failed"
    )
    .unwrap()
});

/// Wall-clock duration of one full cycle, by task.
pub static CYCLE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "reseed_cycle_duration_seconds",
            "Duration of one search cycle",
        )
        .buckets(vec![1.0, 5.0, 15.0, 60.0, 300.0, 900.0, 3600.0, 14400.0]),
        &["task"],
    )
    .unwrap()
});

/// Register every core metric with the given registry.
pub fn register_core_metrics(registry: &Registry) {
    let _ = registry.register(Box::new(CYCLES_TOTAL.clone()));
    let _ = registry.register(Box::new(SEARCHES_TOTAL.clone()));
    let _ = registry.register(Box::new(CANDIDATES_RETURNED.clone()));
    let _ = registry.register(Box::new(INDEXER_ERRORS.clone()));
    let _ = registry.register(Box::new(MATCHES_FOUND.clone()));
    let _ = registry.register(Box::new(INJECTIONS_TOTAL.clone()));
    let _ = registry.register(Box::new(CYCLE_DURATION.clone()));
}
