//! HTTP-level metrics for the API server.

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry};

/// HTTP requests total by method, path and status.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("reseed_http_requests_total", "HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("reseed_http_request_duration_seconds", "Request duration")
            .buckets(vec![0.005, 0.025, 0.1, 0.5, 1.0, 5.0, 30.0]),
        &["method", "path"],
    )
    .unwrap()
});

/// Requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("reseed_http_requests_in_flight", "Requests in flight").unwrap()
});

/// Authentication failures by reason.
pub static AUTH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("reseed_auth_failures_total", "Authentication failures"),
        &["reason"],
    )
    .unwrap()
});

/// Register the server metrics with the given registry.
pub fn register_server_metrics(registry: &Registry) {
    let _ = registry.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = registry.register(Box::new(HTTP_REQUEST_DURATION.clone()));
    let _ = registry.register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()));
    let _ = registry.register(Box::new(AUTH_FAILURES_TOTAL.clone()));
}

/// Collapse dynamic path segments so label cardinality stays bounded.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.chars().any(|c| c.is_ascii_digit()) && segment.len() > 8 {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
