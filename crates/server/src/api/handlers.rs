//! Health, config, status and metrics handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use prometheus::Encoder;
use serde_json::json;
use std::sync::Arc;

use crate::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let uptime = chrono::Utc::now()
        .signed_duration_since(state.started_at())
        .num_seconds();

    Json(json!({
        "status": "ok",
        "version": VERSION,
        "uptime_secs": uptime,
    }))
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.sanitized_config())
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.scheduler().status())
}

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let encoder = prometheus::TextEncoder::new();
    let families = state.registry().gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buffer) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to encode metrics: {}", e),
        )
            .into_response();
    }

    (
        [(axum::http::header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}
