//! On-demand scheduler triggers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use reseed_core::SchedulerError;

use crate::state::AppState;

/// POST /jobs/search - run a full search cycle now.
pub async fn trigger_search(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    info!("Full search triggered via API");
    match state.scheduler().trigger_search().await {
        Ok(summary) => (StatusCode::OK, Json(json!(summary))).into_response(),
        Err(e) => scheduler_error_response(e),
    }
}

/// POST /jobs/rss - run an activity poll now.
pub async fn trigger_rss(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    info!("Activity poll triggered via API");
    match state.scheduler().trigger_rss().await {
        Ok(summary) => (StatusCode::OK, Json(json!(summary))).into_response(),
        Err(e) => scheduler_error_response(e),
    }
}

/// POST /scheduler/reset-budget - zero the search budget counter.
pub async fn reset_budget(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.scheduler().reset_budget();
    (StatusCode::OK, Json(json!({"status": "reset"}))).into_response()
}

fn scheduler_error_response(error: SchedulerError) -> axum::response::Response {
    let status = match error {
        SchedulerError::AlreadyRunning { .. } => StatusCode::CONFLICT,
        SchedulerError::BudgetExhausted { .. } => StatusCode::TOO_MANY_REQUESTS,
        SchedulerError::Source(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({"error": error.to_string()}))).into_response()
}
