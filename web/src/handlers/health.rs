//! Liveness and metrics endpoints.

use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode};

/// Liveness probe. Does not check dependencies.
///
/// ```text
/// GET /health  ->  200 ok
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Prometheus scrape body.
///
/// # Errors
///
/// 404 `METRICS_DISABLED` when no recorder is installed.
#[allow(clippy::unused_async)]
pub async fn metrics(State(state): State<AppState>) -> Result<String, AppError> {
    state.metrics.as_ref().map(|h| h.render()).ok_or_else(|| {
        AppError::not_found("METRICS_DISABLED", "Metrics recorder is not installed")
    })
}
