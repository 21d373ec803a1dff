//! Liveness check and favicon.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

use super::AppState;

/// `GET /health`: 200 when the database answers `SELECT 1`.
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "OK").into_response(),
        Err(e) => {
            tracing::warn!("Health check failed: {e:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, "DB error").into_response()
        }
    }
}

pub async fn favicon() -> Redirect {
    Redirect::to("/static/favicon.svg")
}
