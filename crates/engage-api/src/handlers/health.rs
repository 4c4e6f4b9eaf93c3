//! Health check handlers
//!
//! Liveness and readiness probes.

use axum::{extract::State, http::StatusCode, Json};
use engage_service::dto::{HealthResponse, ReadinessResponse};

use crate::state::AppState;

/// Liveness probe
///
/// GET /health, /health/live
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Readiness probe with dependency checks
///
/// GET /health/ready
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    // The in-memory store is always reachable
    let store = match state.db_pool() {
        Some(pool) => Some(pool.acquire().await.is_ok()),
        None => Some(true),
    };

    let relay = match state.redis_pool() {
        Some(pool) => Some(pool.health_check().await.is_ok()),
        None => None,
    };

    let response = ReadinessResponse::ready(store, relay);
    let status = if response.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
