use axum::{Json, extract::State, http::StatusCode};

use crate::{AppState, api_types::HealthResponse};

/// Liveness plus pool occupancy. Reports 503 once the pool is shut down.
pub async fn health(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let pool = state.executor.pool();
    let (status, label) = if pool.is_closed() {
        (StatusCode::SERVICE_UNAVAILABLE, "shutting_down")
    } else {
        (StatusCode::OK, "ok")
    };
    (
        status,
        Json(HealthResponse {
            status: label,
            pool: pool.stats(),
        }),
    )
}
