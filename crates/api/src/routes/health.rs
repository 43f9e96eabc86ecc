//! Health check endpoints.

use axum::{extract::State, http::StatusCode, Json};
use telemetry::health;

use crate::response::HealthResponse;
use crate::state::AppState;

/// GET /health - Probes every store, then reports.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    state.pipeline.probe().await;
    let report = health().report();

    Json(HealthResponse {
        status: format!("{:?}", report.status).to_lowercase(),
        source_connected: health().source.is_healthy(),
        serving_store_connected: health().serving_store.is_healthy(),
        checkpoint_available: health().checkpoint.is_healthy(),
        components: report.components,
    })
}

/// GET /health/ready - Readiness probe (a run could succeed).
pub async fn ready_handler() -> StatusCode {
    if health().is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health/live - Liveness probe (service is running).
pub async fn live_handler() -> StatusCode {
    if health().is_alive() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
