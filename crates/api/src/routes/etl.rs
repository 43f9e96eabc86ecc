//! ETL trigger and status endpoints.

use axum::{extract::State, http::StatusCode, Json};
use std::time::Instant;
use tracing::{error, info, warn};

use etl_core::Error;
use telemetry::metrics;

use crate::response::{ApiError, StatusResponse, TriggerResponse};
use crate::state::AppState;

/// POST /api/etl/trigger - Runs the pipeline and waits for it to finish.
pub async fn trigger_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<TriggerResponse>) {
    info!("Manual ETL trigger received");
    let start = Instant::now();

    let result = state.pipeline.run().await;
    let duration_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(report) => {
            info!(run_id = %report.run_id, duration_ms, "Manual ETL completed");
            (StatusCode::OK, Json(TriggerResponse::success(report, duration_ms)))
        }
        Err(e @ Error::AlreadyRunning) => {
            warn!("Manual ETL trigger rejected: run already in progress");
            (StatusCode::CONFLICT, Json(TriggerResponse::error(&e, duration_ms)))
        }
        Err(e) => {
            error!(error = %e, duration_ms, "Manual ETL failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(TriggerResponse::error(&e, duration_ms)),
            )
        }
    }
}

/// GET /api/etl/status - Watermark and pipeline counters.
pub async fn status_handler(
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, ApiError> {
    let watermark = state.pipeline.checkpoint().current().await?;

    Ok(Json(StatusResponse {
        watermark,
        running: state.pipeline.is_running(),
        metrics: metrics().snapshot(),
    }))
}
