//! Standardized API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use etl_core::Watermark;
use telemetry::{ComponentHealthReport, MetricsSnapshot};
use worker::RunReport;

/// Outcome of a manual trigger.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerResponse {
    /// "success" or "error"
    pub status: &'static str,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<RunReport>,
}

impl TriggerResponse {
    pub fn success(report: RunReport, duration_ms: u64) -> Self {
        Self {
            status: "success",
            message: "ETL process completed successfully".into(),
            timestamp: Utc::now(),
            duration_ms,
            code: None,
            report: Some(report),
        }
    }

    pub fn error(err: &etl_core::Error, duration_ms: u64) -> Self {
        Self {
            status: "error",
            message: err.to_string(),
            timestamp: Utc::now(),
            duration_ms,
            code: Some(err.code()),
            report: None,
        }
    }
}

/// Current pipeline progress.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub watermark: Option<Watermark>,
    pub running: bool,
    pub metrics: MetricsSnapshot,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub source_connected: bool,
    pub serving_store_connected: bool,
    pub checkpoint_available: bool,
    pub components: Vec<ComponentHealthReport>,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

/// API error type carrying the error code.
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
}

impl ApiError {
    pub fn with_code(status: StatusCode, code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            status,
            response: ErrorResponse::new(msg, code),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<etl_core::Error> for ApiError {
    fn from(err: etl_core::Error) -> Self {
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        ApiError::with_code(status, err.code(), err.to_string())
    }
}
