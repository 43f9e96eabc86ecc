//! Application state shared across handlers.

use std::sync::Arc;

use worker::EtlPipeline;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<EtlPipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<EtlPipeline>) -> Self {
        Self { pipeline }
    }
}
