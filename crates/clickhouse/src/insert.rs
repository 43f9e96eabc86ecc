//! Writing raw gaze rows. The device normally does this; used for seeding and tests.

use clickhouse::Row;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::ClickHouseClient;
use etl_core::{Error, Result};

/// Row in the gaze events table.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct GazeEventRow {
    pub ts: i64, // DateTime64(3) as milliseconds
    pub evt_type: String,
    pub viewer_id: String,
    pub event_data: String, // JSON payload
}

impl GazeEventRow {
    pub fn new(
        ts_ms: i64,
        evt_type: impl Into<String>,
        viewer_id: impl Into<String>,
        event_data: impl Into<String>,
    ) -> Self {
        Self {
            ts: ts_ms,
            evt_type: evt_type.into(),
            viewer_id: viewer_id.into(),
            event_data: event_data.into(),
        }
    }
}

/// Inserts gaze rows into the configured events table.
pub async fn insert_gaze_events(client: &ClickHouseClient, rows: Vec<GazeEventRow>) -> Result<usize> {
    if rows.is_empty() {
        return Ok(0);
    }

    let count = rows.len();
    let table = client.events_table();

    let mut insert = client
        .inner()
        .insert(&table)
        .map_err(|e| Error::internal(format!("Insert error: {}", e)))?;

    for row in &rows {
        insert
            .write(row)
            .await
            .map_err(|e| Error::internal(format!("Write error: {}", e)))?;
    }

    insert
        .end()
        .await
        .map_err(|e| Error::internal(format!("End error: {}", e)))?;

    debug!(count = count, table = %table, "Inserted gaze events");
    Ok(count)
}
