//! Gaze events table schema.
//!
//! The edge device writes one row per event:
//! - `ts` DateTime64(3) for millisecond precision
//! - `evt_type` LowCardinality since there are only a handful of kinds
//! - `event_data` keeps the raw JSON payload

use crate::client::ClickHouseClient;
use etl_core::{Error, Result};
use tracing::debug;

/// SQL for creating the database.
pub fn create_database(database: &str) -> String {
    format!("CREATE DATABASE IF NOT EXISTS {}", database)
}

/// SQL for creating the gaze events table.
pub fn create_events_table(qualified_table: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {} (
    ts DateTime64(3),
    evt_type LowCardinality(String),
    viewer_id String,
    event_data String
)
ENGINE = MergeTree()
PARTITION BY toYYYYMM(ts)
ORDER BY (evt_type, ts)
"#,
        qualified_table
    )
}

/// Creates the database and events table if they don't exist.
pub async fn init_schema(client: &ClickHouseClient) -> Result<()> {
    let config = client.config();
    // The configured database may not exist yet.
    let bootstrap = client.inner().clone().with_database("default");

    for sql in [
        create_database(&config.database),
        create_events_table(&config.events_table()),
    ] {
        bootstrap
            .query(&sql)
            .execute()
            .await
            .map_err(|e| Error::source_unavailable(format!("Schema init error: {}", e)))?;
    }

    debug!(table = %config.events_table(), "ClickHouse schema initialized");
    Ok(())
}

/// Event type values for the `evt_type` column.
pub mod event_types {
    pub const SESSION_START: &str = "session_start";
    pub const SESSION_END: &str = "session_end";
    pub const HEARTBEAT: &str = "heartbeat";
}
