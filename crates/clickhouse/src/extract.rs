//! Session-end extraction from the gaze events table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clickhouse::Row;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::client::ClickHouseClient;
use crate::health::check_connection;
use crate::schema::event_types;
use etl_core::parse::decode_event_lossy;
use etl_core::{Error, EventSource, RawEvent, Result};
use telemetry::metrics;

/// One source row as read by the extractor.
#[derive(Debug, Clone, Row, Deserialize)]
struct SessionRow {
    /// `ts` as epoch milliseconds
    ts_ms: i64,
    event_data: String,
}

/// [`EventSource`] reading session-end rows from ClickHouse.
#[derive(Clone)]
pub struct ClickHouseEventSource {
    client: ClickHouseClient,
}

impl ClickHouseEventSource {
    pub fn new(client: ClickHouseClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ClickHouseClient {
        &self.client
    }
}

/// Full extraction is newest first; incremental is oldest first and binds the watermark.
fn select_sql(table: &str, incremental: bool) -> String {
    let (filter, order) = if incremental {
        (" AND ts > fromUnixTimestamp64Milli(toInt64(?))", "ASC")
    } else {
        ("", "DESC")
    };
    format!(
        "SELECT toUnixTimestamp64Milli(ts) AS ts_ms, event_data FROM {} \
         WHERE evt_type = '{}'{} ORDER BY ts {}",
        table,
        event_types::SESSION_END,
        filter,
        order
    )
}

/// Decodes fetched rows. Undecodable payloads become placeholders.
fn decode_rows(rows: Vec<SessionRow>) -> Result<Vec<RawEvent>> {
    let mut events = Vec::with_capacity(rows.len());
    for row in rows {
        let ts = DateTime::<Utc>::from_timestamp_millis(row.ts_ms).ok_or_else(|| {
            Error::source_unavailable(format!("row timestamp out of range: {}", row.ts_ms))
        })?;
        let (event, err) = decode_event_lossy(ts, &row.event_data);
        if let Some(e) = err {
            metrics().parse_failures.inc();
            warn!(timestamp = %ts, error = %e, "Substituting placeholder for undecodable event");
        }
        events.push(event);
    }
    Ok(events)
}

#[async_trait]
impl EventSource for ClickHouseEventSource {
    async fn extract_all(&self) -> Result<Vec<RawEvent>> {
        let rows: Vec<SessionRow> = self
            .client
            .inner()
            .query(&select_sql(&self.client.events_table(), false))
            .fetch_all()
            .await
            .map_err(|e| Error::source_unavailable(format!("Query error: {}", e)))?;

        debug!(rows = rows.len(), "Fetched all session_end rows");
        decode_rows(rows)
    }

    async fn extract_after(&self, watermark: DateTime<Utc>) -> Result<Vec<RawEvent>> {
        let rows: Vec<SessionRow> = self
            .client
            .inner()
            .query(&select_sql(&self.client.events_table(), true))
            .bind(watermark.timestamp_millis())
            .fetch_all()
            .await
            .map_err(|e| Error::source_unavailable(format!("Query error: {}", e)))?;

        debug!(rows = rows.len(), after = %watermark, "Fetched new session_end rows");
        decode_rows(rows)
    }

    async fn health_check(&self) -> bool {
        check_connection(&self.client).await
    }
}
