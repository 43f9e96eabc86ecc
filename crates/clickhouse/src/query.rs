//! Read-back helpers for tests and admin.

use crate::client::ClickHouseClient;
use crate::schema::event_types;
use etl_core::{Error, Result};

/// Count session-end rows.
pub async fn count_session_ends(client: &ClickHouseClient) -> Result<u64> {
    let sql = format!(
        "SELECT count() FROM {} WHERE evt_type = ?",
        client.events_table()
    );
    let count: u64 = client
        .inner()
        .query(&sql)
        .bind(event_types::SESSION_END)
        .fetch_one()
        .await
        .map_err(|e| Error::internal(format!("Query error: {}", e)))?;
    Ok(count)
}

/// Truncate the events table (test cleanup).
pub async fn truncate_events(client: &ClickHouseClient) -> Result<()> {
    let sql = format!("TRUNCATE TABLE IF EXISTS {}", client.events_table());
    client
        .inner()
        .query(&sql)
        .execute()
        .await
        .map_err(|e| Error::internal(format!("Truncate error: {}", e)))?;
    Ok(())
}
