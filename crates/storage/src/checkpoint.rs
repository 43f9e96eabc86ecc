//! Watermark persisted as a single keyed row in SQLite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use tracing::debug;

use crate::database::SqliteDatabase;
use crate::schema::WATERMARK_KEY;
use etl_core::{CheckpointStore, Error, Result, Watermark};

/// [`CheckpointStore`] backed by the `etl_metadata` table.
#[derive(Clone)]
pub struct SqliteCheckpointStore {
    db: SqliteDatabase,
}

impl SqliteCheckpointStore {
    pub fn new(db: SqliteDatabase) -> Self {
        Self { db }
    }
}

fn from_millis(ms: i64, column: &str) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| Error::checkpoint(format!("{} out of range: {}", column, ms)))
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn current(&self) -> Result<Option<Watermark>> {
        let row: Option<(i64, i64, i64)> = self
            .db
            .execute(|conn| {
                conn.query_row(
                    "SELECT last_processed_timestamp, records_processed, updated_at
                     FROM etl_metadata WHERE metadata_key = ?1",
                    params![WATERMARK_KEY],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()
                .map_err(|e| Error::checkpoint(format!("read failed: {}", e)))
            })
            .await?;

        let Some((last, records, updated)) = row else {
            return Ok(None);
        };

        Ok(Some(Watermark {
            last_processed: from_millis(last, "last_processed_timestamp")?,
            records_processed: u64::try_from(records).map_err(|_| {
                Error::checkpoint(format!("negative records_processed: {}", records))
            })?,
            updated_at: from_millis(updated, "updated_at")?,
        }))
    }

    async fn set_watermark(&self, timestamp: DateTime<Utc>, records_processed: u64) -> Result<()> {
        let last = timestamp.timestamp_millis();
        let updated = Utc::now().timestamp_millis();
        let records = i64::try_from(records_processed)
            .map_err(|_| Error::checkpoint(format!("records_processed too large: {}", records_processed)))?;

        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO etl_metadata
                         (metadata_key, last_processed_timestamp, records_processed, updated_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(metadata_key) DO UPDATE SET
                         last_processed_timestamp = excluded.last_processed_timestamp,
                         records_processed = excluded.records_processed,
                         updated_at = excluded.updated_at",
                    params![WATERMARK_KEY, last, records, updated],
                )
                .map_err(|e| Error::checkpoint(format!("write failed: {}", e)))
            })
            .await?;

        debug!(watermark = %timestamp, records = records_processed, "Stored watermark");
        Ok(())
    }
}
