//! Watermark kept in a small text file, for deployments without the database.
//!
//! File format: `<last_processed_millis>,<records_processed>,<updated_at_millis>`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use etl_core::{CheckpointStore, Error, Result, Watermark};

pub const METADATA_FILENAME: &str = "etl-metadata.txt";

/// [`CheckpointStore`] backed by `<dir>/etl-metadata.txt`.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(METADATA_FILENAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn parse_millis(field: &str, name: &str) -> Result<DateTime<Utc>> {
    let ms: i64 = field
        .trim()
        .parse()
        .map_err(|_| Error::checkpoint(format!("invalid {} in metadata file: {:?}", name, field)))?;
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| Error::checkpoint(format!("{} out of range: {}", name, ms)))
}

/// Parses file content. Only the watermark field is required.
fn parse_record(content: &str) -> Result<Option<Watermark>> {
    let content = content.trim();
    if content.is_empty() {
        return Ok(None);
    }

    let mut parts = content.split(',');
    let last_processed = parse_millis(parts.next().unwrap_or_default(), "watermark")?;
    let records_processed = match parts.next() {
        Some(field) => field.trim().parse().map_err(|_| {
            Error::checkpoint(format!("invalid record count in metadata file: {:?}", field))
        })?,
        None => 0,
    };
    let updated_at = match parts.next() {
        Some(field) => parse_millis(field, "updated_at")?,
        None => last_processed,
    };

    Ok(Some(Watermark {
        last_processed,
        records_processed,
        updated_at,
    }))
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn current(&self) -> Result<Option<Watermark>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No metadata file found (first run)");
                return Ok(None);
            }
            Err(e) => {
                return Err(Error::checkpoint(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        parse_record(&content)
    }

    async fn set_watermark(&self, timestamp: DateTime<Utc>, records_processed: u64) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                Error::checkpoint(format!("failed to create {}: {}", dir.display(), e))
            })?;
        }

        let content = format!(
            "{},{},{}",
            timestamp.timestamp_millis(),
            records_processed,
            Utc::now().timestamp_millis()
        );

        // Atomic replace via rename.
        let tmp = self.path.with_extension("txt.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| Error::checkpoint(format!("failed to write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            Error::checkpoint(format!("failed to replace {}: {}", self.path.display(), e))
        })?;

        debug!(watermark = %timestamp, records = records_processed, "Updated metadata file");
        Ok(())
    }
}
