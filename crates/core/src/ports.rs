//! Capabilities the pipeline depends on.
//!
//! Each port has a production adapter in its own crate and an in-memory
//! version in [`crate::memory`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::analytics::{AdAggregate, DashboardAggregate, Watermark};
use crate::error::Result;
use crate::events::RawEvent;

/// Time-series source of session-end events.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Every session-end event, newest first.
    async fn extract_all(&self) -> Result<Vec<RawEvent>>;

    /// Session-end events strictly newer than `watermark`, oldest first.
    async fn extract_after(&self, watermark: DateTime<Utc>) -> Result<Vec<RawEvent>>;

    /// Returns true if the source is reachable.
    async fn health_check(&self) -> bool {
        true
    }
}

/// Persistent watermark storage.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Full watermark record, `None` before the first successful run.
    async fn current(&self) -> Result<Option<Watermark>>;

    async fn get_watermark(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.current().await?.map(|w| w.last_processed))
    }

    /// Upserts the watermark and stamps the update time.
    async fn set_watermark(&self, timestamp: DateTime<Utc>, records_processed: u64) -> Result<()>;
}

/// Serving-side sink for aggregates.
#[async_trait]
pub trait AnalyticsLoader: Send + Sync {
    /// Replaces the served dataset with these aggregates, all or nothing.
    async fn replace(&self, dashboard: &DashboardAggregate, ads: &[AdAggregate]) -> Result<()>;

    /// Returns true if the store accepts writes.
    async fn health_check(&self) -> bool {
        true
    }
}
