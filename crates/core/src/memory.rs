//! In-memory port implementations.
//!
//! Used by tests and for running the pipeline without external stores.
//! Each adapter can be switched into a failure mode.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::analytics::{AdAggregate, DashboardAggregate, Watermark};
use crate::error::{Error, Result};
use crate::events::{EventKind, RawEvent};
use crate::ports::{AnalyticsLoader, CheckpointStore, EventSource};

/// Which extraction path the pipeline took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractCall {
    All,
    After(DateTime<Utc>),
}

/// Event source backed by a vector.
#[derive(Clone, Default)]
pub struct MemoryEventSource {
    events: Arc<Mutex<Vec<RawEvent>>>,
    calls: Arc<Mutex<Vec<ExtractCall>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MemoryEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: Vec<RawEvent>) -> Self {
        let source = Self::new();
        source.push(events);
        source
    }

    /// Appends events as if the device had written them.
    pub fn push(&self, events: impl IntoIterator<Item = RawEvent>) {
        self.events.lock().extend(events);
    }

    /// Extraction calls made so far, oldest first.
    pub fn calls(&self) -> Vec<ExtractCall> {
        self.calls.lock().clone()
    }

    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }

    fn session_ends(&self) -> Result<Vec<RawEvent>> {
        if *self.should_fail.lock() {
            return Err(Error::source_unavailable("memory source offline"));
        }
        Ok(self
            .events
            .lock()
            .iter()
            .filter(|e| e.kind == EventKind::SessionEnd)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EventSource for MemoryEventSource {
    async fn extract_all(&self) -> Result<Vec<RawEvent>> {
        self.calls.lock().push(ExtractCall::All);
        let mut events = self.session_ends()?;
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(events)
    }

    async fn extract_after(&self, watermark: DateTime<Utc>) -> Result<Vec<RawEvent>> {
        self.calls.lock().push(ExtractCall::After(watermark));
        let mut events: Vec<RawEvent> = self
            .session_ends()?
            .into_iter()
            .filter(|e| e.timestamp > watermark)
            .collect();
        events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(events)
    }

    async fn health_check(&self) -> bool {
        !*self.should_fail.lock()
    }
}

/// Checkpoint store holding a single watermark.
#[derive(Clone, Default)]
pub struct MemoryCheckpointStore {
    state: Arc<Mutex<Option<Watermark>>>,
    writes: Arc<Mutex<usize>>,
    should_fail: Arc<Mutex<bool>>,
    fail_writes: Arc<Mutex<bool>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful watermark writes.
    pub fn write_count(&self) -> usize {
        *self.writes.lock()
    }

    /// Forgets the watermark so the next run extracts everything.
    pub fn reset(&self) {
        *self.state.lock() = None;
    }

    /// Fails watermark writes only; reads keep working.
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }

    fn check(&self) -> Result<()> {
        if *self.should_fail.lock() {
            return Err(Error::checkpoint("memory checkpoint unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn current(&self) -> Result<Option<Watermark>> {
        self.check()?;
        Ok(*self.state.lock())
    }

    async fn set_watermark(&self, timestamp: DateTime<Utc>, records_processed: u64) -> Result<()> {
        self.check()?;
        if *self.fail_writes.lock() {
            return Err(Error::checkpoint("memory checkpoint is read-only"));
        }
        *self.state.lock() = Some(Watermark {
            last_processed: timestamp,
            records_processed,
            updated_at: Utc::now(),
        });
        *self.writes.lock() += 1;
        Ok(())
    }
}

/// Loader that keeps the last replaced dataset.
#[derive(Clone, Default)]
pub struct MemoryAnalyticsLoader {
    current: Arc<Mutex<Option<(DashboardAggregate, Vec<AdAggregate>)>>>,
    replaces: Arc<Mutex<usize>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MemoryAnalyticsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dashboard(&self) -> Option<DashboardAggregate> {
        self.current.lock().as_ref().map(|(d, _)| d.clone())
    }

    pub fn ads(&self) -> Vec<AdAggregate> {
        self.current
            .lock()
            .as_ref()
            .map(|(_, a)| a.clone())
            .unwrap_or_default()
    }

    /// Number of successful replaces.
    pub fn replace_count(&self) -> usize {
        *self.replaces.lock()
    }

    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }
}

#[async_trait]
impl AnalyticsLoader for MemoryAnalyticsLoader {
    async fn replace(&self, dashboard: &DashboardAggregate, ads: &[AdAggregate]) -> Result<()> {
        if *self.should_fail.lock() {
            return Err(Error::load("memory loader rejected write"));
        }
        *self.current.lock() = Some((dashboard.clone(), ads.to_vec()));
        *self.replaces.lock() += 1;
        Ok(())
    }

    async fn health_check(&self) -> bool {
        !*self.should_fail.lock()
    }
}
