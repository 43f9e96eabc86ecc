//! Common test setup functions.

use api::{router, state::AppState};
use axum::Router;
use axum_test::TestServer;
use etl_core::memory::MemoryEventSource;
use etl_core::{AnalyticsLoader, CheckpointStore, RawEvent, Watermark};
use std::sync::Arc;
use storage::read::{read_serving, row_counts};
use storage::{ServingSnapshot, SqliteAnalyticsLoader, SqliteCheckpointStore, SqliteDatabase};
use tempfile::TempDir;
use worker::EtlPipeline;

/// Test context with an in-memory source and a real SQLite serving store.
///
/// This exercises the production code paths by:
/// - Using the real Axum router with all middleware
/// - Using MemoryEventSource which implements the EventSource trait
/// - Using a SQLite database file in a temporary directory for the
///   serving relations and the watermark
pub struct TestContext {
    _dir: TempDir,
    pub source: MemoryEventSource,
    pub db: SqliteDatabase,
    pub checkpoint: Arc<SqliteCheckpointStore>,
    pub pipeline: Arc<EtlPipeline>,
    pub router: Router,
}

impl TestContext {
    /// Create a context that loads into SQLite.
    pub fn new() -> Self {
        Self::build(|db| Arc::new(SqliteAnalyticsLoader::new(db.clone())))
    }

    /// Create a context whose loader wraps the SQLite loader.
    pub fn with_loader<F>(wrap: F) -> Self
    where
        F: FnOnce(Arc<dyn AnalyticsLoader>) -> Arc<dyn AnalyticsLoader>,
    {
        Self::build(|db| wrap(Arc::new(SqliteAnalyticsLoader::new(db.clone()))))
    }

    fn build<F>(loader: F) -> Self
    where
        F: FnOnce(&SqliteDatabase) -> Arc<dyn AnalyticsLoader>,
    {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let db = SqliteDatabase::open(dir.path().join("analytics.db"))
            .expect("Failed to open serving database");

        let source = MemoryEventSource::new();
        let checkpoint = Arc::new(SqliteCheckpointStore::new(db.clone()));
        let pipeline = Arc::new(EtlPipeline::new(
            Arc::new(source.clone()),
            checkpoint.clone(),
            loader(&db),
        ));
        let router = router(AppState::new(pipeline.clone()));

        Self {
            _dir: dir,
            source,
            db,
            checkpoint,
            pipeline,
            router,
        }
    }

    /// HTTP test server over the router.
    pub fn server(&self) -> TestServer {
        TestServer::new(self.router.clone()).expect("Failed to create test server")
    }

    /// Simulate the device recording session-end events.
    pub fn record(&self, events: Vec<RawEvent>) {
        self.source.push(events);
    }

    /// What a dashboard reader sees right now.
    pub async fn serving(&self) -> ServingSnapshot {
        read_serving(&self.db).await.expect("Failed to read serving store")
    }

    /// Row count of each serving relation.
    pub async fn row_counts(&self) -> [i64; 5] {
        row_counts(&self.db).await.expect("Failed to count rows")
    }

    pub async fn watermark(&self) -> Option<Watermark> {
        self.checkpoint
            .current()
            .await
            .expect("Failed to read watermark")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
