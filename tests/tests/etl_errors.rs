//! Failure handling of the ETL trigger.
//!
//! Fatal errors must surface as `status: "error"` and leave the watermark
//! where it was, so the next trigger retries the same batch.

use axum::http::StatusCode;
use etl_core::memory::{MemoryAnalyticsLoader, MemoryEventSource};
use etl_core::{AnalyticsLoader, Error};
use integration_tests::{
    fixtures,
    mocks::{GatedLoader, SwitchableLoader},
    setup::TestContext,
};
use std::sync::Arc;
use storage::file_checkpoint::METADATA_FILENAME;
use storage::FileCheckpointStore;
use worker::EtlPipeline;

/// Load failure: 500, previous dataset and watermark untouched, retry succeeds.
#[tokio::test]
async fn test_load_failure_keeps_checkpoint() {
    let mut switch = None;
    let ctx = TestContext::with_loader(|inner| {
        let loader = SwitchableLoader::new(inner);
        switch = Some(loader.clone());
        Arc::new(loader) as Arc<dyn AnalyticsLoader>
    });
    let switch = switch.unwrap();
    let server = ctx.server();

    ctx.record(fixtures::audience_without_ads());
    server.post("/api/etl/trigger").await.assert_status_ok();
    let served = ctx.serving().await;
    let watermark = ctx.watermark().await;

    switch.set_should_fail(true);
    ctx.record(fixtures::summer_sale_viewers(10_000));

    let response = server.post("/api/etl/trigger").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], "ETL_001");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("ETL process failed"));
    assert!(body["durationMs"].is_u64());
    assert!(body["timestamp"].is_string());

    assert_eq!(ctx.serving().await, served);
    assert_eq!(ctx.watermark().await, watermark);

    switch.set_should_fail(false);
    let response = server.post("/api/etl/trigger").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["report"]["eventsProcessed"], 2);
    assert_eq!(
        ctx.watermark().await.unwrap().last_processed,
        fixtures::at(11_000)
    );
}

/// Source failure aborts before anything is written.
#[tokio::test]
async fn test_source_failure_reports_error() {
    let ctx = TestContext::new();
    let server = ctx.server();
    ctx.record(fixtures::audience_without_ads());
    ctx.source.set_should_fail(true);

    let response = server.post("/api/etl/trigger").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], "ETL_001");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("source unavailable"));

    assert_eq!(ctx.row_counts().await, [0, 0, 0, 0, 0]);
    assert!(ctx.watermark().await.is_none());
}

/// A trigger during an active run is rejected with 409.
#[tokio::test]
async fn test_concurrent_trigger_conflicts() {
    let mut gate = None;
    let ctx = TestContext::with_loader(|inner| {
        let loader = Arc::new(GatedLoader::new(inner));
        gate = Some(loader.clone());
        loader as Arc<dyn AnalyticsLoader>
    });
    let gate = gate.unwrap();
    let server = ctx.server();
    ctx.record(fixtures::audience_without_ads());

    let running = {
        let pipeline = ctx.pipeline.clone();
        tokio::spawn(async move { pipeline.run().await })
    };
    gate.wait_entered().await;

    let response = server.post("/api/etl/trigger").await;
    response.assert_status(StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], "ETL_409");

    let status: serde_json::Value = server.get("/api/etl/status").await.json();
    assert_eq!(status["running"], true);

    gate.release();
    running.await.unwrap().unwrap();

    assert_eq!(ctx.watermark().await.unwrap().records_processed, 3);
    assert_eq!(ctx.serving().await.dashboard.unwrap().total_views, 3);
}

/// A corrupt file checkpoint is a failure, not a first run.
#[tokio::test]
async fn test_corrupt_file_checkpoint_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(METADATA_FILENAME), "not-a-timestamp,3,0").unwrap();

    let source = MemoryEventSource::with_events(fixtures::audience_without_ads());
    let loader = MemoryAnalyticsLoader::new();
    let pipeline = EtlPipeline::new(
        Arc::new(source.clone()),
        Arc::new(FileCheckpointStore::new(dir.path())),
        Arc::new(loader.clone()),
    );

    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(err, Error::RunFailed(_)));
    assert_eq!(err.cause().code(), "CKPT_001");
    assert!(source.calls().is_empty());
    assert_eq!(loader.replace_count(), 0);
}

/// The file checkpoint drives incremental runs like the SQLite one.
#[tokio::test]
async fn test_file_checkpoint_round_trip_through_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let source = MemoryEventSource::with_events(fixtures::audience_without_ads());
    let loader = MemoryAnalyticsLoader::new();
    let pipeline = EtlPipeline::new(
        Arc::new(source.clone()),
        Arc::new(FileCheckpointStore::new(dir.path())),
        Arc::new(loader.clone()),
    );

    pipeline.run().await.unwrap();
    let contents = std::fs::read_to_string(dir.path().join(METADATA_FILENAME)).unwrap();
    assert!(contents.starts_with("3000,3,"));

    source.push(fixtures::summer_sale_viewers(5_000));
    let report = pipeline.run().await.unwrap();
    assert_eq!(report.events_processed, 2);
    assert_eq!(report.watermark, Some(fixtures::at(6_000)));
}
