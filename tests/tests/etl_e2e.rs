//! End-to-end tests for the ETL pipeline.
//!
//! These tests validate the full data flow:
//! POST /api/etl/trigger → EtlPipeline → SQLite serving store + watermark
//!
//! The event source is in memory; the serving store and checkpoint are a
//! real SQLite file in a temporary directory.

use integration_tests::{fixtures, setup::TestContext};

/// First run over a batch without ad context.
#[tokio::test]
async fn test_trigger_loads_audience_without_ads() {
    let ctx = TestContext::new();
    let server = ctx.server();
    ctx.record(fixtures::audience_without_ads());

    let response = server.post("/api/etl/trigger").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "ETL process completed successfully");
    assert!(body["timestamp"].is_string());
    assert!(body["durationMs"].is_u64());
    assert_eq!(body["report"]["mode"], "full");
    assert_eq!(body["report"]["eventsProcessed"], 3);

    let serving = ctx.serving().await;
    let dashboard = serving.dashboard.expect("dashboard should be loaded");
    assert_eq!(dashboard.total_audience, 3);
    assert_eq!(dashboard.total_views, 3);
    assert_eq!(dashboard.age.children, 1);
    assert_eq!(dashboard.age.mid_aged, 1);
    assert_eq!(dashboard.age.seniors, 1);
    assert_eq!(dashboard.gender.male, 1);
    assert_eq!(dashboard.emotion.happy, 1);
    assert_eq!(dashboard.total_ads, 12);
    assert!(serving.ads.is_empty());

    let watermark = ctx.watermark().await.expect("watermark should be set");
    assert_eq!(watermark.last_processed, fixtures::at(3_000));
    assert_eq!(watermark.records_processed, 3);
}

/// Ad attention counts land in the advertisement relation.
#[tokio::test]
async fn test_trigger_loads_ad_attention() {
    let ctx = TestContext::new();
    let server = ctx.server();
    ctx.record(fixtures::summer_sale_viewers(1_000));

    server.post("/api/etl/trigger").await.assert_status_ok();

    let serving = ctx.serving().await;
    assert_eq!(serving.ads.len(), 1);
    let ad = &serving.ads[0];
    assert_eq!(ad.ad_name, "Summer Sale");
    assert_eq!(ad.total_viewers, 2);
    assert_eq!(ad.look_yes, 1);
    assert_eq!(ad.look_no, 1);
    assert_eq!(ad.attention_rate(), 0.5);
    assert_eq!(serving.dashboard.unwrap().total_ads, 1);
}

/// Second run only reads events after the watermark and replaces the dataset.
#[tokio::test]
async fn test_incremental_run_replaces_dataset() {
    let ctx = TestContext::new();
    let server = ctx.server();
    ctx.record(fixtures::audience_without_ads());
    server.post("/api/etl/trigger").await.assert_status_ok();

    ctx.record(fixtures::summer_sale_viewers(10_000));
    let response = server.post("/api/etl/trigger").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["report"]["mode"], "incremental");
    assert_eq!(body["report"]["eventsProcessed"], 2);

    // Replacement, not accumulation: only the second batch is served
    let serving = ctx.serving().await;
    let dashboard = serving.dashboard.unwrap();
    assert_eq!(dashboard.total_views, 2);
    assert_eq!(dashboard.total_audience, 2);
    assert_eq!(serving.ads.len(), 1);
    assert_eq!(ctx.row_counts().await, [1, 1, 1, 1, 1]);

    let watermark = ctx.watermark().await.unwrap();
    assert_eq!(watermark.last_processed, fixtures::at(11_000));
    assert_eq!(watermark.records_processed, 2);
}

/// No new events: success, but nothing is rewritten.
#[tokio::test]
async fn test_trigger_without_new_data() {
    let ctx = TestContext::new();
    let server = ctx.server();
    ctx.record(fixtures::summer_sale_viewers(1_000));
    server.post("/api/etl/trigger").await.assert_status_ok();

    let before = ctx.serving().await;
    let watermark = ctx.watermark().await;

    let response = server.post("/api/etl/trigger").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "success");
    assert_eq!(body["report"]["outcome"], "no_new_data");

    assert_eq!(ctx.serving().await, before);
    assert_eq!(ctx.watermark().await, watermark);
}

/// Empty source on first run leaves the serving store empty.
#[tokio::test]
async fn test_first_run_with_empty_source() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server.post("/api/etl/trigger").await;
    response.assert_status_ok();

    assert_eq!(ctx.row_counts().await, [0, 0, 0, 0, 0]);
    assert!(ctx.watermark().await.is_none());
}

/// Status endpoint exposes the watermark record.
#[tokio::test]
async fn test_status_reports_watermark() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server.get("/api/etl/status").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body["watermark"].is_null());
    assert_eq!(body["running"], false);
    assert!(body["metrics"]["runsStarted"].is_u64());

    ctx.record(fixtures::audience_without_ads());
    server.post("/api/etl/trigger").await.assert_status_ok();

    let body: serde_json::Value = server.get("/api/etl/status").await.json();
    assert_eq!(body["watermark"]["recordsProcessed"], 3);
    assert!(body["watermark"]["lastProcessed"].is_string());
}

/// Resetting the checkpoint and re-running yields identical aggregates.
#[tokio::test]
async fn test_rerun_from_scratch_is_idempotent() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let mut events = fixtures::audience_without_ads();
    events.extend(fixtures::summer_sale_viewers(5_000));
    ctx.record(events);

    server.post("/api/etl/trigger").await.assert_status_ok();
    let first = ctx.serving().await;

    ctx.db
        .execute(|conn| {
            conn.execute("DELETE FROM etl_metadata", [])
                .map_err(|e| etl_core::Error::internal(e.to_string()))
        })
        .await
        .unwrap();
    assert!(ctx.watermark().await.is_none());

    server.post("/api/etl/trigger").await.assert_status_ok();
    assert_eq!(ctx.serving().await, first);
}
