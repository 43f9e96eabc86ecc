//! ClickHouse event source against a real server.
//!
//! Requires Docker to be running for testcontainers (or
//! `ETL_TEST_CLICKHOUSE_URL` pointing at a server), so these are ignored by
//! default: `cargo test -p integration-tests -- --ignored`.

use clickhouse_source::insert::insert_gaze_events;
use clickhouse_source::query::{count_session_ends, truncate_events};
use clickhouse_source::schema::init_schema;
use clickhouse_source::{ClickHouseClient, ClickHouseConfig, ClickHouseEventSource};
use etl_core::{EventSource, PARSE_ERROR_VIEWER};
use integration_tests::{containers::TestContainers, fixtures};
use std::sync::Arc;
use storage::{SqliteAnalyticsLoader, SqliteCheckpointStore, SqliteDatabase};
use worker::{EtlPipeline, RunMode};

async fn source_for(containers: &TestContainers, table: &str) -> ClickHouseEventSource {
    let config = ClickHouseConfig {
        url: containers.clickhouse_url.clone(),
        database: containers.clickhouse_database.clone(),
        table: table.to_string(),
        username: containers.clickhouse_username.clone(),
        password: containers.clickhouse_password.clone(),
        timeout_secs: 30,
    };
    let client = ClickHouseClient::new(config);
    init_schema(&client)
        .await
        .expect("Failed to initialize schema");
    truncate_events(&client).await.expect("Failed to truncate");
    ClickHouseEventSource::new(client)
}

async fn seed(source: &ClickHouseEventSource) {
    let rows = vec![
        fixtures::session_end_row(
            1_000,
            &fixtures::session_end_payload("a", 30, "Male", "happy", Some("Summer Sale"), 0.8),
        ),
        fixtures::session_end_row(
            3_000,
            &fixtures::session_end_payload("c", 60, "Female", "neutral", None, 0.1),
        ),
        fixtures::raw_row(2_000, "session_end", "{not json"),
        fixtures::raw_row(2_500, "heartbeat", r#"{"viewer_id":"hb"}"#),
    ];
    insert_gaze_events(source.client(), rows)
        .await
        .expect("Failed to insert rows");
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_extract_all_newest_first_with_placeholders() {
    let containers = TestContainers::start().await;
    let source = source_for(&containers, "gaze_events_extract_all").await;
    seed(&source).await;

    assert_eq!(count_session_ends(source.client()).await.unwrap(), 3);

    let events = source.extract_all().await.unwrap();
    let times: Vec<i64> = events.iter().map(|e| e.timestamp.timestamp_millis()).collect();
    assert_eq!(times, vec![3_000, 2_000, 1_000]);

    assert_eq!(events[0].viewer_id, "c");
    assert_eq!(events[0].gender.as_deref(), Some("Female"));
    assert_eq!(events[1].viewer_id, PARSE_ERROR_VIEWER);
    assert!(events[1].is_placeholder());
    assert_eq!(events[2].ad_name.as_deref(), Some("Summer Sale"));
    assert_eq!(events[2].emotion.as_deref(), Some("happy"));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_extract_after_is_strict_and_oldest_first() {
    let containers = TestContainers::start().await;
    let source = source_for(&containers, "gaze_events_extract_after").await;
    seed(&source).await;

    let events = source.extract_after(fixtures::at(1_000)).await.unwrap();
    let times: Vec<i64> = events.iter().map(|e| e.timestamp.timestamp_millis()).collect();
    assert_eq!(times, vec![2_000, 3_000]);

    assert!(source
        .extract_after(fixtures::at(3_000))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_pipeline_from_clickhouse_into_sqlite() {
    let containers = TestContainers::start().await;
    let source = source_for(&containers, "gaze_events_pipeline").await;
    seed(&source).await;

    let db = SqliteDatabase::open_in_memory().unwrap();
    let pipeline = EtlPipeline::new(
        Arc::new(source.clone()),
        Arc::new(SqliteCheckpointStore::new(db.clone())),
        Arc::new(SqliteAnalyticsLoader::new(db.clone())),
    );

    let report = pipeline.run().await.unwrap();
    assert_eq!(report.mode, RunMode::Full);
    assert_eq!(report.events_processed, 3);
    assert_eq!(report.ads_loaded, 1);
    assert_eq!(report.watermark, Some(fixtures::at(3_000)));

    let snapshot = storage::read::read_serving(&db).await.unwrap();
    let dashboard = snapshot.dashboard.unwrap();
    assert_eq!(dashboard.total_views, 3);
    // a, c, and the placeholder viewer
    assert_eq!(dashboard.total_audience, 3);
    assert_eq!(dashboard.age.young_adults, 1);
    assert_eq!(dashboard.age.seniors, 1);

    insert_gaze_events(
        source.client(),
        vec![fixtures::session_end_row(
            4_000,
            &fixtures::session_end_payload("d", 15, "Male", "serious", None, 0.0),
        )],
    )
    .await
    .unwrap();

    let report = pipeline.run().await.unwrap();
    assert_eq!(report.mode, RunMode::Incremental);
    assert_eq!(report.events_processed, 1);
    assert_eq!(report.watermark, Some(fixtures::at(4_000)));
}
