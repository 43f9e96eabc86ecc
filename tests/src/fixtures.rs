//! Test fixtures and event generators.

use chrono::{DateTime, TimeZone, Utc};
use clickhouse_source::insert::GazeEventRow;
use etl_core::RawEvent;
use serde_json::{json, Map, Value};

/// Timestamp from epoch milliseconds.
pub fn at(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).unwrap()
}

/// Session-end payload as the device writes it.
pub fn session_end_payload(
    viewer_id: &str,
    age: u32,
    gender: &str,
    emotion: &str,
    ad_name: Option<&str>,
    engagement_rate: f64,
) -> Value {
    let mut emotions = Map::new();
    emotions.insert(emotion.to_string(), json!(5));

    let mut payload = json!({
        "event": "session_end",
        "viewer_id": viewer_id,
        "session_stats": {
            "total_gaze_time": 1.5,
            "gaze_count": 3,
            "session_duration": 4.0,
            "engagement_rate": engagement_rate
        },
        "demographics": {
            "age": age,
            "gender": gender,
            "emotions": emotions
        }
    });
    if let Some(ad) = ad_name {
        payload["ad_context"] = json!({ "ad_name": ad });
    }
    payload
}

/// Source row for a session-end payload.
pub fn session_end_row(ts_ms: i64, payload: &Value) -> GazeEventRow {
    let viewer = payload["viewer_id"].as_str().unwrap_or("unknown");
    GazeEventRow::new(ts_ms, "session_end", viewer, payload.to_string())
}

/// Source row of any kind with a raw payload.
pub fn raw_row(ts_ms: i64, evt_type: &str, payload: &str) -> GazeEventRow {
    GazeEventRow::new(ts_ms, evt_type, "raw", payload)
}

/// Ages 10, 45, 70; one male, one happy; no ads.
pub fn audience_without_ads() -> Vec<RawEvent> {
    vec![
        RawEvent::session_end(at(1_000), "v1").with_age(10).with_gender("Male"),
        RawEvent::session_end(at(2_000), "v2").with_age(45).with_emotion("happy"),
        RawEvent::session_end(at(3_000), "v3").with_age(70),
    ]
}

/// Two viewers of "Summer Sale", one looking.
pub fn summer_sale_viewers(first_ms: i64) -> Vec<RawEvent> {
    vec![
        RawEvent::session_end(at(first_ms), "s1")
            .with_ad("Summer Sale")
            .with_engagement(0.6),
        RawEvent::session_end(at(first_ms + 1_000), "s2")
            .with_ad("Summer Sale")
            .with_engagement(0.2),
    ]
}
