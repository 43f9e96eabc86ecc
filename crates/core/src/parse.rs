//! Decoding of the JSON payload stored alongside each source row.
//!
//! The device writes payloads shaped like:
//!
//! ```json
//! {"event": "session_end", "viewer_id": "37c6477e",
//!  "session_stats": {"total_gaze_time": 0.0, "gaze_count": 0,
//!                    "session_duration": 3.04, "engagement_rate": 0.0},
//!  "demographics": {"age": 33, "gender": "Male", "emotions": {"neutral": 1}},
//!  "ad_context": {"ad_name": "Summer Sale 2026"}}
//! ```
//!
//! Field-level problems never fail the decode: a malformed or missing value
//! becomes `None`. Only a payload that is not a JSON object is an error.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::events::{EventKind, RawEvent, UNKNOWN_VIEWER};

/// Decodes a session payload recorded at `timestamp`.
pub fn decode_event(timestamp: DateTime<Utc>, payload: &str) -> Result<RawEvent> {
    let root: Value = serde_json::from_str(payload)
        .map_err(|e| Error::parse(format!("invalid event payload: {}", e)))?;
    let root = root
        .as_object()
        .ok_or_else(|| Error::parse("event payload is not a JSON object"))?;

    let kind = text(root.get("event"))
        .map(|s| EventKind::from_str_lossy(&s))
        .unwrap_or(EventKind::SessionEnd);
    let viewer_id = text(root.get("viewer_id")).unwrap_or_else(|| UNKNOWN_VIEWER.to_string());

    let stats = section(root, "session_stats");
    let demographics = section(root, "demographics");
    let ad_context = section(root, "ad_context");

    Ok(RawEvent {
        timestamp,
        kind,
        viewer_id,
        session_duration: stats.and_then(|s| number(s.get("session_duration"))),
        engagement_rate: stats.and_then(|s| number(s.get("engagement_rate"))),
        total_gaze_time: stats.and_then(|s| number(s.get("total_gaze_time"))),
        gaze_count: stats.and_then(|s| count(s.get("gaze_count"))),
        age: demographics.and_then(|d| count(d.get("age"))),
        gender: demographics.and_then(|d| text(d.get("gender"))),
        emotion: demographics.and_then(|d| primary_emotion(d.get("emotions"))),
        ad_name: ad_context.and_then(|a| text(a.get("ad_name"))),
    })
}

/// Decodes a payload, substituting a placeholder event when it cannot be read.
///
/// The second element is the decode error, if any, so callers can count it.
pub fn decode_event_lossy(timestamp: DateTime<Utc>, payload: &str) -> (RawEvent, Option<Error>) {
    match decode_event(timestamp, payload) {
        Ok(event) => (event, None),
        Err(e) => (RawEvent::placeholder(timestamp), Some(e)),
    }
}

fn section<'a>(root: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    root.get(key).and_then(Value::as_object)
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Accepts JSON numbers and numeric strings.
fn number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Non-negative whole count; fractional values are truncated.
fn count(value: Option<&Value>) -> Option<u32> {
    let n = number(value)?;
    if n < 0.0 || n > u32::MAX as f64 {
        return None;
    }
    Some(n.trunc() as u32)
}

/// Label with the highest count. Ties keep the first label in key order.
fn primary_emotion(value: Option<&Value>) -> Option<String> {
    let emotions = value?.as_object()?;
    let mut best: Option<(&String, f64)> = None;
    for (label, n) in emotions {
        let Some(n) = number(Some(n)) else { continue };
        if best.map_or(true, |(_, max)| n > max) {
            best = Some((label, n));
        }
    }
    best.map(|(label, _)| label.clone())
}
