//! Raw gaze telemetry events as produced by the edge device.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Viewer id assigned to events whose payload could not be decoded.
pub const PARSE_ERROR_VIEWER: &str = "parse_error";

/// Viewer id used when a payload carries none.
pub const UNKNOWN_VIEWER: &str = "unknown";

/// Event kinds written by the edge device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SessionStart,
    SessionEnd,
    Heartbeat,
    Other,
}

impl EventKind {
    /// Returns the string representation stored in the source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionStart => "session_start",
            Self::SessionEnd => "session_end",
            Self::Heartbeat => "heartbeat",
            Self::Other => "other",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "session_start" => Self::SessionStart,
            "session_end" => Self::SessionEnd,
            "heartbeat" => Self::Heartbeat,
            _ => Self::Other,
        }
    }
}

/// A single decoded event.
///
/// Only session-end events carry a complete session summary; every optional
/// field is `None` when the device omitted it or sent a malformed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Source row timestamp
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    /// Opaque viewer identifier
    pub viewer_id: String,
    /// Session length in seconds
    pub session_duration: Option<f64>,
    /// Share of the session spent gazing at the display (0.0-1.0)
    pub engagement_rate: Option<f64>,
    /// Total gaze time in seconds
    pub total_gaze_time: Option<f64>,
    pub gaze_count: Option<u32>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    /// Dominant emotion label over the session
    pub emotion: Option<String>,
    /// Advertisement on screen during the session
    pub ad_name: Option<String>,
}

impl RawEvent {
    /// Creates a session-end event with no optional fields set.
    pub fn session_end(timestamp: DateTime<Utc>, viewer_id: impl Into<String>) -> Self {
        Self {
            timestamp,
            kind: EventKind::SessionEnd,
            viewer_id: viewer_id.into(),
            session_duration: None,
            engagement_rate: None,
            total_gaze_time: None,
            gaze_count: None,
            age: None,
            gender: None,
            emotion: None,
            ad_name: None,
        }
    }

    /// Stand-in for a row whose payload could not be decoded.
    pub fn placeholder(timestamp: DateTime<Utc>) -> Self {
        Self::session_end(timestamp, PARSE_ERROR_VIEWER)
    }

    pub fn is_placeholder(&self) -> bool {
        self.viewer_id == PARSE_ERROR_VIEWER
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    pub fn with_emotion(mut self, emotion: impl Into<String>) -> Self {
        self.emotion = Some(emotion.into());
        self
    }

    pub fn with_ad(mut self, ad_name: impl Into<String>) -> Self {
        self.ad_name = Some(ad_name.into());
        self
    }

    pub fn with_engagement(mut self, rate: f64) -> Self {
        self.engagement_rate = Some(rate);
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.session_duration = Some(seconds);
        self
    }
}
