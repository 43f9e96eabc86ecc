//! Aggregates produced by one ETL run and the watermark that tracks progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Advertisement count reported when a batch carries no ad context.
pub const DEFAULT_TOTAL_ADS: u64 = 12;

/// Engagement rate at or above which a viewer counts as having looked at the ad.
pub const LOOK_THRESHOLD: f64 = 0.5;

/// Age band counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeDistribution {
    /// Ages 1-12
    pub children: u64,
    /// Ages 13-19
    pub teenagers: u64,
    /// Ages 20-35
    pub young_adults: u64,
    /// Ages 36-55
    pub mid_aged: u64,
    /// Ages 56 and over
    pub seniors: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenderDistribution {
    pub male: u64,
    pub female: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionDistribution {
    pub neutral: u64,
    pub serious: u64,
    pub happy: u64,
    pub surprised: u64,
}

/// Audience totals for the whole batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAggregate {
    /// Distinct viewer ids
    pub total_audience: u64,
    /// Session-end events in the batch
    pub total_views: u64,
    /// Distinct advertisements, or [`DEFAULT_TOTAL_ADS`] when none were seen
    pub total_ads: u64,
    /// Mean session duration in seconds
    pub avg_view_seconds: f64,
    pub age: AgeDistribution,
    pub gender: GenderDistribution,
    pub emotion: EmotionDistribution,
}

/// Attention counts for one advertisement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdAggregate {
    pub ad_name: String,
    pub total_viewers: u64,
    /// Viewers with engagement at or above [`LOOK_THRESHOLD`]
    pub look_yes: u64,
    pub look_no: u64,
}

impl AdAggregate {
    /// Share of viewers who looked at the ad.
    pub fn attention_rate(&self) -> f64 {
        if self.total_viewers == 0 {
            return 0.0;
        }
        self.look_yes as f64 / self.total_viewers as f64
    }
}

/// Persisted progress marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Watermark {
    /// Newest event timestamp already loaded
    pub last_processed: DateTime<Utc>,
    /// Size of the batch that produced this watermark
    pub records_processed: u64,
    pub updated_at: DateTime<Utc>,
}
