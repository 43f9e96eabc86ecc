//! HTTP push loader.
//!
//! Delivers each run's aggregates to a downstream dashboard service that
//! does not read the serving store directly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use etl_core::{AdAggregate, AnalyticsLoader, DashboardAggregate, Error, Result};

/// Path the downstream service accepts updates on.
pub const UPDATE_PATH: &str = "/api/analytics/update";

/// Where aggregates are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoaderKind {
    /// Replace the rows in the SQLite serving store
    #[default]
    Sqlite,
    /// POST to a downstream analytics service
    Http,
}

/// Loader configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    #[serde(default)]
    pub kind: LoaderKind,
    /// Base URL of the downstream service, required for `http`
    #[serde(default)]
    pub push_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            kind: LoaderKind::default(),
            push_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LoaderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Flat dashboard shape the downstream service expects.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_audience: u64,
    pub total_views: u64,
    pub total_ads: u64,
    pub avg_view_seconds: f64,
    pub children: u64,
    pub teenagers: u64,
    pub young_adults: u64,
    pub mid_aged: u64,
    pub seniors: u64,
    pub male: u64,
    pub female: u64,
    pub neutral: u64,
    pub serious: u64,
    pub happy: u64,
    pub surprised: u64,
}

impl From<&DashboardAggregate> for DashboardMetrics {
    fn from(d: &DashboardAggregate) -> Self {
        Self {
            total_audience: d.total_audience,
            total_views: d.total_views,
            total_ads: d.total_ads,
            avg_view_seconds: d.avg_view_seconds,
            children: d.age.children,
            teenagers: d.age.teenagers,
            young_adults: d.age.young_adults,
            mid_aged: d.age.mid_aged,
            seniors: d.age.seniors,
            male: d.gender.male,
            female: d.gender.female,
            neutral: d.emotion.neutral,
            serious: d.emotion.serious,
            happy: d.emotion.happy,
            surprised: d.emotion.surprised,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    dashboard_metrics: DashboardMetrics,
    #[serde(skip_serializing_if = "no_ads")]
    ad_metrics: &'a [AdAggregate],
}

fn no_ads(ads: &&[AdAggregate]) -> bool {
    ads.is_empty()
}

/// Loader that POSTs aggregates to `<base_url>/api/analytics/update`.
#[derive(Debug, Clone)]
pub struct HttpPushLoader {
    url: String,
    http_client: reqwest::Client,
}

impl HttpPushLoader {
    pub fn new(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self> {
        let base = base_url.as_ref().trim_end_matches('/');
        if base.is_empty() {
            return Err(Error::config("push loader requires a base URL"));
        }

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url: format!("{}{}", base, UPDATE_PATH),
            http_client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AnalyticsLoader for HttpPushLoader {
    async fn replace(&self, dashboard: &DashboardAggregate, ads: &[AdAggregate]) -> Result<()> {
        let request = UpdateRequest {
            dashboard_metrics: dashboard.into(),
            ad_metrics: ads,
        };

        debug!(url = %self.url, ads = ads.len(), "Pushing analytics update");

        let response = self
            .http_client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Analytics push request failed");
                Error::load(format!("Push to {} failed: {}", self.url, e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Analytics service rejected update");
            return Err(Error::load(format!(
                "Analytics service returned {}: {}",
                status, body
            )));
        }

        Ok(())
    }
}
