//! ETL orchestration.
//!
//! One run reads the watermark, extracts the session-end events after it,
//! aggregates them, replaces the served dataset, and advances the watermark.
//! The watermark is only written after the load commits, so a failed run is
//! retried in full by the next one.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use etl_core::{aggregate, AnalyticsLoader, CheckpointStore, Error, EventSource, Result, Watermark};
use telemetry::{health, metrics};

/// Extraction path taken by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// No watermark yet, every session-end event was read
    Full,
    /// Only events after the stored watermark were read
    Incremental,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Nothing new since the watermark; serving store and watermark untouched
    NoNewData,
    Loaded,
}

/// Result of a successful run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: Uuid,
    pub mode: RunMode,
    pub outcome: RunOutcome,
    pub events_processed: u64,
    pub ads_loaded: u64,
    /// Watermark after the run
    pub watermark: Option<DateTime<Utc>>,
    pub duration_ms: u64,
}

/// Single-flight ETL pipeline over the three ports.
pub struct EtlPipeline {
    source: Arc<dyn EventSource>,
    checkpoint: Arc<dyn CheckpointStore>,
    loader: Arc<dyn AnalyticsLoader>,
    guard: Mutex<()>,
    running: AtomicBool,
}

/// Clears the running flag when a run ends, including when its future is dropped.
struct RunningFlag<'a>(&'a AtomicBool);

impl<'a> RunningFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for RunningFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl EtlPipeline {
    pub fn new(
        source: Arc<dyn EventSource>,
        checkpoint: Arc<dyn CheckpointStore>,
        loader: Arc<dyn AnalyticsLoader>,
    ) -> Self {
        Self {
            source,
            checkpoint,
            loader,
            guard: Mutex::new(()),
            running: AtomicBool::new(false),
        }
    }

    pub fn checkpoint(&self) -> &Arc<dyn CheckpointStore> {
        &self.checkpoint
    }

    /// Returns true while a run is active. Never touches the guard.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Runs the pipeline once.
    ///
    /// Fails immediately with [`Error::AlreadyRunning`] if another run is
    /// active. Every other failure is wrapped as [`Error::RunFailed`].
    pub async fn run(&self) -> Result<RunReport> {
        let Ok(_running) = self.guard.try_lock() else {
            metrics().runs_rejected.inc();
            warn!("ETL run rejected: another run is in progress");
            return Err(Error::AlreadyRunning);
        };
        let _flag = RunningFlag::raise(&self.running);

        let run_id = Uuid::new_v4();
        let span = info_span!("etl_run", run_id = %run_id);
        let start = Instant::now();

        metrics().runs_started.inc();
        metrics().run_in_progress.set(1);

        let result = self.execute(run_id, start).instrument(span.clone()).await;

        let elapsed = start.elapsed().as_millis() as u64;
        metrics().run_in_progress.set(0);
        metrics().run_latency_ms.observe(elapsed);

        match &result {
            Ok(report) if report.outcome == RunOutcome::NoNewData => {
                metrics().runs_skipped.inc();
            }
            Ok(_) => {
                metrics().runs_completed.inc();
            }
            Err(e) => {
                metrics().runs_failed.inc();
                span.in_scope(|| {
                    error!(error = %e, code = e.code(), duration_ms = elapsed, "ETL process failed");
                });
            }
        }

        result.map_err(Error::run_failed)
    }

    async fn execute(&self, run_id: Uuid, start: Instant) -> Result<RunReport> {
        let previous = self.read_watermark().await?;
        let mode = match previous {
            Some(_) => RunMode::Incremental,
            None => RunMode::Full,
        };
        info!(mode = ?mode, watermark = ?previous.map(|w| w.last_processed), "Starting ETL run");

        let extract_start = Instant::now();
        let extracted = match previous {
            Some(w) => self.source.extract_after(w.last_processed).await,
            None => self.source.extract_all().await,
        };
        metrics()
            .extract_latency_ms
            .observe(extract_start.elapsed().as_millis() as u64);
        let events = match extracted {
            Ok(events) => {
                health().source.set_healthy();
                events
            }
            Err(e) => {
                health().source.set_unhealthy(e.to_string());
                return Err(e);
            }
        };
        metrics().events_extracted.inc_by(events.len() as u64);

        let Some(batch_max) = events.iter().map(|e| e.timestamp).max() else {
            info!("No new session data since last run");
            return Ok(RunReport {
                run_id,
                mode,
                outcome: RunOutcome::NoNewData,
                events_processed: 0,
                ads_loaded: 0,
                watermark: previous.map(|w| w.last_processed),
                duration_ms: start.elapsed().as_millis() as u64,
            });
        };
        metrics().last_batch_size.set(events.len() as u64);
        debug!(events = events.len(), "Extracted session-end events");

        let (dashboard, ads) = aggregate(&events);

        let load_start = Instant::now();
        let loaded = self.loader.replace(&dashboard, &ads).await;
        metrics()
            .load_latency_ms
            .observe(load_start.elapsed().as_millis() as u64);
        if let Err(e) = loaded {
            metrics().load_errors.inc();
            health().serving_store.set_unhealthy(e.to_string());
            return Err(e);
        }
        health().serving_store.set_healthy();
        metrics().ads_loaded.inc_by(ads.len() as u64);

        let watermark = advance(previous, batch_max);
        let records = events.len() as u64;
        if let Err(e) = self.checkpoint.set_watermark(watermark, records).await {
            health().checkpoint.set_unhealthy(e.to_string());
            return Err(e);
        }

        info!(
            audience = dashboard.total_audience,
            views = dashboard.total_views,
            avg_view_seconds = dashboard.avg_view_seconds,
            total_ads = dashboard.total_ads,
            ads = ads.len(),
            watermark = %watermark,
            "ETL run complete"
        );

        Ok(RunReport {
            run_id,
            mode,
            outcome: RunOutcome::Loaded,
            events_processed: records,
            ads_loaded: ads.len() as u64,
            watermark: Some(watermark),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn read_watermark(&self) -> Result<Option<Watermark>> {
        match self.checkpoint.current().await {
            Ok(w) => {
                health().checkpoint.set_healthy();
                Ok(w)
            }
            Err(e) => {
                health().checkpoint.set_unhealthy(e.to_string());
                Err(e)
            }
        }
    }

    /// Refreshes the health registry from each port.
    pub async fn probe(&self) {
        if self.source.health_check().await {
            health().source.set_healthy();
        } else {
            health().source.set_unhealthy("source health check failed");
        }

        if self.loader.health_check().await {
            health().serving_store.set_healthy();
        } else {
            health().serving_store.set_unhealthy("serving store health check failed");
        }

        match self.checkpoint.current().await {
            Ok(_) => health().checkpoint.set_healthy(),
            Err(e) => health().checkpoint.set_unhealthy(e.to_string()),
        }
    }
}

/// Next watermark. Never moves backwards.
fn advance(previous: Option<Watermark>, batch_max: DateTime<Utc>) -> DateTime<Utc> {
    match previous {
        Some(w) if w.last_processed > batch_max => {
            warn!(
                stored = %w.last_processed,
                batch_max = %batch_max,
                "Batch is older than the stored watermark, keeping watermark"
            );
            w.last_processed
        }
        _ => batch_max,
    }
}
