//! Scheduled ETL runs.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use etl_core::Error;

use crate::pipeline::{EtlPipeline, RunOutcome};

/// Schedule configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub enabled: bool,
    /// Run once as soon as the scheduler starts
    pub run_on_startup: bool,
    pub initial_delay_secs: u64,
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            run_on_startup: true,
            initial_delay_secs: 60, // 1 minute
            interval_secs: 300,     // 5 minutes
        }
    }
}

impl ScheduleConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

/// Background scheduler for the ETL pipeline.
pub struct EtlScheduler {
    pipeline: Arc<EtlPipeline>,
    run_on_startup: bool,
    initial_delay: Duration,
    interval: Duration,
}

impl EtlScheduler {
    pub fn new(pipeline: Arc<EtlPipeline>, config: &ScheduleConfig) -> Self {
        Self {
            pipeline,
            run_on_startup: config.run_on_startup,
            initial_delay: config.initial_delay(),
            interval: config.interval(),
        }
    }

    /// Overrides the timings. Used by tests.
    pub fn with_timing(mut self, initial_delay: Duration, interval: Duration) -> Self {
        self.initial_delay = initial_delay;
        self.interval = interval;
        self
    }

    /// Starts the schedule loop.
    pub fn start(self) -> JoinHandle<()> {
        info!(
            run_on_startup = self.run_on_startup,
            initial_delay_secs = self.initial_delay.as_secs(),
            interval_secs = self.interval.as_secs(),
            "ETL scheduler started"
        );
        tokio::spawn(async move { self.run_loop().await })
    }

    async fn run_loop(&self) {
        if self.run_on_startup {
            self.tick("startup").await;
        }

        let mut ticker = interval_at(Instant::now() + self.initial_delay, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.tick("scheduled").await;
        }
    }

    async fn tick(&self, trigger: &'static str) {
        match self.pipeline.run().await {
            Ok(report) if report.outcome == RunOutcome::NoNewData => {
                info!(trigger, "Scheduled ETL run found no new data");
            }
            Ok(report) => {
                info!(
                    trigger,
                    run_id = %report.run_id,
                    events = report.events_processed,
                    duration_ms = report.duration_ms,
                    "Scheduled ETL run completed"
                );
            }
            Err(Error::AlreadyRunning) => {
                warn!(trigger, "Skipping scheduled ETL run: previous run still active");
            }
            Err(e) => {
                error!(trigger, error = %e, "Scheduled ETL run failed");
            }
        }
    }
}
