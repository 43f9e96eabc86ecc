//! Audience Analytics ETL
//!
//! Incremental batch pipeline handling:
//! - Watermark-based extraction of session-end gaze events from ClickHouse
//! - Demographic and advertisement attention aggregation
//! - All-or-nothing replacement of the SQLite serving store (or an HTTP push)
//! - Scheduled runs plus a manual trigger endpoint

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};

use api::{router, AppState};
use clickhouse_source::{ClickHouseClient, ClickHouseConfig, ClickHouseEventSource};
use etl_core::{AnalyticsLoader, CheckpointStore, EventSource};
use storage::{
    CheckpointKind, FileCheckpointStore, SqliteAnalyticsLoader, SqliteCheckpointStore,
    SqliteDatabase, StorageConfig,
};
use telemetry::{health, init_tracing_from_env};
use worker::{EtlPipeline, EtlScheduler, HttpPushLoader, LoaderConfig, LoaderKind, ScheduleConfig};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    #[serde(default)]
    clickhouse: ClickHouseConfig,

    #[serde(default)]
    storage: StorageConfig,

    #[serde(default)]
    loader: LoaderConfig,

    #[serde(default)]
    schedule: ScheduleConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            clickhouse: ClickHouseConfig::default(),
            storage: StorageConfig::default(),
            loader: LoaderConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Audience Analytics ETL v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    info!(
        clickhouse_url = %config.clickhouse.url,
        events_table = %config.clickhouse.events_table(),
        database_path = %config.storage.database_path.display(),
        checkpoint = ?config.storage.checkpoint,
        loader = ?config.loader.kind,
        "Loaded configuration"
    );

    // Time-series source
    let clickhouse = ClickHouseClient::new(config.clickhouse.clone());
    if let Err(e) = clickhouse_source::schema::init_schema(&clickhouse).await {
        error!("Failed to initialize ClickHouse schema: {}", e);
        // Continue anyway - the device may own the schema
    }
    if clickhouse_source::health::check_connection(&clickhouse).await {
        health().source.set_healthy();
        info!("ClickHouse connection: healthy");
    } else {
        health().source.set_unhealthy("Connection failed");
        error!("ClickHouse connection: unhealthy");
    }
    let source: Arc<dyn EventSource> = Arc::new(ClickHouseEventSource::new(clickhouse));

    // Serving store
    let db = SqliteDatabase::open(&config.storage.database_path)
        .context("Failed to open serving database")?;

    let checkpoint: Arc<dyn CheckpointStore> = match config.storage.checkpoint {
        CheckpointKind::Sqlite => Arc::new(SqliteCheckpointStore::new(db.clone())),
        CheckpointKind::File => Arc::new(FileCheckpointStore::new(&config.storage.metadata_dir)),
    };

    let loader: Arc<dyn AnalyticsLoader> = match config.loader.kind {
        LoaderKind::Sqlite => Arc::new(SqliteAnalyticsLoader::new(db.clone())),
        LoaderKind::Http => {
            let url = config
                .loader
                .push_url
                .as_deref()
                .context("loader.push_url is required when loader.kind is http")?;
            let push = HttpPushLoader::new(url, config.loader.timeout())
                .context("Failed to create push loader")?;
            info!(url = push.url(), "Pushing aggregates over HTTP");
            Arc::new(push)
        }
    };

    let pipeline = Arc::new(EtlPipeline::new(source, checkpoint, loader));
    pipeline.probe().await;

    let _scheduler_handle = if config.schedule.enabled {
        Some(EtlScheduler::new(pipeline.clone(), &config.schedule).start())
    } else {
        warn!("ETL schedule disabled, runs only via the trigger endpoint");
        None
    };

    let app = router(AppState::new(pipeline));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables, e.g. ETL__LOADER__PUSH_URL
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("ETL")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    if config.schedule.interval_secs == 0 {
        warn!("schedule.interval_secs is 0, using 1 second");
    }

    Ok(config)
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
