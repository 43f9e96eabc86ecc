//! SQLite schema for the serving relations and the ETL metadata row.

/// Key of the single watermark row.
pub const WATERMARK_KEY: &str = "last_processed_timestamp";

pub const CREATE_METRICS_KPI: &str = r#"
CREATE TABLE IF NOT EXISTS metrics_kpi (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    total_audience INTEGER NOT NULL,
    total_views INTEGER NOT NULL,
    total_ads INTEGER NOT NULL,
    avg_view_seconds REAL NOT NULL
)
"#;

pub const CREATE_AGE_DISTRIBUTION: &str = r#"
CREATE TABLE IF NOT EXISTS age_distribution (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    children INTEGER NOT NULL,
    teenagers INTEGER NOT NULL,
    young_adults INTEGER NOT NULL,
    mid_aged INTEGER NOT NULL,
    seniors INTEGER NOT NULL
)
"#;

pub const CREATE_GENDER_DISTRIBUTION: &str = r#"
CREATE TABLE IF NOT EXISTS gender_distribution (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    male INTEGER NOT NULL,
    female INTEGER NOT NULL
)
"#;

pub const CREATE_EMOTION_DISTRIBUTION: &str = r#"
CREATE TABLE IF NOT EXISTS emotion_distribution (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    neutral INTEGER NOT NULL,
    serious INTEGER NOT NULL,
    happy INTEGER NOT NULL,
    surprised INTEGER NOT NULL
)
"#;

pub const CREATE_ADVERTISEMENT: &str = r#"
CREATE TABLE IF NOT EXISTS advertisement (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ad_name TEXT NOT NULL,
    total_viewers INTEGER NOT NULL,
    look_yes INTEGER NOT NULL,
    look_no INTEGER NOT NULL
)
"#;

/// Watermark row, keyed by [`WATERMARK_KEY`]. Timestamps are epoch millis.
pub const CREATE_ETL_METADATA: &str = r#"
CREATE TABLE IF NOT EXISTS etl_metadata (
    metadata_key TEXT PRIMARY KEY,
    last_processed_timestamp INTEGER NOT NULL,
    records_processed INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
)
"#;

/// Serving relations, in the order they are cleared on replace.
pub const SERVING_TABLES: [&str; 5] = [
    "metrics_kpi",
    "age_distribution",
    "gender_distribution",
    "emotion_distribution",
    "advertisement",
];

/// All table creation statements.
pub fn all_tables() -> Vec<&'static str> {
    vec![
        CREATE_METRICS_KPI,
        CREATE_AGE_DISTRIBUTION,
        CREATE_GENDER_DISTRIBUTION,
        CREATE_EMOTION_DISTRIBUTION,
        CREATE_ADVERTISEMENT,
        CREATE_ETL_METADATA,
    ]
}
