//! Storage configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the watermark is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointKind {
    /// `etl_metadata` table in the serving database
    #[default]
    Sqlite,
    /// `etl-metadata.txt` in `metadata_dir`
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite serving database
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default)]
    pub checkpoint: CheckpointKind,
    /// Directory for the file checkpoint
    #[serde(default = "default_metadata_dir")]
    pub metadata_dir: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/analytics.db")
}

fn default_metadata_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            checkpoint: CheckpointKind::default(),
            metadata_dir: default_metadata_dir(),
        }
    }
}
