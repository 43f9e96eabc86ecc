//! Storage adapters: the SQLite serving store plus SQLite and file checkpoints.

pub mod checkpoint;
pub mod config;
pub mod database;
pub mod file_checkpoint;
pub mod loader;
pub mod read;
pub mod schema;

pub use checkpoint::SqliteCheckpointStore;
pub use config::{CheckpointKind, StorageConfig};
pub use database::SqliteDatabase;
pub use file_checkpoint::FileCheckpointStore;
pub use loader::SqliteAnalyticsLoader;
pub use read::ServingSnapshot;
