//! ClickHouse adapter for the gaze event source.

pub mod client;
pub mod config;
pub mod extract;
pub mod health;
pub mod insert;
pub mod query;
pub mod schema;

pub use client::*;
pub use config::*;
pub use extract::ClickHouseEventSource;
