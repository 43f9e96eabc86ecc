//! Health, metrics, and tracing setup for the audience ETL.
//!
//! Everything is in-process: health and metrics live in global registries
//! that the HTTP layer reads.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
