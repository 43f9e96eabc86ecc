//! Core types, ports, and aggregation for the audience analytics ETL.

pub mod aggregate;
pub mod analytics;
pub mod error;
pub mod events;
pub mod memory;
pub mod parse;
pub mod ports;

pub use aggregate::aggregate;
pub use analytics::*;
pub use error::{Error, Result};
pub use events::*;
pub use ports::*;
