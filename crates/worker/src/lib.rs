//! Background side of the audience ETL.
//!
//! - Pipeline (checkpoint → extract → aggregate → load → checkpoint)
//! - Scheduler (startup run plus fixed-rate runs)
//! - Push loader (HTTP delivery to a downstream dashboard service)

pub mod pipeline;
pub mod push;
pub mod scheduler;

pub use pipeline::*;
pub use push::{HttpPushLoader, LoaderConfig, LoaderKind};
pub use scheduler::*;
