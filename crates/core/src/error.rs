//! Unified error types for the ETL pipeline.
//!
//! Error codes:
//! - SRC_001: Source unavailable
//! - PARSE_001: Event payload could not be decoded
//! - LOAD_001: Serving store write failed
//! - CKPT_001: Watermark read/write failed
//! - ETL_001: Run failed (wraps one of the above)
//! - ETL_409: Run already in progress
//! - CFG_001: Configuration error
//! - INT_001: Internal error

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the ETL pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("parse failure: {0}")]
    Parse(String),

    #[error("load failure: {0}")]
    Load(String),

    #[error("checkpoint failure: {0}")]
    Checkpoint(String),

    /// A fatal error raised by one of the run steps.
    #[error("ETL process failed: {0}")]
    RunFailed(Box<Error>),

    #[error("ETL run already in progress")]
    AlreadyRunning,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    pub fn checkpoint(msg: impl Into<String>) -> Self {
        Self::Checkpoint(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Wraps a step error as a failed run. Already-wrapped errors are returned as is.
    pub fn run_failed(self) -> Self {
        match self {
            Self::RunFailed(_) => self,
            other => Self::RunFailed(Box::new(other)),
        }
    }

    /// Returns the step error behind a failed run.
    pub fn cause(&self) -> &Error {
        match self {
            Self::RunFailed(inner) => inner.cause(),
            other => other,
        }
    }

    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SourceUnavailable(_) => "SRC_001",
            Self::Parse(_) => "PARSE_001",
            Self::Load(_) => "LOAD_001",
            Self::Checkpoint(_) => "CKPT_001",
            Self::RunFailed(_) => "ETL_001",
            Self::AlreadyRunning => "ETL_409",
            Self::Config(_) => "CFG_001",
            Self::Internal(_) => "INT_001",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::AlreadyRunning => 409,
            _ => 500,
        }
    }
}
