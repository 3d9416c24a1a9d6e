//! Error types for revu.

use thiserror::Error;

/// Result type alias using revu's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for revu operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Note store operation failed
    #[error("Store error: {0}")]
    Store(String),

    /// Delivery (formatter/sender) failed
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Job execution error
    #[error("Job error: {0}")]
    Job(String),

    /// A job is already running (single-flight rejection)
    #[error("a job is already running")]
    Busy,

    /// Scheduler is shutting down; no new jobs accepted
    #[error("scheduler is shutting down")]
    ShuttingDown,

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
