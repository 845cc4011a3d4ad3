//! Common error types for the check production pipeline

use thiserror::Error;

/// Common result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared across the pipeline services.
///
/// `Config` and `UnsupportedBank` are configuration errors: fatal, never
/// retried. `Validation` is a caller-visible selection/validation failure.
/// `Io` is the only class the file transfer service treats as transient.
/// `Conflict` surfaces concurrency losers (duplicate run start, stale
/// reprint update) so the caller can re-fetch and decide.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No MICR formatter registered for a bank routing number
    #[error("Unsupported bank routing number: {0}")]
    UnsupportedBank(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input or selection (empty id list, missing distribution, empty positive pay)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Concurrent update lost the race (duplicate run, stale reprint)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// File transfer failed after exhausting retries
    #[error("File transfer failed: {0}")]
    Transfer(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Transient errors are worth retrying; everything else fails fast.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Io(_))
    }
}
