use thiserror::Error;

/// Errors raised by the persistence adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The operation did not finish within the configured bound.
    #[error("Store operation timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// The connection pool has been shut down.
    #[error("Store is closed")]
    Closed,

    /// The blocking worker running the statement panicked or was cancelled.
    #[error("Store worker failed: {0}")]
    Worker(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
