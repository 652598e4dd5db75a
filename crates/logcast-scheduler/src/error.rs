use logcast_store::StoreError;
use thiserror::Error;

/// Errors that end a single ingest tick. None of them stop the loop.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The record could not be stored; it is dropped and not broadcast.
    #[error("Persist failed: {0}")]
    Persist(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
