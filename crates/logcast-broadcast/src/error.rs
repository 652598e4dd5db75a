use thiserror::Error;

/// Errors writing to a subscriber sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The subscriber was deregistered or its connection is gone.
    #[error("sink closed")]
    Closed,

    /// The transport rejected the write.
    #[error("write failed: {0}")]
    Write(String),

    /// The write did not complete within the configured bound.
    #[error("write timed out after {ms}ms")]
    Timeout { ms: u64 },
}

pub type Result<T> = std::result::Result<T, SinkError>;
