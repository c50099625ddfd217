use thiserror::Error;

/// Errors surfaced by queue backends.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Failed to reach the broker.
    #[error("queue connection error: {0}")]
    Connection(String),

    /// The broker rejected or failed the operation.
    #[error("queue backend error: {0}")]
    Backend(String),

    /// A stored job could not be decoded.
    #[error("queue serialization error: {0}")]
    Serialization(String),

    /// The queue has been closed and accepts no further work.
    #[error("queue closed")]
    Closed,
}

impl From<serde_json::Error> for QueueError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
