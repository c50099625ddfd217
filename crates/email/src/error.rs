use thiserror::Error;

/// Errors surfaced by message delivery backends.
#[derive(Debug, Error)]
pub enum SendError {
    /// The backend was misconfigured (bad sender address, missing relay).
    #[error("message backend configuration error: {0}")]
    Configuration(String),

    /// Failed to reach the delivery service; likely transient.
    #[error("message backend connection error: {0}")]
    Connection(String),

    /// The service rejected the message permanently.
    #[error("message delivery failed: {0}")]
    Delivery(String),
}
