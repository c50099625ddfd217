use thiserror::Error;

/// Errors surfaced by storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to reach the backend (pool exhaustion, network, auth).
    #[error("storage connection error: {0}")]
    Connection(String),

    /// The backend rejected or failed the operation.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A stored value could not be decoded.
    #[error("storage serialization error: {0}")]
    Serialization(String),

    /// The addressed row does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
