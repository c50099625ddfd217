use thiserror::Error;

use leadflow_core::{MessageChannel, TemplateId};
use leadflow_email::SendError;
use leadflow_queue::QueueError;
use leadflow_store::StoreError;

/// Infrastructure errors surfaced by engine operations.
///
/// These propagate to the job queue so its retry policy re-runs the
/// job. Action-level failures are [`HandlerError`]s and terminate the
/// enrollment instead.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A storage operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A queue operation failed.
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// The engine was misconfigured (missing required collaborator).
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Failures raised by action handlers.
///
/// The step executor captures these into the enrollment's error state;
/// they are never retried by the engine itself.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The lead has no contact address for the requested channel.
    #[error("lead has no {channel} address")]
    MissingAddress { channel: MessageChannel },

    /// The configured template is missing or inactive.
    #[error("message template not found: {0}")]
    TemplateNotFound(TemplateId),

    /// No delivery backend serves the requested channel.
    #[error("no message backend for channel {channel}")]
    ChannelUnavailable { channel: MessageChannel },

    /// The delivery backend rejected the message.
    #[error("message send failed: {0}")]
    Send(#[from] SendError),

    /// A lead mutation inside the handler failed.
    #[error("lead mutation failed: {0}")]
    Store(#[from] StoreError),
}
