use async_trait::async_trait;

use leadflow_core::MessageChannel;

use crate::error::SendError;

/// A unified outbound message shared across all backends.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    /// Recipient address for the channel (email address, phone number).
    pub to: String,
    /// Subject line. Ignored by channels without subjects.
    pub subject: String,
    /// HTML body.
    pub html: String,
    /// Optional plain-text body.
    pub text: Option<String>,
}

/// Result of a successful send operation.
#[derive(Debug, Clone)]
pub struct SendReceipt {
    /// Provider-assigned message identifier (if available).
    pub message_id: Option<String>,
    /// Human-readable status (e.g. `"sent"`, `"queued"`).
    pub status: String,
}

/// Trait for pluggable message delivery backends.
///
/// Implementations handle the actual transport (SMTP today; an SMS
/// gateway would slot in on the same seam) while the engine's
/// send-message handler owns template rendering and address selection.
#[async_trait]
pub trait MessageBackend: Send + Sync + std::fmt::Debug {
    /// Send a message through this backend.
    async fn send(&self, message: &OutboundMessage) -> Result<SendReceipt, SendError>;

    /// Perform a health check to verify the backend is operational.
    async fn health_check(&self) -> Result<(), SendError>;

    /// The channel this backend delivers on.
    fn channel(&self) -> MessageChannel;

    /// Return the backend name (e.g. `"smtp"`, `"mock"`).
    fn backend_name(&self) -> &'static str;
}
