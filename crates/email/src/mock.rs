use std::sync::Mutex;

use async_trait::async_trait;

use leadflow_core::MessageChannel;

use crate::backend::{MessageBackend, OutboundMessage, SendReceipt};
use crate::error::SendError;

/// Recording backend for tests: captures every message instead of
/// delivering it, and can be told to fail.
#[derive(Debug, Default)]
pub struct MockBackend {
    sent: Mutex<Vec<OutboundMessage>>,
    fail_with: Mutex<Option<String>>,
}

impl MockBackend {
    /// Create a backend that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent send fail with the given message.
    pub fn fail_with(&self, error: impl Into<String>) {
        *self.fail_with.lock().expect("mock mutex poisoned") = Some(error.into());
    }

    /// Messages captured so far.
    #[must_use]
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().expect("mock mutex poisoned").clone()
    }

    /// Number of messages captured so far.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent.lock().expect("mock mutex poisoned").len()
    }
}

#[async_trait]
impl MessageBackend for MockBackend {
    async fn send(&self, message: &OutboundMessage) -> Result<SendReceipt, SendError> {
        if let Some(error) = self.fail_with.lock().expect("mock mutex poisoned").clone() {
            return Err(SendError::Delivery(error));
        }
        self.sent
            .lock()
            .expect("mock mutex poisoned")
            .push(message.clone());
        Ok(SendReceipt {
            message_id: Some(format!("mock-{}", self.sent_count())),
            status: "sent".to_owned(),
        })
    }

    async fn health_check(&self) -> Result<(), SendError> {
        Ok(())
    }

    fn channel(&self) -> MessageChannel {
        MessageChannel::Email
    }

    fn backend_name(&self) -> &'static str {
        "mock"
    }
}
