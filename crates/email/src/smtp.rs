use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, error, info};

use leadflow_core::MessageChannel;

use crate::backend::{MessageBackend, OutboundMessage, SendReceipt};
use crate::config::SmtpConfig;
use crate::error::SendError;

/// SMTP delivery backend using `lettre`.
pub struct SmtpBackend {
    config: SmtpConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl std::fmt::Debug for SmtpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpBackend")
            .field("config", &self.config)
            .field("transport", &"<AsyncSmtpTransport>")
            .finish()
    }
}

impl SmtpBackend {
    /// Create an `SmtpBackend` from the given configuration.
    pub fn new(config: SmtpConfig) -> Result<Self, SendError> {
        let transport = build_transport(&config)?;
        Ok(Self { config, transport })
    }

    /// Create an `SmtpBackend` with a pre-built transport (for testing).
    #[must_use]
    pub fn with_transport(
        config: SmtpConfig,
        transport: AsyncSmtpTransport<Tokio1Executor>,
    ) -> Self {
        Self { config, transport }
    }
}

#[async_trait]
impl MessageBackend for SmtpBackend {
    async fn send(&self, message: &OutboundMessage) -> Result<SendReceipt, SendError> {
        debug!(to = %message.to, subject = %message.subject, "building SMTP message");
        let lettre_message = build_message(&self.config.from, message)?;

        info!(to = %message.to, subject = %message.subject, "sending email via SMTP");
        self.transport.send(lettre_message).await.map_err(|e| {
            error!(error = %e, "SMTP send failed");
            map_smtp_error(&e)
        })?;

        Ok(SendReceipt {
            message_id: None,
            status: "sent".to_owned(),
        })
    }

    async fn health_check(&self) -> Result<(), SendError> {
        self.transport.test_connection().await.map_err(|e| {
            error!(error = %e, "SMTP health check failed");
            SendError::Connection(format!("SMTP health check failed: {e}"))
        })?;
        Ok(())
    }

    fn channel(&self) -> MessageChannel {
        MessageChannel::Email
    }

    fn backend_name(&self) -> &'static str {
        "smtp"
    }
}

/// Build a `lettre::Message` from the unified [`OutboundMessage`].
fn build_message(from: &str, msg: &OutboundMessage) -> Result<Message, SendError> {
    let from_mailbox: Mailbox = from
        .parse()
        .map_err(|e| SendError::Configuration(format!("invalid from address: {e}")))?;

    let to_mailbox: Mailbox = msg
        .to
        .parse()
        .map_err(|e| SendError::Delivery(format!("invalid recipient address: {e}")))?;

    let builder = Message::builder()
        .from(from_mailbox)
        .to(to_mailbox)
        .subject(&msg.subject);

    let message = match &msg.text {
        Some(text) => builder
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(lettre::message::header::ContentType::TEXT_PLAIN)
                            .body(text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(lettre::message::header::ContentType::TEXT_HTML)
                            .body(msg.html.clone()),
                    ),
            )
            .map_err(|e| SendError::Delivery(format!("failed to build email: {e}")))?,
        None => builder
            .singlepart(
                SinglePart::builder()
                    .header(lettre::message::header::ContentType::TEXT_HTML)
                    .body(msg.html.clone()),
            )
            .map_err(|e| SendError::Delivery(format!("failed to build email: {e}")))?,
    };

    Ok(message)
}

/// Build an async SMTP transport from the given configuration.
fn build_transport(config: &SmtpConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>, SendError> {
    let builder = if config.tls {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| SendError::Configuration(format!("SMTP TLS relay error: {e}")))?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
    };

    let builder = builder.port(config.port);

    let builder = if let (Some(user), Some(pass)) = (&config.username, &config.password) {
        builder.credentials(Credentials::new(user.clone(), pass.clone()))
    } else {
        builder
    };

    Ok(builder.build())
}

/// Map a lettre SMTP error to the appropriate [`SendError`] variant.
fn map_smtp_error(error: &lettre::transport::smtp::Error) -> SendError {
    let message = error.to_string();

    if error.is_transient() {
        SendError::Connection(format!("transient SMTP error: {message}"))
    } else if error.is_permanent() {
        SendError::Delivery(format!("permanent SMTP error: {message}"))
    } else {
        SendError::Connection(format!("SMTP error: {message}"))
    }
}
