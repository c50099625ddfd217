pub mod backend;
pub mod config;
pub mod error;
pub mod mock;
pub mod smtp;

pub use backend::{MessageBackend, OutboundMessage, SendReceipt};
pub use config::SmtpConfig;
pub use error::SendError;
pub use mock::MockBackend;
pub use smtp::SmtpBackend;
