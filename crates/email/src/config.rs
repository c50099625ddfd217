/// SMTP transport configuration.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP relay hostname.
    pub host: String,
    /// SMTP relay port.
    pub port: u16,
    /// Optional username for authentication.
    pub username: Option<String>,
    /// Optional password for authentication.
    pub password: Option<String>,
    /// Whether to negotiate STARTTLS.
    pub tls: bool,
    /// Sender address applied to every outbound message.
    pub from: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::from("localhost"),
            port: 587,
            username: None,
            password: None,
            tls: true,
            from: String::from("noreply@localhost"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let cfg = SmtpConfig::default();
        assert_eq!(cfg.port, 587);
        assert!(cfg.tls);
        assert!(cfg.username.is_none());
    }
}
