pub mod azure;

use std::fmt;

use async_trait::async_trait;

use crate::config::EmailConfig;
use crate::errors::NotifyError;

pub use azure::AzureEmailNotifier;

pub const ALERT_SUBJECT: &str = "Alerta de ubicación recibida";

/// Identifier the email provider assigned to an accepted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageId(pub String);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub subject: String,
    pub html: String,
    pub sender: String,
    pub recipients: Vec<String>,
}

impl EmailMessage {
    /// Address a message using the configured sender and recipients.
    pub fn compose(
        config: &EmailConfig,
        subject: impl Into<String>,
        html: impl Into<String>,
    ) -> Result<Self, NotifyError> {
        let sender = config
            .sender_address
            .clone()
            .ok_or_else(|| NotifyError::Configuration("SENDER_ADDRESS is not set".into()))?;
        if config.recipients.is_empty() {
            return Err(NotifyError::Configuration(
                "RECIPIENT_ADDRESS is not set".into(),
            ));
        }

        Ok(Self {
            subject: subject.into(),
            html: html.into(),
            sender,
            recipients: config.recipients.clone(),
        })
    }
}

/// Outbound email delivery. `send` returns once the provider has accepted
/// or refused the message.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<MessageId, NotifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_requires_sender_and_recipients() {
        let mut config = EmailConfig::default();
        let err = EmailMessage::compose(&config, ALERT_SUBJECT, "<pre></pre>").unwrap_err();
        assert_eq!(err.to_string(), "SENDER_ADDRESS is not set");

        config.sender_address = Some("alerts@example.com".into());
        let err = EmailMessage::compose(&config, ALERT_SUBJECT, "<pre></pre>").unwrap_err();
        assert_eq!(err.to_string(), "RECIPIENT_ADDRESS is not set");

        config.recipients = vec!["a@example.com".into(), "b@example.com".into()];
        let message = EmailMessage::compose(&config, ALERT_SUBJECT, "<pre></pre>").unwrap();
        assert_eq!(message.subject, "Alerta de ubicación recibida");
        assert_eq!(message.sender, "alerts@example.com");
        assert_eq!(message.recipients.len(), 2);
    }
}
