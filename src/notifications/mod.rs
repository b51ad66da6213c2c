use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::config::AppConfig;

pub mod templates;

/// Plain-text email ready for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Mail relay rejected message with status {0}")]
    Rejected(u16),
    #[error("Mailer misconfigured: {0}")]
    Config(String),
}

/// Outgoing mail transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// Sends and logs the outcome. Failures never propagate to the caller.
pub async fn deliver(mailer: &dyn Mailer, message: &EmailMessage) -> bool {
    match mailer.send(message).await {
        Ok(()) => {
            info!(to = %message.to, subject = %message.subject, "Email sent");
            true
        }
        Err(e) => {
            error!(to = %message.to, subject = %message.subject, error = %e, "Failed to send email");
            false
        }
    }
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body_len = message.body.len(),
            "Email (log transport)"
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// POSTs messages as JSON to a mail relay over verified TLS.
#[derive(Clone)]
pub struct HttpRelayMailer {
    client: reqwest::Client,
    endpoint: String,
    from: String,
}

impl HttpRelayMailer {
    pub fn new(endpoint: impl Into<String>, from: impl Into<String>) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            from: from.into(),
        })
    }
}

#[async_trait]
impl Mailer for HttpRelayMailer {
    #[instrument(skip(self, message), fields(to = %message.to))]
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let payload = RelayPayload {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            text: &message.body,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            warn!("Mail relay responded with status {}", response.status());
            Err(MailError::Rejected(response.status().as_u16()))
        }
    }
}

/// Keeps messages in memory. Used by tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every send fails.
    pub fn failing() -> Self {
        Self {
            sent: Arc::default(),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Rejected(503));
        }
        if let Ok(mut messages) = self.sent.lock() {
            messages.push(message.clone());
        }
        Ok(())
    }
}

/// Builds the mailer selected by `mail_transport`.
pub fn mailer_from_config(config: &AppConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match config.mail_transport.as_str() {
        "log" => Ok(Arc::new(LogMailer)),
        "http" => {
            let endpoint = config
                .mail_relay_url
                .clone()
                .ok_or_else(|| MailError::Config("mail_relay_url is not set".to_string()))?;
            Ok(Arc::new(HttpRelayMailer::new(
                endpoint,
                config.mail_from.clone(),
            )?))
        }
        other => Err(MailError::Config(format!(
            "unknown mail transport '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> EmailMessage {
        EmailMessage {
            to: "buyer@example.com".into(),
            subject: "Hello".into(),
            body: "Body".into(),
        }
    }

    #[tokio::test]
    async fn recording_mailer_keeps_messages() {
        let mailer = RecordingMailer::new();
        assert!(deliver(&mailer, &message()).await);
        assert_eq!(mailer.sent(), vec![message()]);
    }

    #[tokio::test]
    async fn delivery_failure_is_reported_not_raised() {
        let mailer = RecordingMailer::failing();
        assert!(!deliver(&mailer, &message()).await);
        assert!(mailer.sent().is_empty());
    }

    #[test]
    fn http_transport_requires_relay_url() {
        let mut config = AppConfig::new(
            "sqlite::memory:".into(),
            "a-test-secret-with-enough-entropy-1234567890".into(),
            "test".into(),
        );
        config.mail_transport = "http".into();
        assert!(matches!(
            mailer_from_config(&config),
            Err(MailError::Config(_))
        ));

        config.mail_relay_url = Some("https://relay.example.com/send".into());
        assert!(mailer_from_config(&config).is_ok());
    }
}
