//! Async SMTP delivery via lettre.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use pricewatch_core::config::EmailConfig;
use pricewatch_core::{PricewatchError, Result};

/// Sends alert emails over SMTPS (implicit TLS, port 465 by default).
#[derive(Clone)]
pub struct AlertMailer {
    config: EmailConfig,
}

impl AlertMailer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Deliver one HTML alert to the configured recipient.
    ///
    /// Incomplete credentials fail here, at send time, so scraping keeps
    /// running when alerting is misconfigured.
    pub async fn send(&self, subject: &str, html_body: &str) -> Result<()> {
        if !self.config.is_complete() {
            return Err(PricewatchError::Config(
                "email credentials not configured (SENDER_EMAIL / SENDER_PASSWORD / RECIPIENT_EMAIL)"
                    .into(),
            ));
        }

        let from: Mailbox = self
            .config
            .sender
            .parse()
            .map_err(|e| PricewatchError::Alert(format!("invalid sender address: {e}")))?;
        let to: Mailbox = self
            .config
            .recipient
            .parse()
            .map_err(|e| PricewatchError::Alert(format!("invalid recipient address: {e}")))?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| PricewatchError::Alert(format!("build email: {e}")))?;

        let creds = Credentials::new(self.config.sender.clone(), self.config.password.clone());

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)
            .map_err(|e| PricewatchError::Alert(format!("SMTP relay: {e}")))?
            .port(self.config.smtp_port)
            .credentials(creds)
            .build();

        mailer
            .send(email)
            .await
            .map_err(|e| PricewatchError::Alert(format!("SMTP send: {e}")))?;

        tracing::info!("📤 Alert email sent to {}", self.config.recipient);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_incomplete_config_rejected_before_network() {
        let mailer = AlertMailer::new(EmailConfig::default());
        let err = mailer.send("subject", "<html></html>").await.unwrap_err();
        assert!(matches!(err, PricewatchError::Config(_)));
    }

    #[tokio::test]
    async fn test_bad_sender_address() {
        let mailer = AlertMailer::new(EmailConfig {
            sender: "not an address".into(),
            password: "pw".into(),
            recipient: "someone@example.com".into(),
            ..EmailConfig::default()
        });
        let err = mailer.send("subject", "body").await.unwrap_err();
        assert!(matches!(err, PricewatchError::Alert(_)));
    }
}
