//! Notification gateway: delivers one message to many customers

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::str::FromStr;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
};

/// Delivers a message body to a list of addresses.
/// Success means the message was handed off, not that it was read.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_messages(&self, body: &str, recipients: &[String]) -> AppResult<()>;
}

/// Sends notifications through an SMTP relay
#[derive(Clone)]
pub struct SmtpNotifier {
    config: EmailConfig,
}

impl SmtpNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, body: &str, recipients: &[String]) -> AppResult<Option<Message>> {
        let from_name = self.config.smtp_from_name.as_deref().unwrap_or("Biblion");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Notification(format!("Invalid from address: {}", e)))?;

        let mut builder = Message::builder()
            .from(from_mailbox)
            .subject(self.config.overdue_subject.as_str());

        let mut accepted = 0usize;
        for recipient in recipients {
            match Mailbox::from_str(recipient) {
                Ok(mailbox) => {
                    builder = builder.to(mailbox);
                    accepted += 1;
                }
                Err(e) => tracing::warn!("Skipping invalid recipient {}: {}", recipient, e),
            }
        }
        if accepted == 0 {
            return Ok(None);
        }

        let email = builder
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(format!(
                                r#"<html><body><p>{}</p></body></html>"#,
                                body.replace('\n', "<br>")
                            )),
                    ),
            )
            .map_err(|e| AppError::Notification(format!("Failed to build email: {}", e)))?;

        Ok(Some(email))
    }

    fn build_transport(&self) -> AppResult<SmtpTransport> {
        let mailer_builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Notification(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer_builder = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            mailer_builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer_builder
        };

        Ok(mailer_builder.build())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_messages(&self, body: &str, recipients: &[String]) -> AppResult<()> {
        let Some(email) = self.build_message(body, recipients)? else {
            tracing::warn!("No valid recipients, nothing sent");
            return Ok(());
        };
        let mailer = self.build_transport()?;

        // lettre's SmtpTransport blocks
        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::Internal(format!("Email task failed: {}", e)))?
            .map_err(|e| AppError::Notification(format!("Failed to send email: {}", e)))?;

        tracing::info!("Sent notification to {} recipient(s)", recipients.len());
        Ok(())
    }
}

/// Logs notifications instead of sending them, for setups without SMTP
#[derive(Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_messages(&self, body: &str, recipients: &[String]) -> AppResult<()> {
        tracing::info!(
            recipients = ?recipients,
            "Email delivery disabled, notification not sent: {}",
            body
        );
        Ok(())
    }
}
