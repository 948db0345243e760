//! Outbound email delivery
//!
//! SMTP transport behind a small trait so the notifier can be wired with a
//! no-op in tests and in deployments without mail credentials. Delivery is
//! always best-effort; callers log failures and move on.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use rollcall_core::config::EmailConfig;
use std::sync::Arc;
use thiserror::Error;

/// Email delivery errors
#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid email address: {0}")]
    Address(String),

    #[error("Failed to build message: {0}")]
    Message(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),
}

/// Outbound email sender
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// SMTP-backed mailer using lettre
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build from configuration; returns `None` when no SMTP host is set
    pub fn from_config(config: &EmailConfig) -> Result<Option<Self>, MailError> {
        let Some(host) = &config.smtp_host else {
            return Ok(None);
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let from = parse_mailbox(&config.from_address)?;

        Ok(Some(Self {
            transport: builder.build(),
            from,
        }))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(to)?)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| MailError::Message(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        Ok(())
    }
}

/// Mailer that only logs; used when SMTP is unconfigured and in tests
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), MailError> {
        tracing::debug!(to = %to, subject = %subject, "email delivery disabled; dropping message");
        Ok(())
    }
}

/// Build the mailer for the current configuration, degrading to a no-op when
/// SMTP is unconfigured or misconfigured.
pub fn build_mailer(config: &EmailConfig) -> Arc<dyn Mailer> {
    match SmtpMailer::from_config(config) {
        Ok(Some(mailer)) => Arc::new(mailer),
        Ok(None) => {
            tracing::info!("SMTP not configured; outbound email disabled");
            Arc::new(NoopMailer)
        }
        Err(e) => {
            tracing::warn!(error = %e, "invalid SMTP configuration; outbound email disabled");
            Arc::new(NoopMailer)
        }
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| MailError::Address(format!("{address}: {e}")))
}
