//! Best-effort notification delivery
//!
//! Auth operations emit events here and never wait on the outcome: the
//! notifier pushes onto a bounded queue and a worker task records the event
//! in the notification log and, for reset requests, attempts email delivery.
//! A full queue or a failing sink is logged and otherwise ignored, so a
//! notifier outage structurally cannot affect an operation's result.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rollcall_core::{NotificationRepository, PgStore};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::mailer::Mailer;

/// Queue depth before events are dropped
const NOTIFY_QUEUE_DEPTH: usize = 256;

/// User-facing auth events
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotificationEvent {
    Welcome {
        account_id: Uuid,
        email: String,
    },
    LoginSucceeded {
        account_id: Uuid,
        email: String,
    },
    ResetRequested {
        account_id: Uuid,
        /// Delivery target (primary or verified backup email)
        email: String,
        reset_link: String,
    },
    PasswordChanged {
        account_id: Uuid,
        email: String,
    },
    AccountLocked {
        account_id: Uuid,
        email: String,
        until: DateTime<Utc>,
    },
    AccountUnlocked {
        account_id: Uuid,
        email: String,
    },
}

/// Email content derived from an event
pub struct EmailPayload {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl NotificationEvent {
    pub fn account_id(&self) -> Uuid {
        match self {
            Self::Welcome { account_id, .. }
            | Self::LoginSucceeded { account_id, .. }
            | Self::ResetRequested { account_id, .. }
            | Self::PasswordChanged { account_id, .. }
            | Self::AccountLocked { account_id, .. }
            | Self::AccountUnlocked { account_id, .. } => *account_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Welcome { .. } => "welcome",
            Self::LoginSucceeded { .. } => "login",
            Self::ResetRequested { .. } => "reset_requested",
            Self::PasswordChanged { .. } => "password_changed",
            Self::AccountLocked { .. } => "account_locked",
            Self::AccountUnlocked { .. } => "account_unlocked",
        }
    }

    /// Text recorded in the notification log.
    ///
    /// Never includes the raw reset token; the link only travels by email.
    pub fn message(&self) -> String {
        match self {
            Self::Welcome { .. } => {
                "Welcome to rollcall! Your account has been created.".to_string()
            }
            Self::LoginSucceeded { .. } => "New sign-in to your account.".to_string(),
            Self::ResetRequested { .. } => {
                "A password reset was requested for your account.".to_string()
            }
            Self::PasswordChanged { .. } => "Your password was changed.".to_string(),
            Self::AccountLocked { until, .. } => format!(
                "Your account was temporarily locked after too many failed sign-in attempts (until {until})."
            ),
            Self::AccountUnlocked { .. } => "Your account has been unlocked.".to_string(),
        }
    }

    /// Email to send for this event, if any
    pub fn email_payload(&self) -> Option<EmailPayload> {
        match self {
            Self::ResetRequested {
                email, reset_link, ..
            } => Some(EmailPayload {
                to: email.clone(),
                subject: "Reset your rollcall password".to_string(),
                body: format!(
                    "A password reset was requested for your rollcall account.\n\n\
                     Use the link below within 30 minutes to choose a new password:\n\n\
                     {reset_link}\n\n\
                     If you did not request this, you can ignore this message."
                ),
            }),
            _ => None,
        }
    }
}

/// Delivery backend for notification events
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, event: &NotificationEvent) -> anyhow::Result<()>;
}

/// Records events in the notifications table and sends any email payload
pub struct PgNotificationSink {
    store: PgStore,
    mailer: Arc<dyn Mailer>,
}

impl PgNotificationSink {
    pub fn new(store: PgStore, mailer: Arc<dyn Mailer>) -> Self {
        Self { store, mailer }
    }
}

#[async_trait]
impl NotificationSink for PgNotificationSink {
    async fn deliver(&self, event: &NotificationEvent) -> anyhow::Result<()> {
        self.store
            .append_notification(event.account_id(), event.kind(), &event.message())
            .await?;

        if let Some(email) = event.email_payload() {
            self.mailer
                .send(&email.to, &email.subject, &email.body)
                .await?;
        }

        Ok(())
    }
}

/// Sink that discards events; used in tests
pub struct NoopSink;

#[async_trait]
impl NotificationSink for NoopSink {
    async fn deliver(&self, event: &NotificationEvent) -> anyhow::Result<()> {
        debug!(kind = event.kind(), "discarding notification");
        Ok(())
    }
}

/// Handle for emitting notification events from request handlers
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<NotificationEvent>,
}

impl Notifier {
    /// Spawn the delivery worker and return the emitting handle.
    ///
    /// Must be called within a tokio runtime.
    pub fn spawn(sink: Arc<dyn NotificationSink>) -> Self {
        let (tx, mut rx) = mpsc::channel::<NotificationEvent>(NOTIFY_QUEUE_DEPTH);

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = sink.deliver(&event).await {
                    warn!(
                        target: "audit",
                        kind = event.kind(),
                        account_id = %event.account_id(),
                        error = %e,
                        "notification delivery failed"
                    );
                }
            }
        });

        Self { tx }
    }

    /// Emit an event without waiting. Drops the event (with a warning) when
    /// the queue is full or the worker is gone.
    pub fn notify(&self, event: NotificationEvent) {
        if let Err(e) = self.tx.try_send(event) {
            warn!(target: "audit", error = %e, "notification dropped");
        }
    }
}
