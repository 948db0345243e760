//! Rollcall Core - Domain models, configuration, and the credential store
//!
//! This crate defines the abstractions shared across the rollcall backend:
//! - Account model with its lockout and reset-token state
//! - Common error types
//! - Configuration management
//! - Credential and notification storage (PostgreSQL)

pub mod config;
pub mod store;

pub use config::{AppConfig, AuthConfig, ConfigError, DatabaseConfig, EmailConfig, ServerConfig};
pub use store::{AccountRepository, NewAccount, NotificationRepository, PgStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for rollcall operations
#[derive(Error, Debug)]
pub enum RollcallError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RollcallError>;

// ============================================================================
// Account Model
// ============================================================================

/// Authentication status of an account at a given instant.
///
/// Derived from the stored `lock_until` timestamp rather than persisted as a
/// column; the lock expires lazily once `now` passes `until`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Locked { until: DateTime<Utc> },
}

/// Pending password-reset token state.
///
/// The digest and expiry are set together when a reset is requested and
/// cleared together when the reset completes. The raw token itself is never
/// stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetToken {
    /// One-way digest of the raw token (hex SHA-256)
    pub digest: String,

    /// Instant after which the token is no longer accepted
    pub expires_at: DateTime<Utc>,
}

impl ResetToken {
    /// Check whether the token has expired at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Account record
///
/// Represents a registered user with their credential digest, lockout
/// counters, and any pending reset-token state. Maps to the `accounts` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique account identifier, assigned at creation
    pub id: Uuid,

    /// Email address (unique, used for login)
    pub email: String,

    /// Optional secondary contact, used only as a reset delivery target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_email: Option<String>,

    /// Display name (no behavioral effect)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Phone number (no behavioral effect)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    /// Hashed password (Argon2id, PHC string format).
    /// Never serialized in API responses.
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Consecutive failed login attempts since the last success or unlock
    pub failed_login_attempts: i32,

    /// Account locked until this time, if a lockout is in effect
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_until: Option<DateTime<Utc>>,

    /// Pending reset token, if a password reset has been requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<ResetToken>,

    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Resolve the account's auth status at `now`.
    ///
    /// A `lock_until` in the past counts as `Active`; expired locks are never
    /// actively cleared, only superseded by the next counter update.
    pub fn status(&self, now: DateTime<Utc>) -> AccountStatus {
        match self.lock_until {
            Some(until) if until > now => AccountStatus::Locked { until },
            _ => AccountStatus::Active,
        }
    }

    /// Whether the account is locked at `now`
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        matches!(self.status(now), AccountStatus::Locked { .. })
    }
}

// ============================================================================
// Notification Model
// ============================================================================

/// A recorded user-facing event.
///
/// Rows are append-only and retrieved newest-first for an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub account_id: Uuid,
    pub kind: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
