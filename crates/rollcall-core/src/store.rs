//! PostgreSQL credential and notification store
//!
//! Provides the persistence layer for accounts and the append-only
//! notification log using SQLx and PostgreSQL. All access goes through
//! parameterized queries; the schema lives in `migrations/001_schema.sql`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{Account, Notification, ResetToken, RollcallError, Result};

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store connection
    pub async fn connect(database_url: &str, pool_size: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .connect(database_url)
            .await
            .map_err(|e| RollcallError::DatabaseError(format!("PostgreSQL connection failed: {e}")))?;

        tracing::debug!(pool_size, "connected to PostgreSQL");

        Ok(Self { pool })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Account row from database
#[derive(Debug, FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    backup_email: Option<String>,
    name: Option<String>,
    phone: Option<String>,
    password_hash: String,
    failed_login_attempts: i32,
    lock_until: Option<DateTime<Utc>>,
    reset_token_hash: Option<String>,
    reset_expires: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        // The token pair is written and cleared together; a half-present
        // pair is treated as no pending reset.
        let reset_token = match (row.reset_token_hash, row.reset_expires) {
            (Some(digest), Some(expires_at)) => Some(ResetToken { digest, expires_at }),
            _ => None,
        };

        Account {
            id: row.id,
            email: row.email,
            backup_email: row.backup_email,
            name: row.name,
            phone: row.phone,
            password_hash: row.password_hash,
            failed_login_attempts: row.failed_login_attempts,
            lock_until: row.lock_until,
            reset_token,
            created_at: row.created_at,
        }
    }
}

/// Notification row from database
#[derive(Debug, FromRow)]
struct NotificationRow {
    id: Uuid,
    account_id: Uuid,
    kind: String,
    message: String,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Notification {
            id: row.id,
            account_id: row.account_id,
            kind: row.kind,
            message: row.message,
            created_at: row.created_at,
        }
    }
}

/// Fields required to create an account
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub backup_email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub password_hash: String,
}

const ACCOUNT_COLUMNS: &str = "id, email, backup_email, name, phone, password_hash, \
     failed_login_attempts, lock_until, reset_token_hash, reset_expires, created_at";

/// Trait for account credential operations
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Create an account; fails with `Conflict` if the email is taken
    async fn create_account(&self, account: NewAccount) -> Result<Account>;

    /// Find an account by its (case-sensitive) email
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Find an account by id
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>>;

    /// Persist a failed-login transition: the new attempt counter and, when
    /// the threshold was reached, the lock expiry. One statement, so the
    /// counter and lock can never be observed out of step.
    async fn record_login_failure(
        &self,
        id: Uuid,
        attempts: i32,
        lock_until: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Reset the failure counter and clear any lock (successful login or
    /// manual unlock)
    async fn clear_lockout(&self, id: Uuid) -> Result<()>;

    /// Store a reset-token digest and its expiry, replacing any prior token
    async fn set_reset_token(
        &self,
        id: Uuid,
        digest: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Set the new password hash and clear the reset-token pair in one
    /// statement
    async fn complete_password_reset(&self, id: Uuid, password_hash: &str) -> Result<()>;
}

#[async_trait]
impl AccountRepository for PgStore {
    async fn create_account(&self, account: NewAccount) -> Result<Account> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "INSERT INTO accounts (id, email, backup_email, name, phone, password_hash, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW()) \
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&account.email)
        .bind(&account.backup_email)
        .bind(&account.name)
        .bind(&account.phone)
        .bind(&account.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RollcallError::Conflict("Email already registered".to_string())
            } else {
                RollcallError::DatabaseError(format!("Failed to create account: {e}"))
            }
        })?;

        Ok(row.into())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RollcallError::DatabaseError(format!("Failed to fetch account: {e}")))?;

        Ok(row.map(Into::into))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RollcallError::DatabaseError(format!("Failed to fetch account: {e}")))?;

        Ok(row.map(Into::into))
    }

    async fn record_login_failure(
        &self,
        id: Uuid,
        attempts: i32,
        lock_until: Option<DateTime<Utc>>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE accounts SET failed_login_attempts = $1, lock_until = $2, updated_at = NOW() \
             WHERE id = $3",
        )
        .bind(attempts)
        .bind(lock_until)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| RollcallError::DatabaseError(format!("Failed to record login failure: {e}")))?;

        Ok(())
    }

    async fn clear_lockout(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE accounts SET failed_login_attempts = 0, lock_until = NULL, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| RollcallError::DatabaseError(format!("Failed to clear lockout: {e}")))?;

        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        digest: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE accounts SET reset_token_hash = $1, reset_expires = $2, updated_at = NOW() \
             WHERE id = $3",
        )
        .bind(digest)
        .bind(expires_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| RollcallError::DatabaseError(format!("Failed to store reset token: {e}")))?;

        Ok(())
    }

    async fn complete_password_reset(&self, id: Uuid, password_hash: &str) -> Result<()> {
        sqlx::query(
            "UPDATE accounts SET password_hash = $1, reset_token_hash = NULL, \
             reset_expires = NULL, updated_at = NOW() WHERE id = $2",
        )
        .bind(password_hash)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| RollcallError::DatabaseError(format!("Failed to complete reset: {e}")))?;

        Ok(())
    }
}

/// Trait for the append-only notification log
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Append a notification for an account
    async fn append_notification(
        &self,
        account_id: Uuid,
        kind: &str,
        message: &str,
    ) -> Result<Notification>;

    /// List notifications for an account, newest first
    async fn list_notifications(&self, account_id: Uuid, limit: i64) -> Result<Vec<Notification>>;
}

#[async_trait]
impl NotificationRepository for PgStore {
    async fn append_notification(
        &self,
        account_id: Uuid,
        kind: &str,
        message: &str,
    ) -> Result<Notification> {
        let row = sqlx::query_as::<_, NotificationRow>(
            "INSERT INTO notifications (id, account_id, kind, message, created_at) \
             VALUES ($1, $2, $3, $4, NOW()) \
             RETURNING id, account_id, kind, message, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(kind)
        .bind(message)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RollcallError::DatabaseError(format!("Failed to append notification: {e}")))?;

        Ok(row.into())
    }

    async fn list_notifications(&self, account_id: Uuid, limit: i64) -> Result<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            "SELECT id, account_id, kind, message, created_at FROM notifications \
             WHERE account_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(account_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RollcallError::DatabaseError(format!("Failed to list notifications: {e}")))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Check for a PostgreSQL unique-constraint violation (SQLSTATE 23505)
fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}
