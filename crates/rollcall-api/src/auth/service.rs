//! Authentication service layer
//!
//! Business logic for registration, login with progressive lockout,
//! token-based password reset, and manual unlock. Storage is reached through
//! the [`AccountRepository`] trait and policy parameters are injected at
//! construction, so the service runs unchanged against a test store or with
//! alternate lockout settings.
//!
//! Every operation follows the same shape: validate input, read the store,
//! apply policy, write the store, emit a best-effort notification.

use chrono::{Duration, Utc};
use rollcall_core::config::AuthConfig;
use rollcall_core::{AccountRepository, AccountStatus, NewAccount};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::jwt::{self, JwtConfig};
use super::lockout::LockoutPolicy;
use super::models::{
    AccountInfo, ForgotPasswordRequest, LoginData, LoginRequest, ResetPasswordRequest,
    SignupRequest, UnlockAccountRequest,
};
use super::password::{hash_password, validate_password_strength, verify_password};
use super::token;
use crate::error::AppError;
use crate::notify::{NotificationEvent, Notifier};

/// Authentication service
pub struct AuthService<R> {
    repo: R,
    policy: LockoutPolicy,
    jwt: JwtConfig,
    reset_validity: Duration,
    frontend_origin: String,
    notifier: Notifier,
}

impl<R: AccountRepository> AuthService<R> {
    /// Create a new authentication service with an injected policy
    pub fn new(repo: R, config: &AuthConfig, notifier: Notifier) -> Self {
        Self {
            repo,
            policy: LockoutPolicy::from_config(config),
            jwt: JwtConfig::from_auth(config),
            reset_validity: Duration::minutes(config.reset_token_minutes),
            frontend_origin: config.frontend_origin.clone(),
            notifier,
        }
    }

    /// Register a new account.
    ///
    /// Fails with `Conflict` when the email is taken and `Validation` when
    /// the email is missing or the password is too weak.
    pub async fn register(&self, request: SignupRequest) -> Result<AccountInfo, AppError> {
        if request.email.is_empty() {
            return Err(AppError::Validation("Email is required".to_string()));
        }
        if !request.email.contains('@') {
            return Err(AppError::Validation("Invalid email format".to_string()));
        }
        validate_password_strength(&request.password).map_err(AppError::Validation)?;

        let password_hash = hash_password(&request.password)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))?;

        let account = self
            .repo
            .create_account(NewAccount {
                email: request.email,
                backup_email: request.backup_email,
                name: request.name,
                phone: request.phone,
                password_hash,
            })
            .await?;

        info!(
            target: "audit",
            account_id = %account.id,
            email = %account.email,
            "account registered"
        );
        self.notifier.notify(NotificationEvent::Welcome {
            account_id: account.id,
            email: account.email.clone(),
        });

        Ok(AccountInfo::from(&account))
    }

    /// Authenticate and issue an access token.
    ///
    /// The lock check runs strictly before password verification: a login
    /// attempt against a locked account is rejected with the remaining
    /// seconds and does not touch the attempt counter, even when the
    /// password is correct.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginData, AppError> {
        if request.email.is_empty() || request.password.is_empty() {
            return Err(AppError::Validation(
                "Email and password are required".to_string(),
            ));
        }

        // Unknown email and wrong password answer identically
        let account = self
            .repo
            .find_by_email(&request.email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let now = Utc::now();
        if let AccountStatus::Locked { until } = account.status(now) {
            warn!(
                target: "audit",
                account_id = %account.id,
                "login rejected: account locked"
            );
            return Err(AppError::Locked {
                retry_after_secs: self.policy.remaining_secs(until, now),
            });
        }

        let password_valid = verify_password(&request.password, &account.password_hash)
            .map_err(|e| AppError::Internal(format!("Failed to verify password: {e}")))?;

        if !password_valid {
            let transition = self.policy.on_failure(account.failed_login_attempts, now);
            self.repo
                .record_login_failure(account.id, transition.attempts, transition.lock_until)
                .await?;

            return match transition.lock_until {
                Some(until) => {
                    warn!(
                        target: "audit",
                        account_id = %account.id,
                        failed_attempts = transition.attempts,
                        locked_until = %until,
                        "account locked"
                    );
                    self.notifier.notify(NotificationEvent::AccountLocked {
                        account_id: account.id,
                        email: account.email.clone(),
                        until,
                    });
                    Err(AppError::Locked {
                        retry_after_secs: self.policy.remaining_secs(until, now),
                    })
                }
                None => {
                    warn!(
                        target: "audit",
                        account_id = %account.id,
                        failed_attempts = transition.attempts,
                        "login failed"
                    );
                    Err(AppError::InvalidCredentials)
                }
            };
        }

        // Any successful login resets the counter and clears a stale lock
        self.repo.clear_lockout(account.id).await?;

        let token = jwt::generate_access_token(&self.jwt, account.id, &account.email)
            .map_err(|e| AppError::Internal(format!("Failed to generate access token: {e}")))?;

        info!(target: "audit", account_id = %account.id, "login succeeded");
        self.notifier.notify(NotificationEvent::LoginSucceeded {
            account_id: account.id,
            email: account.email.clone(),
        });

        Ok(LoginData { token })
    }

    /// Issue a password-reset token and hand the link to the notifier.
    ///
    /// Deliberately quiet: unknown emails and backup-email mismatches return
    /// `Ok(())` without touching token state, so the HTTP response never
    /// reveals whether an account exists. When a backup email is supplied it
    /// must match the stored one (case-insensitive) before anything is
    /// persisted, and delivery then targets the backup address.
    pub async fn forgot_password(&self, request: ForgotPasswordRequest) -> Result<(), AppError> {
        if request.email.is_empty() {
            return Err(AppError::Validation("Email is required".to_string()));
        }

        let Some(account) = self.repo.find_by_email(&request.email).await? else {
            debug!(target: "audit", "password reset requested for unknown email");
            return Ok(());
        };

        let target = match &request.backup_email {
            None => account.email.clone(),
            Some(requested) => match &account.backup_email {
                Some(stored) if stored.eq_ignore_ascii_case(requested) => stored.clone(),
                _ => {
                    debug!(
                        target: "audit",
                        account_id = %account.id,
                        "password reset rejected: backup email mismatch"
                    );
                    return Ok(());
                }
            },
        };

        let issued = token::issue(self.reset_validity);
        self.repo
            .set_reset_token(account.id, &issued.digest, issued.expires_at)
            .await?;

        let reset_link = format!(
            "{}/reset-password?token={}&email={}",
            self.frontend_origin.trim_end_matches('/'),
            issued.raw,
            account.email
        );

        info!(
            target: "audit",
            account_id = %account.id,
            expires_at = %issued.expires_at,
            "password reset token issued"
        );
        self.notifier.notify(NotificationEvent::ResetRequested {
            account_id: account.id,
            email: target,
            reset_link,
        });

        Ok(())
    }

    /// Consume a reset token and set a new password.
    ///
    /// A missing account, absent token state, digest mismatch, and expiry
    /// all answer with the same `InvalidToken`. Success clears the token
    /// pair in the same statement that stores the new hash, so a token can
    /// never be replayed.
    pub async fn reset_password(&self, request: ResetPasswordRequest) -> Result<(), AppError> {
        if request.email.is_empty() || request.token.is_empty() || request.new_password.is_empty()
        {
            return Err(AppError::Validation(
                "Email, token, and new password are required".to_string(),
            ));
        }
        validate_password_strength(&request.new_password).map_err(AppError::Validation)?;

        let Some(account) = self.repo.find_by_email(&request.email).await? else {
            return Err(AppError::InvalidToken);
        };

        let Some(reset) = &account.reset_token else {
            return Err(AppError::InvalidToken);
        };
        if !token::matches(&request.token, &reset.digest) {
            warn!(target: "audit", account_id = %account.id, "reset token mismatch");
            return Err(AppError::InvalidToken);
        }
        if reset.is_expired(Utc::now()) {
            warn!(target: "audit", account_id = %account.id, "reset token expired");
            return Err(AppError::InvalidToken);
        }

        let password_hash = hash_password(&request.new_password)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))?;

        self.repo
            .complete_password_reset(account.id, &password_hash)
            .await?;

        info!(target: "audit", account_id = %account.id, "password reset completed");
        self.notifier.notify(NotificationEvent::PasswordChanged {
            account_id: account.id,
            email: account.email.clone(),
        });

        Ok(())
    }

    /// Clear the failure counter and any lock for an account.
    ///
    /// Idempotent, and a silent no-op for unknown emails to match the
    /// anti-enumeration stance of the other quiet paths.
    pub async fn unlock_account(&self, request: UnlockAccountRequest) -> Result<(), AppError> {
        if request.email.is_empty() {
            return Err(AppError::Validation("Email is required".to_string()));
        }

        let Some(account) = self.repo.find_by_email(&request.email).await? else {
            debug!(target: "audit", "unlock requested for unknown email");
            return Ok(());
        };

        self.repo.clear_lockout(account.id).await?;

        info!(target: "audit", account_id = %account.id, "account unlocked");
        self.notifier.notify(NotificationEvent::AccountUnlocked {
            account_id: account.id,
            email: account.email.clone(),
        });

        Ok(())
    }

    /// Fetch the profile for an authenticated account
    pub async fn profile(&self, account_id: Uuid) -> Result<AccountInfo, AppError> {
        let account = self
            .repo
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Account".to_string()))?;

        Ok(AccountInfo::from(&account))
    }
}
