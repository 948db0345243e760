//! Auth service behavior tests
//!
//! Run the service against an in-memory implementation of the repository
//! trait so lockout, reset, and unlock behavior is exercised end to end
//! without a database.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rollcall_api::auth::models::{
    ForgotPasswordRequest, LoginRequest, ResetPasswordRequest, SignupRequest,
    UnlockAccountRequest,
};
use rollcall_api::auth::AuthService;
use rollcall_api::error::AppError;
use rollcall_api::notify::{NoopSink, NotificationEvent, NotificationSink, Notifier};
use rollcall_core::config::AuthConfig;
use rollcall_core::{Account, AccountRepository, NewAccount, Result, RollcallError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use uuid::Uuid;

// ============================================================================
// In-memory repository
// ============================================================================

#[derive(Clone, Default)]
struct MemoryStore {
    accounts: Arc<Mutex<HashMap<Uuid, Account>>>,
}

impl MemoryStore {
    fn get_by_email(&self, email: &str) -> Option<Account> {
        self.accounts
            .lock()
            .unwrap()
            .values()
            .find(|a| a.email == email)
            .cloned()
    }

    fn update_by_email(&self, email: &str, f: impl FnOnce(&mut Account)) {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .values_mut()
            .find(|a| a.email == email)
            .expect("account should exist");
        f(account);
    }
}

#[async_trait]
impl AccountRepository for MemoryStore {
    async fn create_account(&self, account: NewAccount) -> Result<Account> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.values().any(|a| a.email == account.email) {
            return Err(RollcallError::Conflict("Email already registered".into()));
        }

        let created = Account {
            id: Uuid::new_v4(),
            email: account.email,
            backup_email: account.backup_email,
            name: account.name,
            phone: account.phone,
            password_hash: account.password_hash,
            failed_login_attempts: 0,
            lock_until: None,
            reset_token: None,
            created_at: Utc::now(),
        };
        accounts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        Ok(self.get_by_email(email))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        Ok(self.accounts.lock().unwrap().get(&id).cloned())
    }

    async fn record_login_failure(
        &self,
        id: Uuid,
        attempts: i32,
        lock_until: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut accounts = self.accounts.lock().unwrap();
        if let Some(account) = accounts.get_mut(&id) {
            account.failed_login_attempts = attempts;
            account.lock_until = lock_until;
        }
        Ok(())
    }

    async fn clear_lockout(&self, id: Uuid) -> Result<()> {
        let mut accounts = self.accounts.lock().unwrap();
        if let Some(account) = accounts.get_mut(&id) {
            account.failed_login_attempts = 0;
            account.lock_until = None;
        }
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        digest: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut accounts = self.accounts.lock().unwrap();
        if let Some(account) = accounts.get_mut(&id) {
            account.reset_token = Some(rollcall_core::ResetToken {
                digest: digest.to_string(),
                expires_at,
            });
        }
        Ok(())
    }

    async fn complete_password_reset(&self, id: Uuid, password_hash: &str) -> Result<()> {
        let mut accounts = self.accounts.lock().unwrap();
        if let Some(account) = accounts.get_mut(&id) {
            account.password_hash = password_hash.to_string();
            account.reset_token = None;
        }
        Ok(())
    }
}

// ============================================================================
// Test helpers
// ============================================================================

struct ChannelSink(mpsc::UnboundedSender<NotificationEvent>);

#[async_trait]
impl NotificationSink for ChannelSink {
    async fn deliver(&self, event: &NotificationEvent) -> anyhow::Result<()> {
        self.0
            .send(event.clone())
            .map_err(|e| anyhow::anyhow!(e.to_string()))
    }
}

fn make_service(store: MemoryStore) -> AuthService<MemoryStore> {
    AuthService::new(store, &AuthConfig::default(), Notifier::spawn(Arc::new(NoopSink)))
}

fn make_service_with_events(
    store: MemoryStore,
) -> (
    AuthService<MemoryStore>,
    mpsc::UnboundedReceiver<NotificationEvent>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let service = AuthService::new(
        store,
        &AuthConfig::default(),
        Notifier::spawn(Arc::new(ChannelSink(tx))),
    );
    (service, rx)
}

fn signup(email: &str, password: &str) -> SignupRequest {
    SignupRequest {
        email: email.to_string(),
        password: password.to_string(),
        name: None,
        phone: None,
        backup_email: None,
    }
}

fn login(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    }
}

fn forgot(email: &str, backup_email: Option<&str>) -> ForgotPasswordRequest {
    ForgotPasswordRequest {
        email: email.to_string(),
        backup_email: backup_email.map(str::to_string),
    }
}

fn reset(email: &str, token: &str, new_password: &str) -> ResetPasswordRequest {
    ResetPasswordRequest {
        email: email.to_string(),
        token: token.to_string(),
        new_password: new_password.to_string(),
    }
}

fn unlock(email: &str) -> UnlockAccountRequest {
    UnlockAccountRequest {
        email: email.to_string(),
    }
}

/// Wait for the next event of the given kind from the notification worker
async fn next_event_of_kind(
    rx: &mut mpsc::UnboundedReceiver<NotificationEvent>,
    kind: &str,
) -> NotificationEvent {
    loop {
        let event = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
            .await
            .expect("notification worker should deliver promptly")
            .expect("notification channel open");
        if event.kind() == kind {
            return event;
        }
    }
}

fn token_from_link(link: &str) -> String {
    link.split("token=")
        .nth(1)
        .expect("link should carry a token")
        .split('&')
        .next()
        .unwrap()
        .to_string()
}

/// Request a reset and capture the raw token from the emitted reset link
async fn request_reset_token(
    service: &AuthService<MemoryStore>,
    rx: &mut mpsc::UnboundedReceiver<NotificationEvent>,
    email: &str,
) -> String {
    service.forgot_password(forgot(email, None)).await.unwrap();

    match next_event_of_kind(rx, "reset_requested").await {
        NotificationEvent::ResetRequested { reset_link, .. } => token_from_link(&reset_link),
        other => panic!("unexpected event: {other:?}"),
    }
}

// ============================================================================
// Registration and login
// ============================================================================

#[tokio::test]
async fn test_register_then_login_round_trip() {
    let store = MemoryStore::default();
    let service = make_service(store.clone());

    service
        .register(signup("a@x.com", "Abc123!@"))
        .await
        .expect("registration should succeed");

    let data = service
        .login(login("a@x.com", "Abc123!@"))
        .await
        .expect("login should succeed");
    assert!(!data.token.is_empty());

    // Wrong password answers InvalidCredentials and bumps the counter to 1
    let err = service
        .login(login("a@x.com", "Wrong123!@"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidCredentials));
    assert_eq!(
        store.get_by_email("a@x.com").unwrap().failed_login_attempts,
        1
    );
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let service = make_service(MemoryStore::default());

    service
        .register(signup("dup@x.com", "Abc123!@"))
        .await
        .unwrap();

    let err = service
        .register(signup("dup@x.com", "Other123!@"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn test_unknown_email_and_wrong_password_answer_identically() {
    let service = make_service(MemoryStore::default());

    service
        .register(signup("known@x.com", "Abc123!@"))
        .await
        .unwrap();

    let unknown = service
        .login(login("nobody@x.com", "Abc123!@"))
        .await
        .unwrap_err();
    let wrong = service
        .login(login("known@x.com", "Wrong123!@"))
        .await
        .unwrap_err();

    assert!(matches!(unknown, AppError::InvalidCredentials));
    assert!(matches!(wrong, AppError::InvalidCredentials));
}

#[tokio::test]
async fn test_login_missing_fields_is_rejected() {
    let service = make_service(MemoryStore::default());

    let err = service.login(login("", "Abc123!@")).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = service.login(login("a@x.com", "")).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

// ============================================================================
// Lockout
// ============================================================================

#[tokio::test]
async fn test_third_failure_locks_and_correct_password_stays_rejected() {
    let store = MemoryStore::default();
    let service = make_service(store.clone());

    service
        .register(signup("lock@x.com", "Abc123!@"))
        .await
        .unwrap();

    // Two failures: still invalid credentials
    for _ in 0..2 {
        let err = service
            .login(login("lock@x.com", "Wrong123!@"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    // Third failure crosses the threshold and locks
    let err = service
        .login(login("lock@x.com", "Wrong123!@"))
        .await
        .unwrap_err();
    match err {
        AppError::Locked { retry_after_secs } => {
            assert!((1..=30).contains(&retry_after_secs));
        }
        other => panic!("expected lockout, got {other:?}"),
    }

    let account = store.get_by_email("lock@x.com").unwrap();
    assert_eq!(account.failed_login_attempts, 3);
    assert!(account.lock_until.is_some());

    // The correct password within the window is still rejected, and the
    // rejected attempt does not bump the counter
    let err = service
        .login(login("lock@x.com", "Abc123!@"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Locked { .. }));
    assert_eq!(
        store.get_by_email("lock@x.com").unwrap().failed_login_attempts,
        3
    );
}

#[tokio::test]
async fn test_expired_lock_allows_login_and_resets_counter() {
    let store = MemoryStore::default();
    let service = make_service(store.clone());

    service
        .register(signup("expired@x.com", "Abc123!@"))
        .await
        .unwrap();

    // Simulate a lockout whose window has already elapsed
    store.update_by_email("expired@x.com", |a| {
        a.failed_login_attempts = 3;
        a.lock_until = Some(Utc::now() - Duration::seconds(1));
    });

    service
        .login(login("expired@x.com", "Abc123!@"))
        .await
        .expect("login should succeed once the lock has expired");

    let account = store.get_by_email("expired@x.com").unwrap();
    assert_eq!(account.failed_login_attempts, 0);
    assert!(account.lock_until.is_none());
}

#[tokio::test]
async fn test_unlock_clears_lockout_and_login_succeeds() {
    let store = MemoryStore::default();
    let service = make_service(store.clone());

    service
        .register(signup("unlock@x.com", "Abc123!@"))
        .await
        .unwrap();
    for _ in 0..3 {
        let _ = service.login(login("unlock@x.com", "Wrong123!@")).await;
    }
    assert!(store.get_by_email("unlock@x.com").unwrap().lock_until.is_some());

    service.unlock_account(unlock("unlock@x.com")).await.unwrap();

    let account = store.get_by_email("unlock@x.com").unwrap();
    assert_eq!(account.failed_login_attempts, 0);
    assert!(account.lock_until.is_none());

    // Immediately usable again
    service
        .login(login("unlock@x.com", "Abc123!@"))
        .await
        .expect("login should succeed after unlock");
}

#[tokio::test]
async fn test_unlock_is_a_quiet_no_op_for_unknown_email() {
    let service = make_service(MemoryStore::default());
    assert!(service.unlock_account(unlock("nobody@x.com")).await.is_ok());
}

// ============================================================================
// Forgot password
// ============================================================================

#[tokio::test]
async fn test_forgot_password_is_quiet_for_unknown_email() {
    let store = MemoryStore::default();
    let service = make_service(store.clone());

    // Same Ok as for a registered account; the handler adds the one generic
    // message on top
    assert!(service
        .forgot_password(forgot("nobody@x.com", None))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_forgot_password_issues_token_for_known_email() {
    let store = MemoryStore::default();
    let (service, mut rx) = make_service_with_events(store.clone());

    service
        .register(signup("reset@x.com", "Abc123!@"))
        .await
        .unwrap();

    service
        .forgot_password(forgot("reset@x.com", None))
        .await
        .unwrap();

    let account = store.get_by_email("reset@x.com").unwrap();
    let token = account.reset_token.expect("token state should be set");
    assert!(token.expires_at > Utc::now());
    assert!(token.expires_at <= Utc::now() + Duration::minutes(30));

    // Delivery targets the primary email and the link carries the raw token,
    // which is never equal to the stored digest
    match next_event_of_kind(&mut rx, "reset_requested").await {
        NotificationEvent::ResetRequested {
            email, reset_link, ..
        } => {
            assert_eq!(email, "reset@x.com");
            assert_ne!(token_from_link(&reset_link), token.digest);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_backup_email_mismatch_leaves_token_state_untouched() {
    let store = MemoryStore::default();
    let service = make_service(store.clone());

    let mut request = signup("backup@x.com", "Abc123!@");
    request.backup_email = Some("second@x.com".to_string());
    service.register(request).await.unwrap();

    // Mismatched backup email: generic success, no token issued
    assert!(service
        .forgot_password(forgot("backup@x.com", Some("wrong@x.com")))
        .await
        .is_ok());
    assert!(store.get_by_email("backup@x.com").unwrap().reset_token.is_none());

    // Case-insensitive match: token issued
    service
        .forgot_password(forgot("backup@x.com", Some("SECOND@X.COM")))
        .await
        .unwrap();
    assert!(store.get_by_email("backup@x.com").unwrap().reset_token.is_some());
}

#[tokio::test]
async fn test_backup_email_supplied_but_none_stored_is_quiet() {
    let store = MemoryStore::default();
    let service = make_service(store.clone());

    service
        .register(signup("nobackup@x.com", "Abc123!@"))
        .await
        .unwrap();

    assert!(service
        .forgot_password(forgot("nobackup@x.com", Some("any@x.com")))
        .await
        .is_ok());
    assert!(store.get_by_email("nobackup@x.com").unwrap().reset_token.is_none());
}

#[tokio::test]
async fn test_matched_backup_email_is_the_delivery_target() {
    let store = MemoryStore::default();
    let (service, mut rx) = make_service_with_events(store.clone());

    let mut request = signup("primary@x.com", "Abc123!@");
    request.backup_email = Some("backup@y.com".to_string());
    service.register(request).await.unwrap();

    service
        .forgot_password(forgot("primary@x.com", Some("backup@y.com")))
        .await
        .unwrap();

    match next_event_of_kind(&mut rx, "reset_requested").await {
        NotificationEvent::ResetRequested { email, .. } => {
            assert_eq!(email, "backup@y.com");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

// ============================================================================
// Reset password
// ============================================================================

#[tokio::test]
async fn test_reset_token_is_single_use() {
    let store = MemoryStore::default();
    let (service, mut rx) = make_service_with_events(store.clone());

    service
        .register(signup("once@x.com", "Abc123!@"))
        .await
        .unwrap();
    let raw = request_reset_token(&service, &mut rx, "once@x.com").await;

    service
        .reset_password(reset("once@x.com", &raw, "NewPass1!"))
        .await
        .expect("first reset should succeed");

    // Token state cleared together with the password update
    assert!(store.get_by_email("once@x.com").unwrap().reset_token.is_none());

    // New password works, old one does not
    service
        .login(login("once@x.com", "NewPass1!"))
        .await
        .expect("new password should log in");
    assert!(service.login(login("once@x.com", "Abc123!@")).await.is_err());

    // Replaying the consumed token fails
    let err = service
        .reset_password(reset("once@x.com", &raw, "Other123!@"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidToken));
}

#[tokio::test]
async fn test_expired_reset_token_is_rejected_even_on_digest_match() {
    let store = MemoryStore::default();
    let (service, mut rx) = make_service_with_events(store.clone());

    service
        .register(signup("late@x.com", "Abc123!@"))
        .await
        .unwrap();
    let raw = request_reset_token(&service, &mut rx, "late@x.com").await;

    store.update_by_email("late@x.com", |a| {
        a.reset_token.as_mut().unwrap().expires_at = Utc::now() - Duration::seconds(1);
    });

    let err = service
        .reset_password(reset("late@x.com", &raw, "NewPass1!"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidToken));
}

#[tokio::test]
async fn test_reset_with_wrong_or_absent_token_is_rejected() {
    let store = MemoryStore::default();
    let (service, mut rx) = make_service_with_events(store.clone());

    service
        .register(signup("strict@x.com", "Abc123!@"))
        .await
        .unwrap();

    // No token issued yet
    let err = service
        .reset_password(reset("strict@x.com", "bogus", "NewPass1!"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidToken));

    // Token issued, wrong raw value presented
    let _raw = request_reset_token(&service, &mut rx, "strict@x.com").await;
    let err = service
        .reset_password(reset("strict@x.com", "bogus", "NewPass1!"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidToken));

    // Unknown account answers the same way
    let err = service
        .reset_password(reset("nobody@x.com", "bogus", "NewPass1!"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidToken));
}

// ============================================================================
// Password strength
// ============================================================================

#[tokio::test]
async fn test_weak_passwords_rejected_at_register_and_reset() {
    let service = make_service(MemoryStore::default());

    for weak in ["short", "alllowercase1!", "ALLUPPER123!", "NoSpecial123"] {
        let err = service
            .register(signup("weak@x.com", weak))
            .await
            .unwrap_err();
        assert!(
            matches!(err, AppError::Validation(_)),
            "register should reject {weak:?}"
        );

        let err = service
            .reset_password(reset("weak@x.com", "token", weak))
            .await
            .unwrap_err();
        assert!(
            matches!(err, AppError::Validation(_)),
            "reset should reject {weak:?}"
        );
    }
}
