//! Application state management

use rollcall_core::config::AppConfig;
use rollcall_core::PgStore;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::auth::{AuthService, JwtConfig};
use crate::mailer::Mailer;
use crate::notify::{Notifier, PgNotificationSink};

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Credential and notification store
    pub store: PgStore,
    /// Auth service wired to the store
    pub auth: AuthService<PgStore>,
    /// Access token configuration (used by the auth middleware)
    pub jwt: JwtConfig,
    /// Server start time
    start_time: Instant,
    /// Request counter
    request_count: AtomicU64,
    /// Ready status
    is_ready: AtomicBool,
}

impl AppState {
    /// Create the application state and spawn the notification worker.
    ///
    /// Must be called within a tokio runtime.
    pub fn new(config: AppConfig, store: PgStore, mailer: Arc<dyn Mailer>) -> Self {
        let sink = Arc::new(PgNotificationSink::new(store.clone(), mailer));
        let notifier = Notifier::spawn(sink);

        let jwt = JwtConfig::from_auth(&config.auth);
        let auth = AuthService::new(store.clone(), &config.auth, notifier);

        Self {
            config,
            store,
            auth,
            jwt,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            is_ready: AtomicBool::new(true),
        }
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check if service is ready
    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }

    /// Set ready status
    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::SeqCst)
    }
}
