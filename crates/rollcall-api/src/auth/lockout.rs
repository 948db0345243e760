//! Progressive account lockout policy
//!
//! Pure decision logic over the failed-attempt counter and the clock. The
//! policy never touches storage; callers persist the transition it returns.
//! Lock expiry is lazy: an expired `lock_until` simply stops mattering at the
//! next status check, there is no background sweep.

use chrono::{DateTime, Duration, Utc};
use rollcall_core::config::AuthConfig;

/// Lockout policy parameters, injected at service construction
#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    max_failed_attempts: i32,
    lock_duration: Duration,
}

/// The persisted outcome of a failed credential check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureTransition {
    /// New value for the attempt counter
    pub attempts: i32,

    /// Lock expiry, set only when the counter reached the threshold
    pub lock_until: Option<DateTime<Utc>>,
}

impl LockoutPolicy {
    pub fn new(max_failed_attempts: i32, lock_duration_secs: i64) -> Self {
        Self {
            max_failed_attempts,
            lock_duration: Duration::seconds(lock_duration_secs),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.max_failed_attempts, config.lock_duration_secs)
    }

    /// Transition for a failed credential check: bump the counter and, once
    /// it reaches the threshold, set the lock expiry.
    pub fn on_failure(&self, current_attempts: i32, now: DateTime<Utc>) -> FailureTransition {
        let attempts = current_attempts + 1;
        let lock_until = if attempts >= self.max_failed_attempts {
            Some(now + self.lock_duration)
        } else {
            None
        };

        FailureTransition {
            attempts,
            lock_until,
        }
    }

    /// Seconds remaining on a lock, rounded up, never less than 1.
    ///
    /// Only meaningful while `until > now`; the caller checks the status
    /// first.
    pub fn remaining_secs(&self, until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
        let ms = (until - now).num_milliseconds();
        ((ms + 999) / 1000).max(1)
    }
}
