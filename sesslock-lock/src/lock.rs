//! Per-session distributed lock.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sesslock_redis::{KeyValueStore, StoreError, secs_f64};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::backoff::BackoffPolicy;

/// Lock errors.
#[derive(Debug, Error)]
pub enum LockError {
    /// The lock key was already gone when we tried to free it.
    #[error("Lock not held: {0}")]
    NotHeld(String),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result of an acquisition attempt.
///
/// Acquisition never fails outright: when the retry budget runs out the
/// caller gets [`LockOutcome::Degraded`] and proceeds without protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOutcome {
    /// The lock was created by this handle.
    Acquired {
        /// Attempts it took, starting at 1.
        attempts: u32,
    },
    /// This handle already held the lock; its TTL was extended.
    Refreshed,
    /// Every attempt failed; nothing is held.
    Degraded {
        /// Attempts made.
        attempts: u32,
    },
}

impl LockOutcome {
    /// Whether the handle holds the lock after this outcome.
    pub fn is_held(&self) -> bool {
        !matches!(self, Self::Degraded { .. })
    }
}

/// Lock timing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockConfig {
    /// TTL of a freshly created lock, and of the refresh done on write.
    #[serde(with = "secs_f64", default = "default_ttl")]
    pub ttl: Duration,
    /// TTL set when a handle re-acquires a lock it already holds.
    #[serde(with = "secs_f64", default = "default_refresh_ttl")]
    pub refresh_ttl: Duration,
    /// Retry budget and delays.
    #[serde(default)]
    pub backoff: BackoffPolicy,
}

fn default_ttl() -> Duration {
    Duration::from_secs(30)
}

fn default_refresh_ttl() -> Duration {
    Duration::from_secs(300)
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            ttl: default_ttl(),
            refresh_ttl: default_refresh_ttl(),
            backoff: BackoffPolicy::default(),
        }
    }
}

impl LockConfig {
    /// Set the lock TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the refresh TTL.
    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    /// Set the backoff policy.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Lock handle for one request.
///
/// Holds at most one lock key at a time. The store is passed into every
/// call; the handle itself only remembers which key it owns.
///
/// # Examples
///
/// ```rust,ignore
/// use sesslock_lock::{LockConfig, SessionLock};
///
/// let mut lock = SessionLock::new(LockConfig::default());
/// let outcome = lock.acquire(&store, "ci_session:abc:lock").await;
///
/// if outcome.is_held() {
///     // Critical section
/// }
///
/// lock.release(&store).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct SessionLock {
    config: LockConfig,
    key: Option<String>,
}

impl SessionLock {
    /// Create a handle that holds nothing.
    pub fn new(config: LockConfig) -> Self {
        Self { config, key: None }
    }

    /// Get the configuration.
    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Whether a lock is held.
    pub fn is_held(&self) -> bool {
        self.key.is_some()
    }

    /// The held lock key.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Acquire `lock_key`, retrying within the backoff budget.
    pub async fn acquire<S>(&mut self, store: &S, lock_key: &str) -> LockOutcome
    where
        S: KeyValueStore + ?Sized,
    {
        if self.key.as_deref() == Some(lock_key) {
            match store.expire(lock_key, self.config.refresh_ttl).await {
                Ok(true) => debug!(key = %lock_key, "Refreshed held lock"),
                Ok(false) => warn!(key = %lock_key, "Held lock expired before refresh"),
                Err(e) => warn!(key = %lock_key, error = %e, "Failed to refresh held lock"),
            }
            return LockOutcome::Refreshed;
        }

        if self.key.is_some()
            && let Err(e) = self.release(store).await {
                warn!(error = %e, "Dropping stale lock before acquiring {}", lock_key);
                self.forget();
            }

        let token = Utc::now().timestamp().to_string();
        let policy = self.config.backoff.clone();
        let ttl = self.config.ttl;
        let mut sleeps = 0;

        for attempt in 1..=policy.max_attempts {
            match store.set_if_absent(lock_key, &token, ttl).await {
                Ok(true) => {
                    debug!(key = %lock_key, attempts = attempt, "Acquired session lock");
                    self.key = Some(lock_key.to_string());
                    return LockOutcome::Acquired { attempts: attempt };
                }
                Ok(false) => {
                    debug!(key = %lock_key, attempt, "Session lock is held elsewhere");
                }
                Err(e) => {
                    debug!(key = %lock_key, attempt, error = %e, "Lock attempt failed");
                }
            }

            if attempt == policy.max_attempts {
                break;
            }

            // Released between SET and EXISTS: go again without waiting
            if let Ok(false) = store.exists(lock_key).await {
                continue;
            }

            tokio::time::sleep(policy.delay_for_sleep(sleeps)).await;
            sleeps += 1;
        }

        debug!(
            key = %lock_key,
            attempts = policy.max_attempts,
            "Proceeding without session lock"
        );
        LockOutcome::Degraded {
            attempts: policy.max_attempts,
        }
    }

    /// Reset the TTL of the held lock.
    ///
    /// Returns `Ok(false)` if nothing is held or the key is already gone.
    pub async fn extend<S>(&self, store: &S, ttl: Duration) -> Result<bool, LockError>
    where
        S: KeyValueStore + ?Sized,
    {
        match &self.key {
            Some(key) => Ok(store.expire(key, ttl).await?),
            None => Ok(false),
        }
    }

    /// Delete the held lock.
    ///
    /// On failure the handle keeps believing it holds the key. Releasing when
    /// nothing is held succeeds.
    pub async fn release<S>(&mut self, store: &S) -> Result<(), LockError>
    where
        S: KeyValueStore + ?Sized,
    {
        let Some(key) = self.key.clone() else {
            return Ok(());
        };

        match store.delete(&key).await {
            Ok(0) => {
                error!(key = %key, "Error while trying to free lock: key already gone");
                Err(LockError::NotHeld(key))
            }
            Ok(_) => {
                debug!(key = %key, "Released session lock");
                self.key = None;
                Ok(())
            }
            Err(e) => {
                error!(key = %key, error = %e, "Error while trying to free lock");
                Err(e.into())
            }
        }
    }

    /// Drop the held key without touching the store.
    pub fn forget(&mut self) -> Option<String> {
        self.key.take()
    }
}
