//! Session locking for sesslock.
//!
//! A short-lived, per-session mutual-exclusion lock kept in the session
//! store itself.
//!
//! ## Features
//!
//! - **Atomic acquire** - `SET key token NX EX ttl`
//! - **Bounded wait** - a few attempts with capped exponential backoff
//! - **Graceful degradation** - when the budget runs out the caller gets
//!   [`LockOutcome::Degraded`] and carries on unprotected
//! - **Refresh** - re-acquiring a held key extends its TTL instead
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sesslock_lock::{LockConfig, SessionLock};
//! use sesslock_redis::{RedisConfig, RedisStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = RedisStore::connect(&RedisConfig::new("127.0.0.1", 6379)).await?;
//!
//!     let mut lock = SessionLock::new(LockConfig::default());
//!     let outcome = lock.acquire(&store, "ci_session:abc:lock").await;
//!     println!("lock held: {}", outcome.is_held());
//!
//!     lock.release(&store).await?;
//!     Ok(())
//! }
//! ```

pub mod backoff;
pub mod lock;

pub use backoff::BackoffPolicy;
pub use lock::{LockConfig, LockError, LockOutcome, SessionLock};
