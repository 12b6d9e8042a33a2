//! Locking session handler for sesslock.
//!
//! Stores serialized session payloads in a Redis-compatible store and
//! serializes concurrent requests for the same session with a short-lived
//! lock key.
//!
//! # Lifecycle
//!
//! A web framework drives one [`SessionHandler`] per request:
//!
//! 1. `open` connects (connect and read timeouts, AUTH, SELECT)
//! 2. `read` takes the session lock and fetches the payload
//! 3. `write` stores the payload, or only refreshes its TTL when the payload
//!    is unchanged since `read`
//! 4. `close` frees the lock and disconnects
//!
//! `destroy` deletes a session on logout. `gc` does nothing: every key
//! carries its own TTL.
//!
//! # Locking
//!
//! The lock is best-effort. When another request holds it for longer than
//! the retry budget (five attempts, under two seconds), the handler carries
//! on without it. Set [`SessionConfig::require_lock`] to refuse unlocked
//! writes instead.
//!
//! # Examples
//!
//! ```no_run
//! use sesslock_session::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), SessionError> {
//!     let config = SessionConfig::from_save_path("tcp://localhost:6379?auth=secret&prefix=shop:")?
//!         .with_expiration(Duration::from_secs(3600));
//!
//!     let mut handler = RedisSessionHandler::new(config);
//!     handler.open().await?;
//!
//!     let payload = handler.read("0f3a9c").await?;
//!     handler.write("0f3a9c", &payload).await?;
//!
//!     if let Some(e) = handler.close().await.error() {
//!         eprintln!("session close: {}", e);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod redis_session;
pub mod save_path;
pub mod traits;

pub use config::{DEFAULT_KEY_PREFIX, SessionConfig};
pub use error::{SessionError, SessionResult};
pub use fingerprint::Fingerprint;
pub use redis_session::RedisSessionHandler;
pub use save_path::SavePath;
pub use traits::{CloseOutcome, Phase, SessionHandler};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::SessionConfig;
    pub use crate::error::{SessionError, SessionResult};
    pub use crate::redis_session::RedisSessionHandler;
    pub use crate::traits::{CloseOutcome, Phase, SessionHandler};
}
