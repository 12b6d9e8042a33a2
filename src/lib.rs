// Sesslock - locking Redis session persistence for Rust
//
// This library stores per-user session payloads in a Redis-compatible store,
// serializes concurrent requests for one session with a bounded-wait lock,
// and skips writes whose payload did not change.

// Re-export the store layer
pub use sesslock_redis::*;

// Re-export optional crates
#[cfg(feature = "lock")]
pub use sesslock_lock;

#[cfg(feature = "session")]
pub use sesslock_session;

#[cfg(feature = "lock")]
pub use sesslock_lock::{BackoffPolicy, LockConfig, LockError, LockOutcome, SessionLock};

#[cfg(feature = "session")]
pub use sesslock_session::{
    CloseOutcome, Fingerprint, Phase, RedisSessionHandler, SavePath, SessionConfig, SessionError,
    SessionHandler, SessionResult,
};

// Prelude for common imports
pub mod prelude {
    pub use crate::{KeyValueStore, MemoryStore, RedisConfig, RedisStore, StoreConnector, StoreError};

    #[cfg(feature = "lock")]
    pub use crate::{LockConfig, LockOutcome, SessionLock};

    #[cfg(feature = "session")]
    pub use crate::{
        CloseOutcome, Phase, RedisSessionHandler, SessionConfig, SessionError, SessionHandler,
        SessionResult,
    };
}
