//! # Sesslock Redis
//!
//! The key-value store seam used by session handling.
//!
//! ## Features
//!
//! - **[`KeyValueStore`]**: the narrow set of commands sessions need
//!   (conditional set, get, set, expire, delete, exists, ping)
//! - **[`RedisStore`]**: one dedicated Redis connection with connect and
//!   read timeouts, explicit AUTH and SELECT
//! - **[`MemoryStore`]**: in-process store with the same semantics, call
//!   counters and failure injection
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sesslock_redis::{KeyValueStore, RedisConfig, RedisStore};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RedisConfig::builder()
//!         .host("127.0.0.1")
//!         .port(6379)
//!         .connect_timeout(Duration::from_secs(2))
//!         .build();
//!
//!     let mut store = RedisStore::connect(&config).await?;
//!
//!     if store.set_if_absent("app:lock", "1", Duration::from_secs(30)).await? {
//!         store.set("app:data", b"payload", Duration::from_secs(7200)).await?;
//!         store.delete("app:lock").await?;
//!     }
//!
//!     store.close().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod memory;
mod redis_store;
mod store;

pub use config::{DEFAULT_PORT, RedisConfig, RedisConfigBuilder, secs_f64};
pub use error::{Result, StoreError};
pub use memory::{MemoryStore, StoreOp};
pub use redis_store::{RedisConnector, RedisStore};
pub use store::{KeyValueStore, StoreConnector, ttl_secs};

// Re-export redis crate for convenience
pub use redis;

/// Prelude for common imports.
///
/// ```
/// use sesslock_redis::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{RedisConfig, RedisConfigBuilder};
    pub use crate::error::{Result, StoreError};
    pub use crate::memory::{MemoryStore, StoreOp};
    pub use crate::redis_store::{RedisConnector, RedisStore};
    pub use crate::store::{KeyValueStore, StoreConnector};
}
