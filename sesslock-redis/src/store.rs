//! Key-value store trait definition.

use async_trait::async_trait;
use std::time::Duration;

use crate::{RedisConfig, Result};

/// The narrow slice of a Redis-compatible store that session handling needs.
///
/// Every write carries its own TTL; expiration is always left to the store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Atomically create `key` with a TTL only if it does not exist yet.
    ///
    /// Returns `true` if this call created the key.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;

    /// Get the raw value stored at `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Overwrite `key` with a TTL.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;

    /// Reset the TTL of `key`.
    ///
    /// Returns `false` if the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Delete `key`, returning the number of keys removed.
    async fn delete(&self, key: &str) -> Result<u64>;

    /// Check if `key` exists.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Liveness probe. `true` means the server answered PONG.
    async fn ping(&self) -> Result<bool>;

    /// Close the connection. Later calls fail with `NotConnected`.
    async fn close(&mut self) -> Result<()>;
}

/// Opens store connections.
///
/// Session handlers hold a connector rather than a connection so that each
/// request opens (and closes) its own link.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    /// Connection type produced by this connector.
    type Store: KeyValueStore;

    /// Connect, authenticate and select the database described by `config`.
    async fn connect(&self, config: &RedisConfig) -> Result<Self::Store>;
}

/// TTL in whole seconds as Redis expects it, never below one second.
pub fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}
