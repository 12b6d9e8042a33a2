//! In-memory store.
//!
//! Same semantics as the Redis store (atomic conditional set, per-key TTL on
//! the tokio clock) without a server. Clones share one key space, so a single
//! `MemoryStore` can stand in for a Redis instance that many handlers talk
//! to. Every operation is counted and can be made to fail, which is what the
//! session tests assert against.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::store::{KeyValueStore, StoreConnector};
use crate::{RedisConfig, Result, StoreError};

/// Store operations, for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// `StoreConnector::connect`
    Connect,
    /// `set_if_absent`
    SetIfAbsent,
    /// `get`
    Get,
    /// `set`
    Set,
    /// `expire`
    Expire,
    /// `delete`
    Delete,
    /// `exists`
    Exists,
    /// `ping`
    Ping,
    /// `close`
    Close,
}

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

struct Inner {
    entries: HashMap<String, Entry>,
    calls: HashMap<StoreOp, usize>,
    failures: HashMap<StoreOp, usize>,
    offline: bool,
    ping_reply: bool,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            calls: HashMap::new(),
            failures: HashMap::new(),
            offline: false,
            ping_reply: true,
        }
    }
}

impl Inner {
    /// Count the call and apply injected faults.
    fn enter(&mut self, op: StoreOp) -> Result<()> {
        *self.calls.entry(op).or_default() += 1;

        if self.offline {
            return Err(StoreError::Connection("store is offline".to_string()));
        }

        if let Some(remaining) = self.failures.get_mut(&op)
            && *remaining > 0 {
                *remaining -= 1;
                return Err(StoreError::Command(format!("injected {:?} failure", op)));
            }

        Ok(())
    }

    fn live(&mut self, key: &str) -> Option<&mut Entry> {
        let now = Instant::now();
        if self.entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
            self.entries.remove(key);
        }
        self.entries.get_mut(key)
    }
}

/// In-memory key-value store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    closed: bool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls made for `op` across all clones.
    pub fn calls(&self, op: StoreOp) -> usize {
        self.inner.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Total number of calls across all operations.
    pub fn total_calls(&self) -> usize {
        self.inner.lock().calls.values().sum()
    }

    /// Reset all call counters.
    pub fn reset_calls(&self) {
        self.inner.lock().calls.clear();
    }

    /// Make the next `times` calls of `op` fail with a command error.
    pub fn fail_next(&self, op: StoreOp, times: usize) {
        self.inner.lock().failures.insert(op, times);
    }

    /// Take the store offline: every operation fails with a connection error.
    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().offline = offline;
    }

    /// Reply returned by `ping` while online.
    pub fn set_ping_reply(&self, pong: bool) {
        self.inner.lock().ping_reply = pong;
    }

    /// Seed a key directly, bypassing counters.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Vec<u8>>, ttl: Option<Duration>) {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.inner.lock().entries.insert(
            key.into(),
            Entry {
                value: value.into(),
                expires_at,
            },
        );
    }

    /// Read a key directly, bypassing counters.
    pub fn value(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.lock().live(key).map(|entry| entry.value.clone())
    }

    /// Remaining TTL of a key, bypassing counters.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.inner
            .lock()
            .live(key)
            .and_then(|entry| entry.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }

    /// Check a key directly, bypassing counters.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().live(key).is_some()
    }

    /// Check if this handle has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn enter(&self, op: StoreOp) -> Result<parking_lot::MutexGuard<'_, Inner>> {
        let mut inner = self.inner.lock();
        inner.enter(op)?;
        if self.closed {
            return Err(StoreError::NotConnected);
        }
        Ok(inner)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let mut inner = self.enter(StoreOp::SetIfAbsent)?;
        if inner.live(key).is_some() {
            return Ok(false);
        }

        inner.entries.insert(
            key.to_string(),
            Entry {
                value: value.as_bytes().to_vec(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut inner = self.enter(StoreOp::Get)?;
        Ok(inner.live(key).map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let mut inner = self.enter(StoreOp::Set)?;
        inner.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut inner = self.enter(StoreOp::Expire)?;
        match inner.live(key) {
            Some(entry) => {
                entry.expires_at = Some(Instant::now() + ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, key: &str) -> Result<u64> {
        let mut inner = self.enter(StoreOp::Delete)?;
        let existed = inner.live(key).is_some();
        inner.entries.remove(key);
        Ok(u64::from(existed))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut inner = self.enter(StoreOp::Exists)?;
        Ok(inner.live(key).is_some())
    }

    async fn ping(&self) -> Result<bool> {
        let inner = self.enter(StoreOp::Ping)?;
        Ok(inner.ping_reply)
    }

    async fn close(&mut self) -> Result<()> {
        drop(self.enter(StoreOp::Close)?);
        self.closed = true;
        Ok(())
    }
}

#[async_trait]
impl StoreConnector for MemoryStore {
    type Store = MemoryStore;

    async fn connect(&self, _config: &RedisConfig) -> Result<MemoryStore> {
        let mut inner = self.inner.lock();
        inner
            .enter(StoreOp::Connect)
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(MemoryStore {
            inner: Arc::clone(&self.inner),
            closed: false,
        })
    }
}
