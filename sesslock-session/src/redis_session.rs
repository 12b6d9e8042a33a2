//! Redis session handler.

use async_trait::async_trait;
use sesslock_lock::SessionLock;
use sesslock_redis::{KeyValueStore, RedisConnector, StoreConnector, StoreError};
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::fingerprint::Fingerprint;
use crate::traits::{CloseOutcome, Phase, SessionHandler};

/// State of one open request. Built by `open`, dropped by `close`.
struct OpenSession<S> {
    store: S,
    lock: SessionLock,
    session_id: Option<String>,
    fingerprint: Option<Fingerprint>,
    key_exists: bool,
}

impl<S> OpenSession<S> {
    fn new(store: S, lock: SessionLock) -> Self {
        Self {
            store,
            lock,
            session_id: None,
            fingerprint: None,
            key_exists: false,
        }
    }

    fn reset(&mut self) {
        self.session_id = None;
        self.fingerprint = None;
        self.key_exists = false;
    }
}

/// Locking session handler backed by a Redis-compatible store.
///
/// One handler serves one request at a time: `open`, `read`, `write` and
/// `close` run in sequence. Concurrent requests for the same session each
/// use their own handler and are serialized by a lock key stored next to the
/// session (`<session key>:lock`).
///
/// Writes are skipped when the payload did not change since it was read;
/// only the TTL is refreshed then.
///
/// # Examples
///
/// ```no_run
/// use sesslock_session::{RedisSessionHandler, SessionConfig, SessionHandler};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = SessionConfig::from_save_path("tcp://127.0.0.1:6379?database=1")?;
///     let mut handler = RedisSessionHandler::new(config).with_client_address("203.0.113.7");
///
///     handler.open().await?;
///     let mut payload = handler.read("5f1c0b2e").await?;
///     payload.extend_from_slice(b"cart|a:0:{}");
///     handler.write("5f1c0b2e", &payload).await?;
///
///     let outcome = handler.close().await;
///     assert!(outcome.is_success());
///     Ok(())
/// }
/// ```
pub struct RedisSessionHandler<C: StoreConnector = RedisConnector> {
    config: SessionConfig,
    connector: C,
    prefix: String,
    phase: Phase,
    session: Option<OpenSession<C::Store>>,
}

impl RedisSessionHandler<RedisConnector> {
    /// Create a handler that connects to Redis.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_connector(config, RedisConnector)
    }
}

impl<C: StoreConnector> RedisSessionHandler<C> {
    /// Create a handler with a custom connector.
    pub fn with_connector(config: SessionConfig, connector: C) -> Self {
        let prefix = config.key_prefix_for(None);
        Self {
            config,
            connector,
            prefix,
            phase: Phase::Unopened,
            session: None,
        }
    }

    /// Set the requesting client's address.
    ///
    /// Only affects keys when `match_client_address` is enabled.
    pub fn with_client_address(mut self, address: impl AsRef<str>) -> Self {
        self.prefix = self.config.key_prefix_for(Some(address.as_ref()));
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Effective key prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Store key of a session.
    pub fn key_for(&self, session_id: &str) -> String {
        format!("{}{}", self.prefix, session_id)
    }

    /// Lock key of a session.
    pub fn lock_key_for(&self, session_id: &str) -> String {
        format!("{}{}:lock", self.prefix, session_id)
    }

    /// Session ID last read or written.
    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref()?.session_id.as_deref()
    }

    /// Whether this handler holds a session lock.
    pub fn lock_held(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.lock.is_held())
    }

    /// Key of the held lock.
    pub fn held_lock_key(&self) -> Option<&str> {
        self.session.as_ref()?.lock.key()
    }

    /// Whether the session key was seen in the store.
    pub fn key_exists(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.key_exists)
    }

    /// Fingerprint of the payload last read or written.
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        self.session.as_ref()?.fingerprint
    }

    fn open_session(&mut self) -> SessionResult<&mut OpenSession<C::Store>> {
        if self.phase == Phase::Terminated {
            return Err(SessionError::Terminated);
        }
        self.session.as_mut().ok_or(SessionError::NotOpen)
    }
}

#[async_trait]
impl<C: StoreConnector> SessionHandler for RedisSessionHandler<C> {
    async fn open(&mut self) -> SessionResult<()> {
        match self.phase {
            Phase::Terminated => return Err(SessionError::Terminated),
            phase if phase.is_open() => return Ok(()),
            _ => {}
        }

        let Some(store_config) = self.config.store.as_ref() else {
            error!("No Redis save path configured");
            self.phase = Phase::Terminated;
            return Err(SessionError::Config(
                "no Redis save path configured".to_string(),
            ));
        };

        match self.connector.connect(store_config).await {
            Ok(store) => {
                debug!(
                    host = %store_config.host,
                    port = store_config.port,
                    "Session store opened"
                );
                self.session = Some(OpenSession::new(
                    store,
                    SessionLock::new(self.config.lock.clone()),
                ));
                self.phase = Phase::Opened;
                Ok(())
            }
            Err(e) => {
                match &e {
                    StoreError::Auth(_) => {
                        error!(error = %e, "Unable to authenticate to Redis instance")
                    }
                    StoreError::Select { database, .. } => error!(
                        database,
                        error = %e,
                        "Unable to select Redis database"
                    ),
                    _ => error!(
                        host = %store_config.host,
                        port = store_config.port,
                        error = %e,
                        "Unable to connect to Redis with the configured settings"
                    ),
                }
                self.phase = Phase::Terminated;
                Err(SessionError::Connection(e))
            }
        }
    }

    async fn read(&mut self, session_id: &str) -> SessionResult<Vec<u8>> {
        let key = self.key_for(session_id);
        let lock_key = self.lock_key_for(session_id);
        let session = self.open_session()?;

        let outcome = session.lock.acquire(&session.store, &lock_key).await;
        if !outcome.is_held() {
            debug!(key = %key, "Reading without session lock");
        }

        // Kept so write can tell a regenerated ID from the one read
        session.session_id = Some(session_id.to_string());

        let payload = match session.store.get(&key).await? {
            Some(payload) => {
                session.key_exists = true;
                payload
            }
            None => {
                session.key_exists = false;
                Vec::new()
            }
        };
        session.fingerprint = Some(Fingerprint::of(&payload));

        self.phase = Phase::Read;
        Ok(payload)
    }

    async fn write(&mut self, session_id: &str, payload: &[u8]) -> SessionResult<()> {
        let key = self.key_for(session_id);
        let lock_key = self.lock_key_for(session_id);
        let expiration = self.config.expiration;
        let lock_ttl = self.config.lock.ttl;
        let require_lock = self.config.require_lock;
        let session = self.open_session()?;

        if session.session_id.as_deref() != Some(session_id) {
            if let Err(e) = session.lock.release(&session.store).await {
                warn!(error = %e, "Dropping lock of the previous session ID");
                session.lock.forget();
            }

            if !session.lock.acquire(&session.store, &lock_key).await.is_held() {
                debug!(key = %key, "Writing without lock for regenerated session");
            }

            session.key_exists = false;
            session.session_id = Some(session_id.to_string());
        }

        if require_lock && !session.lock.is_held() {
            error!(key = %key, "Refusing to write session without its lock");
            return Err(SessionError::LockRequired(key));
        }

        match session.lock.extend(&session.store, lock_ttl).await {
            Ok(true) => {}
            Ok(false) if session.lock.is_held() => {
                warn!(key = %lock_key, "Session lock expired before write")
            }
            Ok(false) => {}
            Err(e) => warn!(key = %lock_key, error = %e, "Failed to extend session lock"),
        }

        let fingerprint = Fingerprint::of(payload);
        if session.fingerprint != Some(fingerprint) || !session.key_exists {
            if let Err(e) = session.store.set(&key, payload, expiration).await {
                error!(key = %key, error = %e, "Failed to write session");
                return Err(e.into());
            }
            session.fingerprint = Some(fingerprint);
            session.key_exists = true;
        } else {
            match session.store.expire(&key, expiration).await {
                Ok(true) => debug!(key = %key, "Session unchanged, refreshed TTL only"),
                Ok(false) => {
                    error!(key = %key, "Session key vanished before touch");
                    session.key_exists = false;
                    return Err(SessionError::TouchFailed(key));
                }
                Err(e) => {
                    error!(key = %key, error = %e, "Failed to refresh session TTL");
                    return Err(e.into());
                }
            }
        }

        self.phase = Phase::Written;
        Ok(())
    }

    async fn close(&mut self) -> CloseOutcome {
        let Some(mut session) = self.session.take() else {
            return CloseOutcome::Closed;
        };
        self.phase = Phase::Closed;

        // A failed DEL does not stop the disconnect; the lock expires on its own
        let mut lock_fault = None;
        if let Some(lock_key) = session.lock.forget()
            && let Err(e) = session.store.delete(&lock_key).await
        {
            error!(key = %lock_key, error = %e, "Got store error freeing lock on close");
            lock_fault = Some(SessionError::from(e));
        }

        let outcome = match session.store.ping().await {
            Ok(true) => match session.store.close().await {
                Ok(()) => {
                    debug!("Session store closed");
                    CloseOutcome::Closed
                }
                Err(e) => {
                    error!(error = %e, "Failed to close Redis connection properly");
                    return CloseOutcome::Failed(SessionError::Close(e.to_string()));
                }
            },
            Ok(false) => {
                warn!("Session store did not answer PONG, dropping connection");
                CloseOutcome::Discarded
            }
            Err(e) => {
                error!(error = %e, "Got store error on close");
                return CloseOutcome::Suppressed(e.into());
            }
        };

        match lock_fault {
            Some(e) => CloseOutcome::Suppressed(e),
            None => outcome,
        }
    }

    async fn destroy(&mut self, session_id: &str) -> SessionResult<()> {
        let key = self.key_for(session_id);
        let lock_key = self.lock_key_for(session_id);
        let session = match self.open_session() {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "Redis connection not available for destroy");
                return Err(e);
            }
        };

        let store_error = |e: StoreError| {
            error!(key = %key, error = %e, "Store error during destroy");
            SessionError::from(e)
        };

        let deleted_session = session.store.delete(&key).await.map_err(store_error)?;
        let deleted_lock = session.store.delete(&lock_key).await.map_err(store_error)?;
        debug!(
            key = %key,
            session = if deleted_session > 0 { "deleted" } else { "not found" },
            lock = if deleted_lock > 0 { "deleted" } else { "not found" },
            "Session destroyed"
        );

        if deleted_session == 0 && session.store.exists(&key).await.map_err(store_error)? {
            error!(key = %key, "Failed to destroy session");
            return Err(SessionError::DestroyFailed(session_id.to_string()));
        }

        if session.lock.key() == Some(lock_key.as_str()) {
            session.lock.forget();
        } else if let Err(e) = session.lock.release(&session.store).await {
            warn!(error = %e, "Dropping lock of another session");
            session.lock.forget();
        }
        session.reset();

        self.phase = Phase::Opened;
        Ok(())
    }

    async fn gc(&mut self, max_lifetime: Duration) -> SessionResult<usize> {
        // Keys carry their own TTL; there is nothing to sweep
        debug!(max_lifetime = ?max_lifetime, "Skipping session gc");
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sesslock_lock::LockConfig;
    use sesslock_redis::{MemoryStore, RedisConfig, StoreOp};
    use tokio::time::Instant;

    const ID: &str = "abc";
    const KEY: &str = "ci_session:abc";
    const LOCK: &str = "ci_session:abc:lock";

    fn config() -> SessionConfig {
        SessionConfig::redis(RedisConfig::default())
    }

    fn handler(server: &MemoryStore) -> RedisSessionHandler<MemoryStore> {
        RedisSessionHandler::with_connector(config(), server.clone())
    }

    async fn opened(server: &MemoryStore) -> RedisSessionHandler<MemoryStore> {
        let mut handler = handler(server);
        handler.open().await.unwrap();
        handler
    }

    #[tokio::test]
    async fn test_open_without_store_config_terminates() {
        let server = MemoryStore::new();
        let mut handler = RedisSessionHandler::with_connector(SessionConfig::default(), server.clone());

        assert!(matches!(handler.open().await, Err(SessionError::Config(_))));
        assert_eq!(handler.phase(), Phase::Terminated);
        assert!(matches!(handler.read(ID).await, Err(SessionError::Terminated)));
        assert!(matches!(handler.write(ID, b"x").await, Err(SessionError::Terminated)));
        assert!(matches!(handler.destroy(ID).await, Err(SessionError::Terminated)));
        assert_eq!(handler.gc(Duration::from_secs(60)).await.unwrap(), 0);
        assert_eq!(server.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_connect_terminates_without_retry() {
        let server = MemoryStore::new();
        server.set_offline(true);
        let mut handler = handler(&server);

        assert!(matches!(handler.open().await, Err(SessionError::Connection(_))));
        assert!(matches!(handler.open().await, Err(SessionError::Terminated)));
        assert_eq!(server.calls(StoreOp::Connect), 1);
        assert!(handler.close().await.is_success());
        assert_eq!(handler.phase(), Phase::Terminated);
    }

    #[tokio::test]
    async fn test_operations_before_open() {
        let server = MemoryStore::new();
        let mut handler = handler(&server);

        assert!(matches!(handler.read(ID).await, Err(SessionError::NotOpen)));
        assert!(matches!(handler.write(ID, b"x").await, Err(SessionError::NotOpen)));
        assert!(matches!(handler.destroy(ID).await, Err(SessionError::NotOpen)));
        assert!(matches!(handler.close().await, CloseOutcome::Closed));
        assert_eq!(server.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_open_twice_keeps_connection() {
        let server = MemoryStore::new();
        let mut handler = opened(&server).await;

        handler.open().await.unwrap();

        assert_eq!(server.calls(StoreOp::Connect), 1);
        assert_eq!(handler.phase(), Phase::Opened);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_write_close_on_empty_store() {
        let server = MemoryStore::new();
        let mut handler = opened(&server).await;

        let payload = handler.read(ID).await.unwrap();
        assert!(payload.is_empty());
        assert!(!handler.key_exists());
        assert!(handler.lock_held());
        assert_eq!(handler.held_lock_key(), Some(LOCK));
        assert_eq!(server.ttl(LOCK), Some(Duration::from_secs(30)));
        assert_eq!(handler.phase(), Phase::Read);

        handler.write(ID, b"hello").await.unwrap();
        assert_eq!(server.calls(StoreOp::Set), 1);
        assert_eq!(server.value(KEY), Some(b"hello".to_vec()));
        assert_eq!(server.ttl(KEY), Some(Duration::from_secs(7200)));
        assert!(handler.key_exists());
        assert_eq!(handler.phase(), Phase::Written);

        let outcome = handler.close().await;
        assert!(matches!(outcome, CloseOutcome::Closed));
        assert!(!server.contains(LOCK));
        assert_eq!(server.calls(StoreOp::Close), 1);
        assert_eq!(handler.phase(), Phase::Closed);
        assert!(handler.session_id().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_payload_only_touches() {
        let server = MemoryStore::new();
        server.insert(KEY, "user|i:7;", Some(Duration::from_secs(60)));
        let mut handler = opened(&server).await;

        let payload = handler.read(ID).await.unwrap();
        assert_eq!(payload, b"user|i:7;");
        assert!(handler.key_exists());
        assert_eq!(handler.fingerprint(), Some(Fingerprint::of(b"user|i:7;")));

        server.reset_calls();
        handler.write(ID, &payload).await.unwrap();

        assert_eq!(server.calls(StoreOp::Set), 0);
        // Lock refresh plus session touch
        assert_eq!(server.calls(StoreOp::Expire), 2);
        assert_eq!(server.ttl(KEY), Some(Duration::from_secs(7200)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_changed_payload_is_written() {
        let server = MemoryStore::new();
        server.insert(KEY, "user|i:7;", Some(Duration::from_secs(60)));
        let mut handler = opened(&server).await;
        handler.read(ID).await.unwrap();

        handler.write(ID, b"user|i:8;").await.unwrap();

        assert_eq!(server.calls(StoreOp::Set), 1);
        assert_eq!(server.value(KEY), Some(b"user|i:8;".to_vec()));
        assert_eq!(handler.fingerprint(), Some(Fingerprint::of(b"user|i:8;")));

        // A second identical write is skipped
        handler.write(ID, b"user|i:8;").await.unwrap();
        assert_eq!(server.calls(StoreOp::Set), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_refreshes_lock_ttl() {
        let server = MemoryStore::new();
        let mut handler = opened(&server).await;
        handler.read(ID).await.unwrap();

        tokio::time::advance(Duration::from_secs(20)).await;
        handler.write(ID, b"data").await.unwrap();

        assert_eq!(server.ttl(LOCK), Some(Duration::from_secs(30)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_touch_of_expired_key_fails_then_rewrites() {
        let server = MemoryStore::new();
        server.insert(KEY, "data", Some(Duration::from_secs(10)));
        let mut handler = opened(&server).await;
        handler.read(ID).await.unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;
        let result = handler.write(ID, b"data").await;

        assert!(matches!(result, Err(SessionError::TouchFailed(_))));
        assert!(!handler.key_exists());

        handler.write(ID, b"data").await.unwrap();
        assert_eq!(server.calls(StoreOp::Set), 1);
        assert_eq!(server.value(KEY), Some(b"data".to_vec()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_set_is_reported() {
        let server = MemoryStore::new();
        let mut handler = opened(&server).await;
        handler.read(ID).await.unwrap();
        server.fail_next(StoreOp::Set, 1);

        let result = handler.write(ID, b"data").await;

        assert!(matches!(result, Err(SessionError::Store(_))));
        assert_eq!(handler.fingerprint(), Some(Fingerprint::of(b"")));
        assert!(!handler.key_exists());
        assert_eq!(handler.phase(), Phase::Read);
    }

    #[tokio::test(start_paused = true)]
    async fn test_regenerated_id_moves_lock_and_forces_write() {
        let server = MemoryStore::new();
        server.insert(KEY, "data", Some(Duration::from_secs(60)));
        let mut handler = opened(&server).await;
        handler.read(ID).await.unwrap();

        handler.write("xyz", b"data").await.unwrap();

        assert!(!server.contains(LOCK));
        assert!(server.contains("ci_session:xyz:lock"));
        assert_eq!(handler.held_lock_key(), Some("ci_session:xyz:lock"));
        assert_eq!(handler.session_id(), Some("xyz"));
        // Same bytes, but the new key was never seen
        assert_eq!(server.calls(StoreOp::Set), 1);
        assert_eq!(server.value("ci_session:xyz"), Some(b"data".to_vec()));
        assert!(handler.key_exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_regeneration_survives_lost_old_lock() {
        let server = MemoryStore::new();
        let mut handler = opened(&server).await;
        handler.read(ID).await.unwrap();

        tokio::time::advance(Duration::from_secs(31)).await;
        handler.write("xyz", b"data").await.unwrap();

        assert_eq!(handler.held_lock_key(), Some("ci_session:xyz:lock"));
        assert_eq!(server.value("ci_session:xyz"), Some(b"data".to_vec()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_contended_read_degrades_and_writes_unlocked() {
        let server = MemoryStore::new();
        server.insert(LOCK, "1700000000", Some(Duration::from_secs(30)));
        let mut handler = opened(&server).await;

        let start = Instant::now();
        let payload = handler.read(ID).await.unwrap();
        let waited = start.elapsed();

        assert!(payload.is_empty());
        assert!(!handler.lock_held());
        assert!(waited >= Duration::from_millis(400));
        assert!(waited < Duration::from_secs(2));

        handler.write(ID, b"data").await.unwrap();
        assert_eq!(server.value(KEY), Some(b"data".to_vec()));

        // The foreign lock is left alone
        assert!(handler.close().await.is_success());
        assert!(server.contains(LOCK));
    }

    #[tokio::test(start_paused = true)]
    async fn test_require_lock_refuses_unlocked_write() {
        let server = MemoryStore::new();
        server.insert(LOCK, "1700000000", Some(Duration::from_secs(30)));
        let mut handler =
            RedisSessionHandler::with_connector(config().with_require_lock(true), server.clone());
        handler.open().await.unwrap();
        handler.read(ID).await.unwrap();

        let result = handler.write(ID, b"data").await;

        assert!(matches!(result, Err(SessionError::LockRequired(_))));
        assert_eq!(server.calls(StoreOp::Set), 0);
        assert!(!server.contains(KEY));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reread_refreshes_lock() {
        let server = MemoryStore::new();
        let mut handler = opened(&server).await;

        handler.read(ID).await.unwrap();
        handler.read(ID).await.unwrap();

        assert_eq!(server.calls(StoreOp::SetIfAbsent), 1);
        assert_eq!(server.ttl(LOCK), Some(Duration::from_secs(300)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_handler_waits_for_first() {
        let server = MemoryStore::new();
        let mut first = opened(&server).await;
        let mut second = opened(&server).await;

        first.read(ID).await.unwrap();
        second.read(ID).await.unwrap();
        assert!(first.lock_held());
        assert!(!second.lock_held());

        first.write(ID, b"first").await.unwrap();
        first.close().await;

        let mut third = opened(&server).await;
        assert_eq!(third.read(ID).await.unwrap(), b"first");
        assert!(third.lock_held());
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_address_pins_keys() {
        let server = MemoryStore::new();
        let config = config().with_match_client_address(true);
        let mut handler =
            RedisSessionHandler::with_connector(config, server.clone()).with_client_address("10.0.0.1");
        handler.open().await.unwrap();

        handler.read(ID).await.unwrap();
        handler.write(ID, b"data").await.unwrap();

        assert_eq!(handler.prefix(), "ci_session:10.0.0.1:");
        assert!(server.contains("ci_session:10.0.0.1:abc:lock"));
        assert_eq!(server.value("ci_session:10.0.0.1:abc"), Some(b"data".to_vec()));
    }

    #[tokio::test]
    async fn test_destroy_removes_session_and_lock() {
        let server = MemoryStore::new();
        server.insert(KEY, "data", None);
        let mut handler = opened(&server).await;
        handler.read(ID).await.unwrap();

        handler.destroy(ID).await.unwrap();

        assert!(!server.contains(KEY));
        assert!(!server.contains(LOCK));
        assert!(!handler.lock_held());
        assert!(handler.session_id().is_none());
        assert!(handler.fingerprint().is_none());
        assert!(!handler.key_exists());
        assert_eq!(handler.phase(), Phase::Opened);
    }

    #[tokio::test]
    async fn test_destroy_missing_session_succeeds() {
        let server = MemoryStore::new();
        let mut handler = opened(&server).await;

        handler.destroy("missing").await.unwrap();

        assert_eq!(server.calls(StoreOp::Delete), 2);
        assert_eq!(server.calls(StoreOp::Exists), 1);
    }

    #[tokio::test]
    async fn test_destroy_reports_store_errors() {
        let server = MemoryStore::new();
        let mut handler = opened(&server).await;
        server.fail_next(StoreOp::Delete, 1);

        assert!(matches!(handler.destroy(ID).await, Err(SessionError::Store(_))));
    }

    #[tokio::test]
    async fn test_destroy_other_session_releases_held_lock() {
        let server = MemoryStore::new();
        let mut handler = opened(&server).await;
        handler.read(ID).await.unwrap();

        handler.destroy("other").await.unwrap();

        assert!(!server.contains(LOCK));
        assert!(!handler.lock_held());
    }

    #[tokio::test]
    async fn test_close_with_dead_probe_discards() {
        let server = MemoryStore::new();
        let mut handler = opened(&server).await;
        handler.read(ID).await.unwrap();
        server.set_ping_reply(false);

        let outcome = handler.close().await;

        assert!(matches!(outcome, CloseOutcome::Discarded));
        assert!(outcome.is_success());
        assert!(!server.contains(LOCK));
        assert_eq!(server.calls(StoreOp::Close), 0);
    }

    #[tokio::test]
    async fn test_close_suppresses_store_faults() {
        let server = MemoryStore::new();
        let mut handler = opened(&server).await;
        handler.read(ID).await.unwrap();
        server.set_offline(true);

        let outcome = handler.close().await;

        assert!(matches!(outcome, CloseOutcome::Suppressed(SessionError::Store(_))));
        assert!(!outcome.is_success());
        assert_eq!(handler.phase(), Phase::Closed);
        assert!(!handler.lock_held());
    }

    #[tokio::test]
    async fn test_close_still_disconnects_after_failed_lock_delete() {
        let server = MemoryStore::new();
        let mut handler = opened(&server).await;
        handler.read(ID).await.unwrap();
        server.fail_next(StoreOp::Delete, 1);

        let outcome = handler.close().await;

        assert!(matches!(outcome, CloseOutcome::Suppressed(SessionError::Store(_))));
        assert!(!outcome.is_success());
        assert_eq!(server.calls(StoreOp::Ping), 1);
        assert_eq!(server.calls(StoreOp::Close), 1);
        assert!(!handler.lock_held());
    }

    #[tokio::test]
    async fn test_close_reports_failed_disconnect() {
        let server = MemoryStore::new();
        let mut handler = opened(&server).await;
        server.fail_next(StoreOp::Close, 1);

        let outcome = handler.close().await;

        assert!(matches!(outcome, CloseOutcome::Failed(SessionError::Close(_))));
        assert!(outcome.error().is_some());
    }

    #[tokio::test]
    async fn test_reopen_after_close() {
        let server = MemoryStore::new();
        let mut handler = opened(&server).await;
        handler.close().await;

        handler.open().await.unwrap();

        assert_eq!(server.calls(StoreOp::Connect), 2);
        assert_eq!(handler.phase(), Phase::Opened);
    }

    #[test]
    fn test_gc_is_a_noop() {
        let server = MemoryStore::new();
        let mut handler = handler(&server);

        let removed = tokio_test::block_on(async {
            handler.open().await.unwrap();
            server.reset_calls();
            handler.gc(Duration::from_secs(1440)).await
        });

        assert_eq!(removed.unwrap(), 0);
        assert_eq!(server.total_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_lock_config_is_used() {
        let server = MemoryStore::new();
        let config = config().with_lock(LockConfig::default().with_ttl(Duration::from_secs(5)));
        let mut handler = RedisSessionHandler::with_connector(config, server.clone());
        handler.open().await.unwrap();

        handler.read(ID).await.unwrap();

        assert_eq!(server.ttl(LOCK), Some(Duration::from_secs(5)));
    }
}
