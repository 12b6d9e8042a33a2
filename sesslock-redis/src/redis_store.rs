//! Redis-backed store.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::FromRedisValue;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::store::{KeyValueStore, StoreConnector, ttl_secs};
use crate::{RedisConfig, Result, StoreError};

/// A single dedicated Redis connection.
///
/// Every command is bounded by the configured read timeout; the connection
/// itself is bounded by the connect timeout.
pub struct RedisStore {
    config: RedisConfig,
    conn: Option<MultiplexedConnection>,
}

impl RedisStore {
    /// Connect, then authenticate and select the database if configured.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sesslock_redis::{RedisConfig, RedisStore};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = RedisConfig::new("127.0.0.1", 6379);
    /// let store = RedisStore::connect(&config).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let url = config.connection_url()?;
        let client =
            redis::Client::open(url.as_str()).map_err(|e| StoreError::Config(e.to_string()))?;

        let conn = match timeout(
            config.connect_timeout,
            client.get_multiplexed_async_connection(),
        )
        .await
        {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => return Err(StoreError::Connection(e.to_string())),
            Err(_) => {
                return Err(StoreError::Connection(format!(
                    "connect to {}:{} timed out after {:?}",
                    config.host, config.port, config.connect_timeout
                )));
            }
        };

        let store = Self {
            config: config.clone(),
            conn: Some(conn),
        };

        if let Some(password) = &config.password {
            let mut cmd = redis::cmd("AUTH");
            cmd.arg(password);
            store
                .query::<()>(&cmd)
                .await
                .map_err(|e| StoreError::Auth(e.to_string()))?;
        }

        if let Some(database) = config.database {
            let mut cmd = redis::cmd("SELECT");
            cmd.arg(database);
            store
                .query::<()>(&cmd)
                .await
                .map_err(|e| StoreError::Select {
                    database,
                    reason: e.to_string(),
                })?;
        }

        info!(
            host = %config.host,
            port = config.port,
            database = ?config.database,
            "Redis session connection established"
        );

        Ok(store)
    }

    /// Get the configuration.
    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    /// Check if the connection is still open.
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn connection(&self) -> Result<MultiplexedConnection> {
        self.conn.clone().ok_or(StoreError::NotConnected)
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match timeout(self.config.read_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(StoreError::Timeout),
        }
    }

    async fn query<T: FromRedisValue>(&self, cmd: &redis::Cmd) -> Result<T> {
        let mut conn = self.connection()?;
        self.bounded(cmd.query_async(&mut conn)).await
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        // SET NX EX creates the key and its TTL in one atomic step
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("NX").arg("EX").arg(ttl_secs(ttl));

        let result: Option<String> = self.query(&cmd).await?;
        Ok(result.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.query(&cmd).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("EX").arg(ttl_secs(ttl));
        self.query::<()>(&cmd).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut cmd = redis::cmd("EXPIRE");
        cmd.arg(key).arg(ttl_secs(ttl));
        self.query(&cmd).await
    }

    async fn delete(&self, key: &str) -> Result<u64> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);
        self.query(&cmd).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut cmd = redis::cmd("EXISTS");
        cmd.arg(key);
        self.query(&cmd).await
    }

    async fn ping(&self) -> Result<bool> {
        let reply: String = self.query(&redis::cmd("PING")).await?;
        Ok(reply == "PONG")
    }

    /// Send QUIT and drop the connection.
    ///
    /// The connection is dropped even when QUIT fails, and the failure is
    /// returned.
    async fn close(&mut self) -> Result<()> {
        if self.conn.is_none() {
            return Err(StoreError::NotConnected);
        }

        let result = self.query::<()>(&redis::cmd("QUIT")).await;
        self.conn = None;
        result?;

        debug!(host = %self.config.host, "Redis session connection closed");
        Ok(())
    }
}

/// Connector producing [`RedisStore`] connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisConnector;

#[async_trait]
impl StoreConnector for RedisConnector {
    type Store = RedisStore;

    async fn connect(&self, config: &RedisConfig) -> Result<RedisStore> {
        RedisStore::connect(config).await
    }
}
