//! Redis connection configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::{Result, StoreError};

/// Default Redis port.
pub const DEFAULT_PORT: u16 = 6379;

/// Redis connection configuration.
///
/// Sessions open one dedicated connection per request, so there is no pool
/// sizing here; the two timeouts bound how long a request can hang on a
/// slow or unreachable server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Server host name or address.
    pub host: String,
    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Password sent with AUTH after connecting.
    #[serde(default)]
    pub password: Option<String>,
    /// Database index sent with SELECT after connecting.
    #[serde(default)]
    pub database: Option<u32>,
    /// Connect timeout.
    #[serde(with = "secs_f64", default = "default_connect_timeout")]
    pub connect_timeout: Duration,
    /// Per-command read timeout.
    #[serde(with = "secs_f64", default = "default_read_timeout")]
    pub read_timeout: Duration,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_read_timeout() -> Duration {
    Duration::from_secs(2)
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            password: None,
            database: None,
            connect_timeout: default_connect_timeout(),
            read_timeout: default_read_timeout(),
        }
    }
}

impl RedisConfig {
    /// Create a configuration for the given host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Create a builder.
    pub fn builder() -> RedisConfigBuilder {
        RedisConfigBuilder::new()
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> RedisConfigBuilder {
        let mut builder = RedisConfigBuilder::new();

        if let Ok(host) = std::env::var("REDIS_HOST") {
            builder = builder.host(host);
        }

        if let Ok(port) = std::env::var("REDIS_PORT")
            && let Ok(port) = port.parse() {
                builder = builder.port(port);
            }

        if let Ok(password) = std::env::var("REDIS_PASSWORD") {
            builder = builder.password(password);
        }

        if let Ok(db) = std::env::var("REDIS_DATABASE")
            && let Ok(db_num) = db.parse() {
                builder = builder.database(db_num);
            }

        if let Ok(timeout) = std::env::var("REDIS_CONNECT_TIMEOUT")
            && let Ok(secs) = timeout.parse::<f64>()
            && secs > 0.0 {
                builder = builder.connect_timeout(Duration::from_secs_f64(secs));
            }

        if let Ok(timeout) = std::env::var("REDIS_READ_TIMEOUT")
            && let Ok(secs) = timeout.parse::<f64>()
            && secs > 0.0 {
                builder = builder.read_timeout(Duration::from_secs_f64(secs));
            }

        builder
    }

    /// Connection URL for the Redis client.
    ///
    /// Credentials and database are not part of the URL; `RedisStore::connect`
    /// sends them as AUTH and SELECT.
    pub fn connection_url(&self) -> Result<String> {
        if self.host.is_empty() {
            return Err(StoreError::Config("Redis host is empty".to_string()));
        }

        let mut url = Url::parse("redis://localhost")
            .map_err(|e| StoreError::Config(e.to_string()))?;

        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };

        url.set_host(Some(&host))
            .map_err(|e| StoreError::Config(format!("invalid host '{}': {}", self.host, e)))?;
        url.set_port(Some(self.port))
            .map_err(|_| StoreError::Config(format!("invalid port {}", self.port)))?;

        Ok(url.to_string())
    }
}

/// Builder for Redis configuration.
#[derive(Default)]
pub struct RedisConfigBuilder {
    config: RedisConfig,
}

impl RedisConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: RedisConfig::default(),
        }
    }

    /// Set the host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = Some(password.into());
        self
    }

    /// Set the database index.
    pub fn database(mut self, db: u32) -> Self {
        self.config.database = Some(db);
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the read timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> RedisConfig {
        self.config
    }
}

/// Durations as fractional seconds (`connect_timeout = 1.5`).
pub mod secs_f64 {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
