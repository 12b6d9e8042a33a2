//! Session configuration.

use serde::{Deserialize, Serialize};
use sesslock_lock::LockConfig;
use sesslock_redis::{RedisConfig, secs_f64};
use std::time::Duration;

use crate::error::SessionResult;
use crate::save_path::SavePath;

/// Default key prefix.
pub const DEFAULT_KEY_PREFIX: &str = "ci_session:";

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Store connection; `None` means nothing was configured and `open` fails
    #[serde(default)]
    pub store: Option<RedisConfig>,
    /// Prefix for session keys
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Pin sessions to the client address by adding it to the key prefix
    #[serde(default)]
    pub match_client_address: bool,
    /// Session TTL, applied on every write and touch
    #[serde(with = "secs_f64", default = "default_expiration")]
    pub expiration: Duration,
    /// Lock timings
    #[serde(default)]
    pub lock: LockConfig,
    /// Refuse to write without holding the session lock
    #[serde(default)]
    pub require_lock: bool,
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

fn default_expiration() -> Duration {
    Duration::from_secs(7200)
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            store: None,
            key_prefix: default_key_prefix(),
            match_client_address: false,
            expiration: default_expiration(),
            lock: LockConfig::default(),
            require_lock: false,
        }
    }
}

impl SessionConfig {
    /// Create a Redis session configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use sesslock_redis::RedisConfig;
    /// use sesslock_session::SessionConfig;
    ///
    /// let config = SessionConfig::redis(RedisConfig::new("127.0.0.1", 6379));
    /// assert_eq!(config.key_prefix, "ci_session:");
    /// ```
    pub fn redis(store: RedisConfig) -> Self {
        Self {
            store: Some(store),
            ..Default::default()
        }
    }

    /// Create a configuration from a save path.
    ///
    /// A `prefix` parameter in the save path replaces the default prefix.
    ///
    /// # Examples
    ///
    /// ```
    /// use sesslock_session::SessionConfig;
    ///
    /// let config = SessionConfig::from_save_path("tcp://127.0.0.1:6379?prefix=shop:").unwrap();
    /// assert_eq!(config.key_prefix, "shop:");
    /// ```
    pub fn from_save_path(save_path: &str) -> SessionResult<Self> {
        let parsed = SavePath::parse(save_path)?;
        let mut config = Self::redis(parsed.redis_config());
        if let Some(prefix) = parsed.prefix {
            config.key_prefix = prefix;
        }
        Ok(config)
    }

    /// Load configuration from environment variables.
    ///
    /// - `SESSION_SAVE_PATH` - save path; unset leaves the store unconfigured
    /// - `SESSION_EXPIRATION` - TTL in seconds
    /// - `SESSION_MATCH_IP` - `1`/`true` to pin sessions to the client address
    /// - `SESSION_REQUIRE_LOCK` - `1`/`true` to refuse unlocked writes
    pub fn from_env() -> SessionResult<Self> {
        let mut config = match std::env::var("SESSION_SAVE_PATH") {
            Ok(save_path) => Self::from_save_path(&save_path)?,
            Err(_) => Self::default(),
        };

        if let Ok(expiration) = std::env::var("SESSION_EXPIRATION")
            && let Ok(secs) = expiration.parse() {
                config.expiration = Duration::from_secs(secs);
            }

        if let Ok(flag) = std::env::var("SESSION_MATCH_IP") {
            config.match_client_address = is_truthy(&flag);
        }

        if let Ok(flag) = std::env::var("SESSION_REQUIRE_LOCK") {
            config.require_lock = is_truthy(&flag);
        }

        Ok(config)
    }

    /// Set the key prefix.
    pub fn with_key_prefix(mut self, prefix: &str) -> Self {
        self.key_prefix = prefix.to_string();
        self
    }

    /// Set the session TTL.
    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = expiration;
        self
    }

    /// Pin sessions to the client address.
    pub fn with_match_client_address(mut self, enabled: bool) -> Self {
        self.match_client_address = enabled;
        self
    }

    /// Set the lock configuration.
    pub fn with_lock(mut self, lock: LockConfig) -> Self {
        self.lock = lock;
        self
    }

    /// Refuse unlocked writes.
    pub fn with_require_lock(mut self, required: bool) -> Self {
        self.require_lock = required;
        self
    }

    /// Effective key prefix for a request from `client_address`.
    pub fn key_prefix_for(&self, client_address: Option<&str>) -> String {
        match client_address {
            Some(address) if self.match_client_address => {
                format!("{}{}:", self.key_prefix, address)
            }
            _ => self.key_prefix.clone(),
        }
    }
}

fn is_truthy(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
