//! Save-path parsing.
//!
//! Accepts `[tcp://]host[:port][?auth=..&database=N&timeout=F&prefix=..]`.

use std::str::FromStr;
use std::time::Duration;
use url::Url;

use sesslock_redis::{DEFAULT_PORT, RedisConfig};

use crate::error::{SessionError, SessionResult};

/// A parsed save path.
#[derive(Debug, Clone, PartialEq)]
pub struct SavePath {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// `auth` parameter.
    pub password: Option<String>,
    /// `database` parameter.
    pub database: Option<u32>,
    /// `timeout` parameter in seconds, used as the connect timeout.
    /// Whole numbers (`timeout=2`) are accepted as well as decimals (`2.5`).
    pub timeout: Option<Duration>,
    /// `prefix` parameter, overrides the key prefix.
    pub prefix: Option<String>,
}

impl SavePath {
    /// Parse a save path.
    ///
    /// # Examples
    ///
    /// ```
    /// use sesslock_session::SavePath;
    ///
    /// let path = SavePath::parse("tcp://10.0.0.2:6380?auth=s3cret&database=2").unwrap();
    /// assert_eq!(path.host, "10.0.0.2");
    /// assert_eq!(path.port, 6380);
    /// assert_eq!(path.database, Some(2));
    /// ```
    pub fn parse(save_path: &str) -> SessionResult<Self> {
        let save_path = save_path.trim();
        if save_path.is_empty() {
            return Err(SessionError::Config(
                "no Redis save path configured".to_string(),
            ));
        }

        let with_scheme = if save_path.contains("://") {
            save_path.to_string()
        } else {
            format!("tcp://{}", save_path)
        };

        let invalid = || SessionError::InvalidSavePath(save_path.to_string());

        let url = Url::parse(&with_scheme).map_err(|_| invalid())?;
        if url.scheme() != "tcp" {
            return Err(invalid());
        }

        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => return Err(invalid()),
        };

        let mut parsed = Self {
            host,
            port: url.port().unwrap_or(DEFAULT_PORT),
            password: None,
            database: None,
            timeout: None,
            prefix: None,
        };

        // Unparseable values are ignored rather than rejected
        for (name, value) in url.query_pairs() {
            match name.as_ref() {
                "auth" if !value.is_empty() => parsed.password = Some(value.into_owned()),
                "database" => parsed.database = value.parse().ok(),
                "timeout" => {
                    parsed.timeout = value
                        .parse::<f64>()
                        .ok()
                        .filter(|secs| secs.is_finite() && *secs > 0.0)
                        .map(Duration::from_secs_f64);
                }
                "prefix" if !value.is_empty() => parsed.prefix = Some(value.into_owned()),
                _ => {}
            }
        }

        Ok(parsed)
    }

    /// Store configuration described by this save path.
    pub fn redis_config(&self) -> RedisConfig {
        let mut config = RedisConfig::new(self.host.clone(), self.port);
        config.password = self.password.clone();
        config.database = self.database;
        if let Some(timeout) = self.timeout {
            config.connect_timeout = timeout;
        }
        config
    }
}

impl FromStr for SavePath {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
