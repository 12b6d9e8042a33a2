//! Store error types.

use thiserror::Error;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by a key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Could not establish the connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// AUTH was rejected.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// SELECT was rejected.
    #[error("Unable to select database {database}: {reason}")]
    Select {
        /// Requested database index.
        database: u32,
        /// Server or client message.
        reason: String,
    },

    /// A command failed.
    #[error("Command error: {0}")]
    Command(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connect or read timed out.
    #[error("Operation timed out")]
    Timeout,

    /// The connection was already closed.
    #[error("Not connected")]
    NotConnected,

    /// Underlying Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl StoreError {
    /// Check if this error indicates the link to the store is unusable.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Timeout | Self::NotConnected
        )
    }
}
