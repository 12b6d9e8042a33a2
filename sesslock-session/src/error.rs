//! Error types for session operations.

use sesslock_redis::StoreError;
use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Session-specific errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Save path could not be parsed
    #[error("Invalid Redis save path format: {0}")]
    InvalidSavePath(String),

    /// Operation requires an open connection
    #[error("Session store is not open")]
    NotOpen,

    /// An earlier open failed; the handler is unusable for this request
    #[error("Session handler is terminated")]
    Terminated,

    /// Connect, AUTH or SELECT failed
    #[error("Connection error: {0}")]
    Connection(#[source] StoreError),

    /// Store command failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Strict locking is on and no lock is held
    #[error("Session lock required but not held: {0}")]
    LockRequired(String),

    /// TTL refresh hit a missing key
    #[error("Session key vanished before touch: {0}")]
    TouchFailed(String),

    /// Session key still present after delete
    #[error("Failed to destroy session: {0}")]
    DestroyFailed(String),

    /// Closing the connection failed
    #[error("Failed to close connection: {0}")]
    Close(String),
}
