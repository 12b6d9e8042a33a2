//! Session handler contract.

use crate::error::{SessionError, SessionResult};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Where a handler is in its request lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Constructed, `open` not called yet
    Unopened,
    /// Connected to the store
    Opened,
    /// A session was read
    Read,
    /// A session was written
    Written,
    /// `close` ran; the handler may be opened again
    Closed,
    /// `open` failed; every later operation fails without contacting the store
    Terminated,
}

impl Phase {
    /// Whether a store connection is held in this phase.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Opened | Self::Read | Self::Written)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unopened => "unopened",
            Self::Opened => "opened",
            Self::Read => "read",
            Self::Written => "written",
            Self::Closed => "closed",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Result of [`SessionHandler::close`].
///
/// `close` cannot fail in the `Result` sense. A broken store is reported
/// through the outcome instead, and the caller decides whether it cares.
#[derive(Debug)]
pub enum CloseOutcome {
    /// The connection was closed.
    Closed,
    /// The liveness probe did not answer; the connection was dropped.
    Discarded,
    /// The store answered the probe but closing the connection failed.
    Failed(SessionError),
    /// A store fault was logged and swallowed.
    Suppressed(SessionError),
}

impl CloseOutcome {
    /// Whether close should be reported to the framework as a success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Closed | Self::Discarded)
    }

    /// The failure or suppressed fault, if any.
    pub fn error(&self) -> Option<&SessionError> {
        match self {
            Self::Failed(e) | Self::Suppressed(e) => Some(e),
            Self::Closed | Self::Discarded => None,
        }
    }
}

/// Lifecycle callbacks a web framework drives once per request.
///
/// The framework calls `open`, `read`, lets the application mutate the
/// payload, then calls `write` and `close`. `destroy` runs on logout.
///
/// # Examples
///
/// ```ignore
/// use sesslock_session::SessionHandler;
///
/// async fn handle(handler: &mut impl SessionHandler, id: &str) -> SessionResult<()> {
///     handler.open().await?;
///     let mut payload = handler.read(id).await?;
///     payload.extend_from_slice(b"visits|i:1;");
///     handler.write(id, &payload).await?;
///     handler.close().await;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SessionHandler: Send {
    /// Connect to the store.
    async fn open(&mut self) -> SessionResult<()>;

    /// Lock and fetch a session. A missing session reads as an empty payload.
    async fn read(&mut self, session_id: &str) -> SessionResult<Vec<u8>>;

    /// Persist a session payload.
    ///
    /// # Arguments
    ///
    /// * `session_id` - May differ from the ID last read if it was regenerated
    /// * `payload` - Serialized session data
    async fn write(&mut self, session_id: &str, payload: &[u8]) -> SessionResult<()>;

    /// Release the lock and disconnect.
    async fn close(&mut self) -> CloseOutcome;

    /// Delete a session and its lock.
    async fn destroy(&mut self, session_id: &str) -> SessionResult<()>;

    /// Garbage-collect sessions older than `max_lifetime`; returns the number removed.
    async fn gc(&mut self, max_lifetime: Duration) -> SessionResult<usize>;
}
