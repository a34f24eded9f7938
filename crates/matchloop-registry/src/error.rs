//! Error types for the registry layer.

use matchloop_protocol::{PlayerId, SessionId};
use matchloop_session::{GameError, SessionError};

/// Errors returned by [`SessionRegistry`](crate::SessionRegistry)
/// operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The player is already mapped to a session (or appears twice in the
    /// same batch).
    #[error("player {0} is already in a session")]
    AlreadyInGame(PlayerId),

    /// No session is registered under this id.
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// Every id in `[1, max]` is in use.
    #[error("no free session id (all {0} in use)")]
    IdsExhausted(u16),

    /// The session's tick loop was already started.
    #[error("session {0} is already running")]
    AlreadyRunning(SessionId),

    /// The session's task went away before answering.
    #[error("session {0} is unavailable")]
    Unavailable(SessionId),

    /// The registry is shutting down and starts no new tasks.
    #[error("registry is shutting down")]
    ShuttingDown,

    /// A session task panicked or was aborted.
    #[error("session {session} task failed: {reason}")]
    TaskFailed { session: SessionId, reason: String },

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Game(#[from] GameError),
}
