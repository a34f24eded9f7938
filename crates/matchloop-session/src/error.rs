//! Error types for the session layer.

use matchloop_protocol::{PlayerId, SessionId};

use crate::QueueKind;

/// An error raised by game code (`init`, `start`, `add_players`).
///
/// Opaque to the framework: it is carried, logged, and handed back to
/// whoever asked, but never inspected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct GameError(pub String);

impl GameError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors that can occur while staging or applying work on a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The event carries nothing to apply, e.g. a match join with an
    /// empty player batch.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A bounded staging queue is at capacity.
    #[error("{queue} queue of session {session} is full")]
    QueueFull {
        session: SessionId,
        queue: QueueKind,
    },

    /// The session's task is gone, so nothing will ever drain the queue.
    #[error("session {0} is closed")]
    Closed(SessionId),

    /// A join event was applied for a player the registry no longer maps
    /// to any session.
    #[error("player {0} has not joined any session")]
    PlayerNotJoined(PlayerId),

    /// A join event was applied by a session other than the one the
    /// registry maps the player to.
    #[error("player {player} belongs to session {mapped}, not {applying}")]
    SessionMismatch {
        player: PlayerId,
        mapped: SessionId,
        applying: SessionId,
    },

    /// The caller waiting on a match join went away before the session
    /// answered. The players were taken back out of the session.
    #[error("match join on session {0} was abandoned by its caller")]
    ReplyAbandoned(SessionId),

    /// The game rejected the operation.
    #[error(transparent)]
    Game(#[from] GameError),
}
