//! Unified error type for Matchloop.

use matchloop_protocol::ProtocolError;
use matchloop_registry::RegistryError;
use matchloop_session::{GameError, SessionError};

/// Top-level error that wraps every sub-crate's errors.
///
/// Hosts using the `matchloop` crate can return this from any function
/// that touches commands, sessions, or the registry; `?` converts the
/// sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum MatchloopError {
    /// A command could not be decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Staging work on a session failed (queue full, session closed).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A registry operation failed (already in game, not found, ...).
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Game code refused the operation.
    #[error(transparent)]
    Game(#[from] GameError),
}
