//! Core types shared by every Matchloop layer.
//!
//! Identity newtypes plus the command records a transport hands to a
//! session. Everything here is plain data: serializable, cheap to clone,
//! and free of any locking or scheduling concerns.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// This is a "newtype wrapper" around `u64`. You can't accidentally pass a
/// `SessionId` where a `PlayerId` is expected, even though both are plain
/// integers underneath.
///
/// `#[serde(transparent)]` serializes `PlayerId(42)` as just `42`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// Identifier of a registered session.
///
/// Ids are handed out by the registry from a bounded pool starting at 1,
/// and are reused once a session is unregistered. `SessionId(0)` is never
/// allocated; it marks a session that has not been registered yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u16);

impl SessionId {
    /// Placeholder id carried by sessions that were never registered.
    pub const UNASSIGNED: SessionId = SessionId(0);

    /// Returns `true` once the registry has assigned a real id.
    pub fn is_assigned(&self) -> bool {
        *self != Self::UNASSIGNED
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// Identifies which kind of game a session runs (map, mode, ruleset).
///
/// Chosen by the caller when the session is built and never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(pub u16);

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// A player command staged for a session's next tick.
///
/// `args` is an ordered, heterogeneous argument list. Each element is a
/// `serde_json::Value`, so a command like `move 3 4` carries
/// `[3, 4]` and `chat "gg"` carries `["gg"]` without the framework
/// knowing anything about the game's command set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameInput {
    /// The player who issued the command.
    pub player_id: PlayerId,

    /// Command name, interpreted only by the game.
    pub cmd: String,

    /// Ordered arguments. Missing in JSON means "no arguments".
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
}

impl GameInput {
    /// Builds an input from its parts.
    pub fn new(
        player_id: PlayerId,
        cmd: impl Into<String>,
        args: Vec<serde_json::Value>,
    ) -> Self {
        Self {
            player_id,
            cmd: cmd.into(),
            args,
        }
    }

    /// Returns the argument at `index`, if present.
    pub fn arg(&self, index: usize) -> Option<&serde_json::Value> {
        self.args.get(index)
    }
}

/// The wire form of a command, as sent by a client.
///
/// The client never states who it is inside the frame; the transport knows
/// which player owns the connection and binds the frame to that player with
/// [`CommandFrame::into_input`].
///
/// ```text
/// { "cmd": "move", "args": [3, 4] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandFrame {
    pub cmd: String,
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
}

impl CommandFrame {
    /// Binds this frame to the player that sent it.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] if the command name is
    /// empty or only whitespace.
    pub fn into_input(self, player_id: PlayerId) -> Result<GameInput, ProtocolError> {
        if self.cmd.trim().is_empty() {
            return Err(ProtocolError::InvalidMessage(format!(
                "empty command from {player_id}"
            )));
        }
        Ok(GameInput {
            player_id,
            cmd: self.cmd,
            args: self.args,
        })
    }
}

// =========================================================================
// Tests
// =========================================================================
