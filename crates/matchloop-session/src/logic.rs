//! The traits game developers implement.
//!
//! A game is one type implementing [`GameLogic`] (the lifecycle
//! callbacks) and [`PlayerManager`] (its player set). The framework calls
//! these methods from the session's own task, never from the thread that
//! submitted the work, so implementations need no locking of their own.

use std::time::Duration;

use matchloop_protocol::{GameInput, PlayerId, SessionId};

use crate::{GameError, SessionError, SessionEvent, SessionMeta};

/// Anything that identifies as a player.
///
/// Games usually carry more than an id (name, loadout, rating); they pass
/// that richer type into joins and get it back in
/// [`PlayerManager::add_players`].
pub trait Player: Send + 'static {
    fn player_id(&self) -> PlayerId;
}

impl Player for PlayerId {
    fn player_id(&self) -> PlayerId {
        *self
    }
}

/// A game's player set.
///
/// [`PlayerRoster`](crate::PlayerRoster) implements this and is meant to be
/// embedded and delegated to; implement it by hand only when the game
/// needs different bookkeeping.
pub trait PlayerManager {
    /// The player record this game stores.
    type Player: Player;

    /// Adds a batch of players. Implementations should be all-or-nothing:
    /// on `Err`, none of the batch is in the set.
    fn add_players(&mut self, players: Vec<Self::Player>) -> Result<(), GameError>;

    /// Ids of every player currently in the set.
    fn player_ids(&self) -> Vec<PlayerId>;

    fn has_player(&self, player_id: PlayerId) -> bool;

    fn set_player_online(&mut self, player_id: PlayerId);

    fn set_player_offline(&mut self, player_id: PlayerId);

    /// Removes a player. Removing an absent player is a no-op.
    fn remove_player(&mut self, player_id: PlayerId);
}

/// Read access to the registry's player → session mapping.
///
/// Join events consult this to confirm the player still belongs to the
/// session applying the event. The registry implements it.
pub trait PlayerDirectory: Send + Sync {
    /// The session `player_id` is currently mapped to, if any.
    fn session_of(&self, player_id: PlayerId) -> Option<SessionId>;

    /// Drops the mapping for `player_id`, but only if it still points at
    /// `session_id`. Used when a join the registry already recorded is
    /// rejected by the game.
    fn release_player(&self, player_id: PlayerId, session_id: SessionId);
}

/// The lifecycle callbacks of a game.
///
/// The session task drives these in a fixed order:
///
/// ```text
/// init ─► start ─► (drain events, drain inputs, update)* ─► stop ─┐
///           ▲                                                     │
///           └──────────────── is_auto_restart() ◄─────────────────┘
///                                   │ false
///                                   ▼
///                                destroy
/// ```
///
/// Every callback receives the session's [`SessionMeta`] so the game can
/// read its id and keep `stage`/times up to date.
pub trait GameLogic: PlayerManager + Send + Sized + 'static {
    /// One-time setup before the first round. An error aborts the session
    /// task entirely: no round runs and `destroy` is not called.
    fn init(&mut self, _meta: &mut SessionMeta) -> Result<(), GameError> {
        Ok(())
    }

    /// Begins a round. `now` is Unix time in milliseconds.
    ///
    /// An error skips the round (and its `stop`); the session then
    /// restarts or finishes according to [`is_auto_restart`](Self::is_auto_restart).
    fn start(&mut self, meta: &mut SessionMeta, now: i64) -> Result<(), GameError>;

    /// Applies one staged player command. Called in submission order.
    fn handle_input(&mut self, meta: &mut SessionMeta, input: GameInput);

    /// Applies one staged event. Called in submission order, always before
    /// the inputs of the same tick.
    ///
    /// The default applies the event to this game's player set. Override to
    /// observe joins and presence changes; call
    /// [`SessionEvent::apply`] to keep the default behavior.
    fn handle_event(
        &mut self,
        meta: &mut SessionMeta,
        event: SessionEvent<Self::Player>,
        directory: &dyn PlayerDirectory,
    ) -> Result<(), SessionError> {
        event.apply(self, meta.session_id(), directory)
    }

    /// Advances the simulation. `dt` is the wall time since the previous
    /// update (or since `start` for the first one).
    fn update(&mut self, meta: &mut SessionMeta, dt: Duration);

    /// Checked after every update; `true` ends the round.
    fn is_game_over(&self, meta: &SessionMeta) -> bool;

    /// Ends a round that reached game over (or was cancelled).
    fn stop(&mut self, _meta: &mut SessionMeta) {}

    /// Whether a finished round should be followed by a fresh `start`.
    fn is_auto_restart(&self) -> bool {
        false
    }

    /// Final teardown. Runs once, after the player mappings were released.
    fn destroy(&mut self, _meta: &mut SessionMeta) {}
}
