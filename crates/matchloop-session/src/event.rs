//! Session events: the closed set of mutations other threads may request.
//!
//! Producers never touch a session's player set directly. They enqueue a
//! [`SessionEvent`] and the session's own task applies it on its next tick.
//! Adding a new kind of mutation means adding a variant here and a match
//! arm in [`SessionEvent::apply`].

use std::fmt;

use matchloop_protocol::{PlayerId, SessionId};
use tokio::sync::oneshot;

use crate::{GameError, Player, PlayerDirectory, PlayerManager, SessionError};

/// A mutation staged for a session's player set.
pub enum SessionEvent<P> {
    /// The player's connection came (back) up.
    PlayerOnline(PlayerId),

    /// The player's connection dropped.
    PlayerOffline(PlayerId),

    /// A single player joining. The registry recorded the mapping when the
    /// event was enqueued; it is re-checked when applied.
    PlayerJoin(P),

    /// The player left; take them out of the set.
    PlayerRemove(PlayerId),

    /// A matched batch joining a session whose task is already running.
    /// The result of `add_players` is sent back on `reply`.
    MatchJoin {
        players: Vec<P>,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
}

/// The variant of a [`SessionEvent`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PlayerOnline,
    PlayerOffline,
    PlayerJoin,
    PlayerRemove,
    MatchJoin,
}

impl EventKind {
    /// Stable snake_case label, used for diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::PlayerOnline => "player_online",
            Self::PlayerOffline => "player_offline",
            Self::PlayerJoin => "player_join",
            Self::PlayerRemove => "player_remove",
            Self::MatchJoin => "match_join",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl<P: Player> SessionEvent<P> {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::PlayerOnline(_) => EventKind::PlayerOnline,
            Self::PlayerOffline(_) => EventKind::PlayerOffline,
            Self::PlayerJoin(_) => EventKind::PlayerJoin,
            Self::PlayerRemove(_) => EventKind::PlayerRemove,
            Self::MatchJoin { .. } => EventKind::MatchJoin,
        }
    }

    /// Every player this event concerns.
    pub fn player_ids(&self) -> Vec<PlayerId> {
        match self {
            Self::PlayerOnline(id) | Self::PlayerOffline(id) | Self::PlayerRemove(id) => {
                vec![*id]
            }
            Self::PlayerJoin(player) => vec![player.player_id()],
            Self::MatchJoin { players, .. } => players.iter().map(Player::player_id).collect(),
        }
    }

    /// Rejects events that carry nothing to apply.
    pub(crate) fn validate(&self) -> Result<(), SessionError> {
        match self {
            Self::MatchJoin { players, .. } if players.is_empty() => Err(
                SessionError::InvalidArgument("match join with no players".into()),
            ),
            _ => Ok(()),
        }
    }

    /// Applies the event to `game`, which belongs to session `session_id`.
    ///
    /// Presence and removal never fail. A join fails with
    /// [`SessionError::PlayerNotJoined`] if the directory has no mapping for
    /// the player, [`SessionError::SessionMismatch`] if the mapping names a
    /// different session, or with the game's own error from `add_players`.
    /// When the game refuses a join, the mapping recorded for it is
    /// released so the player is free to join elsewhere.
    pub fn apply<G>(
        self,
        game: &mut G,
        session_id: SessionId,
        directory: &dyn PlayerDirectory,
    ) -> Result<(), SessionError>
    where
        G: PlayerManager<Player = P>,
    {
        match self {
            Self::PlayerOnline(player_id) => {
                game.set_player_online(player_id);
                Ok(())
            }
            Self::PlayerOffline(player_id) => {
                game.set_player_offline(player_id);
                Ok(())
            }
            Self::PlayerJoin(player) => {
                let player_id = player.player_id();
                match directory.session_of(player_id) {
                    None => Err(SessionError::PlayerNotJoined(player_id)),
                    Some(mapped) if mapped != session_id => Err(SessionError::SessionMismatch {
                        player: player_id,
                        mapped,
                        applying: session_id,
                    }),
                    Some(_) => game.add_players(vec![player]).map_err(|e| {
                        directory.release_player(player_id, session_id);
                        SessionError::Game(e)
                    }),
                }
            }
            Self::PlayerRemove(player_id) => {
                game.remove_player(player_id);
                Ok(())
            }
            Self::MatchJoin { players, reply } => {
                let ids: Vec<PlayerId> = players.iter().map(Player::player_id).collect();
                let result = game.add_players(players);
                let added = result.is_ok();
                if reply.send(result).is_err() {
                    // Nobody will commit the registry mappings; undo.
                    if added {
                        for id in ids {
                            game.remove_player(id);
                        }
                    }
                    return Err(SessionError::ReplyAbandoned(session_id));
                }
                Ok(())
            }
        }
    }
}

impl<P: Player> fmt::Debug for SessionEvent<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionEvent")
            .field("kind", &self.kind())
            .field("players", &self.player_ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::PlayerRoster;

    /// A directory backed by a plain map.
    #[derive(Default)]
    struct MapDirectory {
        mapping: Mutex<HashMap<PlayerId, SessionId>>,
    }

    impl MapDirectory {
        fn with(entries: &[(u64, u16)]) -> Self {
            let mapping = entries
                .iter()
                .map(|(p, s)| (PlayerId(*p), SessionId(*s)))
                .collect();
            Self {
                mapping: Mutex::new(mapping),
            }
        }
    }

    impl PlayerDirectory for MapDirectory {
        fn session_of(&self, player_id: PlayerId) -> Option<SessionId> {
            self.mapping.lock().unwrap().get(&player_id).copied()
        }

        fn release_player(&self, player_id: PlayerId, session_id: SessionId) {
            let mut mapping = self.mapping.lock().unwrap();
            if mapping.get(&player_id) == Some(&session_id) {
                mapping.remove(&player_id);
            }
        }
    }

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    const HERE: SessionId = SessionId(1);

    #[test]
    fn test_apply_join_mapped_here_adds_player() {
        let mut roster = PlayerRoster::new();
        let dir = MapDirectory::with(&[(1, 1)]);

        SessionEvent::PlayerJoin(pid(1)).apply(&mut roster, HERE, &dir).unwrap();

        assert!(roster.has_player(pid(1)));
    }

    #[test]
    fn test_apply_join_unmapped_is_player_not_joined() {
        let mut roster = PlayerRoster::new();
        let dir = MapDirectory::default();

        let result = SessionEvent::PlayerJoin(pid(1)).apply(&mut roster, HERE, &dir);

        assert!(matches!(result, Err(SessionError::PlayerNotJoined(p)) if p == pid(1)));
        assert!(!roster.has_player(pid(1)));
    }

    #[test]
    fn test_apply_join_mapped_elsewhere_is_mismatch() {
        let mut roster = PlayerRoster::new();
        let dir = MapDirectory::with(&[(1, 9)]);

        let result = SessionEvent::PlayerJoin(pid(1)).apply(&mut roster, HERE, &dir);

        assert!(matches!(
            result,
            Err(SessionError::SessionMismatch { mapped, applying, .. })
                if mapped == SessionId(9) && applying == HERE
        ));
        assert!(!roster.has_player(pid(1)));
    }

    #[test]
    fn test_apply_join_rejected_by_game_releases_mapping() {
        let mut roster = PlayerRoster::with_capacity(1);
        roster.add_players(vec![pid(7)]).unwrap();
        let dir = MapDirectory::with(&[(1, 1)]);

        let result = SessionEvent::PlayerJoin(pid(1)).apply(&mut roster, HERE, &dir);

        assert!(matches!(result, Err(SessionError::Game(_))));
        assert_eq!(dir.session_of(pid(1)), None);
    }

    #[test]
    fn test_apply_presence_and_remove() {
        let mut roster = PlayerRoster::new();
        roster.add_players(vec![pid(1)]).unwrap();
        let dir = MapDirectory::default();

        SessionEvent::<PlayerId>::PlayerOffline(pid(1)).apply(&mut roster, HERE, &dir).unwrap();
        assert!(!roster.is_online(pid(1)));

        SessionEvent::<PlayerId>::PlayerOnline(pid(1)).apply(&mut roster, HERE, &dir).unwrap();
        assert!(roster.is_online(pid(1)));

        SessionEvent::<PlayerId>::PlayerRemove(pid(1)).apply(&mut roster, HERE, &dir).unwrap();
        assert!(!roster.has_player(pid(1)));
    }

    #[test]
    fn test_apply_match_join_replies_with_result() {
        let mut roster = PlayerRoster::new();
        let dir = MapDirectory::default();
        let (reply, mut rx) = oneshot::channel();

        SessionEvent::MatchJoin {
            players: vec![pid(1), pid(2)],
            reply,
        }
        .apply(&mut roster, HERE, &dir)
        .unwrap();

        assert_eq!(rx.try_recv().unwrap(), Ok(()));
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn test_apply_match_join_abandoned_rolls_back() {
        let mut roster = PlayerRoster::new();
        let dir = MapDirectory::default();
        let (reply, rx) = oneshot::channel();
        drop(rx);

        let result = SessionEvent::MatchJoin {
            players: vec![pid(1), pid(2)],
            reply,
        }
        .apply(&mut roster, HERE, &dir);

        assert!(matches!(result, Err(SessionError::ReplyAbandoned(id)) if id == HERE));
        assert!(roster.is_empty());
    }

    #[test]
    fn test_validate_rejects_empty_match_join() {
        let (reply, _rx) = oneshot::channel();
        let event = SessionEvent::<PlayerId>::MatchJoin {
            players: vec![],
            reply,
        };
        assert!(matches!(event.validate(), Err(SessionError::InvalidArgument(_))));
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(EventKind::PlayerJoin.to_string(), "player_join");
        assert_eq!(
            SessionEvent::<PlayerId>::PlayerRemove(pid(3)).kind(),
            EventKind::PlayerRemove
        );
    }
}
