//! A ready-made player set.

use std::collections::BTreeMap;

use matchloop_protocol::PlayerId;

use crate::{GameError, Player, PlayerManager};

/// One seated player and their connection state.
#[derive(Debug, Clone)]
struct Seat<P> {
    player: P,
    online: bool,
}

/// Players keyed by id, each with an online flag, optionally capped.
///
/// Games embed a roster and delegate their [`PlayerManager`] methods to
/// it. Iteration is in ascending id order, which keeps anything derived
/// from the roster deterministic.
#[derive(Debug, Clone)]
pub struct PlayerRoster<P> {
    seats: BTreeMap<PlayerId, Seat<P>>,
    capacity: Option<usize>,
}

impl<P: Player> PlayerRoster<P> {
    /// An empty, uncapped roster.
    pub fn new() -> Self {
        Self {
            seats: BTreeMap::new(),
            capacity: None,
        }
    }

    /// An empty roster that holds at most `capacity` players.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            seats: BTreeMap::new(),
            capacity: Some(capacity),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn get(&self, player_id: PlayerId) -> Option<&P> {
        self.seats.get(&player_id).map(|seat| &seat.player)
    }

    pub fn get_mut(&mut self, player_id: PlayerId) -> Option<&mut P> {
        self.seats.get_mut(&player_id).map(|seat| &mut seat.player)
    }

    /// `false` for absent players as well as offline ones.
    pub fn is_online(&self, player_id: PlayerId) -> bool {
        self.seats.get(&player_id).is_some_and(|seat| seat.online)
    }

    pub fn online_count(&self) -> usize {
        self.seats.values().filter(|seat| seat.online).count()
    }

    /// Players in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &P> {
        self.seats.values().map(|seat| &seat.player)
    }

    fn check_batch(&self, players: &[P]) -> Result<(), GameError> {
        let mut incoming = Vec::with_capacity(players.len());
        for player in players {
            let id = player.player_id();
            if self.seats.contains_key(&id) || incoming.contains(&id) {
                return Err(GameError::new(format!("player {id} is already seated")));
            }
            incoming.push(id);
        }
        if let Some(capacity) = self.capacity {
            if self.seats.len() + incoming.len() > capacity {
                return Err(GameError::new(format!(
                    "roster full: {} seated, {} joining, capacity {capacity}",
                    self.seats.len(),
                    incoming.len()
                )));
            }
        }
        Ok(())
    }
}

impl<P: Player> Default for PlayerRoster<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Player> PlayerManager for PlayerRoster<P> {
    type Player = P;

    /// Seats the whole batch (online) or none of it. Fails on a player that
    /// is already seated, a duplicate within the batch, or a batch that
    /// would exceed the capacity.
    fn add_players(&mut self, players: Vec<P>) -> Result<(), GameError> {
        self.check_batch(&players)?;
        for player in players {
            let id = player.player_id();
            self.seats.insert(
                id,
                Seat {
                    player,
                    online: true,
                },
            );
        }
        Ok(())
    }

    fn player_ids(&self) -> Vec<PlayerId> {
        self.seats.keys().copied().collect()
    }

    fn has_player(&self, player_id: PlayerId) -> bool {
        self.seats.contains_key(&player_id)
    }

    fn set_player_online(&mut self, player_id: PlayerId) {
        if let Some(seat) = self.seats.get_mut(&player_id) {
            seat.online = true;
        }
    }

    fn set_player_offline(&mut self, player_id: PlayerId) {
        if let Some(seat) = self.seats.get_mut(&player_id) {
            seat.online = false;
        }
    }

    fn remove_player(&mut self, player_id: PlayerId) {
        self.seats.remove(&player_id);
    }
}
