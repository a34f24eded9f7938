use std::time::Duration;

use matchloop::prelude::*;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct CountdownConfig {
    tick_ms: u64,
    /// Ticks per round before the clock hits zero.
    countdown: u32,
    seats: usize,
    rounds: u32,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            tick_ms: 50,
            countdown: 20,
            seats: 4,
            rounds: 2,
        }
    }
}

fn load_config() -> Result<CountdownConfig, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?),
        None => Ok(CountdownConfig::default()),
    }
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Racer {
    id: PlayerId,
    name: String,
    boosts: u32,
}

impl Racer {
    fn new(id: u64, name: &str) -> Self {
        Self {
            id: PlayerId(id),
            name: name.into(),
            boosts: 0,
        }
    }
}

impl Player for Racer {
    fn player_id(&self) -> PlayerId {
        self.id
    }
}

/// A shared clock that ticks down to zero. Online players can `boost` it
/// down faster; the player with the most boosts wins the round.
struct Countdown {
    roster: PlayerRoster<Racer>,
    config: CountdownConfig,
    remaining: u32,
    round: u32,
}

impl Countdown {
    fn new(config: CountdownConfig) -> Self {
        Self {
            roster: PlayerRoster::with_capacity(config.seats),
            remaining: config.countdown,
            round: 0,
            config,
        }
    }

    fn leader(&self) -> Option<&Racer> {
        self.roster
            .iter()
            .filter(|r| r.boosts > 0)
            .max_by_key(|r| r.boosts)
    }
}

impl PlayerManager for Countdown {
    type Player = Racer;

    fn add_players(&mut self, players: Vec<Racer>) -> Result<(), GameError> {
        self.roster.add_players(players)
    }
    fn player_ids(&self) -> Vec<PlayerId> {
        self.roster.player_ids()
    }
    fn has_player(&self, player_id: PlayerId) -> bool {
        self.roster.has_player(player_id)
    }
    fn set_player_online(&mut self, player_id: PlayerId) {
        self.roster.set_player_online(player_id);
    }
    fn set_player_offline(&mut self, player_id: PlayerId) {
        self.roster.set_player_offline(player_id);
    }
    fn remove_player(&mut self, player_id: PlayerId) {
        self.roster.remove_player(player_id);
    }
}

impl GameLogic for Countdown {
    fn init(&mut self, meta: &mut SessionMeta) -> Result<(), GameError> {
        if self.config.countdown == 0 {
            return Err(GameError::new("countdown must be at least one tick"));
        }
        tracing::info!(session_id = %meta.session_id(), "countdown ready");
        Ok(())
    }

    fn start(&mut self, meta: &mut SessionMeta, now: i64) -> Result<(), GameError> {
        if self.roster.is_empty() {
            return Err(GameError::new("no racers seated"));
        }
        self.round += 1;
        self.remaining = self.config.countdown;
        for id in self.roster.player_ids() {
            if let Some(racer) = self.roster.get_mut(id) {
                racer.boosts = 0;
            }
        }
        meta.set_stage(self.round as i32);
        meta.set_start_time(now);
        meta.set_cur_time(now);
        tracing::info!(round = self.round, racers = self.roster.len(), "round started");
        Ok(())
    }

    fn handle_input(&mut self, _meta: &mut SessionMeta, input: GameInput) {
        if input.cmd != "boost" || !self.roster.is_online(input.player_id) {
            return;
        }
        let amount = input.arg(0).and_then(|v| v.as_u64()).unwrap_or(1).min(3) as u32;
        if let Some(racer) = self.roster.get_mut(input.player_id) {
            racer.boosts += 1;
            self.remaining = self.remaining.saturating_sub(amount);
            tracing::debug!(racer = %racer.name, amount, remaining = self.remaining, "boost");
        }
    }

    fn update(&mut self, meta: &mut SessionMeta, dt: Duration) {
        meta.advance_cur_time(dt.as_millis() as i64);
        self.remaining = self.remaining.saturating_sub(1);
    }

    fn is_game_over(&self, _meta: &SessionMeta) -> bool {
        self.remaining == 0
    }

    fn stop(&mut self, meta: &mut SessionMeta) {
        meta.set_end_time(meta.cur_time());
        let winner = self.leader().map(|r| r.name.as_str()).unwrap_or("nobody");
        tracing::info!(
            round = self.round,
            winner,
            ms = meta.end_time() - meta.start_time(),
            "round over"
        );
    }

    fn is_auto_restart(&self) -> bool {
        self.round < self.config.rounds
    }

    fn destroy(&mut self, _meta: &mut SessionMeta) {
        tracing::info!(rounds = self.round, "countdown closed");
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    matchloop::init_tracing();
    let config = load_config()?;
    let tick_ms = config.tick_ms;

    let registry = SessionRegistry::<Countdown>::new(RegistryConfig::default());
    let session = Session::new(TemplateId(1), Countdown::new(config), &SessionConfig::default());
    let id = registry.register(session)?;

    // Matchmaking found two racers; a third drops in after launch.
    registry
        .match_join(vec![Racer::new(1, "ada"), Racer::new(2, "bo")], id)
        .await?;
    let task = registry.run(id, tick_ms)?;
    registry.join_single(Racer::new(3, "cy"), id)?;

    // Commands arrive as JSON from the transport.
    let codec = JsonCodec;
    let handle = registry.session(id).ok_or(RegistryError::SessionNotFound(id))?;
    for (player, frame) in [
        (1, r#"{"cmd":"boost","args":[2]}"#),
        (2, r#"{"cmd":"boost"}"#),
        (1, r#"{"cmd":"boost","args":[1]}"#),
    ] {
        handle.enqueue_input(codec.decode_input(PlayerId(player), frame.as_bytes())?)?;
    }

    // Bo's connection flaps; boosts sent while offline are ignored.
    registry.set_player_offline(PlayerId(2));
    handle.submit_input(PlayerId(2), "boost", vec![])?;
    tokio::time::sleep(Duration::from_millis(tick_ms * 2)).await;
    registry.set_player_online(PlayerId(2));

    // Cy leaves before the end.
    registry.remove_player(PlayerId(3));

    match tokio::time::timeout(Duration::from_secs(30), task.join()).await {
        Ok(result) => result?,
        Err(_) => tracing::warn!("countdown did not finish in time"),
    }
    registry.shutdown().await;
    Ok(())
}
