//! The per-session tick loop.
//!
//! ```text
//! init ──err──► (report, return)
//!   │
//!   ▼
//! start ──err──► report ──► auto restart? ──yes──► wait one interval ─┐
//!   │                             │ no                                │
//!   ▼                             ▼                                   │
//! tick*  (events, inputs, update) ... until game over or cancel      │
//!   │                                                                 │
//! stop ──► auto restart and not cancelled? ──yes──► start ◄───────────┘
//!   │ no
//!   ▼
//! release players ──► destroy
//! ```

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use matchloop_protocol::SessionId;
use matchloop_session::{GameLogic, Session};
use matchloop_tick::{TickConfig, TickScheduler};
use tokio_util::sync::CancellationToken;

use crate::SessionRegistry;
use crate::registry::SessionEntry;

/// How a round's tick loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoundEnd {
    GameOver,
    Cancelled,
}

/// Owns a session for as long as its task runs.
pub(crate) struct SessionRunner<G: GameLogic> {
    session: Session<G>,
    registry: Arc<SessionRegistry<G>>,
    entry: Arc<SessionEntry<G>>,
    tick: TickConfig,
    cancel: CancellationToken,
}

impl<G: GameLogic> SessionRunner<G> {
    pub(crate) fn new(
        session: Session<G>,
        registry: Arc<SessionRegistry<G>>,
        entry: Arc<SessionEntry<G>>,
        tick: TickConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session,
            registry,
            entry,
            tick,
            cancel,
        }
    }

    pub(crate) async fn run(mut self) {
        let session_id = self.session.session_id();

        if let Err(e) = self.session.init() {
            self.registry.diagnostics().report("init", &e);
            self.entry.set_running(false);
            tracing::warn!("session aborted during init");
            return;
        }
        tracing::info!(template_id = %self.session.template_id(), "session initialized");

        let mut rounds = 0u64;
        while !self.cancel.is_cancelled() {
            if let Err(e) = self.session.start(unix_millis()) {
                self.registry.diagnostics().report("start", &e);
                if !self.session.is_auto_restart() || !self.pause().await {
                    break;
                }
                continue;
            }
            rounds += 1;
            tracing::info!(round = rounds, "round started");

            let end = self.play_round().await;
            self.session.stop();
            tracing::info!(round = rounds, ?end, "round stopped");

            if end == RoundEnd::Cancelled || !self.session.is_auto_restart() {
                break;
            }
        }

        self.finish(session_id);
    }

    /// Ticks until the game is over or the task is cancelled.
    async fn play_round(&mut self) -> RoundEnd {
        let mut scheduler = TickScheduler::new(self.tick.clone());
        loop {
            let info = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return RoundEnd::Cancelled,
                info = scheduler.wait_for_tick() => info,
            };

            let events = self
                .session
                .drain_events(&*self.registry, self.registry.diagnostics());
            let inputs = self.session.drain_inputs();
            self.session.update(info.elapsed);
            scheduler.record_tick_end();

            tracing::trace!(
                tick = info.tick,
                events,
                inputs,
                dt_ms = info.elapsed.as_millis() as u64,
                "tick"
            );

            if self.session.is_game_over() {
                return RoundEnd::GameOver;
            }
        }
    }

    /// Waits one tick interval before retrying a failed start. Returns
    /// `false` if cancelled meanwhile.
    ///
    /// Takes `&mut self` so the future stays `Send` without requiring the
    /// game to be `Sync`.
    async fn pause(&mut self) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(self.tick.interval()) => true,
        }
    }

    /// Releases every player mapped to this session, then destroys it.
    fn finish(&mut self, session_id: SessionId) {
        let mut players = self.session.player_ids();
        players.extend(self.session.discard_pending());
        let released = self.registry.release_players(session_id, &players);
        self.session.destroy();
        self.entry.set_running(false);
        tracing::info!(released, "session destroyed");
    }
}

/// Wall-clock Unix time in milliseconds.
fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
