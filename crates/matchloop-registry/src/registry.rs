//! Session registry: creates, tracks, and routes players to sessions.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use matchloop_protocol::{PlayerId, SessionId};
use matchloop_session::{
    Diagnostics, GameLogic, Player, PlayerDirectory, Session, SessionError, SessionEvent,
    SessionHandle, TracingDiagnostics,
};
use matchloop_tick::TickConfig;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

use crate::runner::SessionRunner;
use crate::{IdPool, RegistryConfig, RegistryError, SessionTask};

/// One registered session.
///
/// Until its tick loop is launched the registry owns the session itself
/// (`staged`); afterwards the session lives on its task and only the
/// handle stays here.
pub(crate) struct SessionEntry<G: GameLogic> {
    handle: SessionHandle<G::Player>,
    staged: Mutex<Option<Session<G>>>,
    running: AtomicBool,
}

impl<G: GameLogic> SessionEntry<G> {
    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }
}

/// The session table and the id pool share one lock, so an id is never
/// visible as both free and in use.
struct SessionTable<G: GameLogic> {
    entries: HashMap<SessionId, Arc<SessionEntry<G>>>,
    ids: IdPool,
}

/// Player mappings recorded ahead of the operation they belong to.
///
/// Dropping an uncommitted reservation removes the mappings again, so an
/// early return, an error, or a cancelled future all leave the player map
/// as it was.
struct Reservation<'a> {
    players: &'a RwLock<HashMap<PlayerId, SessionId>>,
    player_ids: Vec<PlayerId>,
    session_id: SessionId,
    committed: bool,
}

impl Reservation<'_> {
    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let mut players = write(self.players);
        for player_id in &self.player_ids {
            if players.get(player_id) == Some(&self.session_id) {
                players.remove(player_id);
            }
        }
        tracing::debug!(
            session_id = %self.session_id,
            players = self.player_ids.len(),
            "player reservation rolled back"
        );
    }
}

/// The concurrent directory of sessions and player → session mappings.
///
/// Two independent reader-writer locks guard the two maps. No operation
/// holds both at once, and none holds either while enqueuing to a session
/// or calling into game code.
///
/// A player is mapped to at most one session at any time.
///
/// Construct one per process (or per game mode) and share the `Arc` with
/// whatever needs it: transport handlers, matchmaking, admin tooling.
pub struct SessionRegistry<G: GameLogic> {
    config: RegistryConfig,
    sessions: RwLock<SessionTable<G>>,
    players: RwLock<HashMap<PlayerId, SessionId>>,
    diagnostics: Arc<dyn Diagnostics>,
    shutdown: CancellationToken,
    tasks: TaskTracker,
}

impl<G: GameLogic> SessionRegistry<G> {
    /// A registry that reports session errors through `tracing`.
    pub fn new(config: RegistryConfig) -> Arc<Self> {
        Self::with_diagnostics(config, Arc::new(TracingDiagnostics))
    }

    /// A registry that reports session errors to `diagnostics`.
    pub fn with_diagnostics(config: RegistryConfig, diagnostics: Arc<dyn Diagnostics>) -> Arc<Self> {
        let ids = IdPool::new(config.max_session_id);
        Arc::new(Self {
            config,
            sessions: RwLock::new(SessionTable {
                entries: HashMap::new(),
                ids,
            }),
            players: RwLock::new(HashMap::new()),
            diagnostics,
            shutdown: CancellationToken::new(),
            tasks: TaskTracker::new(),
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub(crate) fn diagnostics(&self) -> &dyn Diagnostics {
        &*self.diagnostics
    }

    // -----------------------------------------------------------------
    // Session table
    // -----------------------------------------------------------------

    /// Assigns the session the lowest free id and takes ownership of it.
    ///
    /// The session does not tick until [`run`](Self::run) is called.
    pub fn register(&self, mut session: Session<G>) -> Result<SessionId, RegistryError> {
        let mut table = write(&self.sessions);
        let session_id = table
            .ids
            .allocate()
            .ok_or(RegistryError::IdsExhausted(self.config.max_session_id))?;
        session.assign_id(session_id);

        let entry = SessionEntry {
            handle: session.handle(),
            staged: Mutex::new(Some(session)),
            running: AtomicBool::new(false),
        };
        table.entries.insert(session_id, Arc::new(entry));
        tracing::info!(%session_id, sessions = table.entries.len(), "session registered");
        Ok(session_id)
    }

    /// Removes the session and frees its id. Unknown ids are ignored.
    ///
    /// A session that never ran is dropped here. A running session keeps
    /// ticking on its task; use its [`SessionTask`] to stop it.
    pub fn unregister(&self, session_id: SessionId) {
        let mut table = write(&self.sessions);
        if table.entries.remove(&session_id).is_some() {
            table.ids.release(session_id);
            tracing::info!(%session_id, sessions = table.entries.len(), "session unregistered");
        }
    }

    /// The producer handle of a registered session.
    pub fn session(&self, session_id: SessionId) -> Option<SessionHandle<G::Player>> {
        self.entry(session_id).map(|entry| entry.handle.clone())
    }

    /// The producer handle of the session `player_id` is mapped to.
    pub fn session_by_player(&self, player_id: PlayerId) -> Option<SessionHandle<G::Player>> {
        self.player_session(player_id)
            .and_then(|session_id| self.session(session_id))
    }

    pub fn session_count(&self) -> usize {
        read(&self.sessions).entries.len()
    }

    /// Registered session ids, ascending.
    pub fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = read(&self.sessions).entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// `true` while the session's tick loop is alive.
    pub fn is_running(&self, session_id: SessionId) -> bool {
        self.entry(session_id)
            .is_some_and(|entry| entry.running.load(Ordering::Acquire))
    }

    fn entry(&self, session_id: SessionId) -> Option<Arc<SessionEntry<G>>> {
        read(&self.sessions).entries.get(&session_id).cloned()
    }

    // -----------------------------------------------------------------
    // Player mapping
    // -----------------------------------------------------------------

    /// The session `player_id` is currently mapped to.
    pub fn player_session(&self, player_id: PlayerId) -> Option<SessionId> {
        read(&self.players).get(&player_id).copied()
    }

    /// Number of mapped players, across all sessions.
    pub fn player_count(&self) -> usize {
        read(&self.players).len()
    }

    /// Maps every player in `player_ids` to `session_id`, or none of them.
    ///
    /// The check and the insert happen under one write lock, so two
    /// concurrent reservations can never both claim the same player.
    fn reserve(
        &self,
        player_ids: Vec<PlayerId>,
        session_id: SessionId,
    ) -> Result<Reservation<'_>, RegistryError> {
        let mut players = write(&self.players);
        let mut batch = HashSet::with_capacity(player_ids.len());
        for player_id in &player_ids {
            if players.contains_key(player_id) || !batch.insert(*player_id) {
                return Err(RegistryError::AlreadyInGame(*player_id));
            }
        }
        for player_id in &player_ids {
            players.insert(*player_id, session_id);
        }
        Ok(Reservation {
            players: &self.players,
            player_ids,
            session_id,
            committed: false,
        })
    }

    /// Drops the mappings of `player_ids` that still point at `session_id`.
    pub(crate) fn release_players(&self, session_id: SessionId, player_ids: &[PlayerId]) -> usize {
        let mut players = write(&self.players);
        let mut released = 0;
        for player_id in player_ids {
            if players.get(player_id) == Some(&session_id) {
                players.remove(player_id);
                released += 1;
            }
        }
        released
    }

    /// Adds a matched batch of players to a session, all or nothing.
    ///
    /// Fails with [`RegistryError::AlreadyInGame`] if any player is already
    /// mapped (or listed twice), [`RegistryError::SessionNotFound`] for an
    /// unknown session, or with the game's own error if it refuses the
    /// batch. On any failure no player of the batch is mapped.
    ///
    /// If the session has not been launched yet its `add_players` is called
    /// right here. Otherwise the call is made on the session's task and this
    /// waits for the answer.
    pub async fn match_join(
        &self,
        players: Vec<G::Player>,
        session_id: SessionId,
    ) -> Result<(), RegistryError> {
        if players.is_empty() {
            return Err(SessionError::InvalidArgument("match join with no players".into()).into());
        }
        let player_ids: Vec<PlayerId> = players.iter().map(Player::player_id).collect();
        let count = player_ids.len();
        let reservation = self.reserve(player_ids, session_id)?;
        let entry = self
            .entry(session_id)
            .ok_or(RegistryError::SessionNotFound(session_id))?;

        let pending = {
            let mut staged = lock(&entry.staged);
            match staged.as_mut() {
                Some(session) => {
                    session.add_players(players)?;
                    None
                }
                None => {
                    let (reply, answer) = oneshot::channel();
                    entry
                        .handle
                        .enqueue_event(SessionEvent::MatchJoin { players, reply })?;
                    Some(answer)
                }
            }
        };
        if let Some(answer) = pending {
            answer
                .await
                .map_err(|_| RegistryError::Unavailable(session_id))??;
        }

        reservation.commit();
        tracing::info!(%session_id, players = count, "match joined");
        Ok(())
    }

    /// Maps one player to a session and stages their join.
    ///
    /// The mapping is recorded immediately, so concurrent joins for the same
    /// player are rejected before the session applies the event. The game's
    /// `add_players` runs later, on the session's task; if it refuses, the
    /// mapping is released and the error goes to the diagnostics sink.
    pub fn join_single(&self, player: G::Player, session_id: SessionId) -> Result<(), RegistryError> {
        let player_id = player.player_id();
        let reservation = self.reserve(vec![player_id], session_id)?;
        let entry = self
            .entry(session_id)
            .ok_or(RegistryError::SessionNotFound(session_id))?;
        entry.handle.enqueue_event(SessionEvent::PlayerJoin(player))?;
        reservation.commit();
        tracing::info!(%session_id, %player_id, "player join staged");
        Ok(())
    }

    /// Unmaps a player and tells their session to drop them.
    ///
    /// Never fails; removing an unmapped player does nothing.
    pub fn remove_player(&self, player_id: PlayerId) {
        let Some(session_id) = write(&self.players).remove(&player_id) else {
            return;
        };
        tracing::info!(%session_id, %player_id, "player removed");
        self.notify(session_id, SessionEvent::PlayerRemove(player_id));
    }

    /// Marks a player online in their session. No-op if unmapped.
    pub fn set_player_online(&self, player_id: PlayerId) {
        if let Some(session_id) = self.player_session(player_id) {
            self.notify(session_id, SessionEvent::PlayerOnline(player_id));
        }
    }

    /// Marks a player offline in their session. No-op if unmapped.
    pub fn set_player_offline(&self, player_id: PlayerId) {
        if let Some(session_id) = self.player_session(player_id) {
            self.notify(session_id, SessionEvent::PlayerOffline(player_id));
        }
    }

    /// Best-effort event delivery for operations that never fail.
    fn notify(&self, session_id: SessionId, event: SessionEvent<G::Player>) {
        let Some(entry) = self.entry(session_id) else {
            return;
        };
        let kind = event.kind();
        if let Err(e) = entry.handle.enqueue_event(event) {
            tracing::debug!(%session_id, %kind, error = %e, "event dropped");
        }
    }

    // -----------------------------------------------------------------
    // Running
    // -----------------------------------------------------------------

    /// Starts the session's tick loop on its own task and returns at once.
    ///
    /// `tick_interval_ms` is the fixed tick period (clamped to the
    /// scheduler's supported range). Errors raised inside the loop go to
    /// the diagnostics sink, not to the caller.
    pub fn run(
        self: &Arc<Self>,
        session_id: SessionId,
        tick_interval_ms: u64,
    ) -> Result<SessionTask, RegistryError> {
        if self.shutdown.is_cancelled() {
            return Err(RegistryError::ShuttingDown);
        }
        let entry = self
            .entry(session_id)
            .ok_or(RegistryError::SessionNotFound(session_id))?;
        let session = lock(&entry.staged)
            .take()
            .ok_or(RegistryError::AlreadyRunning(session_id))?;
        entry.set_running(true);

        let tick = TickConfig {
            interval_ms: tick_interval_ms,
            ..self.config.tick.clone()
        }
        .validated();
        let cancel = self.shutdown.child_token();
        let runner = SessionRunner::new(session, Arc::clone(self), entry, tick, cancel.clone());
        let span = tracing::info_span!("session", %session_id);
        let join = self.tasks.spawn(runner.run().instrument(span));

        tracing::info!(%session_id, tick_interval_ms, "session launched");
        Ok(SessionTask::new(session_id, cancel, join))
    }

    /// [`register`](Self::register) followed by [`run`](Self::run). If the
    /// session cannot be run it is unregistered again.
    pub fn launch(
        self: &Arc<Self>,
        session: Session<G>,
        tick_interval_ms: u64,
    ) -> Result<SessionTask, RegistryError> {
        if self.shutdown.is_cancelled() {
            return Err(RegistryError::ShuttingDown);
        }
        let session_id = self.register(session)?;
        self.run(session_id, tick_interval_ms)
            .inspect_err(|_| self.unregister(session_id))
    }

    /// Cancels every running session and waits until all of them have
    /// released their players and been destroyed. No new session can be
    /// run afterwards.
    pub async fn shutdown(&self) {
        tracing::info!(running = self.tasks.len(), "registry shutting down");
        self.shutdown.cancel();
        self.tasks.close();
        self.tasks.wait().await;
        tracing::info!("registry shut down");
    }
}

impl<G: GameLogic> PlayerDirectory for SessionRegistry<G> {
    fn session_of(&self, player_id: PlayerId) -> Option<SessionId> {
        self.player_session(player_id)
    }

    fn release_player(&self, player_id: PlayerId, session_id: SessionId) {
        if self.release_players(session_id, &[player_id]) > 0 {
            tracing::debug!(%session_id, %player_id, "rejected join released");
        }
    }
}

// Poisoning only means another thread panicked mid-update; the maps are
// still structurally valid, so keep going with them.

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
