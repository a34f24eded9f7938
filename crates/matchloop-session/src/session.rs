//! The session: a game plus its staging queues.

use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use matchloop_protocol::{GameInput, PlayerId, SessionId, TemplateId};

use crate::queue::{PushError, StageReceiver, StageSender, stage_queue};
use crate::{
    Diagnostics, GameError, GameLogic, Player, PlayerDirectory, PlayerManager, QueueKind,
    SessionConfig, SessionError, SessionEvent, SessionMeta,
};

/// Thread-safe producer side of a session.
///
/// Cheap to clone. Any number of threads may hold handles to the same
/// session and enqueue concurrently; each producer's items are drained in
/// the order it pushed them.
///
/// All handles of a session share its id, so a handle taken before
/// registration reports the assigned id once the registry sets it.
pub struct SessionHandle<P> {
    session_id: Arc<AtomicU16>,
    template_id: TemplateId,
    inputs: StageSender<GameInput>,
    events: StageSender<SessionEvent<P>>,
}

impl<P> Clone for SessionHandle<P> {
    fn clone(&self) -> Self {
        Self {
            session_id: Arc::clone(&self.session_id),
            template_id: self.template_id,
            inputs: self.inputs.clone(),
            events: self.events.clone(),
        }
    }
}

impl<P: Player> SessionHandle<P> {
    pub fn session_id(&self) -> SessionId {
        SessionId(self.session_id.load(Ordering::Acquire))
    }

    pub fn template_id(&self) -> TemplateId {
        self.template_id
    }

    /// Stages a player command for the next tick.
    pub fn enqueue_input(&self, input: GameInput) -> Result<(), SessionError> {
        self.inputs
            .push(input)
            .map_err(|e| self.push_error(e, QueueKind::Input))
    }

    /// Builds a [`GameInput`] and stages it.
    pub fn submit_input(
        &self,
        player_id: PlayerId,
        cmd: impl Into<String>,
        args: Vec<serde_json::Value>,
    ) -> Result<(), SessionError> {
        self.enqueue_input(GameInput::new(player_id, cmd, args))
    }

    /// Stages an event for the next tick. Events are applied before the
    /// inputs staged for the same tick.
    pub fn enqueue_event(&self, event: SessionEvent<P>) -> Result<(), SessionError> {
        event.validate()?;
        tracing::trace!(session_id = %self.session_id(), kind = %event.kind(), "event staged");
        self.events
            .push(event)
            .map_err(|e| self.push_error(e, QueueKind::Event))
    }

    /// `true` once the session has been dropped and nothing will drain
    /// the queues again.
    pub fn is_closed(&self) -> bool {
        self.events.is_closed()
    }

    fn push_error(&self, err: PushError, queue: QueueKind) -> SessionError {
        match err {
            PushError::Full => SessionError::QueueFull {
                session: self.session_id(),
                queue,
            },
            PushError::Closed => SessionError::Closed(self.session_id()),
        }
    }
}

/// One instance of a game.
///
/// Owns the game, its [`SessionMeta`] and the consumer side of both staging
/// queues. A session is driven by exactly one task; producers reach it
/// through [`SessionHandle`]s.
pub struct Session<G: GameLogic> {
    meta: SessionMeta,
    game: G,
    handle: SessionHandle<G::Player>,
    inputs: StageReceiver<GameInput>,
    events: StageReceiver<SessionEvent<G::Player>>,
}

impl<G: GameLogic> Session<G> {
    /// A new, unregistered session (id [`SessionId::UNASSIGNED`]).
    pub fn new(template_id: TemplateId, game: G, config: &SessionConfig) -> Self {
        let (input_tx, input_rx) = stage_queue(config.input_capacity);
        let (event_tx, event_rx) = stage_queue(config.event_capacity);
        Self {
            meta: SessionMeta::new(template_id),
            game,
            handle: SessionHandle {
                session_id: Arc::new(AtomicU16::new(SessionId::UNASSIGNED.0)),
                template_id,
                inputs: input_tx,
                events: event_tx,
            },
            inputs: input_rx,
            events: event_rx,
        }
    }

    /// A producer handle. Its id follows [`assign_id`](Self::assign_id).
    pub fn handle(&self) -> SessionHandle<G::Player> {
        self.handle.clone()
    }

    pub fn session_id(&self) -> SessionId {
        self.meta.session_id()
    }

    pub fn template_id(&self) -> TemplateId {
        self.meta.template_id()
    }

    pub fn meta(&self) -> &SessionMeta {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut SessionMeta {
        &mut self.meta
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut G {
        &mut self.game
    }

    /// Sets the session's id. The registry calls this once, on
    /// registration; every handle, including ones taken earlier, sees it.
    pub fn assign_id(&mut self, session_id: SessionId) {
        self.meta.assign_id(session_id);
        self.handle.session_id.store(session_id.0, Ordering::Release);
    }

    /// Adds `delta` to the session's current time. See
    /// [`SessionMeta::advance_cur_time`].
    pub fn advance_cur_time(&mut self, delta: i64) -> i64 {
        self.meta.advance_cur_time(delta)
    }

    pub fn enqueue_input(&self, input: GameInput) -> Result<(), SessionError> {
        self.handle.enqueue_input(input)
    }

    pub fn submit_input(
        &self,
        player_id: PlayerId,
        cmd: impl Into<String>,
        args: Vec<serde_json::Value>,
    ) -> Result<(), SessionError> {
        self.handle.submit_input(player_id, cmd, args)
    }

    pub fn enqueue_event(&self, event: SessionEvent<G::Player>) -> Result<(), SessionError> {
        self.handle.enqueue_event(event)
    }

    pub fn pending_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Applies every staged event, oldest first, until the queue reads
    /// empty. Returns how many were applied.
    ///
    /// A failing event is reported to `diagnostics` under its kind label
    /// and does not stop the drain.
    pub fn drain_events(
        &mut self,
        directory: &dyn PlayerDirectory,
        diagnostics: &dyn Diagnostics,
    ) -> usize {
        let mut applied = 0;
        while let Some(event) = self.events.try_pop() {
            let kind = event.kind();
            if let Err(e) = self.game.handle_event(&mut self.meta, event, directory) {
                diagnostics.report(kind.label(), &e);
            }
            applied += 1;
        }
        applied
    }

    /// Hands every staged input to the game, oldest first, until the
    /// queue reads empty. Returns how many were handled.
    pub fn drain_inputs(&mut self) -> usize {
        let mut handled = 0;
        while let Some(input) = self.inputs.try_pop() {
            self.game.handle_input(&mut self.meta, input);
            handled += 1;
        }
        handled
    }

    /// Empties both queues without applying anything and returns the ids of
    /// players whose single join was still waiting to be applied.
    ///
    /// Dropped match joins answer their waiting callers with a closed
    /// reply channel.
    pub fn discard_pending(&mut self) -> Vec<PlayerId> {
        while self.inputs.try_pop().is_some() {}
        let mut joining = Vec::new();
        while let Some(event) = self.events.try_pop() {
            if let SessionEvent::PlayerJoin(player) = &event {
                joining.push(player.player_id());
            }
        }
        joining
    }

    /// Adds a batch directly, bypassing the event queue. Only valid while
    /// no task is driving the session.
    pub fn add_players(&mut self, players: Vec<G::Player>) -> Result<(), GameError> {
        self.game.add_players(players)
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.game.player_ids()
    }

    // Lifecycle, forwarded with the session's meta.

    pub fn init(&mut self) -> Result<(), GameError> {
        self.game.init(&mut self.meta)
    }

    pub fn start(&mut self, now: i64) -> Result<(), GameError> {
        self.game.start(&mut self.meta, now)
    }

    pub fn update(&mut self, dt: Duration) {
        self.game.update(&mut self.meta, dt);
    }

    pub fn is_game_over(&self) -> bool {
        self.game.is_game_over(&self.meta)
    }

    pub fn stop(&mut self) {
        self.game.stop(&mut self.meta);
    }

    pub fn is_auto_restart(&self) -> bool {
        self.game.is_auto_restart()
    }

    pub fn destroy(&mut self) {
        self.game.destroy(&mut self.meta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PlayerRoster;

    /// Records what the session fed it.
    #[derive(Default)]
    struct Recorder {
        roster: PlayerRoster<PlayerId>,
        inputs: Vec<String>,
    }

    impl PlayerManager for Recorder {
        type Player = PlayerId;

        fn add_players(&mut self, players: Vec<PlayerId>) -> Result<(), GameError> {
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

    impl GameLogic for Recorder {
        fn start(&mut self, _meta: &mut SessionMeta, _now: i64) -> Result<(), GameError> {
            Ok(())
        }
        fn handle_input(&mut self, _meta: &mut SessionMeta, input: GameInput) {
            self.inputs.push(input.cmd);
        }
        fn update(&mut self, _meta: &mut SessionMeta, _dt: Duration) {}
        fn is_game_over(&self, _meta: &SessionMeta) -> bool {
            false
        }
    }

    fn session() -> Session<Recorder> {
        Session::new(TemplateId(1), Recorder::default(), &SessionConfig::default())
    }

    #[test]
    fn test_new_session_is_unassigned() {
        let s = session();
        assert_eq!(s.session_id(), SessionId::UNASSIGNED);
        assert_eq!(s.handle().session_id(), SessionId::UNASSIGNED);
        assert_eq!(s.template_id(), TemplateId(1));
    }

    #[test]
    fn test_assign_id_updates_meta_and_new_handles() {
        let mut s = session();
        s.assign_id(SessionId(4));
        assert_eq!(s.session_id(), SessionId(4));
        assert_eq!(s.meta().session_id(), SessionId(4));
        assert_eq!(s.handle().session_id(), SessionId(4));
    }

    #[test]
    fn test_handle_taken_before_assign_reports_assigned_id() {
        let mut s = Session::new(TemplateId(1), Recorder::default(), &SessionConfig::bounded(1, 1));
        let early = s.handle();
        s.assign_id(SessionId(9));
        assert_eq!(early.session_id(), SessionId(9));

        early.submit_input(PlayerId(1), "a", vec![]).unwrap();
        let err = early.submit_input(PlayerId(1), "b", vec![]).unwrap_err();
        assert!(matches!(
            err,
            SessionError::QueueFull { session, .. } if session == SessionId(9)
        ));
    }

    #[test]
    fn test_drain_inputs_is_fifo() {
        let mut s = session();
        for cmd in ["a", "b", "c"] {
            s.submit_input(PlayerId(1), cmd, vec![]).unwrap();
        }
        assert_eq!(s.pending_inputs(), 3);

        assert_eq!(s.drain_inputs(), 3);

        assert_eq!(s.game().inputs, vec!["a", "b", "c"]);
        assert_eq!(s.pending_inputs(), 0);
    }

    #[test]
    fn test_drain_on_empty_queue_is_noop() {
        let mut s = session();
        assert_eq!(s.drain_inputs(), 0);
    }

    #[test]
    fn test_bounded_input_queue_reports_full() {
        let s = Session::new(TemplateId(1), Recorder::default(), &SessionConfig::bounded(1, 1));
        s.submit_input(PlayerId(1), "a", vec![]).unwrap();

        let err = s.submit_input(PlayerId(1), "b", vec![]).unwrap_err();

        assert!(matches!(
            err,
            SessionError::QueueFull { queue: QueueKind::Input, .. }
        ));
    }

    #[test]
    fn test_handle_outliving_session_reports_closed() {
        let mut s = session();
        s.assign_id(SessionId(2));
        let handle = s.handle();
        drop(s);

        assert!(handle.is_closed());
        let err = handle
            .enqueue_event(SessionEvent::PlayerOnline(PlayerId(1)))
            .unwrap_err();
        assert!(matches!(err, SessionError::Closed(id) if id == SessionId(2)));
    }

    #[test]
    fn test_enqueue_event_rejects_empty_match_join() {
        let s = session();
        let (reply, _rx) = tokio::sync::oneshot::channel();
        let err = s
            .enqueue_event(SessionEvent::MatchJoin {
                players: vec![],
                reply,
            })
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidArgument(_)));
        assert_eq!(s.pending_events(), 0);
    }

    #[test]
    fn test_discard_pending_returns_unapplied_joins() {
        let mut s = session();
        s.submit_input(PlayerId(1), "a", vec![]).unwrap();
        s.enqueue_event(SessionEvent::PlayerJoin(PlayerId(5))).unwrap();
        s.enqueue_event(SessionEvent::PlayerOffline(PlayerId(6))).unwrap();

        assert_eq!(s.discard_pending(), vec![PlayerId(5)]);
        assert_eq!(s.pending_inputs(), 0);
        assert_eq!(s.pending_events(), 0);
        assert!(s.game().inputs.is_empty());
    }

    #[test]
    fn test_advance_cur_time() {
        let mut s = session();
        s.meta_mut().set_cur_time(10);
        assert_eq!(s.advance_cur_time(5), 15);
    }
}
