//! # Matchloop
//!
//! Tick-driven game sessions for multiplayer servers.
//!
//! A game implements [`GameLogic`](prelude::GameLogic) and
//! [`PlayerManager`](prelude::PlayerManager) (usually by delegating to a
//! [`PlayerRoster`](prelude::PlayerRoster)). The [`SessionRegistry`](prelude::SessionRegistry)
//! hands each session an id, tracks which player is in which session, and
//! runs each session's fixed-period loop on its own task. Other threads
//! never touch a game directly: they stage inputs and events that the
//! session applies on its next tick.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use matchloop::prelude::*;
//!
//! # async fn demo<G: GameLogic<Player = PlayerId>>(game: G) -> Result<(), MatchloopError> {
//! matchloop::init_tracing();
//!
//! let registry = SessionRegistry::<G>::new(RegistryConfig::default());
//! let session = Session::new(TemplateId(1), game, &SessionConfig::default());
//! let id = registry.register(session)?;
//! registry.match_join(vec![PlayerId(1), PlayerId(2)], id).await?;
//!
//! let task = registry.run(id, 50)?;
//! registry.session(id).unwrap().submit_input(PlayerId(1), "ready", vec![])?;
//! task.join().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod telemetry;

pub use error::MatchloopError;
pub use telemetry::{init_tracing, init_tracing_with};

pub use matchloop_protocol as protocol;
pub use matchloop_registry as registry;
pub use matchloop_session as session;
pub use matchloop_tick as tick;

/// Everything a game and its host usually need.
pub mod prelude {
    pub use crate::MatchloopError;
    pub use matchloop_protocol::{
        Codec, CommandFrame, GameInput, JsonCodec, PlayerId, ProtocolError, SessionId, TemplateId,
    };
    pub use matchloop_registry::{RegistryConfig, RegistryError, SessionRegistry, SessionTask};
    pub use matchloop_session::{
        Diagnostics, EventKind, GameError, GameLogic, Player, PlayerDirectory, PlayerManager,
        PlayerRoster, Session, SessionConfig, SessionError, SessionEvent, SessionHandle,
        SessionMeta, TracingDiagnostics,
    };
    pub use matchloop_tick::{TickConfig, TickPolicy};
}
