//! Game sessions for Matchloop.
//!
//! A session is one running instance of a game. This crate defines what a
//! session *is* and how work reaches it; the registry crate decides when it
//! runs.
//!
//! # Key types
//!
//! - [`Session`] — identity, timing, the game itself, and two staging
//!   queues (inputs and events)
//! - [`SessionHandle`] — the thread-safe producer side of those queues
//! - [`SessionEvent`] — the closed set of cross-thread mutations
//! - [`GameLogic`] / [`PlayerManager`] — what a game implements
//! - [`PlayerRoster`] — a ready-made player set games can delegate to
//! - [`Diagnostics`] — where errors raised inside a session task go
//!
//! # Threading model
//!
//! ```text
//! any thread ──enqueue──► [input queue] ──┐
//! any thread ──enqueue──► [event queue] ──┼──► session task (drain, update)
//!                                          │
//!              game state is touched only ─┘   here, never by producers
//! ```

mod config;
mod diagnostics;
mod error;
mod event;
mod logic;
mod meta;
mod queue;
mod roster;
mod session;

pub use config::SessionConfig;
pub use diagnostics::{Diagnostics, TracingDiagnostics};
pub use error::{GameError, SessionError};
pub use event::{EventKind, SessionEvent};
pub use logic::{GameLogic, Player, PlayerDirectory, PlayerManager};
pub use meta::SessionMeta;
pub use queue::QueueKind;
pub use roster::PlayerRoster;
pub use session::{Session, SessionHandle};
