//! The session registry for Matchloop.
//!
//! Tracks which sessions exist and which player is in which session, hands
//! out session ids, and runs each session's tick loop on its own task.
//!
//! # Key types
//!
//! - [`SessionRegistry`] — the two concurrent maps plus the id pool
//! - [`SessionTask`] — a running session's join/cancel handle
//! - [`IdPool`] — bounded, lowest-free-first id allocation
//! - [`RegistryConfig`] — id bound and base tick settings
//!
//! # Example
//!
//! ```ignore
//! let registry = SessionRegistry::new(RegistryConfig::default());
//! let task = registry.launch(Session::new(template, game, &SessionConfig::default()), 50)?;
//! registry.match_join(players, task.session_id()).await?;
//! task.join().await?;
//! ```

mod config;
mod error;
mod id_pool;
mod registry;
mod runner;
mod task;

pub use config::RegistryConfig;
pub use error::RegistryError;
pub use id_pool::IdPool;
pub use registry::SessionRegistry;
pub use task::SessionTask;
