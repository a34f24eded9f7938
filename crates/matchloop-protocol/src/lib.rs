//! Shared vocabulary for Matchloop.
//!
//! This crate defines the small set of types every other layer speaks:
//!
//! - **Identity** ([`PlayerId`], [`SessionId`], [`TemplateId`]) — newtype
//!   wrappers so a session id can never be passed where a player id is
//!   expected.
//! - **Commands** ([`GameInput`], [`CommandFrame`]) — what a player asks a
//!   running session to do.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how the transport turns
//!   raw bytes into commands.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (GameInput) → Session (staged input queue)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{CommandFrame, GameInput, PlayerId, SessionId, TemplateId};
