//! Codec trait and implementations for decoding player commands.
//!
//! The transport that delivers commands is not part of Matchloop. What
//! Matchloop does own is the step right after it: turning the raw bytes a
//! transport received into a [`CommandFrame`](crate::CommandFrame) and then
//! a [`GameInput`](crate::GameInput). The [`Codec`] trait is the seam; swap
//! in a binary codec later without touching the session layer.

use serde::{Serialize, de::DeserializeOwned};

use crate::{CommandFrame, GameInput, PlayerId, ProtocolError};

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because a codec is typically shared by every
/// connection handler task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Decodes a command frame and binds it to the sending player.
    ///
    /// # Errors
    /// Propagates decode failures and rejects frames with an empty command
    /// name ([`ProtocolError::InvalidMessage`]).
    fn decode_input(&self, player_id: PlayerId, data: &[u8]) -> Result<GameInput, ProtocolError> {
        let frame: CommandFrame = self.decode(data)?;
        frame.into_input(player_id)
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use matchloop_protocol::{Codec, JsonCodec, PlayerId};
///
/// let codec = JsonCodec;
/// let input = codec
///     .decode_input(PlayerId(4), br#"{"cmd":"move","args":[1,2]}"#)
///     .unwrap();
/// assert_eq!(input.cmd, "move");
/// assert_eq!(input.args.len(), 2);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
