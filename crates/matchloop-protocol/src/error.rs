//! Error types for the protocol layer.
//!
//! Each crate in Matchloop defines its own error enum. A `ProtocolError`
//! always means the problem is in turning bytes into commands (or back),
//! never in session scheduling or registry bookkeeping.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields,
    /// wrong data types, or truncated messages.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded fine but is not a usable command, e.g. a
    /// command frame with an empty command name.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
