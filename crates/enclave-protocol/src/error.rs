//! Codec errors.

use thiserror::Error;

/// Failure to encode or decode a framed message.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The message could not be serialized.
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// A frame payload is not a valid message of the expected type.
    #[error("invalid message payload: {0}")]
    Decode(#[source] serde_json::Error),

    /// The input ended in the middle of a frame.
    #[error("truncated frame: {remaining} trailing byte(s) do not form a complete frame")]
    Truncated {
        /// Bytes left over after the last complete frame.
        remaining: usize,
    },

    /// More bytes followed a message that was expected to stand alone.
    #[error("unexpected {len} byte(s) after message")]
    TrailingBytes {
        /// Number of extra bytes.
        len: usize,
    },

    /// The length prefix is invalid or exceeds the frame size limit.
    #[error("framing error: {0}")]
    Frame(#[from] std::io::Error),
}

/// Convenience alias for codec results.
pub type Result<T> = std::result::Result<T, ProtocolError>;
