//! Length-delimited framing of JSON messages.
//!
//! Frames use the default [`LengthDelimitedCodec`] layout: a 4-byte
//! big-endian payload length followed by the payload.

use bytes::{Bytes, BytesMut};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

use crate::error::{ProtocolError, Result};
use crate::messages::Reply;

/// Size of the length prefix.
const HEADER_LEN: usize = 4;

/// Encodes one message as a complete frame.
///
/// # Errors
///
/// Returns an error if the message cannot be serialized or exceeds the
/// maximum frame length.
pub fn encode_frame<T: Serialize>(message: &T) -> Result<Bytes> {
    let payload = serde_json::to_vec(message).map_err(ProtocolError::Encode)?;
    let mut buf = BytesMut::with_capacity(payload.len() + 4);
    LengthDelimitedCodec::new().encode(Bytes::from(payload), &mut buf)?;
    Ok(buf.freeze())
}

/// Decodes a body that must hold exactly one reply frame.
///
/// # Errors
///
/// Returns an error if the body is truncated, holds trailing bytes after the
/// frame, or the payload is not a reply of type `T`.
pub fn decode_reply<T: DeserializeOwned>(body: &[u8]) -> Result<Reply<T>> {
    let mut reader = FrameReader::new();
    reader.push(body);
    let Some(reply) = reader.next_reply()? else {
        return Err(ProtocolError::Truncated {
            remaining: reader.buffered(),
        });
    };
    if reader.buffered() > 0 {
        return Err(ProtocolError::TrailingBytes {
            len: reader.buffered(),
        });
    }
    Ok(reply)
}

/// Incremental frame decoder for bodies that arrive in arbitrary chunks.
#[derive(Debug)]
pub struct FrameReader {
    codec: LengthDelimitedCodec,
    buf: BytesMut,
}

impl FrameReader {
    /// Creates an empty reader.
    #[must_use]
    pub fn new() -> Self {
        Self {
            codec: LengthDelimitedCodec::new(),
            buf: BytesMut::new(),
        }
    }

    /// Appends received bytes.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Number of bytes received but not yet consumed by a complete frame.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Returns the next complete frame payload, if one is buffered.
    ///
    /// # Errors
    ///
    /// Returns an error if the length prefix exceeds the frame size limit.
    pub fn next_frame(&mut self) -> Result<Option<BytesMut>> {
        // The codec consumes the length prefix eagerly. Only hand it complete
        // or oversized frames so a partial frame stays buffered here.
        let Some(prefix) = self.buf.get(..HEADER_LEN) else {
            return Ok(None);
        };
        let mut raw = [0_u8; HEADER_LEN];
        raw.copy_from_slice(prefix);
        let len = usize::try_from(u32::from_be_bytes(raw)).unwrap_or(usize::MAX);

        if len > self.codec.max_frame_length() || self.buf.len() - HEADER_LEN >= len {
            return Ok(self.codec.decode(&mut self.buf)?);
        }
        Ok(None)
    }

    /// Returns the next complete reply, if one is buffered.
    ///
    /// # Errors
    ///
    /// Returns an error on a framing failure or if the payload is not a reply
    /// of type `T`.
    pub fn next_reply<T: DeserializeOwned>(&mut self) -> Result<Option<Reply<T>>> {
        match self.next_frame()? {
            Some(frame) => serde_json::from_slice(&frame)
                .map(Some)
                .map_err(ProtocolError::Decode),
            None => Ok(None),
        }
    }

    /// Checks that the input ended on a frame boundary.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Truncated`] if a partial frame is buffered.
    pub fn finish(&self) -> Result<()> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::Truncated {
                remaining: self.buf.len(),
            })
        }
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}
