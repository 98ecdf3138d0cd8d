//! # enclave-protocol
//!
//! Wire format of the Enclave control protocol.
//!
//! - **Messages**: one request and one response shape per operation. Fields
//!   that may be absent are `Option` and are left out of the payload when
//!   unset, so "unset" and "zero" stay distinguishable on the wire.
//! - **Framing**: each message travels as a length-delimited frame
//!   (4-byte big-endian length, then a JSON payload).
//! - **Replies**: a response frame carries either the typed response or a
//!   domain error raised by the endpoint.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod codec;
pub mod error;
pub mod messages;

pub use codec::{FrameReader, decode_reply, encode_frame};
pub use error::{ProtocolError, Result};
pub use messages::{ErrorResponse, Reply};
