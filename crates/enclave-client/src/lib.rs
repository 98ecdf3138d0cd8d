//! # enclave-client
//!
//! Async client for the Enclave control endpoint.
//!
//! - **[`Connection`]**: one method per container operation. Each sends a
//!   single framed request and decodes a single framed reply.
//! - **[`Container`]**: a handle bound to a connection.
//! - **[`ProcessStream`]**: output of a process started with `run` or
//!   re-attached with `attach`, fed by a background task and cancellable.
//!
//! Transport failures and domain errors raised by the endpoint are separate
//! [`ClientError`] variants.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod connection;
pub mod container;
mod convert;
pub mod error;
pub mod stream;

pub use connection::Connection;
pub use container::Container;
pub use error::{ClientError, Result};
pub use stream::{ByteStream, ProcessStream};
pub use tokio_util::sync::CancellationToken;
