//! Streaming responses: process output and raw downloads.
//!
//! A process stream is drained by a background task that owns the response
//! body. It decodes frames and forwards them on an unbounded channel, and it
//! is the only party that closes that channel. The task stops on the exit
//! chunk, at end of body, after forwarding one error, or on cancellation.

use bytes::{Bytes, BytesMut};
use enclave_common::process::ProcessChunk;
use enclave_protocol::FrameReader;
use enclave_protocol::messages::ProcessPayload;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::convert;
use crate::error::{ClientError, Result};

/// Decodes process payload frames from a chunked response body.
pub(crate) struct PayloadReader {
    route: &'static str,
    response: reqwest::Response,
    frames: FrameReader,
}

impl PayloadReader {
    pub(crate) fn new(route: &'static str, response: reqwest::Response) -> Self {
        Self {
            route,
            response,
            frames: FrameReader::new(),
        }
    }

    /// Returns the next payload, or `None` once the body ends on a frame
    /// boundary. A domain error frame comes back as [`ClientError::Domain`].
    pub(crate) async fn next_payload(&mut self) -> Result<Option<ProcessPayload>> {
        loop {
            if let Some(reply) = self.frames.next_reply::<ProcessPayload>()? {
                return Ok(Some(reply.into_result()?));
            }
            let chunk = self
                .response
                .chunk()
                .await
                .map_err(|e| ClientError::from_reqwest(self.route, e))?;
            match chunk {
                Some(chunk) => self.frames.push(&chunk),
                None => {
                    self.frames.finish()?;
                    return Ok(None);
                }
            }
        }
    }
}

/// Output of a process running in a container.
///
/// Items arrive in the order the endpoint sent them. The stream ends after
/// the [`ProcessChunk::Exit`] chunk, after a single error item, or when the
/// body closes. Dropping the stream stops its background task; the remote
/// process keeps running.
#[derive(Debug)]
pub struct ProcessStream {
    id: Option<u32>,
    rx: mpsc::UnboundedReceiver<Result<ProcessChunk>>,
    cancel: CancellationToken,
    _guard: DropGuard,
}

impl ProcessStream {
    /// Starts the demultiplexing task for `reader`. The task is stopped when
    /// `parent` is cancelled, when [`cancel`](Self::cancel) is called, or when
    /// the stream is dropped.
    pub(crate) fn spawn(
        id: Option<u32>,
        reader: PayloadReader,
        parent: &CancellationToken,
    ) -> Self {
        let cancel = parent.child_token();
        let (tx, rx) = mpsc::unbounded_channel();
        drop(tokio::spawn(demultiplex(reader, tx, cancel.clone())));
        Self {
            id,
            rx,
            _guard: cancel.clone().drop_guard(),
            cancel,
        }
    }

    /// ID of the process. Known for `run`; `None` for `attach`.
    pub const fn id(&self) -> Option<u32> {
        self.id
    }

    /// Receives the next chunk. Returns `None` once the stream has ended.
    pub async fn recv(&mut self) -> Option<Result<ProcessChunk>> {
        self.rx.recv().await
    }

    /// Discards output until the process exits and returns its status.
    ///
    /// # Errors
    ///
    /// Returns the error item the stream ended with, or
    /// [`ClientError::Disconnected`] if it closed without an exit status.
    pub async fn wait(mut self) -> Result<u32> {
        while let Some(item) = self.rx.recv().await {
            if let Some(status) = item?.exit_status() {
                return Ok(status);
            }
        }
        Err(ClientError::Disconnected)
    }

    /// Stops reading. Buffered chunks stay readable, then the stream ends.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

async fn demultiplex(
    mut reader: PayloadReader,
    tx: mpsc::UnboundedSender<Result<ProcessChunk>>,
    cancel: CancellationToken,
) {
    let route = reader.route;
    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(route, "process stream cancelled");
                return;
            }
            next = reader.next_payload() => next,
        };

        match next {
            Ok(Some(payload)) => {
                let Some(chunk) = convert::chunk_from_payload(payload) else {
                    continue;
                };
                let exited = chunk.exit_status().is_some();
                if tx.send(Ok(chunk)).is_err() || exited {
                    return;
                }
            }
            Ok(None) => {
                tracing::warn!(route, "process stream ended without an exit status");
                return;
            }
            Err(err) => {
                tracing::warn!(route, error = %err, "process stream failed");
                let _ = tx.send(Err(err));
                return;
            }
        }
    }
}

/// Raw bytes streamed out of a container.
#[derive(Debug)]
pub struct ByteStream {
    route: &'static str,
    response: reqwest::Response,
}

impl ByteStream {
    pub(crate) const fn new(route: &'static str, response: reqwest::Response) -> Self {
        Self { route, response }
    }

    /// Receives the next chunk of the body, or `None` at its end.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the body fails.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>> {
        self.response
            .chunk()
            .await
            .map_err(|e| ClientError::from_reqwest(self.route, e))
    }

    /// Reads the rest of the body into memory.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the body fails.
    pub async fn bytes(mut self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.chunk().await? {
            buf.extend_from_slice(&chunk);
        }
        Ok(buf.freeze())
    }
}
