//! Long-lived response streams.
//!
//! A `StreamSink` is the writable end of an open response body. Frames are
//! queued on a bounded channel and drained by the HTTP engine as the client
//! reads. Writes never block: a full queue and a closed peer are both reported
//! to the caller, who decides whether to drop the frame or forget the client.

use axum::body::Bytes;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StreamWriteError {
    /// The response body was dropped (client went away or the stream was replaced).
    #[error("stream closed")]
    Closed,

    /// The client is not reading fast enough; the frame was not queued.
    #[error("stream buffer full")]
    Full,
}

#[derive(Debug, Clone)]
pub struct StreamSink {
    tx: mpsc::Sender<Bytes>,
}

impl StreamSink {
    /// Create a sink and the receiver that feeds the response body.
    /// A zero buffer is rounded up to one frame.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }

    pub fn write(&self, frame: Bytes) -> Result<(), StreamWriteError> {
        self.tx.try_send(frame).map_err(|err| match err {
            TrySendError::Full(_) => StreamWriteError::Full,
            TrySendError::Closed(_) => StreamWriteError::Closed,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// True if both sinks feed the same response body.
    pub fn same_stream(&self, other: &StreamSink) -> bool {
        self.tx.same_channel(&other.tx)
    }
}
