//! In-process transport pair, used by tests across the workspace.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;
use crate::frame::{Control, Frame};
use crate::transport::FrameTransport;

enum Wire {
    Frame(Frame),
    Close,
    Fail(String),
}

/// One end of an in-memory frame connection.
///
/// Frames written on one end are read, in order, on the other. Control
/// frames are recorded on the sending side; a close control additionally
/// reaches the peer as end of stream.
pub struct MemoryTransport {
    tx: Mutex<Option<mpsc::UnboundedSender<Wire>>>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Wire>>,
    closed: CancellationToken,
    remote_closed: AtomicBool,
    write_failure: Mutex<Option<String>>,
    controls: Mutex<Vec<Control>>,
}

impl MemoryTransport {
    /// Two connected ends.
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (Self::from_channels(a_tx, a_rx), Self::from_channels(b_tx, b_rx))
    }

    fn from_channels(tx: mpsc::UnboundedSender<Wire>, rx: mpsc::UnboundedReceiver<Wire>) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
            rx: tokio::sync::Mutex::new(rx),
            closed: CancellationToken::new(),
            remote_closed: AtomicBool::new(false),
            write_failure: Mutex::new(None),
            controls: Mutex::new(Vec::new()),
        }
    }

    /// Make the peer's next read fail with a connection-reset I/O error.
    pub fn inject_failure(&self, message: impl Into<String>) {
        if let Some(tx) = self.tx.lock().as_ref() {
            let _ = tx.send(Wire::Fail(message.into()));
        }
    }

    /// Make every later data write on this end fail.
    pub fn fail_writes(&self, message: impl Into<String>) {
        *self.write_failure.lock() = Some(message.into());
    }

    /// Control frames this end attempted to send, in order.
    pub fn sent_controls(&self) -> Vec<Control> {
        self.controls.lock().clone()
    }

    /// Whether `close` was called on this end.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    fn send(&self, wire: Wire) -> Result<(), TransportError> {
        if self.closed.is_cancelled() {
            return Err(TransportError::Closed);
        }
        let guard = self.tx.lock();
        let tx = guard.as_ref().ok_or(TransportError::Closed)?;
        tx.send(wire).map_err(|_| TransportError::Closed)
    }
}

#[async_trait]
impl FrameTransport for MemoryTransport {
    async fn read_message(&self) -> Result<Frame, TransportError> {
        if self.remote_closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        let mut rx = tokio::select! {
            () = self.closed.cancelled() => return Err(TransportError::Closed),
            rx = self.rx.lock() => rx,
        };
        let wire = tokio::select! {
            () = self.closed.cancelled() => return Err(TransportError::Closed),
            wire = rx.recv() => wire,
        };
        match wire {
            Some(Wire::Frame(frame)) => Ok(frame),
            Some(Wire::Fail(message)) => Err(TransportError::Io(io::Error::new(
                io::ErrorKind::ConnectionReset,
                message,
            ))),
            Some(Wire::Close) | None => {
                self.remote_closed.store(true, Ordering::Release);
                Err(TransportError::Closed)
            }
        }
    }

    async fn write_message(&self, frame: Frame) -> Result<(), TransportError> {
        if let Some(message) = self.write_failure.lock().clone() {
            return Err(TransportError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                message,
            )));
        }
        self.send(Wire::Frame(frame))
    }

    async fn write_control(
        &self,
        control: Control,
        _deadline: Duration,
    ) -> Result<(), TransportError> {
        let is_close = matches!(control, Control::Close(_));
        self.controls.lock().push(control);
        if is_close {
            self.send(Wire::Close)
        } else {
            Ok(())
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.cancel();
        drop(self.tx.lock().take());
        Ok(())
    }
}
