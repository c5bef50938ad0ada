//! Byte-stream view over a frame transport.
//!
//! [`StreamBridge`] lets a codec that expects `AsyncRead + AsyncWrite` run on
//! a message-framed socket. Two background pumps move data between the
//! transport and a pair of in-process pipes:
//!
//! ```text
//!   transport ──read_message──▶ inbound pump ──▶ pipe ──▶ poll_read
//!   poll_write ──▶ pipe ──▶ outbound pump ──JSON document──▶ write_message
//! ```
//!
//! The first failure from either pump is latched in a [`StickyError`] shared
//! by the whole connection. However the outbound pump ends, it closes the
//! transport.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, DuplexStream, ReadBuf};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::document::JsonDocumentReader;
use crate::error::{TransportError, latched_io_error};
use crate::frame::Frame;
use crate::sticky::StickyError;
use crate::transport::FrameTransport;

/// Capacity of each in-process pipe.
const PIPE_CAPACITY: usize = 64 * 1024;

/// State shared between the bridge and its pumps.
#[derive(Default)]
struct Shared {
    sticky: StickyError,
    stop: CancellationToken,
}

impl Shared {
    fn fail(&self, err: TransportError) {
        if self.sticky.set(err) {
            debug!(error = ?self.sticky.get(), "stream bridge latched");
        }
        self.stop.cancel();
    }
}

/// `AsyncRead + AsyncWrite` adapter over a [`FrameTransport`].
///
/// Every inbound frame is appended to the read side as raw bytes. Bytes
/// written are split into complete JSON documents and each document is sent
/// as one text frame. Must be created inside a tokio runtime.
pub struct StreamBridge<T> {
    transport: Arc<T>,
    shared: Arc<Shared>,
    reader: Option<DuplexStream>,
    writer: Option<DuplexStream>,
    inbound: JoinHandle<()>,
    outbound: JoinHandle<()>,
}

impl<T: FrameTransport + 'static> StreamBridge<T> {
    /// Start both pumps over `transport`.
    pub fn new(transport: T) -> Self {
        Self::from_arc(Arc::new(transport))
    }

    /// Start both pumps over a shared transport.
    pub fn from_arc(transport: Arc<T>) -> Self {
        let shared = Arc::new(Shared::default());
        let (reader, inbound_pipe) = tokio::io::duplex(PIPE_CAPACITY);
        let (writer, outbound_pipe) = tokio::io::duplex(PIPE_CAPACITY);

        let inbound = tokio::spawn(pump_inbound(
            Arc::clone(&transport),
            Arc::clone(&shared),
            inbound_pipe,
        ));
        let outbound = tokio::spawn(pump_outbound(
            Arc::clone(&transport),
            Arc::clone(&shared),
            outbound_pipe,
        ));

        Self {
            transport,
            shared,
            reader: Some(reader),
            writer: Some(writer),
            inbound,
            outbound,
        }
    }

    /// The latched connection error, if any.
    pub fn error(&self) -> Option<Arc<TransportError>> {
        self.shared.sticky.get()
    }

    /// The underlying transport.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Close the transport and both pipe ends.
    ///
    /// Pumps observe the closure on their own; the resulting error, usually
    /// [`TransportError::Closed`], is latched by whichever pump sees it
    /// first.
    pub async fn close(&mut self) -> Result<(), TransportError> {
        let result = self.transport.close().await;
        self.reader = None;
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.shutdown().await;
        }
        result
    }

    /// Whether both pumps have exited.
    pub fn is_finished(&self) -> bool {
        self.inbound.is_finished() && self.outbound.is_finished()
    }

    fn latched(&self) -> Option<Arc<TransportError>> {
        self.shared.sticky.get()
    }
}

impl<T> Drop for StreamBridge<T> {
    fn drop(&mut self) {
        // Dropping the pipe ends winds the pumps down. The outbound pump is
        // never aborted since it owns the final transport close.
        if self.shared.sticky.is_set() {
            self.inbound.abort();
        }
    }
}

impl<T: FrameTransport + 'static> AsyncRead for StreamBridge<T> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Some(err) = this.latched() {
            if !err.is_closed() {
                return Poll::Ready(Err(latched_io_error(&err)));
            }
        }
        let Some(reader) = this.reader.as_mut() else {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "stream bridge closed",
            )));
        };

        let before = buf.filled().len();
        match Pin::new(reader).poll_read(cx, buf) {
            Poll::Ready(Ok(())) if buf.filled().len() == before => {
                // The inbound pump latches before it drops its pipe end, so
                // end of stream here means the latch is already visible.
                match this.latched() {
                    Some(err) if !err.is_closed() => Poll::Ready(Err(latched_io_error(&err))),
                    _ => Poll::Ready(Ok(())),
                }
            }
            other => other,
        }
    }
}

impl<T: FrameTransport + 'static> AsyncWrite for StreamBridge<T> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if let Some(err) = this.latched() {
            return Poll::Ready(Err(latched_io_error(&err)));
        }
        match this.writer.as_mut() {
            Some(writer) => Pin::new(writer).poll_write(cx, data),
            None => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "stream bridge closed",
            ))),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut().writer.as_mut() {
            Some(writer) => Pin::new(writer).poll_flush(cx),
            None => Poll::Ready(Ok(())),
        }
    }

    /// Ends the write side. The outbound pump sends whatever complete
    /// documents remain, then closes the transport. After a latched failure
    /// nothing more is sent but the transport is still closed.
    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut().writer.as_mut() {
            Some(writer) => Pin::new(writer).poll_shutdown(cx),
            None => Poll::Ready(Ok(())),
        }
    }
}

async fn pump_inbound<T: FrameTransport>(
    transport: Arc<T>,
    shared: Arc<Shared>,
    mut pipe: DuplexStream,
) {
    loop {
        let received = tokio::select! {
            () = shared.stop.cancelled() => break,
            received = transport.read_message() => received,
        };
        let frame = match received {
            Ok(frame) => frame,
            Err(err) => {
                shared.fail(err);
                break;
            }
        };
        let written = tokio::select! {
            () = shared.stop.cancelled() => break,
            written = pipe.write_all(frame.as_bytes()) => written,
        };
        if let Err(err) = written {
            shared.fail(TransportError::Io(err));
            break;
        }
    }
    let _ = pipe.shutdown().await;
}

/// Forwards documents until the pipe ends or the bridge stops, then closes
/// the transport on every exit path.
async fn pump_outbound<T: FrameTransport>(
    transport: Arc<T>,
    shared: Arc<Shared>,
    pipe: DuplexStream,
) {
    if let Err(err) = forward_documents(transport.as_ref(), &shared, pipe).await {
        shared.fail(err);
    }

    debug!(latched = shared.sticky.is_set(), "outbound pump done, closing transport");
    match transport.close().await {
        Ok(()) | Err(TransportError::Closed) => {}
        Err(err) => warn!(error = %err, "closing transport after write side ended"),
    }
}

async fn forward_documents<T: FrameTransport>(
    transport: &T,
    shared: &Shared,
    pipe: DuplexStream,
) -> Result<(), TransportError> {
    let mut documents = JsonDocumentReader::new(pipe);
    loop {
        let next = tokio::select! {
            () = shared.stop.cancelled() => return Ok(()),
            next = documents.next_document() => next?,
        };
        let Some(document) = next else {
            return Ok(());
        };
        let text = String::from_utf8(document.to_vec())
            .map_err(|err| TransportError::Io(io::Error::new(io::ErrorKind::InvalidData, err)))?;
        tokio::select! {
            () = shared.stop.cancelled() => return Ok(()),
            sent = transport.write_message(Frame::Text(text)) => sent?,
        }
    }
}
