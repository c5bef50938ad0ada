//! Transport error type.

use std::io;
use std::sync::Arc;
use std::time::Duration;

/// Errors raised by frame transports and the stream bridge.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection ended cleanly (close frame, end of stream, or local close).
    #[error("connection closed")]
    Closed,

    /// WebSocket protocol or socket failure reported by tungstenite.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Failure reported by another WebSocket implementation.
    #[error("websocket error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// I/O failure on a pipe or socket.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// The byte stream did not contain a well-formed JSON document.
    #[error("malformed JSON document: {0}")]
    Decode(#[from] serde_json::Error),

    /// A control frame could not be written before its deadline.
    #[error("control frame not sent within {0:?}")]
    Timeout(Duration),
}

impl TransportError {
    /// Whether this is a clean end of the connection.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Wrap a backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

/// Convert a latched error into an `io::Error` for the byte-stream side.
///
/// The returned error keeps the shared original as its inner error.
pub fn latched_io_error(err: &Arc<TransportError>) -> io::Error {
    let kind = match err.as_ref() {
        TransportError::Closed => io::ErrorKind::BrokenPipe,
        TransportError::Io(e) => e.kind(),
        TransportError::Decode(_) => io::ErrorKind::InvalidData,
        TransportError::Timeout(_) => io::ErrorKind::TimedOut,
        TransportError::WebSocket(_) | TransportError::Backend(_) => io::ErrorKind::ConnectionAborted,
    };
    io::Error::new(kind, Arc::clone(err))
}
