//! Client error type.

use std::io;

use wsrpc_core::ErrorObject;
use wsrpc_transport::TransportError;

/// Errors returned by client codecs and [`Client`](crate::Client).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The connection ended cleanly.
    #[error("connection closed")]
    Closed,

    /// The client was shut down by `close` or by an earlier connection failure.
    #[error("client is shut down")]
    Shutdown,

    /// JSON-RPC error object, from the server or generated locally.
    #[error("rpc error {}: {}", .0.code, .0.message)]
    Rpc(ErrorObject),

    /// Transport failure other than a clean close.
    #[error(transparent)]
    Transport(TransportError),

    /// A frame did not hold a valid response envelope.
    #[error("invalid response: {0}")]
    Json(#[from] serde_json::Error),

    /// Byte-stream I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl ClientError {
    /// The JSON-RPC error object, if this is one.
    pub fn rpc(&self) -> Option<&ErrorObject> {
        match self {
            Self::Rpc(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Closed => Self::Closed,
            TransportError::Io(e) => Self::Io(e),
            other => Self::Transport(other),
        }
    }
}

impl From<ErrorObject> for ClientError {
    fn from(err: ErrorObject) -> Self {
        Self::Rpc(err)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn transport_closed_maps_to_closed() {
        assert_matches!(ClientError::from(TransportError::Closed), ClientError::Closed);
    }

    #[test]
    fn transport_io_maps_to_io() {
        let err = TransportError::Io(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert_matches!(ClientError::from(err), ClientError::Io(_));
    }

    #[test]
    fn rpc_display_and_accessor() {
        let err = ClientError::from(ErrorObject::method_not_found("Nope"));
        assert_eq!(err.to_string(), "rpc error -32601: method 'Nope' not found");
        assert_eq!(err.rpc().map(|e| e.code), Some(-32601));
        assert!(ClientError::Closed.rpc().is_none());
    }
}
