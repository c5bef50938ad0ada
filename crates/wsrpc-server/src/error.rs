//! Server error types.

use std::io;

use wsrpc_core::ErrorObject;
use wsrpc_transport::TransportError;

/// Why a single dispatch or a connection loop stopped.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// The request could not be dispatched: parse error, invalid request or
    /// unknown method. The connection keeps serving.
    #[error("protocol error {}: {}", .0.code, .0.message)]
    Protocol(ErrorObject),

    /// Reading the request or writing the response failed.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// The transport failed while reading or sending a frame.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<ErrorObject> for ServeError {
    fn from(err: ErrorObject) -> Self {
        Self::Protocol(err)
    }
}

/// Errors raised while loading the server configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the config file from disk.
    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),
    /// The config file is not valid JSON or does not fit the schema.
    #[error("failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_object_becomes_protocol_error() {
        let err = ServeError::from(ErrorObject::method_not_found("X"));
        assert!(matches!(err, ServeError::Protocol(obj) if obj.code == -32601));
        let err = ServeError::from(TransportError::Closed);
        assert_eq!(err.to_string(), "connection closed");
    }

    #[test]
    fn protocol_display() {
        let err = ServeError::Protocol(ErrorObject::parse_error("eof"));
        assert_eq!(err.to_string(), "protocol error -32700: parse error: eof");
    }

    #[test]
    fn config_json_error_display() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad}").unwrap_err();
        let err = ConfigError::from(json_err);
        assert!(err.to_string().contains("parse config JSON"));
    }
}
