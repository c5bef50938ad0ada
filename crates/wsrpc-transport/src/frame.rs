//! Data and control frames exchanged with a transport.

use bytes::Bytes;

/// One complete data message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text message; every envelope this crate writes is one of these.
    Text(String),
    /// Binary message; accepted inbound and treated as UTF-8 JSON bytes.
    Binary(Bytes),
}

impl Frame {
    /// Text frame from anything string-like.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Payload bytes regardless of frame type.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(s) => s.as_bytes(),
            Self::Binary(b) => b,
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// Status code and reason carried by a close frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloseFrame {
    /// WebSocket close status code.
    pub code: u16,
    /// Optional human-readable reason.
    pub reason: String,
}

impl CloseFrame {
    /// `1000 Normal Closure`.
    pub const NORMAL: u16 = 1000;

    /// Normal closure with an empty reason.
    pub fn normal() -> Self {
        Self {
            code: Self::NORMAL,
            reason: String::new(),
        }
    }
}

/// Control frames written out of band of the data stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Control {
    /// Close frame; `None` sends an empty payload.
    Close(Option<CloseFrame>),
    /// Ping with payload.
    Ping(Bytes),
    /// Pong with payload.
    Pong(Bytes),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_and_binary_bytes() {
        assert_eq!(Frame::text("{}").as_bytes(), b"{}");
        assert_eq!(Frame::Binary(Bytes::from_static(b"[1]")).as_bytes(), b"[1]");
    }

    #[test]
    fn len_and_empty() {
        assert_eq!(Frame::text("abc").len(), 3);
        assert!(Frame::text("").is_empty());
    }

    #[test]
    fn normal_close() {
        let frame = CloseFrame::normal();
        assert_eq!(frame.code, 1000);
        assert!(frame.reason.is_empty());
    }
}
