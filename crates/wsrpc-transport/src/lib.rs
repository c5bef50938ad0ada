//! # wsrpc-transport
//!
//! Frame transports for JSON-RPC over WebSocket.
//!
//! - [`FrameTransport`]: the message-framed duplex abstraction every role
//!   runs on, with a tokio-tungstenite implementation for clients and an
//!   in-memory pair for tests.
//! - [`StreamBridge`]: byte-stream `AsyncRead + AsyncWrite` over any
//!   transport, with a sticky first-failure latch.
//! - [`JsonDocumentReader`]: splits a byte stream into whole JSON documents.

#![deny(unsafe_code)]

pub mod bridge;
pub mod document;
pub mod error;
pub mod frame;
pub mod memory;
pub mod sticky;
pub mod transport;
pub mod tungstenite;

pub use bridge::StreamBridge;
pub use document::JsonDocumentReader;
pub use error::TransportError;
pub use frame::{CloseFrame, Control, Frame};
pub use memory::MemoryTransport;
pub use sticky::StickyError;
pub use transport::FrameTransport;
pub use tungstenite::{TungsteniteTransport, WsClientTransport, connect};
