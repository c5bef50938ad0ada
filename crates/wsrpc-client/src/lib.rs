//! # wsrpc-client
//!
//! Client side of JSON-RPC 2.0 over WebSocket frames.
//!
//! Two codecs implement [`RpcCodec`]:
//!
//! - [`ClientCodec`] reads and writes one envelope per frame directly.
//! - [`StreamCodec`] runs on any byte stream, typically a
//!   [`StreamBridge`](wsrpc_transport::StreamBridge) over a frame transport.
//!
//! [`Client`] drives either one with `call` and `notify`.

#![deny(unsafe_code)]

pub mod client;
pub mod codec;
pub mod error;
pub mod pending;
pub mod stream;

pub use client::{BridgedClient, Client, FrameClient, connect, connect_stream};
pub use codec::{ClientCodec, ResponseHeader, RpcCodec};
pub use error::ClientError;
pub use pending::PendingTable;
pub use stream::StreamCodec;
