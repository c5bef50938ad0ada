//! # wsrpc-server
//!
//! JSON-RPC 2.0 over WebSocket, one request per frame:
//!
//! - **Registry**: [`MethodRegistry`] maps names to [`MethodHandler`]s
//! - **Codec**: [`ServerCodec`] decodes one request and encodes its response
//! - **Dispatch**: [`serve_request`] runs a single request through the registry
//! - **Connection loop**: [`serve_connection`] and [`serve`] drive a [`FrameTransport`](wsrpc_transport::FrameTransport)
//! - **Listener**: [`WsServer`] upgrades HTTP requests with axum and exposes `/health`
//! - **Config**: [`ServerConfig`] and [`load_config_with`]

#![deny(unsafe_code)]

pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod loader;
pub mod registry;
pub mod serve;
pub mod server;
pub mod websocket;

pub use codec::{ServerCodec, ServerRequest};
pub use config::ServerConfig;
pub use connection::{CLOSE_DEADLINE, serve, serve_connection};
pub use error::{ConfigError, ServeError};
pub use loader::load_config_with;
pub use registry::{FnHandler, MethodHandler, MethodRegistry};
pub use serve::serve_request;
pub use server::{HealthResponse, WsServer};
pub use websocket::AxumTransport;
