//! # wsrpc-core
//!
//! Shared vocabulary for JSON-RPC 2.0 over WebSocket frames:
//!
//! - **Envelopes**: [`RequestEnvelope`] and [`ResponseEnvelope`], one per frame
//! - **Request kinds**: [`RequestKind`] separates calls from notifications
//! - **Parameters**: [`Params`], the closed set of by-position / by-name shapes
//! - **Errors**: [`ErrorObject`] and the reserved JSON-RPC error codes
//! - **Logging**: `tracing` subscriber setup for binaries

#![deny(unsafe_code)]

pub mod errors;
pub mod logging;
pub mod params;
mod shape;
pub mod types;

pub use errors::ErrorObject;
pub use params::Params;
pub use types::{JSONRPC_VERSION, RequestEnvelope, RequestKind, ResponseEnvelope};
