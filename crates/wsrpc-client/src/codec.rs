//! Client codecs: request encoding and response correlation.
//!
//! A codec writes one request envelope per call or notification and reads
//! responses in two steps. [`RpcCodec::read_response_header`] decodes the next
//! envelope and resolves its id against the [`PendingTable`];
//! [`RpcCodec::read_response_body`] then decodes that envelope's `result`
//! into the caller's destination.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};
use wsrpc_core::errors::INTERNAL_ERROR;
use wsrpc_core::{ErrorObject, Params, RequestEnvelope, RequestKind, ResponseEnvelope};
use wsrpc_transport::{Frame, FrameTransport};

use crate::error::ClientError;
use crate::pending::PendingTable;

/// Message nested in body-decode errors. With streams shared by several calls
/// the same failure may be reported to calls other than the one that caused it.
pub const OTHER_CALL_FAILED: &str = "some other call failed to unmarshal reply";

/// Correlation data of one response.
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseHeader {
    /// Method recorded when the call was sent; empty if the id was unknown.
    pub method: String,
    /// Id of the call answered.
    pub seq: u64,
    /// Error object carried by the response.
    pub error: Option<ErrorObject>,
}

/// Request encode / response decode cycle of a client connection.
#[async_trait]
pub trait RpcCodec: Send + Sync {
    /// Send one request. Calls are recorded as pending before the send.
    async fn write_request(
        &self,
        method: &str,
        params: Params,
        kind: RequestKind,
    ) -> Result<(), ClientError>;

    /// Read the next response envelope and resolve its id.
    ///
    /// A response without an id yields its error object as
    /// [`ClientError::Rpc`].
    async fn read_response_header(&self) -> Result<ResponseHeader, ClientError>;

    /// Decode the result of the response last read into `dest`.
    ///
    /// `None` discards the body.
    async fn read_response_body<T: DeserializeOwned + Send>(
        &self,
        dest: Option<&mut T>,
    ) -> Result<(), ClientError>;

    /// Close the underlying connection.
    async fn close(&self) -> Result<(), ClientError>;
}

/// Internal error reported when a response body cannot be decoded.
pub fn body_decode_error(detail: impl std::fmt::Display) -> ErrorObject {
    ErrorObject::internal(format!("reading body: {detail}")).with_data(json!({
        "code": INTERNAL_ERROR,
        "message": OTHER_CALL_FAILED,
    }))
}

/// Serialize a request, recording calls in `pending`.
pub(crate) fn encode_request(
    pending: &PendingTable,
    method: &str,
    params: Params,
    kind: RequestKind,
) -> Result<String, ClientError> {
    if let RequestKind::Call(id) = kind {
        if pending.insert(id, method).is_some() {
            warn!(id, method, "request id reused while still pending");
        }
    }
    let envelope = RequestEnvelope::new(method, params, kind);
    serde_json::to_string(&envelope).map_err(|e| {
        forget(pending, kind);
        ClientError::Json(e)
    })
}

/// Drop the pending entry of a request whose send failed.
pub(crate) fn forget(pending: &PendingTable, kind: RequestKind) {
    if let RequestKind::Call(id) = kind {
        let _ = pending.take(id);
    }
}

/// Decode one response envelope and resolve it against `pending`.
pub(crate) fn correlate(
    pending: &PendingTable,
    bytes: &[u8],
) -> Result<(ResponseHeader, ResponseEnvelope), ClientError> {
    let mut envelope: ResponseEnvelope = serde_json::from_slice(bytes)?;
    let Some(seq) = envelope.id else {
        let err = envelope
            .error
            .take()
            .unwrap_or_else(|| ErrorObject::internal("response has neither id nor error"));
        return Err(ClientError::Rpc(err));
    };

    let method = pending.take(seq).unwrap_or_else(|| {
        warn!(id = seq, "response for unknown request id");
        String::new()
    });
    let header = ResponseHeader {
        method,
        seq,
        error: envelope.error.clone(),
    };
    Ok((header, envelope))
}

/// Decode the result of `envelope` into `dest`.
pub(crate) fn decode_body<T: DeserializeOwned>(
    envelope: Option<ResponseEnvelope>,
    dest: Option<&mut T>,
) -> Result<(), ClientError> {
    let Some(dest) = dest else {
        return Ok(());
    };
    let Some(envelope) = envelope else {
        return Err(ClientError::Rpc(body_decode_error(
            "no response header was read",
        )));
    };
    *dest = serde_json::from_str(envelope.result_text())
        .map_err(|e| ClientError::Rpc(body_decode_error(e)))?;
    Ok(())
}

/// Codec writing and reading one envelope per frame.
pub struct ClientCodec<T> {
    transport: T,
    pending: PendingTable,
    write_lock: tokio::sync::Mutex<()>,
    last: Mutex<Option<ResponseEnvelope>>,
}

impl<T: FrameTransport> ClientCodec<T> {
    /// Codec over `transport`.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            pending: PendingTable::new(),
            write_lock: tokio::sync::Mutex::new(()),
            last: Mutex::new(None),
        }
    }

    /// Calls sent and not yet answered.
    pub fn pending(&self) -> &PendingTable {
        &self.pending
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[async_trait]
impl<T: FrameTransport> RpcCodec for ClientCodec<T> {
    async fn write_request(
        &self,
        method: &str,
        params: Params,
        kind: RequestKind,
    ) -> Result<(), ClientError> {
        let text = encode_request(&self.pending, method, params, kind)?;
        let _guard = self.write_lock.lock().await;
        debug!(method, ?kind, "sending request");
        if let Err(err) = self.transport.write_message(Frame::Text(text)).await {
            forget(&self.pending, kind);
            return Err(err.into());
        }
        Ok(())
    }

    async fn read_response_header(&self) -> Result<ResponseHeader, ClientError> {
        let frame = self.transport.read_message().await?;
        let (header, envelope) = correlate(&self.pending, frame.as_bytes())?;
        *self.last.lock() = Some(envelope);
        Ok(header)
    }

    async fn read_response_body<D: DeserializeOwned + Send>(
        &self,
        dest: Option<&mut D>,
    ) -> Result<(), ClientError> {
        let envelope = self.last.lock().take();
        decode_body(envelope, dest)
    }

    async fn close(&self) -> Result<(), ClientError> {
        self.transport.close().await.map_err(Into::into)
    }
}
