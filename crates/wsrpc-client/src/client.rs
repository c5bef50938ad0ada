//! Call and notify entry points.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use metrics::counter;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};
use wsrpc_core::{ErrorObject, Params, RequestKind};
use wsrpc_transport::{FrameTransport, StreamBridge, WsClientTransport};

use crate::codec::{ClientCodec, RpcCodec, body_decode_error};
use crate::error::ClientError;
use crate::stream::StreamCodec;

/// Client over a direct frame codec.
pub type FrameClient<T> = Client<ClientCodec<T>>;

/// Client over a stream codec running on a [`StreamBridge`].
pub type BridgedClient<T> = Client<StreamCodec<StreamBridge<T>>>;

#[derive(Clone, Debug)]
enum Health {
    Open,
    Closed,
    /// A response body failed to decode; later calls get this error.
    Tainted(ErrorObject),
}

/// JSON-RPC client over one connection.
///
/// Exchanges are serialized: a call holds the connection from sending until
/// its response has been read. Sequence numbers start at 0.
pub struct Client<C> {
    codec: C,
    seq: AtomicU64,
    exchange: tokio::sync::Mutex<()>,
    health: Mutex<Health>,
    /// Set by the first `close`, independent of error-driven shutdown.
    closing: AtomicBool,
}

impl<T: FrameTransport> Client<ClientCodec<T>> {
    /// Client using the direct frame codec over `transport`.
    pub fn with_codec(transport: T) -> Self {
        Self::new(ClientCodec::new(transport))
    }
}

impl<T: FrameTransport + 'static> Client<StreamCodec<StreamBridge<T>>> {
    /// Client using a stream codec over a bridge on `transport`.
    ///
    /// Must be called inside a tokio runtime.
    pub fn over_stream(transport: T) -> Self {
        Self::new(StreamCodec::new(StreamBridge::new(transport)))
    }
}

impl<C: RpcCodec> Client<C> {
    /// Client over an arbitrary codec.
    pub fn new(codec: C) -> Self {
        Self {
            codec,
            seq: AtomicU64::new(0),
            exchange: tokio::sync::Mutex::new(()),
            health: Mutex::new(Health::Open),
            closing: AtomicBool::new(false),
        }
    }

    /// The codec driving this client.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Whether the client still accepts calls.
    pub fn is_open(&self) -> bool {
        matches!(*self.health.lock(), Health::Open)
    }

    /// Call `method` with any serializable parameters and decode the result.
    ///
    /// Parameters must serialize to an array, an object or nothing; other
    /// shapes fail with `-32603` before anything is sent.
    pub async fn call<P, R>(&self, method: &str, params: &P) -> Result<R, ClientError>
    where
        P: Serialize + ?Sized + Sync,
        R: DeserializeOwned + Send,
    {
        let params = Params::from_serialize(params)?;
        self.call_with(method, params).await
    }

    /// Call `method` with explicit parameters and decode the result.
    pub async fn call_with<R>(&self, method: &str, params: Params) -> Result<R, ClientError>
    where
        R: DeserializeOwned + Send,
    {
        let _exchange = self.exchange.lock().await;
        self.ensure_open()?;

        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        counter!("wsrpc_client_calls_total", "method" => method.to_owned()).increment(1);
        self.send(method, params, RequestKind::Call(seq)).await?;

        loop {
            let header = match self.codec.read_response_header().await {
                Ok(header) => header,
                Err(err) => {
                    self.shut_down(&err, Health::Closed);
                    return Err(err);
                }
            };

            if header.seq != seq {
                warn!(expected = seq, got = header.seq, "skipping response for another call");
                self.discard_body().await?;
                continue;
            }

            if let Some(err) = header.error {
                counter!("wsrpc_client_errors_total", "method" => method.to_owned()).increment(1);
                self.discard_body().await?;
                return Err(ClientError::Rpc(err));
            }

            let mut slot: Option<R> = None;
            if let Err(err) = self.codec.read_response_body(Some(&mut slot)).await {
                self.body_failed(&err);
                return Err(err);
            }
            return match slot {
                Some(value) => Ok(value),
                None => serde_json::from_value(Value::Null).map_err(|e| {
                    let err = ClientError::Rpc(body_decode_error(e));
                    self.body_failed(&err);
                    err
                }),
            };
        }
    }

    /// Send a notification with any serializable parameters.
    pub async fn notify<P>(&self, method: &str, params: &P) -> Result<(), ClientError>
    where
        P: Serialize + ?Sized + Sync,
    {
        let params = Params::from_serialize(params)?;
        self.notify_with(method, params).await
    }

    /// Send a notification with explicit parameters. No response is read.
    pub async fn notify_with(&self, method: &str, params: Params) -> Result<(), ClientError> {
        let _exchange = self.exchange.lock().await;
        self.ensure_open()?;
        counter!("wsrpc_client_notifications_total", "method" => method.to_owned()).increment(1);
        self.send(method, params, RequestKind::Notification).await
    }

    /// Shut the client down and close the connection.
    ///
    /// The connection is closed even when an earlier failure already shut the
    /// client down. Only a second `close` returns [`ClientError::Shutdown`].
    pub async fn close(&self) -> Result<(), ClientError> {
        if self.closing.swap(true, Ordering::AcqRel) {
            return Err(ClientError::Shutdown);
        }
        *self.health.lock() = Health::Closed;
        info!("closing client");
        self.codec.close().await
    }

    fn ensure_open(&self) -> Result<(), ClientError> {
        match &*self.health.lock() {
            Health::Open => Ok(()),
            Health::Closed => Err(ClientError::Shutdown),
            Health::Tainted(err) => Err(ClientError::Rpc(err.clone())),
        }
    }

    async fn send(&self, method: &str, params: Params, kind: RequestKind) -> Result<(), ClientError> {
        let result = self.codec.write_request(method, params, kind).await;
        if let Err(err @ ClientError::Closed) = &result {
            self.shut_down(err, Health::Closed);
        }
        result
    }

    async fn discard_body(&self) -> Result<(), ClientError> {
        self.codec.read_response_body::<Value>(None).await
    }

    /// Record why the connection became unusable. The first reason sticks.
    fn shut_down(&self, err: &ClientError, next: Health) {
        let mut health = self.health.lock();
        if !matches!(*health, Health::Open) {
            return;
        }
        debug!(error = %err, "client shutting down");
        *health = next;
    }

    fn body_failed(&self, err: &ClientError) {
        let next = match err.rpc() {
            Some(obj) => Health::Tainted(obj.clone()),
            None => Health::Closed,
        };
        self.shut_down(err, next);
    }
}

/// Connect to `url` and build a client on the direct frame codec.
pub async fn connect(url: &str) -> Result<FrameClient<WsClientTransport>, ClientError> {
    let transport = wsrpc_transport::connect(url).await?;
    Ok(Client::with_codec(transport))
}

/// Connect to `url` and build a client on the stream bridge.
pub async fn connect_stream(url: &str) -> Result<BridgedClient<WsClientTransport>, ClientError> {
    let transport = wsrpc_transport::connect(url).await?;
    Ok(Client::over_stream(transport))
}
