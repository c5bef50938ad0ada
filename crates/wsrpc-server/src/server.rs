//! `WsServer`: axum HTTP + WebSocket listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::response::{Json, Response};
use axum::routing::get;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use wsrpc_transport::FrameTransport;

use crate::config::ServerConfig;
use crate::connection::serve;
use crate::registry::MethodRegistry;
use crate::websocket::AxumTransport;

/// Shared state accessible from axum handlers.
#[derive(Clone)]
struct AppState {
    registry: Arc<MethodRegistry>,
    config: Arc<ServerConfig>,
    shutdown: CancellationToken,
    connections: Arc<AtomicUsize>,
}

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the server answers.
    pub status: &'static str,
    /// Number of registered methods.
    pub methods: usize,
    /// WebSocket connections currently being served.
    pub connections: usize,
}

/// The JSON-RPC WebSocket server.
pub struct WsServer {
    config: Arc<ServerConfig>,
    registry: Arc<MethodRegistry>,
    shutdown: CancellationToken,
    connections: Arc<AtomicUsize>,
}

impl WsServer {
    /// Create a new server.
    pub fn new(config: ServerConfig, registry: MethodRegistry) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            shutdown: CancellationToken::new(),
            connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Build the axum router: the upgrade route and `/health`.
    pub fn router(&self) -> Router {
        let state = AppState {
            registry: self.registry.clone(),
            config: self.config.clone(),
            shutdown: self.shutdown.clone(),
            connections: self.connections.clone(),
        };

        Router::new()
            .route("/health", get(health_handler))
            .route(&self.config.path, get(ws_handler))
            .with_state(state)
    }

    /// Bind the configured address and serve in a background task.
    ///
    /// Returns the bound address, which differs from the configured one when
    /// the port is `0`.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let router = self.router();
        let shutdown = self.shutdown.clone().cancelled_owned();

        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!(error = %err, "server failed");
            }
        });
        info!(%addr, path = %self.config.path, "listening");
        Ok((addr, handle))
    }

    /// Stop accepting connections and close the open ones.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the method registry.
    pub fn registry(&self) -> &Arc<MethodRegistry> {
        &self.registry
    }

    /// WebSocket connections currently being served.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        methods: state.registry.len(),
        connections: state.connections.load(Ordering::Relaxed),
    })
}

/// GET <path>: upgrade and serve JSON-RPC on the socket. Origins are not checked.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.read_buffer_size(state.config.read_buffer_size)
        .write_buffer_size(state.config.write_buffer_size)
        .max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let transport = Arc::new(AxumTransport::new(socket));
    let closer = {
        let transport = transport.clone();
        let shutdown = state.shutdown.clone();
        tokio::spawn(async move {
            shutdown.cancelled().await;
            let _ = transport.close().await;
        })
    };

    let active = state.connections.fetch_add(1, Ordering::Relaxed) + 1;
    info!(active, "connection opened");

    if let Err(err) = serve(&*transport, &state.registry, state.config.close_deadline()).await {
        info!(error = %err, "connection failed");
    }

    closer.abort();
    let _ = transport.close().await;
    let _ = state.connections.fetch_sub(1, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;
    use wsrpc_core::ErrorObject;

    use super::*;

    fn make_server() -> WsServer {
        WsServer::new(ServerConfig::default(), MethodRegistry::new())
    }

    async fn get_status(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        (status, body.to_vec())
    }

    #[test]
    fn server_with_default_config() {
        let server = make_server();
        assert_eq!(server.config().host, "127.0.0.1");
        assert_eq!(server.config().path, "/ws");
        assert_eq!(server.connection_count(), 0);
    }

    #[test]
    fn registry_accessible() {
        let mut registry = MethodRegistry::new();
        registry.register_fn("Ping", |_| Ok(Value::from("pong")));
        let server = WsServer::new(ServerConfig::default(), registry);
        assert_eq!(server.registry().methods(), vec!["Ping"]);
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let mut registry = MethodRegistry::new();
        registry.register_fn("A", |_| Ok(Value::Null));
        registry.register_fn("B", |_| Err(ErrorObject::new(1, "no")));
        let server = WsServer::new(ServerConfig::default(), registry);

        let (status, body) = get_status(server.router(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        let parsed: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["methods"], 2);
        assert_eq!(parsed["connections"], 0);
    }

    #[tokio::test]
    async fn ws_route_rejects_plain_get() {
        let (status, _) = get_status(make_server().router(), "/ws").await;
        assert!(status.is_client_error());
        assert_ne!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn custom_path_is_routed() {
        let config = ServerConfig {
            path: "/rpc".into(),
            ..ServerConfig::default()
        };
        let server = WsServer::new(config, MethodRegistry::new());
        let (status, _) = get_status(server.router(), "/rpc").await;
        assert_ne!(status, StatusCode::NOT_FOUND);
        let (status, _) = get_status(server.router(), "/ws").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let (status, _) = get_status(make_server().router(), "/nonexistent").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listen_binds_and_shuts_down() {
        let server = make_server();
        let (addr, handle) = server.listen().await.unwrap();
        assert_ne!(addr.port(), 0);
        server.shutdown();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
