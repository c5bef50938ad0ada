//! Server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the WebSocket RPC server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Route that accepts WebSocket upgrades.
    pub path: String,
    /// Socket read buffer size in bytes.
    pub read_buffer_size: usize,
    /// Socket write buffer size in bytes.
    pub write_buffer_size: usize,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Deadline for the close frame sent when a connection ends.
    pub close_deadline_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            path: "/ws".into(),
            read_buffer_size: 4096,
            write_buffer_size: 4096,
            max_message_size: 16 * 1024 * 1024, // 16 MB
            close_deadline_ms: 1000,
        }
    }
}

impl ServerConfig {
    /// Close deadline as a [`Duration`].
    pub fn close_deadline(&self) -> Duration {
        Duration::from_millis(self.close_deadline_ms)
    }

    /// `host:port` suitable for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_host() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.host, "127.0.0.1");
    }

    #[test]
    fn default_port_is_zero() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.port, 0);
    }

    #[test]
    fn default_path() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.path, "/ws");
    }

    #[test]
    fn default_buffer_sizes() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.read_buffer_size, 4096);
        assert_eq!(cfg.write_buffer_size, 4096);
    }

    #[test]
    fn default_max_message_size() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.max_message_size, 16 * 1024 * 1024);
    }

    #[test]
    fn close_deadline_in_millis() {
        let cfg = ServerConfig {
            close_deadline_ms: 250,
            ..ServerConfig::default()
        };
        assert_eq!(cfg.close_deadline(), Duration::from_millis(250));
    }

    #[test]
    fn bind_addr_joins_host_and_port() {
        let cfg = ServerConfig {
            host: "0.0.0.0".into(),
            port: 9090,
            ..ServerConfig::default()
        };
        assert_eq!(cfg.bind_addr(), "0.0.0.0:9090");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: ServerConfig = serde_json::from_str(r#"{"port": 8080}"#).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.path, "/ws");
    }

    #[test]
    fn serde_roundtrip() {
        let cfg = ServerConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ServerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
        assert!(json.contains("maxMessageSize"));
    }
}
