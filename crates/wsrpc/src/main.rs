//! # wsrpc
//!
//! JSON-RPC 2.0 over WebSocket: serve the demo methods, or make one call
//! against a running server.

#![deny(unsafe_code)]

mod handlers;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use wsrpc_client::{Client, RpcCodec};
use wsrpc_core::Params;
use wsrpc_core::logging::{LogFormat, init_subscriber};
use wsrpc_server::{MethodRegistry, ServerConfig, WsServer};

/// JSON-RPC over WebSocket.
#[derive(Parser, Debug)]
#[command(name = "wsrpc", about = "JSON-RPC 2.0 over WebSocket")]
struct Cli {
    /// Log level used when `RUST_LOG` is unset.
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Log output format (`compact` or `json`).
    #[arg(long, default_value = "compact", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the demo methods (`Echo`, `Sum`, `Ping`).
    Serve {
        /// JSON config file; defaults and `WSRPC_*` variables apply without one.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Host to bind (overrides config).
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides config).
        #[arg(long)]
        port: Option<u16>,
    },

    /// Make one call or notification.
    Call {
        /// Server URL, e.g. `ws://127.0.0.1:9000/ws`.
        url: String,

        /// Method name.
        method: String,

        /// Parameters as a JSON array or object.
        params: Option<String>,

        /// Send a notification and do not wait for a response.
        #[arg(long)]
        notify: bool,

        /// Go through the byte-stream bridge instead of the frame codec.
        #[arg(long)]
        stream: bool,
    },
}

fn load_config(
    path: Option<&PathBuf>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ServerConfig> {
    match path {
        Some(path) => wsrpc_server::load_config_with(path, lookup)
            .with_context(|| format!("Failed to load config: {}", path.display())),
        None => {
            let mut config = ServerConfig::default();
            wsrpc_server::loader::apply_overrides(&mut config, lookup);
            Ok(config)
        }
    }
}

fn parse_params(raw: Option<&str>) -> Result<Params> {
    let Some(raw) = raw else {
        return Ok(Params::None);
    };
    let value: Value = serde_json::from_str(raw).context("PARAMS is not valid JSON")?;
    Params::from_value(value).context("PARAMS must be a JSON array or object")
}

async fn serve(config: Option<PathBuf>, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = load_config(config.as_ref(), |name| std::env::var(name).ok())?;
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    let mut registry = MethodRegistry::new();
    handlers::register_all(&mut registry);

    let server = WsServer::new(config, registry);
    let (addr, handle) = server.listen().await.context("Failed to bind")?;
    tracing::info!(
        %addr,
        methods = ?server.registry().methods(),
        "wsrpc server ready"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutting down...");
    server.shutdown();
    handle.await.context("Server task failed")?;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn run_call<C: RpcCodec>(
    client: &Client<C>,
    method: &str,
    params: Params,
    notify: bool,
) -> Result<Option<Value>> {
    if notify {
        client
            .notify_with(method, params)
            .await
            .with_context(|| format!("Notification {method} failed"))?;
        return Ok(None);
    }
    let result: Value = client
        .call_with(method, params)
        .await
        .with_context(|| format!("Call {method} failed"))?;
    Ok(Some(result))
}

async fn call(url: &str, method: &str, params: Params, notify: bool, stream: bool) -> Result<()> {
    let result = if stream {
        let client = wsrpc_client::connect_stream(url)
            .await
            .with_context(|| format!("Failed to connect to {url}"))?;
        let result = run_call(&client, method, params, notify).await;
        let _ = client.close().await;
        result?
    } else {
        let client = wsrpc_client::connect(url)
            .await
            .with_context(|| format!("Failed to connect to {url}"))?;
        let result = run_call(&client, method, params, notify).await;
        let _ = client.close().await;
        result?
    };

    if let Some(result) = result {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_subscriber(&args.log_level, args.log_format);

    match args.command {
        Command::Serve { config, host, port } => serve(config, host, port).await,
        Command::Call {
            url,
            method,
            params,
            notify,
            stream,
        } => {
            let params = parse_params(params.as_deref())?;
            call(&url, &method, params, notify, stream).await
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_serve_flags() {
        let cli = Cli::parse_from(["wsrpc", "serve", "--host", "0.0.0.0", "--port", "9000"]);
        match cli.command {
            Command::Serve { host, port, config } => {
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
                assert_eq!(port, Some(9000));
                assert!(config.is_none());
            }
            Command::Call { .. } => panic!("expected serve"),
        }
    }

    #[test]
    fn parses_call_with_globals() {
        let cli = Cli::parse_from([
            "wsrpc",
            "--log-format",
            "json",
            "call",
            "ws://localhost:1/ws",
            "Echo",
            r#"["hi"]"#,
            "--stream",
        ]);
        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            Command::Call {
                method,
                params,
                notify,
                stream,
                ..
            } => {
                assert_eq!(method, "Echo");
                assert_eq!(params.as_deref(), Some(r#"["hi"]"#));
                assert!(!notify);
                assert!(stream);
            }
            Command::Serve { .. } => panic!("expected call"),
        }
    }

    #[test]
    fn params_shapes() {
        assert!(parse_params(None).unwrap().is_none());
        assert_eq!(
            parse_params(Some("[1,2]")).unwrap(),
            Params::Array(vec![Value::from(1), Value::from(2)])
        );
        assert!(matches!(parse_params(Some(r#"{"a":1}"#)).unwrap(), Params::Object(_)));
        assert!(parse_params(Some("3")).is_err());
        assert!(parse_params(Some("{oops")).is_err());
    }

    #[test]
    fn missing_config_file_uses_defaults() {
        let path = PathBuf::from("/nonexistent/wsrpc.json");
        let config = load_config(Some(&path), |_| None).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn overrides_apply_without_config_file() {
        let lookup = |name: &str| (name == "WSRPC_PORT").then(|| "9100".to_owned());
        let config = load_config(None, lookup).unwrap();
        assert_eq!(config.port, 9100);
    }
}
