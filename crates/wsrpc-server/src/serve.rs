//! Single-request dispatch.

use std::io::{Read, Write};

use metrics::counter;
use tracing::debug;
use wsrpc_core::ErrorObject;

use crate::codec::{ServerCodec, ServerRequest};
use crate::error::ServeError;
use crate::registry::MethodRegistry;

/// Read one request from `codec`, run its handler and write the response.
///
/// Calls always produce exactly one response envelope, including when the
/// handler fails. Notifications produce nothing, even for unknown methods.
/// Unparseable requests and unknown methods of calls come back as
/// [`ServeError::Protocol`] with nothing written, since no id is known to be
/// safe to answer.
pub async fn serve_request<R: Read, W: Write>(
    registry: &MethodRegistry,
    codec: &mut ServerCodec<R, W>,
) -> Result<(), ServeError> {
    let ServerRequest { method, params, id } = codec.read_request()?;
    let method = method.as_str();
    counter!("wsrpc_requests_total", "method" => method.to_owned()).increment(1);

    let Some(handler) = registry.get(method) else {
        counter!("wsrpc_errors_total", "method" => method.to_owned(), "error_type" => "method_not_found").increment(1);
        if id.is_none() {
            debug!(method, "notification for unknown method dropped");
            return Ok(());
        }
        return Err(ServeError::Protocol(ErrorObject::method_not_found(method)));
    };

    debug!(method, ?id, "dispatching");
    let outcome = handler.handle(params).await;
    if let Err(err) = &outcome {
        counter!("wsrpc_errors_total", "method" => method.to_owned(), "error_type" => err.code.to_string()).increment(1);
        debug!(method, code = err.code, message = %err.message, "handler failed");
    }

    match &id {
        Some(id) => codec.write_response(id, &outcome),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use wsrpc_core::errors::{INVALID_PARAMS, METHOD_NOT_FOUND, PARSE_ERROR};

    use super::*;

    fn registry() -> MethodRegistry {
        let mut reg = MethodRegistry::new();
        reg.register_fn("Echo", |params| {
            params
                .positional(0)
                .cloned()
                .ok_or_else(|| ErrorObject::invalid_params("Echo takes one argument"))
        });
        reg
    }

    async fn run(input: &str) -> (Result<(), ServeError>, String) {
        let mut out = Vec::new();
        let result = {
            let mut codec = ServerCodec::new(input.as_bytes(), &mut out);
            serve_request(&registry(), &mut codec).await
        };
        (result, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn echo_call_writes_one_response() {
        let (result, out) = run(r#"{"jsonrpc":"2.0","method":"Echo","params":["hi"],"id":1}"#).await;
        result.unwrap();
        assert_eq!(out, r#"{"jsonrpc":"2.0","id":1,"result":"hi"}"#);
    }

    #[tokio::test]
    async fn handler_error_is_written_as_response() {
        let (result, out) = run(r#"{"jsonrpc":"2.0","method":"Echo","params":[],"id":4}"#).await;
        result.unwrap();
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["id"], 4);
        assert_eq!(v["error"]["code"], INVALID_PARAMS);
        assert!(v.get("result").is_none());
    }

    #[tokio::test]
    async fn notification_writes_nothing() {
        let (result, out) = run(r#"{"jsonrpc":"2.0","method":"Echo","params":["x"]}"#).await;
        result.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn unknown_method_is_protocol_error() {
        let (result, out) = run(r#"{"jsonrpc":"2.0","method":"Nope","id":2}"#).await;
        match result {
            Err(ServeError::Protocol(err)) => assert_eq!(err.code, METHOD_NOT_FOUND),
            other => panic!("expected protocol error, got {other:?}"),
        }
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn unknown_notification_is_dropped() {
        let (result, out) = run(r#"{"jsonrpc":"2.0","method":"Nope"}"#).await;
        result.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn parse_error_is_protocol_error() {
        let (result, _) = run("{{").await;
        match result {
            Err(ServeError::Protocol(err)) => assert_eq!(err.code, PARSE_ERROR),
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn string_id_is_echoed() {
        let (result, out) = run(r#"{"jsonrpc":"2.0","method":"Echo","params":[1],"id":"a"}"#).await;
        result.unwrap();
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v, json!({"jsonrpc": "2.0", "id": "a", "result": 1}));
    }
}
