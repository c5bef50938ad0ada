//! Single-use server codec: one request in, at most one response out.

use std::io::{self, Read, Write};

use serde::Serialize;
use serde_json::Value;
use wsrpc_core::params::json_kind;
use wsrpc_core::{ErrorObject, JSONRPC_VERSION, Params};

use crate::error::ServeError;

/// A decoded, validated request.
#[derive(Clone, Debug, PartialEq)]
pub struct ServerRequest {
    /// Method name.
    pub method: String,
    /// Parameters.
    pub params: Params,
    /// Request id as received; `None` for notifications.
    pub id: Option<Value>,
}

impl ServerRequest {
    /// Whether no response is expected.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Serialize)]
struct ResponseOut<'a> {
    jsonrpc: &'static str,
    id: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a ErrorObject>,
}

/// Reads one request from `R` and writes its response to `W`.
pub struct ServerCodec<R, W> {
    input: R,
    output: W,
}

impl<R: Read, W: Write> ServerCodec<R, W> {
    /// Codec over one request's bytes and a response sink.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Decode and validate the request.
    ///
    /// Empty input is an I/O error; malformed JSON is `-32700`; a document
    /// that is not a request object is `-32600`.
    pub fn read_request(&mut self) -> Result<ServerRequest, ServeError> {
        let mut bytes = Vec::new();
        let _ = self.input.read_to_end(&mut bytes)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(ServeError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "empty request",
            )));
        }

        let value: Value = serde_json::from_slice(&bytes).map_err(ErrorObject::parse_error)?;
        Ok(parse_request(value)?)
    }

    /// Write the response to a call.
    pub fn write_response(
        &mut self,
        id: &Value,
        outcome: &Result<Value, ErrorObject>,
    ) -> Result<(), ServeError> {
        let out = match outcome {
            Ok(result) => ResponseOut {
                jsonrpc: JSONRPC_VERSION,
                id,
                result: Some(result),
                error: None,
            },
            Err(error) => ResponseOut {
                jsonrpc: JSONRPC_VERSION,
                id,
                result: None,
                error: Some(error),
            },
        };
        serde_json::to_writer(&mut self.output, &out).map_err(io::Error::from)?;
        self.output.flush()?;
        Ok(())
    }

    /// Consume the codec, returning the response sink.
    pub fn into_output(self) -> W {
        self.output
    }
}

fn parse_request(value: Value) -> Result<ServerRequest, ErrorObject> {
    let mut obj = match value {
        Value::Object(obj) => obj,
        other => {
            return Err(ErrorObject::invalid_request(format!(
                "request must be an object, got {}",
                json_kind(&other)
            )));
        }
    };

    match obj.get("jsonrpc") {
        Some(Value::String(v)) if v == JSONRPC_VERSION => {}
        _ => return Err(ErrorObject::invalid_request("jsonrpc must be \"2.0\"")),
    }

    let method = match obj.remove("method") {
        Some(Value::String(method)) => method,
        Some(_) => return Err(ErrorObject::invalid_request("method must be a string")),
        None => return Err(ErrorObject::invalid_request("missing method")),
    };

    let params = match obj.remove("params") {
        None | Some(Value::Null) => Params::None,
        Some(Value::Array(items)) => Params::Array(items),
        Some(Value::Object(map)) => Params::Object(map),
        Some(other) => {
            return Err(ErrorObject::invalid_request(format!(
                "params must be an array or object, got {}",
                json_kind(&other)
            )));
        }
    };

    let id = match obj.remove("id") {
        None => None,
        Some(id @ (Value::Null | Value::Number(_) | Value::String(_))) => Some(id),
        Some(other) => {
            return Err(ErrorObject::invalid_request(format!(
                "id must be a number, string or null, got {}",
                json_kind(&other)
            )));
        }
    };

    Ok(ServerRequest { method, params, id })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;
    use wsrpc_core::errors::{INVALID_REQUEST, PARSE_ERROR};

    use super::*;

    fn read(input: &str) -> Result<ServerRequest, ServeError> {
        let mut out = Vec::new();
        let result = ServerCodec::new(input.as_bytes(), &mut out).read_request();
        result
    }

    fn protocol_code(result: Result<ServerRequest, ServeError>) -> i64 {
        match result {
            Err(ServeError::Protocol(err)) => err.code,
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    // ── read_request ────────────────────────────────────────────────

    #[test]
    fn reads_call() {
        let req = read(r#"{"jsonrpc":"2.0","method":"Echo","params":["hi"],"id":1}"#).unwrap();
        assert_eq!(req.method, "Echo");
        assert_eq!(req.params, Params::Array(vec![json!("hi")]));
        assert_eq!(req.id, Some(json!(1)));
        assert!(!req.is_notification());
    }

    #[test]
    fn reads_notification() {
        let req = read(r#"{"jsonrpc":"2.0","method":"Log"}"#).unwrap();
        assert!(req.is_notification());
        assert!(req.params.is_none());
    }

    #[test]
    fn null_id_is_a_call() {
        let req = read(r#"{"jsonrpc":"2.0","method":"Echo","id":null}"#).unwrap();
        assert_eq!(req.id, Some(Value::Null));
    }

    #[test]
    fn string_id_is_kept() {
        let req = read(r#"{"jsonrpc":"2.0","method":"Echo","id":"abc"}"#).unwrap();
        assert_eq!(req.id, Some(json!("abc")));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        assert_eq!(protocol_code(read("{not json")), PARSE_ERROR);
    }

    #[test]
    fn wrong_version_is_invalid_request() {
        assert_eq!(
            protocol_code(read(r#"{"jsonrpc":"1.0","method":"Echo","id":1}"#)),
            INVALID_REQUEST
        );
        assert_eq!(protocol_code(read(r#"{"method":"Echo","id":1}"#)), INVALID_REQUEST);
    }

    #[test]
    fn missing_method_is_invalid_request() {
        assert_eq!(protocol_code(read(r#"{"jsonrpc":"2.0","id":1}"#)), INVALID_REQUEST);
        assert_eq!(
            protocol_code(read(r#"{"jsonrpc":"2.0","method":5,"id":1}"#)),
            INVALID_REQUEST
        );
    }

    #[test]
    fn scalar_params_are_invalid_request() {
        assert_eq!(
            protocol_code(read(r#"{"jsonrpc":"2.0","method":"Echo","params":3,"id":1}"#)),
            INVALID_REQUEST
        );
    }

    #[test]
    fn object_id_is_invalid_request() {
        assert_eq!(
            protocol_code(read(r#"{"jsonrpc":"2.0","method":"Echo","id":{}}"#)),
            INVALID_REQUEST
        );
    }

    #[test]
    fn non_object_is_invalid_request() {
        assert_eq!(protocol_code(read("[1,2]")), INVALID_REQUEST);
    }

    #[test]
    fn empty_input_is_io_error() {
        assert_matches!(read(""), Err(ServeError::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof);
        assert_matches!(read("  \n"), Err(ServeError::Io(_)));
    }

    // ── write_response ──────────────────────────────────────────────

    #[test]
    fn writes_result_envelope() {
        let mut out = Vec::new();
        let mut codec = ServerCodec::new(&b""[..], &mut out);
        codec.write_response(&json!(1), &Ok(json!("hi"))).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"{"jsonrpc":"2.0","id":1,"result":"hi"}"#
        );
    }

    #[test]
    fn writes_error_envelope_without_result() {
        let mut out = Vec::new();
        let mut codec = ServerCodec::new(&b""[..], &mut out);
        codec
            .write_response(&json!(2), &Err(ErrorObject::new(7, "app failure")))
            .unwrap();
        let v: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(v, json!({"jsonrpc": "2.0", "id": 2, "error": {"code": 7, "message": "app failure"}}));
    }

    #[test]
    fn null_result_is_written() {
        let mut out = Vec::new();
        let mut codec = ServerCodec::new(&b""[..], &mut out);
        codec.write_response(&json!(3), &Ok(Value::Null)).unwrap();
        let v: Value = serde_json::from_slice(&out).unwrap();
        assert!(v["result"].is_null());
        assert!(v.as_object().unwrap().contains_key("result"));
    }
}
