//! Wire envelopes: one JSON document per WebSocket frame.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::errors::ErrorObject;
use crate::params::Params;

/// The only protocol version spoken on the wire.
pub const JSONRPC_VERSION: &str = "2.0";

/// Legacy sequence number meaning "notification".
///
/// Kept only for [`RequestKind::from_seq`]; new code builds
/// [`RequestKind::Notification`] directly.
pub const NOTIFICATION_SEQ: u64 = u64::MAX;

/// Whether a request expects a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// A call with a caller-assigned id; exactly one response is expected.
    Call(u64),
    /// A notification: no id on the wire, no response.
    Notification,
}

impl RequestKind {
    /// Map a sequence number, treating [`NOTIFICATION_SEQ`] as a notification.
    pub fn from_seq(seq: u64) -> Self {
        if seq == NOTIFICATION_SEQ {
            Self::Notification
        } else {
            Self::Call(seq)
        }
    }

    /// Wire id, `None` for notifications.
    pub fn id(self) -> Option<u64> {
        match self {
            Self::Call(id) => Some(id),
            Self::Notification => None,
        }
    }

    /// Whether this is a notification.
    pub fn is_notification(self) -> bool {
        matches!(self, Self::Notification)
    }
}

/// Outgoing request as sent by a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Method name.
    pub method: String,
    /// Parameters; omitted entirely when absent.
    #[serde(default, skip_serializing_if = "Params::is_none")]
    pub params: Params,
    /// Request id; omitted for notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

impl RequestEnvelope {
    /// Build an envelope for `kind`.
    pub fn new(method: impl Into<String>, params: Params, kind: RequestKind) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            method: method.into(),
            params,
            id: kind.id(),
        }
    }

    /// Whether this envelope is a notification.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Incoming response as read by a client.
///
/// `id` is always written (as `null` when absent). A response without an id
/// carries an error that cannot be attributed to any pending call.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Id of the call this answers.
    #[serde(default)]
    pub id: Option<u64>,
    /// Raw result payload, decoded later into the caller's type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Box<RawValue>>,
    /// Error object when the call failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

impl ResponseEnvelope {
    /// Envelope carrying only an error and no id.
    pub fn error_only(error: ErrorObject) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id: None,
            result: None,
            error: Some(error),
        }
    }

    /// Raw result text, `null` when the member was missing.
    pub fn result_text(&self) -> &str {
        self.result.as_deref().map_or("null", RawValue::get)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn kind_from_seq() {
        assert_eq!(RequestKind::from_seq(0), RequestKind::Call(0));
        assert_eq!(RequestKind::from_seq(41), RequestKind::Call(41));
        assert_eq!(RequestKind::from_seq(u64::MAX), RequestKind::Notification);
        assert_eq!(RequestKind::Notification.id(), None);
        assert!(RequestKind::Notification.is_notification());
    }

    #[test]
    fn call_envelope_wire_format() {
        let env = RequestEnvelope::new(
            "Echo",
            Params::Array(vec![json!("hi")]),
            RequestKind::Call(1),
        );
        let json = serde_json::to_string(&env).unwrap();
        assert_eq!(json, r#"{"jsonrpc":"2.0","method":"Echo","params":["hi"],"id":1}"#);
    }

    #[test]
    fn notification_has_no_id_member() {
        let env = RequestEnvelope::new("Log", Params::None, RequestKind::Notification);
        let v: Value = serde_json::to_value(&env).unwrap();
        assert!(v.get("id").is_none());
        assert!(v.get("params").is_none());
        assert!(env.is_notification());
    }

    #[test]
    fn request_roundtrip() {
        let raw = r#"{"jsonrpc":"2.0","method":"Sum","params":{"a":1},"id":7}"#;
        let env: RequestEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(env.id, Some(7));
        assert_eq!(env.params.named("a"), Some(&json!(1)));
    }

    #[test]
    fn response_with_result() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"result":"hi"}"#;
        let env: ResponseEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(env.id, Some(1));
        assert_eq!(env.result_text(), r#""hi""#);
        assert!(env.error.is_none());
    }

    #[test]
    fn response_without_result_reads_as_null() {
        let raw = r#"{"jsonrpc":"2.0","id":2,"error":{"code":-32601,"message":"nope"}}"#;
        let env: ResponseEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(env.result_text(), "null");
        assert_eq!(env.error.unwrap().code, -32601);
    }

    #[test]
    fn error_only_serializes_null_id() {
        let env = ResponseEnvelope::error_only(ErrorObject::method_not_found("X"));
        let v: Value = serde_json::to_value(&env).unwrap();
        assert_eq!(v["jsonrpc"], "2.0");
        assert!(v["id"].is_null());
        assert!(v.get("result").is_none());
        assert_eq!(v["error"]["code"], -32601);
    }

    #[test]
    fn response_with_missing_id_member() {
        let raw = r#"{"jsonrpc":"2.0","error":{"code":-32700,"message":"parse error"}}"#;
        let env: ResponseEnvelope = serde_json::from_str(raw).unwrap();
        assert!(env.id.is_none());
    }
}
