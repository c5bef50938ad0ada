//! Request parameter shapes.
//!
//! JSON-RPC 2.0 only allows by-position (array) or by-name (object)
//! parameters. [`Params`] makes that a closed set chosen at the call site:
//! anything that serializes to another JSON shape is rejected before it
//! reaches the wire.

use serde::de::{DeserializeOwned, Deserializer};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ErrorObject;

/// Parameters of a request.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Params {
    /// No parameters; the `params` member is omitted from the envelope.
    #[default]
    None,
    /// By-position parameters.
    Array(Vec<Value>),
    /// By-name parameters.
    Object(Map<String, Value>),
}

impl Params {
    /// Convert any serializable value into a parameter shape.
    ///
    /// Sequences, tuples and arrays become [`Params::Array`]; structs and
    /// string-keyed maps become [`Params::Object`]; values that serialize to
    /// `null` (`None`, `()`, unit structs) become [`Params::None`]. Every
    /// other shape fails with an internal error naming the type.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, ErrorObject> {
        crate::shape::check(value)
            .map_err(|e| ErrorObject::internal(format!("unsupported param type: {e}")))?;
        let value = serde_json::to_value(value)
            .map_err(|e| ErrorObject::internal(format!("unsupported param type: {e}")))?;
        Self::from_value(value)
    }

    /// Classify an already-built JSON value.
    pub fn from_value(value: Value) -> Result<Self, ErrorObject> {
        match value {
            Value::Null => Ok(Self::None),
            Value::Array(items) => Ok(Self::Array(items)),
            Value::Object(map) => Ok(Self::Object(map)),
            other => Err(ErrorObject::internal(format!(
                "unsupported param type: {}",
                json_kind(&other)
            ))),
        }
    }

    /// Whether there are no parameters at all.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Positional parameter at `index`.
    pub fn positional(&self, index: usize) -> Option<&Value> {
        match self {
            Self::Array(items) => items.get(index),
            _ => None,
        }
    }

    /// Named parameter `key`.
    pub fn named(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Deserialize the parameters into a typed argument list.
    ///
    /// Absent parameters deserialize from `null`. Failures map to `-32602`.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, ErrorObject> {
        let value = self.clone().into_value().unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|e| ErrorObject::invalid_params(e.to_string()))
    }

    /// The parameters as a JSON value, `None` when absent.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::None => None,
            Self::Array(items) => Some(Value::Array(items)),
            Self::Object(map) => Some(Value::Object(map)),
        }
    }
}

impl From<Vec<Value>> for Params {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Self::Object(map)
    }
}

impl Serialize for Params {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::None => serializer.serialize_none(),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Params {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::Null => Ok(Self::None),
            Value::Array(items) => Ok(Self::Array(items)),
            Value::Object(map) => Ok(Self::Object(map)),
            other => Err(serde::de::Error::custom(format!(
                "params must be an array or object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

/// Short name of a JSON value's type, used in error messages.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
