//! Demo methods served by `wsrpc serve`.

use async_trait::async_trait;
use serde_json::Value;
use wsrpc_core::{ErrorObject, Params};
use wsrpc_server::{MethodHandler, MethodRegistry};

/// `Echo(x)` returns its first positional argument.
pub struct EchoHandler;

#[async_trait]
impl MethodHandler for EchoHandler {
    async fn handle(&self, params: Params) -> Result<Value, ErrorObject> {
        params
            .positional(0)
            .cloned()
            .ok_or_else(|| ErrorObject::invalid_params("Echo takes one positional argument"))
    }
}

/// `Sum(a, b, ...)` adds numbers. Integers stay integers unless they overflow.
pub struct SumHandler;

#[async_trait]
impl MethodHandler for SumHandler {
    async fn handle(&self, params: Params) -> Result<Value, ErrorObject> {
        let Params::Array(items) = params else {
            return Err(ErrorObject::invalid_params("Sum takes positional numbers"));
        };

        let mut ints = Some(0_i64);
        let mut floats = 0.0_f64;
        for item in &items {
            let Value::Number(n) = item else {
                return Err(ErrorObject::invalid_params(format!(
                    "Sum takes numbers, got {}",
                    wsrpc_core::params::json_kind(item)
                )));
            };
            ints = match (ints, n.as_i64()) {
                (Some(acc), Some(v)) => acc.checked_add(v),
                _ => None,
            };
            floats += n.as_f64().unwrap_or_default();
        }

        Ok(match ints {
            Some(total) => Value::from(total),
            None => Value::from(floats),
        })
    }
}

/// `Ping()` returns `"pong"`.
pub struct PingHandler;

#[async_trait]
impl MethodHandler for PingHandler {
    async fn handle(&self, _params: Params) -> Result<Value, ErrorObject> {
        Ok(Value::from("pong"))
    }
}

/// Register every demo method.
pub fn register_all(registry: &mut MethodRegistry) {
    registry.register("Echo", EchoHandler);
    registry.register("Sum", SumHandler);
    registry.register("Ping", PingHandler);
}
