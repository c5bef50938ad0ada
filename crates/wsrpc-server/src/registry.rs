//! Method registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use wsrpc_core::{ErrorObject, Params};

/// Trait implemented by every RPC method handler.
///
/// An `Err` is a method-level failure: it is written to the caller as the
/// response's error object and does not affect the connection.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    /// Execute the handler with the request's parameters.
    async fn handle(&self, params: Params) -> Result<Value, ErrorObject>;
}

/// Adapter turning a synchronous closure into a [`MethodHandler`].
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F> MethodHandler for FnHandler<F>
where
    F: Fn(Params) -> Result<Value, ErrorObject> + Send + Sync,
{
    async fn handle(&self, params: Params) -> Result<Value, ErrorObject> {
        (self.0)(params)
    }
}

/// Registry mapping method names to handlers.
#[derive(Clone, Default)]
pub struct MethodRegistry {
    handlers: HashMap<String, Arc<dyn MethodHandler>>,
}

impl MethodRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a method name, replacing any previous one.
    pub fn register(&mut self, method: &str, handler: impl MethodHandler + 'static) {
        let _ = self.handlers.insert(method.to_owned(), Arc::new(handler));
    }

    /// Register a synchronous closure.
    pub fn register_fn<F>(&mut self, method: &str, f: F)
    where
        F: Fn(Params) -> Result<Value, ErrorObject> + Send + Sync + 'static,
    {
        self.register(method, FnHandler(f));
    }

    /// Handler registered for `method`.
    pub fn get(&self, method: &str) -> Option<Arc<dyn MethodHandler>> {
        self.handlers.get(method).cloned()
    }

    /// Check whether a method is registered.
    pub fn has_method(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// List all registered method names (sorted).
    pub fn methods(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered methods.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no method is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct EchoHandler;

    #[async_trait]
    impl MethodHandler for EchoHandler {
        async fn handle(&self, params: Params) -> Result<Value, ErrorObject> {
            Ok(params.into_value().unwrap_or(Value::Null))
        }
    }

    #[test]
    fn register_and_lookup() {
        let mut reg = MethodRegistry::new();
        reg.register("echo", EchoHandler);
        assert!(reg.has_method("echo"));
        assert!(!reg.has_method("nope"));
        assert!(reg.get("echo").is_some());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn methods_sorted() {
        let mut reg = MethodRegistry::new();
        reg.register("b.second", EchoHandler);
        reg.register("a.first", EchoHandler);
        reg.register("c.third", EchoHandler);
        assert_eq!(reg.methods(), vec!["a.first", "b.second", "c.third"]);
    }

    #[test]
    fn register_replaces() {
        let mut reg = MethodRegistry::new();
        reg.register("echo", EchoHandler);
        reg.register_fn("echo", |_| Ok(json!("replaced")));
        assert_eq!(reg.len(), 1);
    }

    #[tokio::test]
    async fn fn_handler_runs_closure() {
        let mut reg = MethodRegistry::new();
        reg.register_fn("count", |params| {
            let items: Vec<Value> = params.parse()?;
            Ok(json!(items.len()))
        });
        let handler = reg.get("count").unwrap();
        let out = handler
            .handle(Params::Array(vec![json!(1), json!(2)]))
            .await
            .unwrap();
        assert_eq!(out, json!(2));
    }

    #[tokio::test]
    async fn handler_error_passes_through() {
        let mut reg = MethodRegistry::new();
        reg.register_fn("fail", |_| Err(ErrorObject::new(7, "app failure")));
        let err = reg.get("fail").unwrap().handle(Params::None).await.unwrap_err();
        assert_eq!(err.code, 7);
    }

    #[test]
    fn empty_registry() {
        let reg = MethodRegistry::new();
        assert!(reg.is_empty());
        assert!(reg.methods().is_empty());
    }
}
