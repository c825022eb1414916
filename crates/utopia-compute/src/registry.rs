//! Pre-registered handler table.
//!
//! The source this pool is ported from shipped a function reference as part of
//! the task message, which assumes a runtime that can marshal code across
//! isolated workers. Executors here are instead launched with a static table of
//! handlers keyed by string tag; `submit` sends `{handler_tag, payload}` only.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::ComputeError;

/// A registered computation: synchronous and `Send + Sync` so it can run on
/// whichever executor thread picks up the task.
pub type Handler = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;

/// Immutable table of handlers, shared by every executor in a [`crate::pool::ComputePool`].
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Handler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `tag`, overwriting any previous registration.
    pub fn register<F>(&mut self, tag: impl Into<String>, handler: F)
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.handlers.insert(tag.into(), Arc::new(handler));
    }

    /// Run the handler registered for `tag` against `payload`.
    pub fn dispatch(&self, tag: &str, payload: Value) -> Result<Value, ComputeError> {
        let handler = self
            .handlers
            .get(tag)
            .ok_or_else(|| ComputeError::UnknownHandler(tag.to_string()))?;

        handler(payload).map_err(|message| ComputeError::HandlerFailed(tag.to_string(), message))
    }
}
