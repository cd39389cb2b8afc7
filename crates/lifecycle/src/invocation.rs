//! One request to fire an event.

use serde_json::{Map, Value};

use crate::machine::Label;

/// Ephemeral value object for a single `fire` call. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation<E: Label> {
    event: E,
    source: Option<String>,
    params: Map<String, Value>,
}

impl<E: Label> Invocation<E> {
    pub fn new(event: E) -> Self {
        Self {
            event,
            source: None,
            params: Map::new(),
        }
    }

    /// Tag recording who/what triggered the event (copied into history).
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn event(&self) -> E {
        self.event
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }

    pub fn param_u64(&self, key: &str) -> Option<u64> {
        self.params.get(key).and_then(Value::as_u64)
    }

    pub fn param_bool(&self, key: &str) -> Option<bool> {
        self.params.get(key).and_then(Value::as_bool)
    }
}

impl<E: Label> From<E> for Invocation<E> {
    fn from(event: E) -> Self {
        Self::new(event)
    }
}
