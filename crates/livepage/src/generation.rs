//! Render generation tracking and the event payload buffer.
//!
//! The server advances the generation with an explicit command; the
//! buffer keeps raw event payloads for the current and the immediately
//! previous generation only, so a later data-extraction request can
//! still reach the payload of the event that triggered it.

use std::collections::HashMap;

use serde_json::{Map, Value};

#[derive(Debug, Default)]
pub struct GenerationTracker {
    current: u64,
    buffer: HashMap<u64, Value>,
}

impl GenerationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    /// Sets the current generation to `n` and evicts the buffer slot for
    /// generation `n - 2`. Slots `n - 1` and `n` are left intact.
    pub fn set_render_num(&mut self, n: u64) {
        if n >= 2 {
            self.buffer.remove(&(n - 2));
        }
        self.current = n;
    }

    /// Stores a raw event payload at the current generation. Last write
    /// wins when the same generation fires more than once.
    pub fn store_event(&mut self, payload: Value) {
        self.buffer.insert(self.current, payload);
    }

    /// Reads the buffered payload for `generation`. Requests outside the
    /// two-generation retention window come back empty.
    pub fn event_payload(&self, generation: u64) -> Option<&Value> {
        self.buffer.get(&generation)
    }

    #[cfg(test)]
    pub fn buffered_generations(&self) -> usize {
        self.buffer.len()
    }
}

/// Projects a raw event payload to the shape the server may consume:
/// primitive-valued fields are kept, a nested `detail` field is kept
/// as-is, and everything else (handles, nested objects, arrays) is
/// dropped.
pub fn project_event_payload(payload: &Value) -> Value {
    let mut result = Map::new();
    if let Value::Object(fields) = payload {
        for (name, value) in fields {
            match value {
                Value::String(_) | Value::Number(_) | Value::Bool(_) => {
                    result.insert(name.clone(), value.clone());
                }
                Value::Object(_) | Value::Array(_) | Value::Null => {
                    if name == "detail" {
                        result.insert(name.clone(), value.clone());
                    }
                }
            }
        }
    }
    Value::Object(result)
}
