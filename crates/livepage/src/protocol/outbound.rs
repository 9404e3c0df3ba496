//! Encoding of outbound callback frames.
//!
//! A callback frame is `[kind, argument?, payload?]` serialized to text.
//! The argument is a colon-joined string whose shape depends on the kind:
//!
//! - DOM_EVENT — `"{renderNum}:{path}:{eventName}"`, payload is the
//!   derived event data object
//! - CUSTOM_CALLBACK — `"{name}:{arg}"`
//! - EXTRACT_PROPERTY_RESPONSE — `"{descriptor}:{typeTag}"`, payload is
//!   the value (a diagnostic message for the error tag)
//! - HISTORY — the current location string
//! - EVALJS_RESPONSE — `"{descriptor}:{status}"`, payload is the result
//!   or the error's string representation
//! - EXTRACT_EVENT_DATA_RESPONSE — `"{descriptor}:{dataJson}"`
//! - HEARTBEAT — no argument

use serde_json::{json, Value};

// ── Callback kinds ─────────────────────────────────────────────────────────

pub const DOM_EVENT: u8 = 0;
pub const CUSTOM_CALLBACK: u8 = 1;
pub const EXTRACT_PROPERTY_RESPONSE: u8 = 2;
pub const HISTORY: u8 = 3;
pub const EVALJS_RESPONSE: u8 = 4;
pub const EXTRACT_EVENT_DATA_RESPONSE: u8 = 5;
pub const HEARTBEAT: u8 = 6;

// Property type tags carried in EXTRACT_PROPERTY_RESPONSE.
pub const PROPERTY_STRING: u8 = 0;
pub const PROPERTY_NUMBER: u8 = 1;
pub const PROPERTY_BOOLEAN: u8 = 2;
pub const PROPERTY_OBJECT: u8 = 3;
pub const PROPERTY_ERROR: u8 = 4;

/// One outbound callback frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Callback {
    DomEvent { arg: String, payload: Value },
    CustomCallback { arg: String },
    ExtractPropertyResponse { arg: String, payload: Value },
    History { location: String },
    EvalJsResponse { arg: String, payload: Option<Value> },
    ExtractEventDataResponse { arg: String },
    Heartbeat,
}

impl Callback {
    pub fn kind(&self) -> u8 {
        match self {
            Callback::DomEvent { .. } => DOM_EVENT,
            Callback::CustomCallback { .. } => CUSTOM_CALLBACK,
            Callback::ExtractPropertyResponse { .. } => EXTRACT_PROPERTY_RESPONSE,
            Callback::History { .. } => HISTORY,
            Callback::EvalJsResponse { .. } => EVALJS_RESPONSE,
            Callback::ExtractEventDataResponse { .. } => EXTRACT_EVENT_DATA_RESPONSE,
            Callback::Heartbeat => HEARTBEAT,
        }
    }
}

/// Encodes a callback to its text wire form.
pub fn encode_callback(callback: &Callback) -> String {
    let frame = match callback {
        Callback::DomEvent { arg, payload } => json!([DOM_EVENT, arg, payload]),
        Callback::CustomCallback { arg } => json!([CUSTOM_CALLBACK, arg]),
        Callback::ExtractPropertyResponse { arg, payload } => {
            json!([EXTRACT_PROPERTY_RESPONSE, arg, payload])
        }
        Callback::History { location } => json!([HISTORY, location]),
        Callback::EvalJsResponse { arg, payload } => match payload {
            Some(value) => json!([EVALJS_RESPONSE, arg, value]),
            None => json!([EVALJS_RESPONSE, arg]),
        },
        Callback::ExtractEventDataResponse { arg } => {
            json!([EXTRACT_EVENT_DATA_RESPONSE, arg])
        }
        Callback::Heartbeat => json!([HEARTBEAT]),
    };
    frame.to_string()
}
