//! Event subscriptions and rate-limiting modifiers.
//!
//! The listener table holds exactly one entry per `(path, eventName)`
//! key. Entries are explicit registration tokens — resolved target,
//! stored configuration, modifier state — so removal is precise and
//! verifiable instead of depending on closure identity.
//!
//! Modifier timing is driven by caller-supplied [`Instant`]s; nothing in
//! here reads a clock, which keeps the state machines deterministic
//! under test.

use std::time::{Duration, Instant};

use indexmap::IndexMap;
use livepage_path::NodePath;
use serde_json::{json, Map, Value};

use crate::dom::NodeId;
use crate::error::ClientError;
use crate::host::Location;

// ── Modifier spec ──────────────────────────────────────────────────────────

pub const NO_MODIFIER: u8 = 0;
pub const THROTTLE_MODIFIER: u8 = 1;
pub const DEBOUNCE_MODIFIER: u8 = 2;

/// Parsed rate-limiting modifier, from the wire form `"kind[:param…]"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventModifier {
    None,
    /// Drop calls arriving sooner than `window_ms` after the last
    /// accepted call.
    Throttle { window_ms: u64 },
    /// Delay dispatch until `wait_ms` of silence; with `leading`, fire
    /// on the leading edge of the burst instead of the trailing edge.
    Debounce { wait_ms: u64, leading: bool },
}

impl EventModifier {
    pub fn parse(spec: &str) -> Result<Self, ClientError> {
        let mut parts = spec.split(':');
        let kind = parts
            .next()
            .unwrap_or_default()
            .parse::<u8>()
            .map_err(|_| ClientError::Protocol(format!("bad modifier spec {spec:?}")))?;
        let mut param = |what: &str| -> Result<u64, ClientError> {
            parts
                .next()
                .and_then(|p| p.parse::<u64>().ok())
                .ok_or_else(|| ClientError::Protocol(format!("modifier {spec:?} missing {what}")))
        };
        match kind {
            NO_MODIFIER => Ok(EventModifier::None),
            THROTTLE_MODIFIER => Ok(EventModifier::Throttle {
                window_ms: param("window")?,
            }),
            DEBOUNCE_MODIFIER => {
                let wait_ms = param("wait")?;
                let leading = parts.next() == Some("true");
                Ok(EventModifier::Debounce { wait_ms, leading })
            }
            other => Err(ClientError::Protocol(format!(
                "unknown modifier kind {other}"
            ))),
        }
    }
}

// ── Listener table entries ─────────────────────────────────────────────────

/// Key of a listener entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerKey {
    pub path: NodePath,
    pub event: String,
}

/// Resolved target of a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTarget {
    Window,
    Node(NodeId),
}

/// Per-entry modifier state machine.
#[derive(Debug)]
enum ModifierState {
    None,
    Throttle {
        window: Duration,
        last_accepted: Option<Instant>,
    },
    Debounce {
        wait: Duration,
        leading: bool,
        deadline: Option<Instant>,
        pending: Option<Value>,
    },
}

impl ModifierState {
    fn new(modifier: EventModifier) -> Self {
        match modifier {
            EventModifier::None => ModifierState::None,
            EventModifier::Throttle { window_ms } => ModifierState::Throttle {
                window: Duration::from_millis(window_ms),
                last_accepted: None,
            },
            EventModifier::Debounce { wait_ms, leading } => ModifierState::Debounce {
                wait: Duration::from_millis(wait_ms),
                leading,
                deadline: None,
                pending: None,
            },
        }
    }
}

/// What a fired event should do after passing through the modifier.
#[derive(Debug, Clone, PartialEq)]
pub enum FireDecision {
    /// Dispatch synchronously with the fired payload.
    Dispatch,
    /// Suppressed by the modifier; nothing to emit.
    Drop,
    /// Dispatch deferred to `deadline`; the payload is parked on the
    /// entry until then.
    Scheduled(Instant),
}

/// One bound listener.
#[derive(Debug)]
pub struct ListenerEntry {
    pub target: EventTarget,
    pub event: String,
    pub prevent_default: bool,
    state: ModifierState,
}

impl ListenerEntry {
    pub fn new(
        target: EventTarget,
        event: String,
        prevent_default: bool,
        modifier: EventModifier,
    ) -> Self {
        ListenerEntry {
            target,
            event,
            prevent_default,
            state: ModifierState::new(modifier),
        }
    }

    /// Runs the modifier state machine for a call at `now`.
    pub fn decide(&mut self, now: Instant, payload: &Value) -> FireDecision {
        match &mut self.state {
            ModifierState::None => FireDecision::Dispatch,
            ModifierState::Throttle {
                window,
                last_accepted,
            } => {
                let accept = last_accepted
                    .map(|last| now.duration_since(last) >= *window)
                    .unwrap_or(true);
                if accept {
                    *last_accepted = Some(now);
                    FireDecision::Dispatch
                } else {
                    FireDecision::Drop
                }
            }
            ModifierState::Debounce {
                wait,
                leading,
                deadline,
                pending,
            } => {
                let due = now + *wait;
                if *leading {
                    // The deadline marks the end of the suppression
                    // window; a call past it starts a new burst.
                    let idle = deadline.map(|d| now >= d).unwrap_or(true);
                    *deadline = Some(due);
                    if idle {
                        FireDecision::Dispatch
                    } else {
                        FireDecision::Drop
                    }
                } else {
                    *pending = Some(payload.clone());
                    *deadline = Some(due);
                    FireDecision::Scheduled(due)
                }
            }
        }
    }

    /// Takes the parked payload if a trailing-edge deadline has passed.
    /// Returns `None` when the deadline was pushed forward by a newer
    /// call or when there is nothing pending.
    pub fn take_due(&mut self, now: Instant) -> Option<Value> {
        match &mut self.state {
            ModifierState::Debounce {
                deadline, pending, ..
            } => {
                let due = deadline.map(|d| now >= d).unwrap_or(false);
                if due {
                    *deadline = None;
                    pending.take()
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

// ── Event enrichment ───────────────────────────────────────────────────────

/// Builds the small derived-data object sent with a DOM_EVENT callback.
///
/// Most event types get an empty object; a few carry type-specific
/// fields: a normalized key code for key presses, the current navigation
/// fragments for history pops, the submitted field map for submissions.
pub fn enrich_event(
    event: &str,
    payload: &Value,
    location: Option<&Location>,
    form_fields: Option<&IndexMap<String, String>>,
) -> Value {
    let mut result = Map::new();
    match event {
        "keydown" => {
            if let Some(code) = payload.get("keyCode") {
                let normalized = match code {
                    Value::Number(n) => n.to_string(),
                    Value::String(s) => s.clone(),
                    _ => String::new(),
                };
                result.insert("keyCode".to_string(), json!(normalized));
            }
        }
        "popstate" => {
            if let Some(loc) = location {
                result.insert("path".to_string(), json!(loc.path));
                result.insert("hash".to_string(), json!(loc.hash));
            }
        }
        "submit" => {
            if let Some(fields) = form_fields {
                for (name, value) in fields {
                    result.insert(name.clone(), json!(value));
                }
            }
        }
        _ => {}
    }
    Value::Object(result)
}
