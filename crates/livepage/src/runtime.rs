//! The client runtime handle.
//!
//! [`LivePage`] ties the registry, mutation engine, listener table, and
//! generation tracker to the wire protocol. The embedder owns the loop
//! and calls in from one logical thread:
//!
//! - [`LivePage::handle_frame`] for each inbound text frame,
//! - [`LivePage::fire_event`] for host-originated events,
//! - [`LivePage::complete_eval`] when a deferred eval settles,
//! - [`LivePage::tick`] to run due deferred work (heartbeat, focus,
//!   debounce trailing edges),
//! - [`LivePage::drain_outbound`] to hand queued frames to the
//!   transport.
//!
//! All outbound frames pass through one ordered queue, so emission
//! order is deterministic even though completion order is not. A bad
//! frame is logged and skipped; the stream continues.

use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::time::{Duration, Instant};

use livepage_path::NodePath;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::dom::{NodeData, Tree};
use crate::engine;
use crate::events::{
    enrich_event, EventModifier, EventTarget, FireDecision, ListenerEntry, ListenerKey,
};
use crate::generation::{project_event_payload, GenerationTracker};
use crate::host::{DebugStore, EvalOutcome, HostIo};
use crate::protocol::outbound::{
    PROPERTY_BOOLEAN, PROPERTY_ERROR, PROPERTY_NUMBER, PROPERTY_OBJECT, PROPERTY_STRING,
};
use crate::protocol::{decode_frame, encode_callback, Callback, Command, LocationKind};
use crate::registry::NodeRegistry;

/// Configuration consumed by the runtime. The base resource path and
/// session identifier are carried for the upload helpers on the host
/// side; the runtime itself only interprets the heartbeat interval.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    /// Heartbeat period in milliseconds; `<= 0` disables the heartbeat.
    #[serde(default)]
    pub heartbeat_interval_ms: i64,
    #[serde(default)]
    pub base_resource_path: String,
    #[serde(default)]
    pub session_id: String,
}

/// What the embedder should do with the host event it just delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireOutcome {
    /// A listener entry matched the (path, event) key.
    pub matched: bool,
    /// Suppress the default host behavior. Only set when the handler
    /// dispatched synchronously; a deferred dispatch is too late to
    /// cancel anything.
    pub prevent_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Task {
    Heartbeat,
    Focus(NodePath),
    DebounceFire(ListenerKey),
}

#[derive(Debug, PartialEq, Eq)]
struct Timer {
    due: Instant,
    seq: u64,
    task: Task,
}

// Inverted ordering turns the max-heap into an earliest-due-first queue.
impl Ord for Timer {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// The runtime handle. Created by [`LivePage::new`] and passed around
/// explicitly; host interop wraps it at the system boundary if needed.
pub struct LivePage<H: HostIo, S: DebugStore> {
    config: ClientConfig,
    tree: Tree,
    registry: NodeRegistry,
    listeners: HashMap<ListenerKey, ListenerEntry>,
    generations: GenerationTracker,
    outbound: VecDeque<String>,
    timers: BinaryHeap<Timer>,
    timer_seq: u64,
    heartbeat: Option<Duration>,
    host: H,
    debug_store: S,
    debug: bool,
}

impl<H: HostIo, S: DebugStore> LivePage<H, S> {
    /// Builds the runtime around an already-rendered initial tree. The
    /// registry is seeded by a full walk, the protocol-debug flag is
    /// loaded from durable storage, and the heartbeat is armed.
    pub fn new(config: ClientConfig, tree: Tree, host: H, debug_store: S, now: Instant) -> Self {
        let mut registry = NodeRegistry::new();
        registry.seed(&tree);
        let debug = debug_store.load();
        let heartbeat = (config.heartbeat_interval_ms > 0)
            .then(|| Duration::from_millis(config.heartbeat_interval_ms as u64));
        let mut page = LivePage {
            config,
            tree,
            registry,
            listeners: HashMap::new(),
            generations: GenerationTracker::new(),
            outbound: VecDeque::new(),
            timers: BinaryHeap::new(),
            timer_seq: 0,
            heartbeat,
            host,
            debug_store,
            debug,
        };
        if let Some(interval) = page.heartbeat {
            page.schedule(now + interval, Task::Heartbeat);
        }
        page
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn render_num(&self) -> u64 {
        self.generations.current()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn protocol_debug(&self) -> bool {
        self.debug
    }

    /// Toggles verbose frame logging. Persisted immediately; independent
    /// of channel state.
    pub fn set_protocol_debug(&mut self, enabled: bool) {
        self.debug = enabled;
        self.debug_store.store(enabled);
    }

    // ── Inbound ────────────────────────────────────────────────────────

    /// Decodes and dispatches one inbound text frame. Malformed frames
    /// and unknown opcodes are logged and skipped.
    pub fn handle_frame(&mut self, text: &str, now: Instant) {
        if self.debug {
            debug!(frame = text, "->");
        }
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(err) => {
                error!(%err, frame = text, "unparseable frame");
                return;
            }
        };
        match decode_frame(&value) {
            Ok(command) => self.dispatch(command, now),
            Err(err) => error!(%err, frame = text, "dropping frame"),
        }
    }

    fn dispatch(&mut self, command: Command, now: Instant) {
        match command {
            Command::SetRenderNum { render_num } => self.generations.set_render_num(render_num),
            Command::CleanRoot => {
                let root = self.tree.root();
                self.tree.detach_children(root);
            }
            Command::ListenEvent {
                event,
                prevent_default,
                path,
                modifier,
            } => self.listen_event(event, prevent_default, path, modifier),
            Command::ExtractProperty {
                descriptor,
                path,
                property,
            } => self.extract_property(&descriptor, &path, &property),
            Command::ModifyDom { ops } => {
                engine::apply_batch(&mut self.tree, &mut self.registry, &mut self.host, &ops)
            }
            Command::Focus { path } => self.schedule(now, Task::Focus(path)),
            Command::ChangePageUrl { kind, value } => self.change_page_url(kind, &value),
            Command::UploadForm { path, descriptor } => self.upload_form(&path, &descriptor),
            Command::ReloadCss => self.host.reload_css(),
            Command::KeepAlive => {}
            Command::EvalJs { descriptor, code } => self.eval_js(&descriptor, &code),
            Command::ExtractEventData {
                descriptor,
                render_num,
            } => self.extract_event_data(&descriptor, render_num),
            Command::ListFiles { path, descriptor } => {
                if let Err(err) = self.host.list_files(&path, &descriptor) {
                    error!(%err, %path, "file listing failed");
                }
            }
            Command::UploadFile {
                path,
                descriptor,
                file_name,
            } => {
                if let Err(err) = self.host.upload_file(&path, &descriptor, &file_name) {
                    error!(%err, %path, "file upload skipped");
                }
            }
            Command::ResetForm { path } => match self.registry.get(&path) {
                Some(id) => self.tree.reset_form_fields(id),
                None => warn!(%path, "reset of an unregistered form"),
            },
            Command::ForgetEvent { event, path } => self.forget_event(&event, &path),
        }
    }

    // ── Event subscriptions ────────────────────────────────────────────

    fn listen_event(
        &mut self,
        event: String,
        prevent_default: bool,
        path: NodePath,
        modifier: EventModifier,
    ) {
        let target = if path.is_window() {
            EventTarget::Window
        } else {
            match self.registry.get(&path) {
                Some(id) => EventTarget::Node(id),
                None => {
                    warn!(%path, event, "listen on an unregistered node");
                    return;
                }
            }
        };
        let key = ListenerKey {
            path,
            event: event.clone(),
        };
        let entry = ListenerEntry::new(target, event, prevent_default, modifier);
        if self.listeners.insert(key.clone(), entry).is_some() {
            // Duplicate listen without an intervening forget; the new
            // handler replaces the old one so the one-per-key invariant
            // holds.
            warn!(path = %key.path, event = key.event, "replaced existing listener");
        }
    }

    fn forget_event(&mut self, event: &str, path: &NodePath) {
        let key = ListenerKey {
            path: path.clone(),
            event: event.to_string(),
        };
        if self.listeners.remove(&key).is_none() {
            warn!(%path, event, "forget of an unknown listener");
        }
    }

    /// Delivers a host-originated event. Returns whether a listener
    /// matched and whether the host should suppress its default
    /// behavior for this call.
    pub fn fire_event(
        &mut self,
        path: &NodePath,
        event: &str,
        payload: Value,
        now: Instant,
    ) -> FireOutcome {
        let key = ListenerKey {
            path: path.clone(),
            event: event.to_string(),
        };
        let Some(entry) = self.listeners.get_mut(&key) else {
            return FireOutcome {
                matched: false,
                prevent_default: false,
            };
        };
        let prevent_default = entry.prevent_default;
        match entry.decide(now, &payload) {
            FireDecision::Dispatch => {
                self.dispatch_event(&key, payload);
                FireOutcome {
                    matched: true,
                    prevent_default,
                }
            }
            FireDecision::Drop => FireOutcome {
                matched: true,
                prevent_default: false,
            },
            FireDecision::Scheduled(due) => {
                self.schedule(due, Task::DebounceFire(key));
                FireOutcome {
                    matched: true,
                    prevent_default: false,
                }
            }
        }
    }

    fn dispatch_event(&mut self, key: &ListenerKey, payload: Value) {
        self.generations.store_event(payload.clone());
        let generation = self.generations.current();

        let location = (key.event == "popstate").then(|| self.host.location());
        let form_fields = (key.event == "submit")
            .then(|| self.registry.get(&key.path))
            .flatten()
            .map(|id| self.tree.collect_form_fields(id));
        let data = enrich_event(
            &key.event,
            &payload,
            location.as_ref(),
            form_fields.as_ref(),
        );

        let arg = format!("{generation}:{}:{}", key.path, key.event);
        self.push(Callback::DomEvent { arg, payload: data });
    }

    // ── Dispatch-level operations ──────────────────────────────────────

    fn extract_property(&mut self, descriptor: &str, path: &NodePath, property: &str) {
        let (tag, value) = if path.is_window() {
            match self.host.window_property(property) {
                Some(value) => classify_property(value),
                None => property_error(format!("{property} is undefined")),
            }
        } else {
            match self.registry.get(path) {
                None => {
                    warn!(%path, property, "property read on an unregistered node");
                    property_error(format!("{path} is not registered"))
                }
                Some(id) => match self.tree.data(id) {
                    NodeData::Element(el) => el
                        .properties
                        .get(property)
                        .cloned()
                        .or_else(|| {
                            el.attributes
                                .get(&(None, property.to_string()))
                                .map(|s| Value::String(s.clone()))
                        })
                        .map(classify_property)
                        .unwrap_or_else(|| property_error(format!("{property} is undefined"))),
                    NodeData::Text(text) => match property {
                        "textContent" | "data" => classify_property(Value::String(text.clone())),
                        _ => property_error(format!("{property} is undefined")),
                    },
                },
            }
        };
        self.push(Callback::ExtractPropertyResponse {
            arg: format!("{descriptor}:{tag}"),
            payload: value,
        });
    }

    fn change_page_url(&mut self, kind: LocationKind, value: &str) {
        if kind == LocationKind::PushState && value == self.host.location().path {
            return;
        }
        self.host.set_location(kind, value);
    }

    fn upload_form(&mut self, path: &NodePath, descriptor: &str) {
        let Some(id) = self.registry.get(path) else {
            warn!(%path, "upload of an unregistered form");
            return;
        };
        let fields = self.tree.collect_form_fields(id);
        if let Err(err) = self.host.upload_form(path, descriptor, &fields) {
            error!(%err, %path, "form upload failed");
        }
    }

    fn eval_js(&mut self, descriptor: &str, code: &str) {
        match self.host.eval(descriptor, code) {
            EvalOutcome::Value(value) => self.push(Callback::EvalJsResponse {
                arg: format!("{descriptor}:0"),
                payload: Some(value),
            }),
            EvalOutcome::Error(message) => {
                error!(descriptor, message, "eval failed");
                self.push(Callback::EvalJsResponse {
                    arg: format!("{descriptor}:1"),
                    payload: Some(Value::String(message)),
                });
            }
            EvalOutcome::Pending => {}
        }
    }

    /// Settles a deferred eval. Completion order may differ from start
    /// order; the reply still goes out through the ordered queue.
    pub fn complete_eval(&mut self, descriptor: &str, result: Result<Value, String>) {
        match result {
            Ok(value) => self.push(Callback::EvalJsResponse {
                arg: format!("{descriptor}:0"),
                payload: Some(value),
            }),
            Err(message) => {
                error!(descriptor, message, "deferred eval rejected");
                self.push(Callback::EvalJsResponse {
                    arg: format!("{descriptor}:1"),
                    payload: Some(Value::String(message)),
                });
            }
        }
    }

    fn extract_event_data(&mut self, descriptor: &str, render_num: u64) {
        let projected = match self.generations.event_payload(render_num) {
            Some(payload) => project_event_payload(payload),
            None => {
                // Outside the two-generation retention window; reply
                // empty so the correlation id is not left dangling.
                warn!(descriptor, render_num, "event data outside retention window");
                Value::Object(serde_json::Map::new())
            }
        };
        self.push(Callback::ExtractEventDataResponse {
            arg: format!("{descriptor}:{projected}"),
        });
    }

    // ── Host-originated notifications ──────────────────────────────────

    /// Reports a navigation change (history pop) to the server.
    pub fn notify_history_change(&mut self) {
        let location = self.host.location();
        self.push(Callback::History {
            location: format!("{}{}", location.path, location.hash),
        });
    }

    /// Forwards a host-invoked named callback.
    pub fn invoke_custom_callback(&mut self, name: &str, arg: &str) {
        self.push(Callback::CustomCallback {
            arg: format!("{name}:{arg}"),
        });
    }

    // ── Deferred work ──────────────────────────────────────────────────

    fn schedule(&mut self, due: Instant, task: Task) {
        self.timer_seq += 1;
        self.timers.push(Timer {
            due,
            seq: self.timer_seq,
            task,
        });
    }

    /// Runs every deferred task due at `now`: heartbeat emission,
    /// deferred focus, debounce trailing edges.
    pub fn tick(&mut self, now: Instant) {
        while self.timers.peek().is_some_and(|t| t.due <= now) {
            let Some(timer) = self.timers.pop() else { break };
            match timer.task {
                Task::Heartbeat => {
                    self.push(Callback::Heartbeat);
                    if let Some(interval) = self.heartbeat {
                        self.schedule(timer.due + interval, Task::Heartbeat);
                    }
                }
                Task::Focus(path) => match self.registry.get(&path) {
                    Some(_) => self.host.focus(&path),
                    None => warn!(%path, "focus of an unregistered node"),
                },
                Task::DebounceFire(key) => {
                    let due_payload = self
                        .listeners
                        .get_mut(&key)
                        .and_then(|entry| entry.take_due(now));
                    if let Some(payload) = due_payload {
                        self.dispatch_event(&key, payload);
                    }
                }
            }
        }
    }

    // ── Outbound ───────────────────────────────────────────────────────

    fn push(&mut self, callback: Callback) {
        let frame = encode_callback(&callback);
        if self.debug {
            debug!(frame = frame.as_str(), "<-");
        }
        self.outbound.push_back(frame);
    }

    /// Takes every queued outbound frame, in emission order.
    pub fn drain_outbound(&mut self) -> Vec<String> {
        self.outbound.drain(..).collect()
    }

    /// Synchronous, total teardown: cancels the heartbeat and every
    /// pending deferred task, and unbinds every listener entry.
    pub fn destroy(&mut self) {
        self.heartbeat = None;
        self.timers.clear();
        self.listeners.clear();
    }
}

fn classify_property(value: Value) -> (u8, Value) {
    let tag = match &value {
        Value::String(_) => PROPERTY_STRING,
        Value::Number(_) => PROPERTY_NUMBER,
        Value::Bool(_) => PROPERTY_BOOLEAN,
        Value::Object(_) | Value::Array(_) | Value::Null => PROPERTY_OBJECT,
    };
    (tag, value)
}

fn property_error(message: String) -> (u8, Value) {
    (PROPERTY_ERROR, Value::String(message))
}
