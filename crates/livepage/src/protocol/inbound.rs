//! Decoding of inbound opcode frames.
//!
//! A frame is `[opcode, ...operands]`. The opcode selects a [`Command`]
//! variant with fixed fields; MODIFY_DOM consumes the remaining elements
//! as a flattened mutation batch where each [`DomOp`] is a sub-opcode
//! followed by that opcode's fixed-arity operands.
//!
//! Decoding is strict about shape (missing or mistyped operands are a
//! [`ClientError::Protocol`]) but lenient about scalar spelling where the
//! wire historically allowed it (booleans may arrive as `"true"` /
//! `"false"` strings, numbers as numeric strings).

use livepage_path::NodePath;
use serde_json::Value;

use crate::error::ClientError;
use crate::events::EventModifier;

// ── Opcodes ────────────────────────────────────────────────────────────────

pub const SET_RENDER_NUM: u8 = 0;
pub const CLEAN_ROOT: u8 = 1;
pub const LISTEN_EVENT: u8 = 2;
pub const EXTRACT_PROPERTY: u8 = 3;
pub const MODIFY_DOM: u8 = 4;
pub const FOCUS: u8 = 5;
pub const CHANGE_PAGE_URL: u8 = 6;
pub const UPLOAD_FORM: u8 = 7;
pub const RELOAD_CSS: u8 = 8;
pub const KEEP_ALIVE: u8 = 9;
pub const EVAL_JS: u8 = 10;
pub const EXTRACT_EVENT_DATA: u8 = 11;
pub const LIST_FILES: u8 = 12;
pub const UPLOAD_FILE: u8 = 13;
pub const RESET_FORM: u8 = 14;
pub const FORGET_EVENT: u8 = 15;

// MODIFY_DOM sub-opcodes.
pub const DOM_CREATE_ELEMENT: u8 = 0;
pub const DOM_CREATE_TEXT: u8 = 1;
pub const DOM_REMOVE: u8 = 2;
pub const DOM_SET_ATTR: u8 = 3;
pub const DOM_REMOVE_ATTR: u8 = 4;
pub const DOM_SET_STYLE: u8 = 5;
pub const DOM_REMOVE_STYLE: u8 = 6;

// ── Commands ───────────────────────────────────────────────────────────────

/// Sub-kind of a CHANGE_PAGE_URL command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationKind {
    Href,
    Pathname,
    Hash,
    Search,
    PushState,
}

impl LocationKind {
    pub fn from_wire(n: u64) -> Result<Self, ClientError> {
        match n {
            0 => Ok(LocationKind::Href),
            1 => Ok(LocationKind::Pathname),
            2 => Ok(LocationKind::Hash),
            3 => Ok(LocationKind::Search),
            4 => Ok(LocationKind::PushState),
            other => Err(ClientError::Protocol(format!(
                "unknown location kind {other}"
            ))),
        }
    }
}

/// One decoded inbound frame.
#[derive(Debug, Clone)]
pub enum Command {
    SetRenderNum {
        render_num: u64,
    },
    CleanRoot,
    ListenEvent {
        event: String,
        prevent_default: bool,
        path: NodePath,
        modifier: EventModifier,
    },
    ExtractProperty {
        descriptor: String,
        path: NodePath,
        property: String,
    },
    ModifyDom {
        ops: Vec<DomOp>,
    },
    Focus {
        path: NodePath,
    },
    ChangePageUrl {
        kind: LocationKind,
        value: String,
    },
    UploadForm {
        path: NodePath,
        descriptor: String,
    },
    ReloadCss,
    KeepAlive,
    EvalJs {
        descriptor: String,
        code: String,
    },
    ExtractEventData {
        descriptor: String,
        render_num: u64,
    },
    ListFiles {
        path: NodePath,
        descriptor: String,
    },
    UploadFile {
        path: NodePath,
        descriptor: String,
        file_name: String,
    },
    ResetForm {
        path: NodePath,
    },
    ForgetEvent {
        event: String,
        path: NodePath,
    },
}

/// One tree mutation from a MODIFY_DOM batch.
#[derive(Debug, Clone)]
pub enum DomOp {
    CreateElement {
        parent: NodePath,
        child: NodePath,
        namespace: Option<String>,
        tag: String,
    },
    CreateText {
        parent: NodePath,
        child: NodePath,
        text: String,
    },
    Remove {
        parent: NodePath,
        child: NodePath,
    },
    SetAttr {
        path: NodePath,
        namespace: Option<String>,
        name: String,
        value: Value,
        is_property: bool,
    },
    RemoveAttr {
        path: NodePath,
        namespace: Option<String>,
        name: String,
        is_property: bool,
    },
    SetStyle {
        path: NodePath,
        name: String,
        value: String,
    },
    RemoveStyle {
        path: NodePath,
        name: String,
    },
}

// ── Operand access ─────────────────────────────────────────────────────────

fn arr_get<'a>(arr: &'a [Value], idx: usize) -> Result<&'a Value, ClientError> {
    arr.get(idx).ok_or_else(|| {
        ClientError::Protocol(format!("frame too short, missing operand {idx}"))
    })
}

fn as_u64(v: &Value, what: &str) -> Result<u64, ClientError> {
    match v {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| ClientError::Protocol(format!("{what} must be a non-negative integer"))),
        Value::String(s) => s
            .parse::<u64>()
            .map_err(|_| ClientError::Protocol(format!("{what} must be a number"))),
        _ => Err(ClientError::Protocol(format!("{what} must be a number"))),
    }
}

fn as_str<'a>(v: &'a Value, what: &str) -> Result<&'a str, ClientError> {
    v.as_str()
        .ok_or_else(|| ClientError::Protocol(format!("{what} must be a string")))
}

fn as_bool(v: &Value, what: &str) -> Result<bool, ClientError> {
    match v {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s == "true" => Ok(true),
        Value::String(s) if s == "false" => Ok(false),
        _ => Err(ClientError::Protocol(format!("{what} must be a boolean"))),
    }
}

fn as_path(v: &Value, what: &str) -> Result<NodePath, ClientError> {
    NodePath::parse(as_str(v, what)?)
        .map_err(|e| ClientError::Protocol(format!("{what}: {e}")))
}

/// Namespace operand: the number `0` is the "no namespace" sentinel,
/// anything else is a namespace URI string.
fn as_namespace(v: &Value, what: &str) -> Result<Option<String>, ClientError> {
    match v {
        Value::Number(n) if n.as_u64() == Some(0) => Ok(None),
        Value::String(s) if s == "0" => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        _ => Err(ClientError::Protocol(format!(
            "{what} must be 0 or a namespace string"
        ))),
    }
}

// ── Frame decode ───────────────────────────────────────────────────────────

/// Decodes one inbound frame from its parsed JSON form.
pub fn decode_frame(frame: &Value) -> Result<Command, ClientError> {
    let arr = frame
        .as_array()
        .ok_or_else(|| ClientError::Protocol("frame must be an array".into()))?;
    if arr.is_empty() {
        return Err(ClientError::Protocol("frame is empty".into()));
    }
    let opcode = as_u64(&arr[0], "opcode")?;
    if opcode > FORGET_EVENT as u64 {
        return Err(ClientError::Protocol(format!("unknown opcode {opcode}")));
    }

    match opcode as u8 {
        SET_RENDER_NUM => Ok(Command::SetRenderNum {
            render_num: as_u64(arr_get(arr, 1)?, "render number")?,
        }),
        CLEAN_ROOT => Ok(Command::CleanRoot),
        LISTEN_EVENT => Ok(Command::ListenEvent {
            event: as_str(arr_get(arr, 1)?, "event name")?.to_string(),
            prevent_default: as_bool(arr_get(arr, 2)?, "preventDefault")?,
            path: as_path(arr_get(arr, 3)?, "listen path")?,
            modifier: EventModifier::parse(as_str(arr_get(arr, 4)?, "event modifier")?)?,
        }),
        EXTRACT_PROPERTY => Ok(Command::ExtractProperty {
            descriptor: as_str(arr_get(arr, 1)?, "descriptor")?.to_string(),
            path: as_path(arr_get(arr, 2)?, "property path")?,
            property: as_str(arr_get(arr, 3)?, "property name")?.to_string(),
        }),
        MODIFY_DOM => Ok(Command::ModifyDom {
            ops: decode_dom_batch(&arr[1..])?,
        }),
        FOCUS => Ok(Command::Focus {
            path: as_path(arr_get(arr, 1)?, "focus path")?,
        }),
        CHANGE_PAGE_URL => Ok(Command::ChangePageUrl {
            kind: LocationKind::from_wire(as_u64(arr_get(arr, 1)?, "location kind")?)?,
            value: as_str(arr_get(arr, 2)?, "location value")?.to_string(),
        }),
        UPLOAD_FORM => Ok(Command::UploadForm {
            path: as_path(arr_get(arr, 1)?, "form path")?,
            descriptor: as_str(arr_get(arr, 2)?, "descriptor")?.to_string(),
        }),
        RELOAD_CSS => Ok(Command::ReloadCss),
        KEEP_ALIVE => Ok(Command::KeepAlive),
        EVAL_JS => Ok(Command::EvalJs {
            descriptor: as_str(arr_get(arr, 1)?, "descriptor")?.to_string(),
            code: as_str(arr_get(arr, 2)?, "code")?.to_string(),
        }),
        EXTRACT_EVENT_DATA => Ok(Command::ExtractEventData {
            descriptor: as_str(arr_get(arr, 1)?, "descriptor")?.to_string(),
            render_num: as_u64(arr_get(arr, 2)?, "render number")?,
        }),
        LIST_FILES => Ok(Command::ListFiles {
            path: as_path(arr_get(arr, 1)?, "input path")?,
            descriptor: as_str(arr_get(arr, 2)?, "descriptor")?.to_string(),
        }),
        UPLOAD_FILE => Ok(Command::UploadFile {
            path: as_path(arr_get(arr, 1)?, "input path")?,
            descriptor: as_str(arr_get(arr, 2)?, "descriptor")?.to_string(),
            file_name: as_str(arr_get(arr, 3)?, "file name")?.to_string(),
        }),
        RESET_FORM => Ok(Command::ResetForm {
            path: as_path(arr_get(arr, 1)?, "form path")?,
        }),
        FORGET_EVENT => Ok(Command::ForgetEvent {
            event: as_str(arr_get(arr, 1)?, "event name")?.to_string(),
            path: as_path(arr_get(arr, 2)?, "forget path")?,
        }),
        _ => Err(ClientError::Protocol(format!("unknown opcode {opcode}"))),
    }
}

/// Decodes a flattened mutation batch: a sub-opcode followed by that
/// opcode's fixed-arity operands, repeated until the slice is exhausted.
fn decode_dom_batch(operands: &[Value]) -> Result<Vec<DomOp>, ClientError> {
    let mut ops = Vec::new();
    let mut cursor = 0usize;
    while cursor < operands.len() {
        let take = |offset: usize| arr_get(operands, cursor + offset);
        let opcode = as_u64(take(0)?, "mutation opcode")?;
        let (op, arity) = match opcode as u8 {
            DOM_CREATE_ELEMENT => (
                DomOp::CreateElement {
                    parent: as_path(take(1)?, "parent path")?,
                    child: as_path(take(2)?, "child path")?,
                    namespace: as_namespace(take(3)?, "namespace")?,
                    tag: as_str(take(4)?, "tag")?.to_string(),
                },
                5,
            ),
            DOM_CREATE_TEXT => (
                DomOp::CreateText {
                    parent: as_path(take(1)?, "parent path")?,
                    child: as_path(take(2)?, "child path")?,
                    text: as_str(take(3)?, "text")?.to_string(),
                },
                4,
            ),
            DOM_REMOVE => (
                DomOp::Remove {
                    parent: as_path(take(1)?, "parent path")?,
                    child: as_path(take(2)?, "child path")?,
                },
                3,
            ),
            DOM_SET_ATTR => (
                DomOp::SetAttr {
                    path: as_path(take(1)?, "attr path")?,
                    namespace: as_namespace(take(2)?, "namespace")?,
                    name: as_str(take(3)?, "attr name")?.to_string(),
                    value: take(4)?.clone(),
                    is_property: as_bool(take(5)?, "isProperty")?,
                },
                6,
            ),
            DOM_REMOVE_ATTR => (
                DomOp::RemoveAttr {
                    path: as_path(take(1)?, "attr path")?,
                    namespace: as_namespace(take(2)?, "namespace")?,
                    name: as_str(take(3)?, "attr name")?.to_string(),
                    is_property: as_bool(take(4)?, "isProperty")?,
                },
                5,
            ),
            DOM_SET_STYLE => (
                DomOp::SetStyle {
                    path: as_path(take(1)?, "style path")?,
                    name: as_str(take(2)?, "style name")?.to_string(),
                    value: as_str(take(3)?, "style value")?.to_string(),
                },
                4,
            ),
            DOM_REMOVE_STYLE => (
                DomOp::RemoveStyle {
                    path: as_path(take(1)?, "style path")?,
                    name: as_str(take(2)?, "style name")?.to_string(),
                },
                3,
            ),
            other => {
                return Err(ClientError::Protocol(format!(
                    "unknown mutation opcode {other}"
                )))
            }
        };
        ops.push(op);
        cursor += arity;
    }
    Ok(ops)
}
