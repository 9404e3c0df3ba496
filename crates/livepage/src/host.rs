//! External collaborator seams.
//!
//! The runtime owns the tree, the registry, and the protocol state; the
//! host owns everything with real side effects — navigation, code
//! execution, file transfer, stylesheet reloads — plus durable storage
//! for the protocol-debug flag. Both are passed to
//! [`crate::runtime::LivePage::new`] explicitly; there is no process-wide
//! singleton.

use indexmap::IndexMap;
use livepage_path::NodePath;
use serde_json::Value;

use crate::error::ClientError;
use crate::protocol::LocationKind;

/// Current navigation state as reported by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub hash: String,
    pub search: String,
}

/// Outcome of starting externally supplied code.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalOutcome {
    /// Completed synchronously with a value.
    Value(Value),
    /// Threw synchronously; the string representation of the error.
    Error(String),
    /// Result is promise-like; the host settles it later through
    /// [`crate::runtime::LivePage::complete_eval`].
    Pending,
}

/// Host I/O primitives invoked by the dispatch loop.
///
/// Implementations must not call back into the runtime re-entrantly;
/// asynchronous completions go through the runtime's explicit
/// completion methods on the same logical thread.
pub trait HostIo {
    fn location(&self) -> Location;

    fn set_location(&mut self, kind: LocationKind, value: &str);

    /// Moves input focus to the node registered at `path`. Invoked from
    /// the deferred-task queue, never during batch application.
    fn focus(&mut self, path: &NodePath);

    /// Re-requests every stylesheet with a cache-busting parameter.
    fn reload_css(&mut self);

    /// Starts externally supplied code. `descriptor` correlates a
    /// pending settlement with its response frame.
    fn eval(&mut self, descriptor: &str, code: &str) -> EvalOutcome;

    /// Reads a named field of the top-level host object.
    fn window_property(&self, name: &str) -> Option<Value>;

    /// Assigns a named field of the top-level host object.
    fn set_window_property(&mut self, name: &str, value: &Value);

    fn upload_form(
        &mut self,
        path: &NodePath,
        descriptor: &str,
        fields: &IndexMap<String, String>,
    ) -> Result<(), ClientError>;

    fn list_files(&mut self, path: &NodePath, descriptor: &str) -> Result<(), ClientError>;

    fn upload_file(
        &mut self,
        path: &NodePath,
        descriptor: &str,
        file_name: &str,
    ) -> Result<(), ClientError>;
}

/// Durable key-value storage for the protocol-debug flag. Independent of
/// channel state; survives reconnects.
pub trait DebugStore {
    fn load(&self) -> bool;
    fn store(&mut self, value: bool);
}

/// In-memory [`DebugStore`], for embedders without durable storage.
#[derive(Debug, Default)]
pub struct MemoryDebugStore(bool);

impl DebugStore for MemoryDebugStore {
    fn load(&self) -> bool {
        self.0
    }

    fn store(&mut self, value: bool) {
        self.0 = value;
    }
}
