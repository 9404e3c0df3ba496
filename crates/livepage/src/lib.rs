//! Client-side runtime for server-driven pages.
//!
//! The server holds the application state and streams rendering
//! instructions as compact JSON-array frames; this crate maintains the
//! client's mirror of the page — an arena-backed element tree, a
//! path-to-node registry, an event-subscription table, and a render
//! generation tracker — and encodes the callback frames flowing back.
//!
//! [`LivePage`] is the entry point; the embedder implements
//! [`HostIo`] for everything with real side effects and drives the
//! runtime from a single logical thread.

pub mod dom;
pub mod engine;
pub mod error;
pub mod events;
pub mod generation;
pub mod host;
pub mod protocol;
pub mod registry;
pub mod runtime;

#[cfg(test)]
mod testutil;

pub use dom::{Element, NodeData, NodeId, Tree};
pub use error::ClientError;
pub use events::{EventModifier, EventTarget, ListenerKey};
pub use generation::GenerationTracker;
pub use host::{DebugStore, EvalOutcome, HostIo, Location, MemoryDebugStore};
pub use livepage_path::{NodePath, PathError};
pub use protocol::{decode_frame, encode_callback, Callback, Command, DomOp, LocationKind};
pub use registry::NodeRegistry;
pub use runtime::{ClientConfig, FireOutcome, LivePage};
