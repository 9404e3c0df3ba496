//! Application of DOM mutation batches.
//!
//! A batch is applied strictly in order in a single pass — later
//! operations may depend on nodes created earlier in the same batch, so
//! there is no buffering or reordering. Each operation is O(1) beyond
//! registry access.
//!
//! An operation whose operand path cannot be resolved is skipped with a
//! diagnostic; a bad operation never aborts the rest of the batch.

use livepage_path::NodePath;
use serde_json::Value;
use tracing::warn;

use crate::dom::{json_to_display_string, NodeId, Tree};
use crate::error::ClientError;
use crate::host::HostIo;
use crate::protocol::DomOp;
use crate::registry::NodeRegistry;

/// Applies a mutation batch in order. Failed operations are logged and
/// skipped.
pub fn apply_batch<H: HostIo>(
    tree: &mut Tree,
    registry: &mut NodeRegistry,
    host: &mut H,
    ops: &[DomOp],
) {
    for op in ops {
        if let Err(err) = apply_op(tree, registry, host, op) {
            warn!(%err, ?op, "skipping mutation");
        }
    }
}

fn apply_op<H: HostIo>(
    tree: &mut Tree,
    registry: &mut NodeRegistry,
    host: &mut H,
    op: &DomOp,
) -> Result<(), ClientError> {
    match op {
        DomOp::CreateElement {
            parent,
            child,
            namespace,
            tag,
        } => {
            let new = tree.alloc_element(namespace.clone(), tag);
            attach(tree, registry, parent, child, new)
        }
        DomOp::CreateText {
            parent,
            child,
            text,
        } => {
            let new = tree.alloc_text(text);
            attach(tree, registry, parent, child, new)
        }
        DomOp::Remove { parent, child } => {
            let parent_id = resolve(registry, parent)?;
            let child_id = resolve(registry, child)?;
            if tree.is_child_of(child_id, parent_id) {
                tree.detach(child_id);
            }
            // Descendant entries are deliberately not purged.
            registry.remove(child);
            Ok(())
        }
        DomOp::SetAttr {
            path,
            namespace,
            name,
            value,
            is_property,
        } => {
            if path.is_window() {
                return set_window_attr(host, name, value, *is_property);
            }
            let id = resolve(registry, path)?;
            let el = element_mut(tree, id, path)?;
            if *is_property {
                el.properties.insert(name.clone(), value.clone());
            } else {
                el.attributes.insert(
                    (namespace.clone(), name.clone()),
                    json_to_display_string(value),
                );
            }
            Ok(())
        }
        DomOp::RemoveAttr {
            path,
            namespace,
            name,
            is_property,
        } => {
            let id = resolve(registry, path)?;
            let el = element_mut(tree, id, path)?;
            if *is_property {
                el.properties.shift_remove(name);
            } else {
                el.attributes.shift_remove(&(namespace.clone(), name.clone()));
            }
            Ok(())
        }
        DomOp::SetStyle { path, name, value } => {
            let id = resolve(registry, path)?;
            let el = element_mut(tree, id, path)?;
            el.styles.insert(name.clone(), value.clone());
            Ok(())
        }
        DomOp::RemoveStyle { path, name } => {
            let id = resolve(registry, path)?;
            let el = element_mut(tree, id, path)?;
            el.styles.shift_remove(name);
            Ok(())
        }
    }
}

/// Patch-or-append: if `child_path` already resolves to a node that is
/// still attached under the parent, the new node replaces it in place,
/// preserving the sibling position; otherwise the new node is appended
/// as the last child. The server is the single source of truth for
/// ordering, so no reconciliation happens here.
fn attach(
    tree: &mut Tree,
    registry: &mut NodeRegistry,
    parent_path: &NodePath,
    child_path: &NodePath,
    new: NodeId,
) -> Result<(), ClientError> {
    let parent_id = resolve(registry, parent_path)?;
    let replaced = registry
        .get(child_path)
        .filter(|&old| tree.is_child_of(old, parent_id))
        .map(|old| tree.replace_child(parent_id, old, new))
        .unwrap_or(false);
    if !replaced {
        tree.append_child(parent_id, new);
    }
    registry.set(child_path.clone(), new);
    Ok(())
}

fn resolve(registry: &NodeRegistry, path: &NodePath) -> Result<NodeId, ClientError> {
    registry
        .get(path)
        .ok_or_else(|| ClientError::Resolution(path.clone()))
}

fn element_mut<'a>(
    tree: &'a mut Tree,
    id: NodeId,
    path: &NodePath,
) -> Result<&'a mut crate::dom::Element, ClientError> {
    tree.element_mut(id)
        .ok_or_else(|| ClientError::Protocol(format!("node {path} is not an element")))
}

fn set_window_attr<H: HostIo>(
    host: &mut H,
    name: &str,
    value: &Value,
    is_property: bool,
) -> Result<(), ClientError> {
    if !is_property {
        return Err(ClientError::Protocol(format!(
            "attribute {name:?} set on the window target"
        )));
    }
    host.set_window_property(name, value);
    Ok(())
}
