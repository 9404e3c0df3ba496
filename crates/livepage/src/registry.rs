//! Bidirectional path ⇄ node index.
//!
//! A pure lookup index between server-assigned [`NodePath`]s and arena
//! [`NodeId`]s. It never owns nodes and never recurses into the tree on
//! removal; purging descendants is the caller's responsibility (and is
//! deliberately not done on REMOVE).

use std::collections::HashMap;

use livepage_path::NodePath;

use crate::dom::{NodeId, Tree};

#[derive(Debug, Default)]
pub struct NodeRegistry {
    by_path: HashMap<NodePath, NodeId>,
    by_id: HashMap<NodeId, NodePath>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &NodePath) -> Option<NodeId> {
        self.by_path.get(path).copied()
    }

    pub fn path_of(&self, id: NodeId) -> Option<&NodePath> {
        self.by_id.get(&id)
    }

    /// Inserts or replaces the entry for `path`. A replaced node's
    /// reverse mapping is dropped so each direction stays one-to-one.
    pub fn set(&mut self, path: NodePath, id: NodeId) {
        if let Some(old) = self.by_path.insert(path.clone(), id) {
            self.by_id.remove(&old);
        }
        if let Some(old_path) = self.by_id.insert(id, path) {
            self.by_path.remove(&old_path);
        }
    }

    pub fn remove(&mut self, path: &NodePath) -> Option<NodeId> {
        let id = self.by_path.remove(path)?;
        self.by_id.remove(&id);
        Some(id)
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    /// Re-seeds the index with a full walk of the tree: the root maps to
    /// the root sentinel path and each child to `parent_path_i` with a
    /// 1-based sibling index. Run once at connect time.
    pub fn seed(&mut self, tree: &Tree) {
        self.by_path.clear();
        self.by_id.clear();
        self.set(NodePath::root(), tree.root());
        let mut pending = vec![(NodePath::root(), tree.root())];
        while let Some((path, id)) = pending.pop() {
            for (i, &child) in tree.children(id).iter().enumerate() {
                let child_path = path.child((i + 1) as u32);
                self.set(child_path.clone(), child);
                pending.push((child_path, child));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_walks_whole_tree() {
        let mut tree = Tree::new("body");
        let root = tree.root();
        let a = tree.alloc_element(None, "div");
        let b = tree.alloc_element(None, "span");
        let a1 = tree.alloc_text("hi");
        tree.append_child(root, a);
        tree.append_child(root, b);
        tree.append_child(a, a1);

        let mut registry = NodeRegistry::new();
        registry.seed(&tree);

        assert_eq!(registry.get(&NodePath::root()), Some(root));
        assert_eq!(registry.get(&NodePath::parse("1_1").unwrap()), Some(a));
        assert_eq!(registry.get(&NodePath::parse("1_2").unwrap()), Some(b));
        assert_eq!(registry.get(&NodePath::parse("1_1_1").unwrap()), Some(a1));
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn set_replaces_both_directions() {
        let mut tree = Tree::new("body");
        let a = tree.alloc_element(None, "div");
        let b = tree.alloc_element(None, "span");
        let path = NodePath::parse("1_1").unwrap();

        let mut registry = NodeRegistry::new();
        registry.set(path.clone(), a);
        registry.set(path.clone(), b);

        assert_eq!(registry.get(&path), Some(b));
        assert_eq!(registry.path_of(a), None);
        assert_eq!(registry.path_of(b), Some(&path));
    }

    #[test]
    fn remove_is_not_recursive() {
        let mut tree = Tree::new("body");
        let a = tree.alloc_element(None, "div");
        let a1 = tree.alloc_element(None, "span");
        let parent = NodePath::parse("1_1").unwrap();
        let child = NodePath::parse("1_1_1").unwrap();

        let mut registry = NodeRegistry::new();
        registry.set(parent.clone(), a);
        registry.set(child.clone(), a1);
        registry.remove(&parent);

        assert_eq!(registry.get(&parent), None);
        assert_eq!(registry.get(&child), Some(a1));
    }
}
