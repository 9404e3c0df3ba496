//! Arena-backed node tree.
//!
//! Nodes live in a caller-owned slot vector and all "pointers" are
//! [`NodeId`] indices, never references. Slots are never reused: removing
//! a node detaches it from its parent but keeps the slot, so a stale
//! `NodeId` held elsewhere (for example by a registry entry that was
//! never purged) can only ever resolve to the node it was issued for.
//!
//! Attribute, live-property, and style maps are ordered so that form
//! collection and test assertions are deterministic.

use indexmap::IndexMap;
use serde_json::Value;

/// Index of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Key of a (possibly namespaced) attribute.
pub type AttrKey = (Option<String>, String);

#[derive(Debug, Clone, Default)]
pub struct Element {
    pub namespace: Option<String>,
    pub tag: String,
    pub attributes: IndexMap<AttrKey, String>,
    /// Live properties, assigned directly instead of through the
    /// attribute map. Some host properties are not faithfully
    /// round-tripped through attributes, hence the separate map.
    pub properties: IndexMap<String, Value>,
    pub styles: IndexMap<String, String>,
}

#[derive(Debug, Clone)]
pub enum NodeData {
    Element(Element),
    Text(String),
}

#[derive(Debug)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// The rendered tree. Owns every node; lookups go through [`NodeId`].
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Tree {
    /// Creates a tree holding only the root container element.
    pub fn new(root_tag: &str) -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            data: NodeData::Element(Element {
                tag: root_tag.to_string(),
                ..Element::default()
            }),
        };
        Tree {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    pub fn alloc_element(&mut self, namespace: Option<String>, tag: &str) -> NodeId {
        self.alloc(NodeData::Element(Element {
            namespace,
            tag: tag.to_string(),
            ..Element::default()
        }))
    }

    pub fn alloc_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::Text(text.to_string()))
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()].data
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.index()].data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.index()].data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    /// Appends `child` as the last child of `parent`, detaching it from
    /// any previous parent first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[parent.index()].children.push(child);
        self.nodes[child.index()].parent = Some(parent);
    }

    /// Replaces `old` with `new` in place, preserving the sibling
    /// position. Returns false when `old` is not a child of `parent`.
    pub fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> bool {
        let Some(pos) = self.nodes[parent.index()]
            .children
            .iter()
            .position(|&c| c == old)
        else {
            return false;
        };
        self.detach(new);
        self.nodes[parent.index()].children[pos] = new;
        self.nodes[old.index()].parent = None;
        self.nodes[new.index()].parent = Some(parent);
        true
    }

    /// Detaches `id` from its parent, if any. The slot is kept.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.index()].parent.take() {
            self.nodes[parent.index()].children.retain(|&c| c != id);
        }
    }

    /// Detaches every child of `id`.
    pub fn detach_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.index()].children);
        for child in children {
            self.nodes[child.index()].parent = None;
        }
    }

    /// True if `child` is currently attached directly under `parent`.
    pub fn is_child_of(&self, child: NodeId, parent: NodeId) -> bool {
        self.nodes[child.index()].parent == Some(parent)
    }

    /// Collects `name` → `value` pairs from form controls in the subtree
    /// rooted at `form` (inclusive). A control is any element with a
    /// `name` attribute or live property; its value is the live `value`
    /// property if set, otherwise the `value` attribute, otherwise empty.
    pub fn collect_form_fields(&self, form: NodeId) -> IndexMap<String, String> {
        let mut fields = IndexMap::new();
        self.collect_form_fields_into(form, &mut fields);
        fields
    }

    fn collect_form_fields_into(&self, id: NodeId, fields: &mut IndexMap<String, String>) {
        if let NodeData::Element(el) = &self.nodes[id.index()].data {
            let name = el
                .properties
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| el.attributes.get(&(None, "name".to_string())).cloned());
            if let Some(name) = name {
                let value = el
                    .properties
                    .get("value")
                    .map(json_to_display_string)
                    .or_else(|| el.attributes.get(&(None, "value".to_string())).cloned())
                    .unwrap_or_default();
                fields.insert(name, value);
            }
        }
        for &child in &self.nodes[id.index()].children {
            self.collect_form_fields_into(child, fields);
        }
    }

    /// Clears the live `value` property of every form control in the
    /// subtree rooted at `form`, restoring attribute-declared defaults.
    pub fn reset_form_fields(&mut self, form: NodeId) {
        if let NodeData::Element(el) = &mut self.nodes[form.index()].data {
            el.properties.shift_remove("value");
        }
        let children = self.nodes[form.index()].children.clone();
        for child in children {
            self.reset_form_fields(child);
        }
    }
}

/// Renders a JSON value the way it would read as a form field value.
pub fn json_to_display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn append_and_replace_preserve_positions() {
        let mut tree = Tree::new("body");
        let root = tree.root();
        let a = tree.alloc_element(None, "div");
        let b = tree.alloc_element(None, "span");
        let c = tree.alloc_element(None, "p");
        tree.append_child(root, a);
        tree.append_child(root, b);
        assert_eq!(tree.children(root), &[a, b]);

        assert!(tree.replace_child(root, a, c));
        assert_eq!(tree.children(root), &[c, b]);
        assert_eq!(tree.parent(a), None);
        assert_eq!(tree.parent(c), Some(root));
    }

    #[test]
    fn replace_missing_child_is_rejected() {
        let mut tree = Tree::new("body");
        let root = tree.root();
        let a = tree.alloc_element(None, "div");
        let b = tree.alloc_element(None, "span");
        assert!(!tree.replace_child(root, a, b));
    }

    #[test]
    fn detach_keeps_slot_alive() {
        let mut tree = Tree::new("body");
        let root = tree.root();
        let a = tree.alloc_element(None, "div");
        tree.append_child(root, a);
        tree.detach(a);
        assert_eq!(tree.parent(a), None);
        assert!(tree.element(a).is_some());
    }

    #[test]
    fn form_fields_prefer_live_value_property() {
        let mut tree = Tree::new("body");
        let root = tree.root();
        let form = tree.alloc_element(None, "form");
        let input = tree.alloc_element(None, "input");
        tree.append_child(root, form);
        tree.append_child(form, input);

        let el = tree.element_mut(input).unwrap();
        el.attributes
            .insert((None, "name".to_string()), "login".to_string());
        el.attributes
            .insert((None, "value".to_string()), "default".to_string());
        el.properties.insert("value".to_string(), json!("typed"));

        let fields = tree.collect_form_fields(form);
        assert_eq!(fields.get("login").map(String::as_str), Some("typed"));

        tree.reset_form_fields(form);
        let fields = tree.collect_form_fields(form);
        assert_eq!(fields.get("login").map(String::as_str), Some("default"));
    }
}
