// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Generic object tree.
//!
//! Every element of a package becomes one [`Node`] with the same shape,
//! regardless of what it represents. Nodes live in an [`ObjectTree`] arena
//! and refer to each other through [`NodeId`] indices, so the parent link is
//! a plain index and never an owning pointer.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ingest::IngestWarning;

/// Index of a node inside its [`ObjectTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// One ingested XML element.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Node {
    /// Qualified tag name, e.g. `DTS:Executable`.
    pub kind: String,

    /// Display name from the `ObjectName` property or attribute.
    pub name: Option<String>,

    /// XML attributes in document order, keyed by qualified name.
    pub attributes: IndexMap<String, String>,

    /// Values of nested property and property-expression elements.
    pub properties: IndexMap<String, String>,

    /// Names of the properties whose current value came from a property expression.
    pub expressions: IndexSet<String>,

    /// Text or CDATA carried directly under the element.
    pub content: Option<String>,

    /// Child nodes in document order (property markers excluded).
    pub children: Vec<NodeId>,

    /// Enclosing node, `None` for the root.
    pub parent: Option<NodeId>,
}

impl Node {
    /// Create an empty node of the given kind.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// The local part of the kind, without namespace prefix.
    pub fn local_kind(&self) -> &str {
        local_name(&self.kind)
    }

    /// Look up a value by key: a property first, then an attribute whose
    /// local name matches (so `DataType` finds `DTS:DataType`).
    pub fn lookup(&self, key: &str) -> Option<&str> {
        if let Some(value) = self.properties.get(key) {
            return Some(value.as_str());
        }
        self.attribute_local(key)
    }

    /// Find an attribute by its local name, ignoring the prefix.
    pub fn attribute_local(&self, local: &str) -> Option<&str> {
        if let Some(value) = self.attributes.get(local) {
            return Some(value.as_str());
        }
        self.attributes
            .iter()
            .find(|(name, _)| local_name(name) == local)
            .map(|(_, value)| value.as_str())
    }

    /// Whether the property was bound by a property expression.
    pub fn is_expression(&self, property: &str) -> bool {
        self.expressions.contains(property)
    }
}

/// Strip a `prefix:` from a qualified name.
pub fn local_name(qualified: &str) -> &str {
    match qualified.rsplit_once(':') {
        Some((_, local)) => local,
        None => qualified,
    }
}

/// Arena holding a whole ingested document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectTree {
    nodes: Vec<Node>,
    root: NodeId,
    /// Non-fatal problems found while ingesting.
    pub warnings: Vec<IngestWarning>,
}

impl ObjectTree {
    /// Create a tree whose root is a fresh node of the given kind.
    pub fn with_root(kind: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node::new(kind)],
            root: NodeId(0),
            warnings: Vec::new(),
        }
    }

    /// The root node id.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes (never true for a tree built by `with_root`).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Borrow a node.
    ///
    /// Ids handed out by this tree are always valid; a foreign id falls back
    /// to the root rather than panicking.
    pub fn node(&self, id: NodeId) -> &Node {
        match self.nodes.get(id.0) {
            Some(node) => node,
            None => &self.nodes[self.root.0],
        }
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Append a child node under `parent` and return its id.
    pub fn add_child(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        self.nodes.push(node);
        if let Some(parent_node) = self.node_mut(parent) {
            parent_node.children.push(id);
        }
        id
    }

    /// Children of `id` in document order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.node(id)
            .children
            .iter()
            .map(move |&child| (child, self.node(child)))
    }

    /// Children of `id` whose kind equals `kind`.
    pub fn children_of_kind<'a>(
        &'a self,
        id: NodeId,
        kind: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(id)
            .filter(move |(_, node)| node.kind == kind)
            .map(|(child, _)| child)
    }

    /// First child of `id` with the given kind.
    pub fn first_child_of_kind(&self, id: NodeId, kind: &str) -> Option<NodeId> {
        self.children_of_kind(id, kind).next()
    }

    /// All descendants of `id` in document (pre-)order, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.node(id).children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.node(next).children.iter().rev().copied());
        }
        out
    }

    /// First descendant of `id` with the given local kind (prefix ignored).
    pub fn find_descendant_local(&self, id: NodeId, local: &str) -> Option<NodeId> {
        self.descendants(id)
            .into_iter()
            .find(|&d| self.node(d).local_kind() == local)
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.node(id).parent;
        while let Some(parent) = current {
            out.push(parent);
            current = self.node(parent).parent;
        }
        out
    }

    /// Position of `id` among its parent's children (0 for the root).
    pub fn sibling_index(&self, id: NodeId) -> usize {
        match self.node(id).parent {
            Some(parent) => self
                .node(parent)
                .children
                .iter()
                .position(|&c| c == id)
                .unwrap_or(0),
            None => 0,
        }
    }

    /// Render the tree as nested JSON for inspection.
    pub fn to_json(&self) -> Value {
        self.node_to_json(self.root)
    }

    fn node_to_json(&self, id: NodeId) -> Value {
        let node = self.node(id);
        let mut obj = Map::new();
        obj.insert("kind".to_string(), Value::String(node.kind.clone()));
        if let Some(name) = &node.name {
            obj.insert("name".to_string(), Value::String(name.clone()));
        }
        if !node.attributes.is_empty() {
            obj.insert("attributes".to_string(), string_map(&node.attributes));
        }
        if !node.properties.is_empty() {
            obj.insert("properties".to_string(), string_map(&node.properties));
        }
        if !node.expressions.is_empty() {
            obj.insert(
                "expressions".to_string(),
                Value::Array(
                    node.expressions
                        .iter()
                        .map(|e| Value::String(e.clone()))
                        .collect(),
                ),
            );
        }
        if let Some(content) = &node.content {
            obj.insert("content".to_string(), Value::String(content.clone()));
        }
        if !node.children.is_empty() {
            obj.insert(
                "children".to_string(),
                Value::Array(
                    node.children
                        .iter()
                        .map(|&c| self.node_to_json(c))
                        .collect(),
                ),
            );
        }
        Value::Object(obj)
    }
}

fn string_map(map: &IndexMap<String, String>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> ObjectTree {
        let mut tree = ObjectTree::with_root("DTS:Executable");
        let root = tree.root();
        let vars = tree.add_child(root, Node::new("DTS:Variables"));
        let mut var = Node::new("DTS:Variable");
        var.name = Some("x".to_string());
        tree.add_child(vars, var);
        tree.add_child(root, Node::new("DTS:Executable"));
        tree
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name("DTS:Executable"), "Executable");
        assert_eq!(local_name("Executable"), "Executable");
        assert_eq!(local_name(""), "");
    }

    #[test]
    fn test_lookup_prefers_property_over_attribute() {
        let mut node = Node::new("DTS:Variable");
        node.attributes
            .insert("DTS:DataType".to_string(), "8".to_string());
        assert_eq!(node.lookup("DataType"), Some("8"));

        node.properties.insert("DataType".to_string(), "3".to_string());
        assert_eq!(node.lookup("DataType"), Some("3"));
        assert_eq!(node.lookup("Missing"), None);
    }

    #[test]
    fn test_add_child_sets_parent_and_order() {
        let tree = sample_tree();
        let root = tree.root();
        let kinds: Vec<&str> = tree.children(root).map(|(_, n)| n.kind.as_str()).collect();
        assert_eq!(kinds, vec!["DTS:Variables", "DTS:Executable"]);
        for (child, node) in tree.children(root) {
            assert_eq!(node.parent, Some(root));
            assert_eq!(tree.ancestors(child), vec![root]);
        }
    }

    #[test]
    fn test_descendants_are_preorder() {
        let tree = sample_tree();
        let kinds: Vec<String> = tree
            .descendants(tree.root())
            .into_iter()
            .map(|d| tree.node(d).kind.clone())
            .collect();
        assert_eq!(
            kinds,
            vec!["DTS:Variables", "DTS:Variable", "DTS:Executable"]
        );
    }

    #[test]
    fn test_sibling_index() {
        let tree = sample_tree();
        let ids: Vec<NodeId> = tree.children(tree.root()).map(|(id, _)| id).collect();
        assert_eq!(tree.sibling_index(ids[0]), 0);
        assert_eq!(tree.sibling_index(ids[1]), 1);
        assert_eq!(tree.sibling_index(tree.root()), 0);
    }

    #[test]
    fn test_to_json_nests_children() {
        let tree = sample_tree();
        let json = tree.to_json();
        assert_eq!(json["kind"], "DTS:Executable");
        assert_eq!(json["children"][0]["children"][0]["name"], "x");
    }
}
