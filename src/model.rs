//! Mind-map data model.
//!
//! A [`GraphState`] is a tree of [`Node`]s linked through `parent_id`, plus a
//! list of stored cross-links ([`Edge`] with [`EdgeKind::Link`]). Tree edges
//! are never stored; see [`crate::graph::compute_tree_edges`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque node identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outline drawn around a node's text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeShape {
    #[default]
    Rounded,
    Rect,
    Ellipse,
    Diamond,
}

/// A labeled point in the map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub text: String,
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
    /// `#rrggbb`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<NodeShape>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<bool>,
}

impl Node {
    /// Create an unstyled, parentless node.
    pub fn new(id: NodeId, text: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            id,
            text: text.into(),
            x,
            y,
            parent_id: None,
            color: None,
            shape: None,
            collapsed: None,
        }
    }

    pub fn with_parent(mut self, parent: NodeId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_shape(mut self, shape: NodeShape) -> Self {
        self.shape = Some(shape);
        self
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed.unwrap_or(false)
    }

    pub fn shape_or_default(&self) -> NodeShape {
        self.shape.unwrap_or_default()
    }
}

/// Distinguishes derived tree edges from stored cross-links.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Tree,
    Link,
}

/// A drawn connection between two nodes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: NodeId,
    pub target: NodeId,
    pub kind: EdgeKind,
}

impl Edge {
    /// New cross-link with a generated `l-` id.
    pub fn link(source: NodeId, target: NodeId) -> Self {
        Self {
            id: format!("l-{}", uuid::Uuid::new_v4().simple()),
            source,
            target,
            kind: EdgeKind::Link,
        }
    }

    /// Derived tree edge `parent -> child`, id `t-<child>`.
    pub fn tree(parent: NodeId, child: NodeId) -> Self {
        Self {
            id: format!("t-{}", child),
            source: parent,
            target: child,
            kind: EdgeKind::Tree,
        }
    }

    pub fn touches(&self, id: &NodeId) -> bool {
        &self.source == id || &self.target == id
    }
}

/// The complete editable map: nodes keyed by id, cross-links, and the root.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphState {
    pub nodes: IndexMap<NodeId, Node>,
    #[serde(default)]
    pub links: Vec<Edge>,
    pub root_id: NodeId,
}

impl GraphState {
    /// A map holding only a root node at the origin.
    pub fn with_root(text: impl Into<String>) -> Self {
        let root_id = NodeId::generate();
        let mut nodes = IndexMap::new();
        nodes.insert(root_id.clone(), Node::new(root_id.clone(), text, 0.0, 0.0));
        Self {
            nodes,
            links: Vec::new(),
            root_id,
        }
    }

    /// Root node plus three colored branches, shown when nothing was persisted.
    pub fn demo() -> Self {
        let mut state = Self::with_root("Root idea");
        let root_id = state.root_id.clone();
        if let Some(root) = state.nodes.get_mut(&root_id) {
            root.color = Some("#fde68a".into());
            root.shape = Some(NodeShape::Rounded);
        }
        let branches = [
            ("First branch", -110.0, "#bfdbfe"),
            ("Second branch", 0.0, "#bbf7d0"),
            ("Third branch", 110.0, "#fecaca"),
        ];
        for (text, y, color) in branches {
            let id = NodeId::generate();
            let node = Node::new(id.clone(), text, 200.0, y)
                .with_parent(root_id.clone())
                .with_color(color)
                .with_shape(NodeShape::Rounded);
            state.nodes.insert(id, node);
        }
        state
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn root(&self) -> Option<&Node> {
        self.nodes.get(&self.root_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
