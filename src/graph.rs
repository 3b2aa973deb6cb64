//! Structural queries, pure edits and cross-link validation over a [`GraphState`].
//!
//! Nothing in this module mutates its input: edits return a new state or the
//! [`ValidationError`] explaining why the edit was refused.

use crate::error::ValidationError;
use crate::model::{Edge, GraphState, Node, NodeId, NodeShape};
use crate::view::parse_hex_color;
use indexmap::IndexSet;
use std::collections::HashMap;

// ============================================================================
// Queries
// ============================================================================

/// Nodes whose parent is `id`, in node-map order.
pub fn children_of<'a>(state: &'a GraphState, id: &NodeId) -> Vec<&'a Node> {
    state
        .nodes
        .values()
        .filter(|n| n.parent_id.as_ref() == Some(id))
        .collect()
}

/// Parent -> children index over the whole map, built in one pass.
pub(crate) fn child_index(state: &GraphState) -> HashMap<&NodeId, Vec<&NodeId>> {
    let mut index: HashMap<&NodeId, Vec<&NodeId>> = HashMap::new();
    for node in state.nodes.values() {
        if let Some(parent) = &node.parent_id {
            index.entry(parent).or_default().push(&node.id);
        }
    }
    index
}

/// `id` and every descendant reachable through the parent relation.
///
/// Iterative with a visited set, so a corrupt parent cycle terminates. The
/// starting id is always included even if it is not in the map.
pub fn subtree_ids(state: &GraphState, id: &NodeId) -> IndexSet<NodeId> {
    let index = child_index(state);
    let mut out = IndexSet::new();
    let mut stack = vec![id.clone()];

    while let Some(current) = stack.pop() {
        if !out.insert(current.clone()) {
            continue;
        }
        if let Some(children) = index.get(&current) {
            stack.extend(children.iter().rev().map(|&c| c.clone()));
        }
    }
    out
}

/// True iff making `parent` the parent of `child` would make a node its own ancestor.
pub fn would_create_cycle(state: &GraphState, child: &NodeId, parent: &NodeId) -> bool {
    subtree_ids(state, child).contains(parent)
}

/// Implicit `parent -> child` edges derived from `parent_id` fields.
///
/// Parents missing from the map are skipped.
pub fn compute_tree_edges(state: &GraphState) -> Vec<Edge> {
    state
        .nodes
        .values()
        .filter_map(|n| {
            let parent = n.parent_id.as_ref()?;
            state
                .contains(parent)
                .then(|| Edge::tree(parent.clone(), n.id.clone()))
        })
        .collect()
}

/// Ancestors of `id`, nearest first. Stops at a dangling parent or a repeat.
pub fn ancestors<'a>(state: &'a GraphState, id: &NodeId) -> Vec<&'a Node> {
    let mut out: Vec<&Node> = Vec::new();
    let mut seen: IndexSet<&NodeId> = IndexSet::new();
    seen.insert(id);

    let mut current = state.node(id).and_then(|n| n.parent_id.as_ref());
    while let Some(pid) = current {
        if !seen.insert(pid) {
            break;
        }
        match state.node(pid) {
            Some(parent) => {
                out.push(parent);
                current = parent.parent_id.as_ref();
            }
            None => break,
        }
    }
    out
}

/// Number of ancestor hops from `id` to the top of its tree.
pub fn depth_of(state: &GraphState, id: &NodeId) -> usize {
    ancestors(state, id).len()
}

// ============================================================================
// Edits
// ============================================================================

/// Text and styling given to freshly created nodes.
pub const NEW_NODE_TEXT: &str = "New node";
pub const NEW_NODE_COLOR: &str = "#e5e7eb";
pub const NEW_CHILD_TEXT: &str = "Child";
pub const NEW_CHILD_COLOR: &str = "#e0e7ff";
/// Horizontal distance between a parent and a freshly added child.
pub const NEW_CHILD_OFFSET_X: f32 = 170.0;

/// Explicit style change request, validated before it is merged into a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StyleUpdate {
    SetColor(String),
    ClearColor,
    SetShape(NodeShape),
}

impl StyleUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            StyleUpdate::SetColor(c) if parse_hex_color(c).is_none() => {
                Err(ValidationError::InvalidColor(c.clone()))
            }
            _ => Ok(()),
        }
    }
}

/// Helper functions for graph edits
pub struct GraphLogic;

impl GraphLogic {
    /// Add a parentless node at the world origin.
    pub fn add_node(state: &GraphState, id: NodeId) -> GraphState {
        let mut next = state.clone();
        let node = Node::new(id.clone(), NEW_NODE_TEXT, 0.0, 0.0)
            .with_color(NEW_NODE_COLOR)
            .with_shape(NodeShape::Rounded);
        next.nodes.insert(id, node);
        next
    }

    /// Add a child to the right of `parent`.
    pub fn add_child(
        state: &GraphState,
        parent: &NodeId,
        id: NodeId,
    ) -> Result<GraphState, ValidationError> {
        let p = state
            .node(parent)
            .ok_or_else(|| ValidationError::NodeNotFound(parent.clone()))?;
        let node = Node::new(id.clone(), NEW_CHILD_TEXT, p.x + NEW_CHILD_OFFSET_X, p.y)
            .with_parent(parent.clone())
            .with_color(NEW_CHILD_COLOR)
            .with_shape(NodeShape::Rounded);
        let mut next = state.clone();
        next.nodes.insert(id, node);
        Ok(next)
    }

    /// Remove `id` with its whole subtree and every cross-link touching it.
    pub fn delete_subtree(state: &GraphState, id: &NodeId) -> Result<GraphState, ValidationError> {
        if *id == state.root_id {
            return Err(ValidationError::RootLocked);
        }
        if !state.contains(id) {
            return Err(ValidationError::NodeNotFound(id.clone()));
        }
        let doomed = subtree_ids(state, id);
        let mut next = state.clone();
        next.nodes.retain(|nid, _| !doomed.contains(nid));
        next.links
            .retain(|l| !doomed.contains(&l.source) && !doomed.contains(&l.target));
        Ok(next)
    }

    /// Make `parent` the parent of `child`, refusing anything that breaks the tree.
    pub fn reparent(
        state: &GraphState,
        child: &NodeId,
        parent: &NodeId,
    ) -> Result<GraphState, ValidationError> {
        for id in [child, parent] {
            if !state.contains(id) {
                return Err(ValidationError::NodeNotFound(id.clone()));
            }
        }
        if child == parent {
            return Err(ValidationError::SelfParent);
        }
        if would_create_cycle(state, child, parent) {
            return Err(ValidationError::WouldCreateCycle {
                child: child.clone(),
                parent: parent.clone(),
            });
        }
        if *child == state.root_id {
            return Err(ValidationError::RootLocked);
        }
        Ok(Self::with_node(state, child, |n| n.parent_id = Some(parent.clone())))
    }

    /// Append a cross-link after it passes `validator`.
    pub fn connect<V>(
        state: &GraphState,
        source: &NodeId,
        target: &NodeId,
        validator: &V,
    ) -> Result<GraphState, ValidationError>
    where
        V: LinkValidator + ?Sized,
    {
        validate_link(source, target, state, validator).into_result()?;
        let mut next = state.clone();
        next.links.push(Edge::link(source.clone(), target.clone()));
        Ok(next)
    }

    pub fn commit_text(
        state: &GraphState,
        id: &NodeId,
        text: &str,
    ) -> Result<GraphState, ValidationError> {
        Self::require(state, id)?;
        Ok(Self::with_node(state, id, |n| n.text = text.to_owned()))
    }

    pub fn toggle_collapse(state: &GraphState, id: &NodeId) -> Result<GraphState, ValidationError> {
        Self::require(state, id)?;
        Ok(Self::with_node(state, id, |n| n.collapsed = Some(!n.is_collapsed())))
    }

    pub fn move_node(
        state: &GraphState,
        id: &NodeId,
        x: f32,
        y: f32,
    ) -> Result<GraphState, ValidationError> {
        Self::require(state, id)?;
        Ok(Self::with_node(state, id, |n| {
            n.x = x;
            n.y = y;
        }))
    }

    pub fn apply_style(
        state: &GraphState,
        id: &NodeId,
        update: &StyleUpdate,
    ) -> Result<GraphState, ValidationError> {
        Self::require(state, id)?;
        update.validate()?;
        Ok(Self::with_node(state, id, |n| match update {
            StyleUpdate::SetColor(c) => n.color = Some(c.to_ascii_lowercase()),
            StyleUpdate::ClearColor => n.color = None,
            StyleUpdate::SetShape(s) => n.shape = Some(*s),
        }))
    }

    fn require(state: &GraphState, id: &NodeId) -> Result<(), ValidationError> {
        if state.contains(id) {
            Ok(())
        } else {
            Err(ValidationError::NodeNotFound(id.clone()))
        }
    }

    fn with_node(state: &GraphState, id: &NodeId, f: impl FnOnce(&mut Node)) -> GraphState {
        let mut next = state.clone();
        if let Some(node) = next.nodes.get_mut(id) {
            f(node);
        }
        next
    }

    /// Check if a link with the given direction already exists
    pub fn duplicate_link_exists(state: &GraphState, source: &NodeId, target: &NodeId) -> bool {
        state
            .links
            .iter()
            .any(|l| &l.source == source && &l.target == target)
    }
}

// ============================================================================
// Link Validation Framework
// ============================================================================

/// Result of link validation with optional rejection reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Link is valid
    Valid,
    /// Link is invalid with a reason
    Invalid(ValidationError),
}

impl ValidationResult {
    /// Check if the result is valid
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// Combine two results (AND logic): returns first error if any
    pub fn and(self, other: ValidationResult) -> ValidationResult {
        match self {
            ValidationResult::Valid => other,
            invalid => invalid,
        }
    }

    pub fn into_result(self) -> Result<(), ValidationError> {
        match self {
            ValidationResult::Valid => Ok(()),
            ValidationResult::Invalid(e) => Err(e),
        }
    }
}

/// Rule deciding whether a cross-link between two nodes may be created.
///
/// Compose rules with [`CompositeValidator`]; [`default_link_validator`]
/// gives the policy the controller uses.
pub trait LinkValidator {
    fn validate(&self, source: &NodeId, target: &NodeId, state: &GraphState) -> ValidationResult;
}

/// Both endpoints must be present in the node map.
#[derive(Clone, Copy, Debug, Default)]
pub struct EndpointsExistValidator;

impl LinkValidator for EndpointsExistValidator {
    fn validate(&self, source: &NodeId, target: &NodeId, state: &GraphState) -> ValidationResult {
        for id in [source, target] {
            if !state.contains(id) {
                return ValidationResult::Invalid(ValidationError::NodeNotFound(id.clone()));
            }
        }
        ValidationResult::Valid
    }
}

/// Rejects `source == target`.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSelfLinkValidator;

impl LinkValidator for NoSelfLinkValidator {
    fn validate(&self, source: &NodeId, target: &NodeId, _state: &GraphState) -> ValidationResult {
        if source == target {
            ValidationResult::Invalid(ValidationError::SelfLink)
        } else {
            ValidationResult::Valid
        }
    }
}

/// Rejects a second link for the same ordered pair.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDuplicatesValidator;

impl LinkValidator for NoDuplicatesValidator {
    fn validate(&self, source: &NodeId, target: &NodeId, state: &GraphState) -> ValidationResult {
        if GraphLogic::duplicate_link_exists(state, source, target) {
            ValidationResult::Invalid(ValidationError::DuplicateLink)
        } else {
            ValidationResult::Valid
        }
    }
}

/// Composite validator that combines multiple validators
///
/// All validators must return Valid for the link to be valid (AND logic).
/// Returns the first error encountered.
#[derive(Default)]
pub struct CompositeValidator {
    validators: Vec<Box<dyn LinkValidator>>,
}

impl CompositeValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validators are checked in the order they were added.
    pub fn add<V: LinkValidator + 'static>(mut self, validator: V) -> Self {
        self.validators.push(Box::new(validator));
        self
    }
}

impl LinkValidator for CompositeValidator {
    fn validate(&self, source: &NodeId, target: &NodeId, state: &GraphState) -> ValidationResult {
        for v in &self.validators {
            let result = v.validate(source, target, state);
            if !result.is_valid() {
                return result;
            }
        }
        ValidationResult::Valid
    }
}

/// Existing endpoints, no self-links, no duplicate ordered pairs.
pub fn default_link_validator() -> CompositeValidator {
    CompositeValidator::new()
        .add(EndpointsExistValidator)
        .add(NoSelfLinkValidator)
        .add(NoDuplicatesValidator)
}

/// Convenience function to validate a link with any validator
pub fn validate_link<V>(
    source: &NodeId,
    target: &NodeId,
    state: &GraphState,
    validator: &V,
) -> ValidationResult
where
    V: LinkValidator + ?Sized,
{
    validator.validate(source, target, state)
}

// ============================================================================
// Tests
// ============================================================================
