use crate::model::{GraphState, NodeId};
use slint::SharedString;

/// Tracks the single selected node.
#[derive(Debug, Default, Clone)]
pub struct SelectionManager {
    selected: Option<NodeId>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `id` selected (the editor opens with the root selected).
    pub fn with_selected(id: NodeId) -> Self {
        Self { selected: Some(id) }
    }

    /// Select `id`, replacing any previous selection. Returns false if unchanged.
    pub fn select(&mut self, id: NodeId) -> bool {
        if self.selected.as_ref() == Some(&id) {
            return false;
        }
        self.selected = Some(id);
        true
    }

    /// Clear the current selection
    pub fn clear(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&NodeId> {
        self.selected.as_ref()
    }

    /// Check if an ID is selected
    pub fn contains(&self, id: &NodeId) -> bool {
        self.selected.as_ref() == Some(id)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_none()
    }

    /// Drop the selection if its node no longer exists. Returns true if it was dropped.
    pub fn prune(&mut self, state: &GraphState) -> bool {
        match &self.selected {
            Some(id) if !state.contains(id) => {
                tracing::debug!("selected node {} disappeared, clearing selection", id);
                self.selected = None;
                true
            }
            _ => false,
        }
    }

    /// Selected id for a Slint string property; empty when nothing is selected.
    pub fn to_shared_string(&self) -> SharedString {
        self.selected
            .as_ref()
            .map(|id| SharedString::from(id.as_str()))
            .unwrap_or_default()
    }
}
