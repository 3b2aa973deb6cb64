//! Layered tree layout.
//!
//! Positions are a pure function of the tree shape: breadth-first depth picks
//! the column, discovery order within a depth picks the row. Previous
//! coordinates never influence the result, which makes the layout idempotent.

use crate::graph::child_index;
use crate::model::{GraphState, NodeId};
use indexmap::IndexSet;
use std::collections::VecDeque;

/// Spacing for [`auto_layout`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    /// Horizontal distance between consecutive depths (default: 220.0).
    pub level_gap: f32,
    /// Vertical distance between nodes of the same depth (default: 90.0).
    pub node_gap: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            level_gap: 220.0,
            node_gap: 90.0,
        }
    }
}

/// Group nodes reachable from the root by BFS depth, in discovery order.
pub fn levels(state: &GraphState) -> Vec<Vec<NodeId>> {
    let mut levels: Vec<Vec<NodeId>> = Vec::new();
    if !state.contains(&state.root_id) {
        return levels;
    }

    let index = child_index(state);
    let mut seen: IndexSet<NodeId> = IndexSet::new();
    let mut queue: VecDeque<(NodeId, usize)> = VecDeque::new();
    queue.push_back((state.root_id.clone(), 0));

    while let Some((id, depth)) = queue.pop_front() {
        if !seen.insert(id.clone()) {
            continue;
        }
        if levels.len() <= depth {
            levels.resize_with(depth + 1, Vec::new);
        }
        levels[depth].push(id.clone());
        if let Some(children) = index.get(&id) {
            queue.extend(children.iter().map(|&c| (c.clone(), depth + 1)));
        }
    }
    levels
}

/// Recompute coordinates for every node reachable from the root.
///
/// Node `i` of a level holding `k` nodes at depth `d` lands at
/// `(d * level_gap, -((k - 1) * node_gap) / 2 + i * node_gap)`. Unreached
/// nodes keep their position. A missing root returns the state unchanged.
pub fn auto_layout(state: &GraphState, config: &LayoutConfig) -> GraphState {
    let mut next = state.clone();
    for (depth, ids) in levels(state).iter().enumerate() {
        let total = (ids.len() as f32 - 1.0) * config.node_gap;
        for (i, id) in ids.iter().enumerate() {
            if let Some(node) = next.nodes.get_mut(id) {
                node.x = depth as f32 * config.level_gap;
                node.y = -total / 2.0 + i as f32 * config.node_gap;
            }
        }
    }
    next
}

/// [`auto_layout`] with [`LayoutConfig::default`].
pub fn auto_layout_default(state: &GraphState) -> GraphState {
    auto_layout(state, &LayoutConfig::default())
}
