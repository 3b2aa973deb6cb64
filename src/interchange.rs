//! Import and export of whole maps.
//!
//! * JSON: the same camelCase document the store persists (without the
//!   storage envelope).
//! * Outline: an indented bullet list, typically pasted from a Markdown
//!   file. Two columns (or one tab) per level:
//!
//! ```text
//! - Project
//!   - Research
//!     - [x] Interviews
//!   - Build
//! ```

use crate::error::{ImportError, ImportResult};
use crate::layout::auto_layout_default;
use crate::model::{GraphState, Node, NodeId};
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;

/// Text of the synthetic root created when an outline has several top-level items.
pub const IMPORTED_ROOT_TEXT: &str = "Imported";

/// `- item`, `* item`, `+ item` or `1. item`, with any leading indentation.
static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*+]|\d+\.)\s+(.*)$").expect("bullet pattern"));

/// Task-list checkbox in front of an item's text.
static TASK_BOX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[(?: |x|X)\]\s*").expect("task box pattern"));

/// Parse a JSON map document.
///
/// `nodes` and `rootId` are required, the root must be one of the nodes and
/// every node must be keyed by its own id.
pub fn import_json(text: &str) -> ImportResult<GraphState> {
    let state: GraphState = serde_json::from_str(text)?;
    if !state.contains(&state.root_id) {
        return Err(ImportError::MissingRoot(state.root_id));
    }
    if let Some((key, node)) = state.nodes.iter().find(|(key, node)| **key != node.id) {
        return Err(ImportError::IdMismatch {
            key: key.clone(),
            id: node.id.clone(),
        });
    }
    tracing::info!(
        "imported mindmap JSON with {} nodes and {} links",
        state.len(),
        state.links.len()
    );
    Ok(state)
}

/// Pretty-printed JSON document for `state`.
pub fn export_json(state: &GraphState) -> serde_json::Result<String> {
    serde_json::to_string_pretty(state)
}

/// Indentation level of an outline line: tabs count as two columns.
fn indent_level(line: &str) -> usize {
    let columns: usize = line
        .chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 2 } else { 1 })
        .sum();
    columns / 2
}

/// Build a laid-out map from an indented bullet outline.
///
/// Blank lines, fence markers (```` ``` ````) and lines that are not bullets
/// are ignored, as are bullets with no text. An item indented deeper than
/// its predecessor allows becomes a child of that predecessor. Several
/// top-level items are gathered under a synthetic
/// [`IMPORTED_ROOT_TEXT`] root.
pub fn import_outline(text: &str) -> ImportResult<GraphState> {
    let mut nodes: IndexMap<NodeId, Node> = IndexMap::new();
    let mut stack: Vec<NodeId> = Vec::new();
    let mut roots: Vec<NodeId> = Vec::new();

    for raw in text.lines() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with("```") {
            continue;
        }
        let Some(caps) = BULLET_RE.captures(raw) else {
            continue;
        };
        let body = caps.get(1).map_or("", |m| m.as_str());
        let item = TASK_BOX_RE.replace(body, "");
        let item = item.trim();
        if item.is_empty() {
            continue;
        }

        stack.truncate(indent_level(raw));
        let id = NodeId::generate();
        let mut node = Node::new(id.clone(), item, 0.0, 0.0);
        match stack.last() {
            Some(parent) => node.parent_id = Some(parent.clone()),
            None => roots.push(id.clone()),
        }
        nodes.insert(id.clone(), node);
        stack.push(id);
    }

    let root_id = match roots.as_slice() {
        [] => return Err(ImportError::EmptyOutline),
        [only] => only.clone(),
        _ => {
            let root_id = NodeId::generate();
            for id in &roots {
                if let Some(node) = nodes.get_mut(id) {
                    node.parent_id = Some(root_id.clone());
                }
            }
            nodes.insert(
                root_id.clone(),
                Node::new(root_id.clone(), IMPORTED_ROOT_TEXT, 0.0, 0.0),
            );
            root_id
        }
    };

    tracing::info!("imported outline with {} items", nodes.len());
    let state = GraphState {
        nodes,
        links: Vec::new(),
        root_id,
    };
    Ok(auto_layout_default(&state))
}
