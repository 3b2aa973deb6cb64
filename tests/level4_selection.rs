//! Level 4: Selection Tests
//!
//! Tests single-node selection, selection pruning after deletes, and the
//! badges that act on the selection (reparent, collapse).

mod common;

use common::harness::{id, MindMapHarness};
use mindmap_engine::GraphLogic;
use slint::Model;

fn selected_rows(harness: &MindMapHarness) -> Vec<String> {
    let nodes = harness.ctrl.scene().nodes();
    (0..nodes.row_count())
        .filter_map(|i| nodes.row_data(i))
        .filter(|n| n.selected)
        .map(|n| n.id.to_string())
        .collect()
}

// ============================================================================
// Selecting
// ============================================================================

#[test]
fn test_root_selected_initially() {
    let harness = MindMapHarness::new();
    assert_eq!(harness.selected().as_deref(), Some("root"));
    assert_eq!(selected_rows(&harness), vec!["root"]);
}

#[test]
fn test_click_selects_single_node() {
    let harness = MindMapHarness::new();
    harness.click_node("b");
    assert_eq!(harness.selected().as_deref(), Some("b"));

    harness.click_node("c");
    assert_eq!(harness.selected().as_deref(), Some("c"));
    assert_eq!(selected_rows(&harness), vec!["c"]);
}

#[test]
fn test_click_background_clears_selection() {
    let harness = MindMapHarness::new();
    harness.click(500.0, 500.0);
    assert_eq!(harness.selected(), None);
    assert!(selected_rows(&harness).is_empty());
}

#[test]
fn test_selection_does_not_touch_store() {
    let harness = MindMapHarness::new();
    harness.click_node("a");
    harness.click(500.0, 500.0);
    harness.ctrl.select(id("b"));
    assert_eq!(harness.tracker.store_changes(), 0);
}

#[test]
fn test_programmatic_select_updates_scene() {
    let harness = MindMapHarness::new();
    harness.ctrl.select(id("a"));
    assert_eq!(selected_rows(&harness), vec!["a"]);
    harness.ctrl.clear_selection();
    assert!(selected_rows(&harness).is_empty());
}

// ============================================================================
// Pruning
// ============================================================================

#[test]
fn test_delete_clears_selection() {
    let harness = MindMapHarness::new();
    harness.click_node("a");
    harness.ctrl.delete_selected().unwrap();

    assert!(!harness.contains("a"));
    assert_eq!(harness.selected(), None);
}

#[test]
fn test_external_delete_prunes_selection() {
    let harness = MindMapHarness::new();
    harness.click_node("c");

    // Another writer removes the selected node.
    harness
        .store
        .update(|s| GraphLogic::delete_subtree(s, &id("c")).unwrap());

    assert_eq!(harness.selected(), None);
    assert_eq!(harness.ctrl.scene().nodes().row_count(), 3);
}

#[test]
fn test_external_delete_of_other_node_keeps_selection() {
    let harness = MindMapHarness::new();
    harness.click_node("c");
    harness
        .store
        .update(|s| GraphLogic::delete_subtree(s, &id("a")).unwrap());
    assert_eq!(harness.selected().as_deref(), Some("c"));
}

#[test]
fn test_delete_subtree_prunes_descendant_selection() {
    let harness = MindMapHarness::new();
    harness.ctrl.select(id("a"));
    let child = harness.ctrl.add_child().unwrap();
    harness.ctrl.commit_edit().unwrap();
    assert_eq!(harness.selected(), Some(child.to_string()));

    harness.ctrl.select(id("a"));
    harness.ctrl.delete_selected().unwrap();
    assert!(!harness.contains(child.as_str()));
    assert_eq!(harness.selected(), None);
}

// ============================================================================
// Reparent badge
// ============================================================================

#[test]
fn test_reparent_badges_on_other_nodes() {
    let harness = MindMapHarness::new();
    harness.click_node("a");

    let nodes = harness.ctrl.scene().nodes();
    let badges: Vec<String> = (0..nodes.row_count())
        .filter_map(|i| nodes.row_data(i))
        .filter(|n| n.show_reparent_badge)
        .map(|n| n.id.to_string())
        .collect();
    assert_eq!(badges, vec!["root", "b", "c"]);
}

#[test]
fn test_click_reparent_badge_moves_selection_under_node() {
    let harness = MindMapHarness::new();
    harness.click_node("a");

    // b's badge: 60 right of its edge plus the 8px offset.
    harness.click(288.0, 0.0);

    assert_eq!(harness.node("a").parent_id, Some(id("b")));
    // The badge acts without changing the selection.
    assert_eq!(harness.selected().as_deref(), Some("a"));
    assert_eq!(harness.tracker.store_changes(), 1);
}

#[test]
fn test_reparent_badge_rejects_cycle() {
    let harness = MindMapHarness::new();
    harness.click_node("a");
    harness.click(288.0, 0.0);

    // Now try to put b under its new child a.
    harness.click_node("b");
    harness.click(288.0, -90.0);

    assert_eq!(harness.node("b").parent_id, Some(id("root")));
    assert_eq!(harness.node("a").parent_id, Some(id("b")));
}

#[test]
fn test_no_reparent_badges_without_selection() {
    let harness = MindMapHarness::new();
    harness.ctrl.clear_selection();

    // Where b's badge would be is empty canvas, so this starts a pan.
    harness.click(288.0, 0.0);
    assert_eq!(harness.node("a").parent_id, Some(id("root")));
    assert_eq!(harness.tracker.store_changes(), 0);
}

// ============================================================================
// Collapse badge
// ============================================================================

#[test]
fn test_collapse_badge_toggles_and_keeps_selection() {
    let harness = MindMapHarness::new();
    harness.click_node("b");

    // Root is 120 wide; its collapse badge sits 8px left of it.
    harness.click(-68.0, 0.0);

    assert!(harness.node("root").is_collapsed());
    assert_eq!(harness.ctrl.scene().nodes().row_count(), 1);
    // b is hidden, not deleted, so the selection survives.
    assert_eq!(harness.selected().as_deref(), Some("b"));

    harness.click(-68.0, 0.0);
    assert!(!harness.node("root").is_collapsed());
    assert_eq!(harness.ctrl.scene().nodes().row_count(), 4);
}

#[test]
fn test_collapse_badge_only_on_parents() {
    let harness = MindMapHarness::new();
    let nodes = harness.ctrl.scene().nodes();
    let with_badge: Vec<String> = (0..nodes.row_count())
        .filter_map(|i| nodes.row_data(i))
        .filter(|n| n.show_collapse_badge)
        .map(|n| n.id.to_string())
        .collect();
    assert_eq!(with_badge, vec!["root"]);
}
