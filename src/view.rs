//! Derived, render-ready view of a [`GraphState`].
//!
//! Collapse is purely a view concern: hidden nodes stay in the data and
//! reappear unchanged when their ancestor is expanded again.
//! [`SceneModels`] mirrors the view into Slint models; a `.slint` front end
//! binds its own row structs through [`SceneModels::bind_nodes`] and
//! [`SceneModels::bind_edges`].

use crate::graph::{ancestors, child_index, compute_tree_edges};
use crate::hit_test::{parents_with_children, HitContext};
use crate::model::{Edge, EdgeKind, GraphState, Node, NodeId, NodeShape};
use crate::path::edge_path;
use crate::sizing::{display_text, SizingOracle, TextMeasurer};
use crate::transform::Point;
use slint::{Color, Model, ModelRc, SharedString, VecModel};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

/// Fill used when neither the node nor any ancestor has a color.
pub const DEFAULT_FILL: Color = Color::from_rgb_u8(0xff, 0xff, 0xff);
/// Lightening added per ancestor hop when a color is inherited.
pub const LIGHTEN_PER_LEVEL: f32 = 0.12;
pub const MAX_LIGHTEN: f32 = 0.6;

// ============================================================================
// Colors
// ============================================================================

/// Parse `#rrggbb` (case-insensitive).
pub fn parse_hex_color(s: &str) -> Option<Color> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Color::from_rgb_u8(channel(0)?, channel(2)?, channel(4)?))
}

/// Format as lowercase `#rrggbb`, ignoring alpha.
pub fn color_to_hex(color: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red(), color.green(), color.blue())
}

/// Move each channel `amount` of the way towards white.
pub fn lighten(color: Color, amount: f32) -> Color {
    let amount = amount.clamp(0.0, 1.0);
    let mix = |c: u8| {
        let c = c as f32;
        (c + (255.0 - c) * amount).round().clamp(0.0, 255.0) as u8
    };
    Color::from_rgb_u8(mix(color.red()), mix(color.green()), mix(color.blue()))
}

/// Fill color of a node.
///
/// An explicit (valid) color wins. Otherwise the nearest ancestor with a
/// valid color is lightened by `min(0.12 * depth, 0.6)`, where `depth` is
/// the number of hops to that ancestor. Without any, white.
pub fn effective_color(state: &GraphState, id: &NodeId) -> Color {
    let Some(node) = state.node(id) else {
        return DEFAULT_FILL;
    };
    if let Some(c) = node.color.as_deref().and_then(parse_hex_color) {
        return c;
    }
    for (i, ancestor) in ancestors(state, id).iter().enumerate() {
        if let Some(c) = ancestor.color.as_deref().and_then(parse_hex_color) {
            let depth = (i + 1) as f32;
            return lighten(c, (LIGHTEN_PER_LEVEL * depth).min(MAX_LIGHTEN));
        }
    }
    DEFAULT_FILL
}

// ============================================================================
// Visibility
// ============================================================================

/// Ids of nodes that have a collapsed ancestor.
pub fn hidden_ids(state: &GraphState) -> HashSet<NodeId> {
    let index = child_index(state);
    let mut stack: Vec<&NodeId> = state
        .nodes
        .values()
        .filter(|n| n.is_collapsed())
        .filter_map(|n| index.get(&n.id))
        .flatten()
        .copied()
        .collect();
    let mut hidden = HashSet::new();
    while let Some(id) = stack.pop() {
        // Each node is expanded once, so nested collapses and parent cycles stay linear.
        if hidden.insert(id.clone()) {
            if let Some(children) = index.get(id) {
                stack.extend(children.iter().copied());
            }
        }
    }
    hidden
}

/// Nodes to draw, in node-map order.
pub fn visible_nodes(state: &GraphState) -> Vec<&Node> {
    let hidden = hidden_ids(state);
    state.nodes.values().filter(|n| !hidden.contains(&n.id)).collect()
}

/// Tree edges followed by cross-links, limited to visible, existing endpoints.
pub fn visible_edges(state: &GraphState) -> Vec<Edge> {
    let hidden = hidden_ids(state);
    let shown = |id: &NodeId| state.contains(id) && !hidden.contains(id);
    compute_tree_edges(state)
        .into_iter()
        .chain(state.links.iter().cloned())
        .filter(|e| shown(&e.source) && shown(&e.target))
        .collect()
}

// ============================================================================
// Slint models
// ============================================================================

fn shape_name(shape: NodeShape) -> &'static str {
    match shape {
        NodeShape::Rounded => "rounded",
        NodeShape::Rect => "rect",
        NodeShape::Ellipse => "ellipse",
        NodeShape::Diamond => "diamond",
    }
}

/// One drawable node row.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeView {
    pub id: SharedString,
    pub text: SharedString,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub fill: Color,
    pub shape: SharedString,
    pub collapsed: bool,
    pub selected: bool,
    pub show_collapse_badge: bool,
    pub show_reparent_badge: bool,
    pub show_link_handle: bool,
}

/// One drawable edge row.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeView {
    pub id: SharedString,
    pub path: SharedString,
    pub is_link: bool,
}

/// Build the node rows for the current state and interaction context.
pub fn node_views<M: TextMeasurer>(
    state: &GraphState,
    oracle: &SizingOracle<M>,
    ctx: HitContext<'_>,
) -> Vec<NodeView> {
    let parents = parents_with_children(state);
    visible_nodes(state)
        .into_iter()
        .map(|n| {
            let node_box = oracle.node_box(n);
            NodeView {
                id: n.id.as_str().into(),
                text: display_text(n).into(),
                x: n.x,
                y: n.y,
                width: node_box.width,
                height: node_box.height,
                fill: effective_color(state, &n.id),
                shape: shape_name(n.shape_or_default()).into(),
                collapsed: n.is_collapsed(),
                selected: ctx.selected == Some(&n.id),
                show_collapse_badge: parents.contains(&n.id),
                show_reparent_badge: ctx.shows_reparent_badge(&n.id),
                show_link_handle: ctx.shows_link_handle(&n.id),
            }
        })
        .collect()
}

pub fn edge_views(state: &GraphState) -> Vec<EdgeView> {
    visible_edges(state)
        .into_iter()
        .filter_map(|e| {
            let s = state.node(&e.source)?;
            let t = state.node(&e.target)?;
            Some(EdgeView {
                id: e.id.as_str().into(),
                path: edge_path(Point::new(s.x, s.y), Point::new(t.x, t.y)).into(),
                is_link: e.kind == EdgeKind::Link,
            })
        })
        .collect()
}

/// Write `rows` into `model`, touching only rows that changed.
///
/// Returns the indices that were written, in ascending order.
fn sync_rows<T: Clone + PartialEq + 'static>(model: &VecModel<T>, rows: &[T]) -> Vec<usize> {
    let existing = model.row_count();
    let mut changed = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        if i < existing {
            if model.row_data(i).as_ref() != Some(row) {
                model.set_row_data(i, row.clone());
                changed.push(i);
            }
        } else {
            model.push(row.clone());
            changed.push(i);
        }
    }
    for i in (rows.len()..existing).rev() {
        model.remove(i);
    }
    changed
}

/// Receives scene rows converted into a front end's own row type.
trait RowSink<T> {
    fn apply(&self, rows: &[T], changed: &[usize]);
}

/// A caller's model plus the function building its rows.
struct BoundModel<P, F> {
    model: Rc<VecModel<P>>,
    constructor: F,
}

impl<T, P, F> RowSink<T> for BoundModel<P, F>
where
    P: Clone + 'static,
    F: Fn(&T) -> P,
{
    fn apply(&self, rows: &[T], changed: &[usize]) {
        for &i in changed {
            let item = (self.constructor)(&rows[i]);
            if i < self.model.row_count() {
                self.model.set_row_data(i, item);
            } else {
                self.model.push(item);
            }
        }
        while self.model.row_count() > rows.len() {
            self.model.remove(self.model.row_count() - 1);
        }
    }
}

type Sinks<T> = Rc<RefCell<Vec<Box<dyn RowSink<T>>>>>;

/// Slint models holding the drawable scene.
///
/// [`nodes`](Self::nodes) and [`edges`](Self::edges) expose the rows as
/// this crate's types. A `.slint` file declares its own structs, so a front
/// end binds its generated models with [`bind_nodes`](Self::bind_nodes) and
/// [`bind_edges`](Self::bind_edges) instead:
///
/// ```ignore
/// let nodes = Rc::new(VecModel::<ui::NodeRow>::default());
/// ctrl.scene().bind_nodes(nodes.clone(), |n| ui::NodeRow {
///     id: n.id.clone(),
///     text: n.text.clone(),
///     x: n.x,
///     y: n.y,
///     ..Default::default()
/// });
/// window.set_nodes(nodes.into());
/// ```
#[derive(Clone)]
pub struct SceneModels {
    nodes: Rc<VecModel<NodeView>>,
    edges: Rc<VecModel<EdgeView>>,
    node_sinks: Sinks<NodeView>,
    edge_sinks: Sinks<EdgeView>,
}

impl Default for SceneModels {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneModels {
    pub fn new() -> Self {
        Self {
            nodes: Rc::new(VecModel::default()),
            edges: Rc::new(VecModel::default()),
            node_sinks: Rc::new(RefCell::new(Vec::new())),
            edge_sinks: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn nodes(&self) -> ModelRc<NodeView> {
        ModelRc::from(self.nodes.clone())
    }

    pub fn edges(&self) -> ModelRc<EdgeView> {
        ModelRc::from(self.edges.clone())
    }

    /// Mirror node rows into `model`, converting each with `constructor`.
    ///
    /// The model is filled right away and kept in sync on every
    /// [`sync`](Self::sync); only changed rows are rebuilt.
    pub fn bind_nodes<P, F>(&self, model: Rc<VecModel<P>>, constructor: F)
    where
        P: Clone + 'static,
        F: Fn(&NodeView) -> P + 'static,
    {
        bind(&self.nodes, &self.node_sinks, model, constructor);
    }

    /// Mirror edge rows into `model`, converting each with `constructor`.
    pub fn bind_edges<P, F>(&self, model: Rc<VecModel<P>>, constructor: F)
    where
        P: Clone + 'static,
        F: Fn(&EdgeView) -> P + 'static,
    {
        bind(&self.edges, &self.edge_sinks, model, constructor);
    }

    /// Bring both models, and every bound model, in line with `state`.
    pub fn sync<M: TextMeasurer>(
        &self,
        state: &GraphState,
        oracle: &SizingOracle<M>,
        ctx: HitContext<'_>,
    ) {
        let nodes = node_views(state, oracle, ctx);
        let changed = sync_rows(&self.nodes, &nodes);
        for sink in self.node_sinks.borrow().iter() {
            sink.apply(&nodes, &changed);
        }

        let edges = edge_views(state);
        let changed = sync_rows(&self.edges, &edges);
        for sink in self.edge_sinks.borrow().iter() {
            sink.apply(&edges, &changed);
        }
    }
}

fn bind<T, P, F>(source: &VecModel<T>, sinks: &Sinks<T>, model: Rc<VecModel<P>>, constructor: F)
where
    T: Clone + 'static,
    P: Clone + 'static,
    F: Fn(&T) -> P + 'static,
{
    let rows: Vec<T> = source.iter().collect();
    let all: Vec<usize> = (0..rows.len()).collect();
    let sink = BoundModel { model, constructor };
    sink.apply(&rows, &all);
    sinks.borrow_mut().push(Box::new(sink));
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    /// r(#ff0000) -> a -> a1 -> a2, r -> b(#00ff00)
    fn setup_state() -> GraphState {
        let mut nodes = IndexMap::new();
        for (id, parent, color) in [
            ("r", None, Some("#ff0000")),
            ("a", Some("r"), None),
            ("a1", Some("a"), None),
            ("a2", Some("a1"), None),
            ("b", Some("r"), Some("#00ff00")),
        ] {
            let mut node = Node::new(id.into(), id, 0.0, 0.0);
            node.parent_id = parent.map(NodeId::from);
            node.color = color.map(str::to_owned);
            nodes.insert(id.into(), node);
        }
        GraphState {
            nodes,
            links: vec![],
            root_id: "r".into(),
        }
    }

    fn ids(nodes: &[&Node]) -> Vec<String> {
        nodes.iter().map(|n| n.id.to_string()).collect()
    }

    // ========================================================================
    // Colors
    // ========================================================================

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#FDE68A"), Some(Color::from_rgb_u8(0xfd, 0xe6, 0x8a)));
        assert_eq!(parse_hex_color("#fde68a"), Some(Color::from_rgb_u8(0xfd, 0xe6, 0x8a)));
        assert_eq!(parse_hex_color("fde68a"), None);
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#gggggg"), None);
        assert_eq!(parse_hex_color("#éééé"), None);
    }

    #[test]
    fn test_lighten() {
        let c = lighten(Color::from_rgb_u8(0, 100, 255), 0.5);
        assert_eq!(color_to_hex(c), "#80b2ff");
        assert_eq!(lighten(Color::from_rgb_u8(10, 20, 30), 0.0), Color::from_rgb_u8(10, 20, 30));
    }

    #[test]
    fn test_effective_color_inherits_and_lightens_by_depth() {
        let state = setup_state();
        assert_eq!(color_to_hex(effective_color(&state, &"r".into())), "#ff0000");
        assert_eq!(color_to_hex(effective_color(&state, &"b".into())), "#00ff00");
        // 1 hop: 255 * 0.12 = 30.6 -> 31
        assert_eq!(color_to_hex(effective_color(&state, &"a".into())), "#ff1f1f");
        // 2 hops: 0.24 -> 61.2 -> 61
        assert_eq!(color_to_hex(effective_color(&state, &"a1".into())), "#ff3d3d");
    }

    #[test]
    fn test_effective_color_lightening_caps() {
        let mut state = setup_state();
        let mut parent = NodeId::from("a2");
        for i in 0..8 {
            let id = NodeId::from(format!("deep{i}"));
            state
                .nodes
                .insert(id.clone(), Node::new(id.clone(), "d", 0.0, 0.0).with_parent(parent));
            parent = id;
        }
        // 11 hops away from r: capped at 0.6 -> 153
        assert_eq!(color_to_hex(effective_color(&state, &parent)), "#ff9999");
    }

    #[test]
    fn test_effective_color_defaults_to_white() {
        let mut state = setup_state();
        state.nodes.get_mut(&NodeId::from("r")).unwrap().color = Some("red".into());
        assert_eq!(effective_color(&state, &"a".into()), DEFAULT_FILL);
        assert_eq!(effective_color(&state, &"missing".into()), DEFAULT_FILL);
    }

    // ========================================================================
    // Visibility
    // ========================================================================

    #[test]
    fn test_everything_visible_without_collapse() {
        let state = setup_state();
        assert_eq!(visible_nodes(&state).len(), 5);
        assert_eq!(visible_edges(&state).len(), 4);
    }

    #[test]
    fn test_collapse_hides_all_descendants_but_not_self() {
        let mut state = setup_state();
        state.nodes.get_mut(&NodeId::from("a")).unwrap().collapsed = Some(true);
        assert_eq!(ids(&visible_nodes(&state)), vec!["r", "a", "b"]);

        let edges = visible_edges(&state);
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|e| e.source != NodeId::from("a")));
        // Data is untouched.
        assert_eq!(state.len(), 5);
    }

    #[test]
    fn test_nested_collapses_hide_each_descendant() {
        let mut state = setup_state();
        for id in ["r", "a", "a1"] {
            state.nodes.get_mut(&NodeId::from(id)).unwrap().collapsed = Some(true);
        }
        let mut hidden: Vec<_> = hidden_ids(&state).into_iter().map(|id| id.to_string()).collect();
        hidden.sort();
        assert_eq!(hidden, vec!["a", "a1", "a2", "b"]);
        assert_eq!(ids(&visible_nodes(&state)), vec!["r"]);
    }

    #[test]
    fn test_collapsed_leaf_hides_nothing() {
        let mut state = setup_state();
        state.nodes.get_mut(&NodeId::from("a2")).unwrap().collapsed = Some(true);
        assert!(hidden_ids(&state).is_empty());
    }

    #[test]
    fn test_links_to_hidden_or_missing_nodes_are_skipped() {
        let mut state = setup_state();
        state.links.push(Edge::link("b".into(), "a2".into()));
        state.links.push(Edge::link("b".into(), "ghost".into()));
        state.links.push(Edge::link("b".into(), "a".into()));
        assert_eq!(visible_edges(&state).len(), 4 + 2);

        state.nodes.get_mut(&NodeId::from("a1")).unwrap().collapsed = Some(true);
        let links: Vec<_> = visible_edges(&state)
            .into_iter()
            .filter(|e| e.kind == EdgeKind::Link)
            .collect();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target, NodeId::from("a"));
    }

    // ========================================================================
    // Slint models
    // ========================================================================

    #[test]
    fn test_node_views_carry_badges_and_selection() {
        let state = setup_state();
        let a: NodeId = "a".into();
        let ctx = HitContext {
            selected: Some(&a),
            connecting: None,
        };
        let rows = node_views(&state, &SizingOracle::default(), ctx);
        let row = |id: &str| rows.iter().find(|r| r.id == id).unwrap();
        assert!(row("a").selected);
        assert!(!row("a").show_reparent_badge);
        assert!(row("b").show_reparent_badge);
        assert!(row("r").show_collapse_badge);
        assert!(!row("a2").show_collapse_badge);
        assert!(!row("b").show_link_handle);
        assert_eq!(row("r").shape, "rounded");
    }

    #[test]
    fn test_scene_models_sync_in_place() {
        let scene = SceneModels::new();
        let oracle = SizingOracle::default();
        let mut state = setup_state();
        scene.sync(&state, &oracle, HitContext::default());
        assert_eq!(scene.nodes().row_count(), 5);
        assert_eq!(scene.edges().row_count(), 4);

        state.nodes.get_mut(&NodeId::from("a")).unwrap().collapsed = Some(true);
        state.nodes.get_mut(&NodeId::from("a")).unwrap().text = "one two three four".into();
        scene.sync(&state, &oracle, HitContext::default());
        assert_eq!(scene.nodes().row_count(), 3);
        assert_eq!(scene.edges().row_count(), 2);
        let a = scene.nodes().row_data(1).unwrap();
        assert_eq!(a.text, "one two three…");
        assert!(a.collapsed);
    }

    /// Stand-in for a struct generated from a `.slint` file.
    #[derive(Clone, Debug, PartialEq)]
    struct UiNode {
        id: SharedString,
        label: SharedString,
        x: f32,
    }

    #[test]
    fn test_bound_models_follow_sync() {
        let scene = SceneModels::new();
        let oracle = SizingOracle::default();
        let mut state = setup_state();
        scene.sync(&state, &oracle, HitContext::default());

        let ui_nodes: Rc<VecModel<UiNode>> = Rc::new(VecModel::default());
        scene.bind_nodes(ui_nodes.clone(), |n| UiNode {
            id: n.id.clone(),
            label: n.text.clone(),
            x: n.x,
        });
        let ui_edges: Rc<VecModel<(SharedString, bool)>> = Rc::new(VecModel::default());
        scene.bind_edges(ui_edges.clone(), |e| (e.id.clone(), e.is_link));

        // Filled at bind time.
        assert_eq!(ui_nodes.row_count(), 5);
        assert_eq!(ui_edges.row_count(), 4);
        assert_eq!(ui_nodes.row_data(4).unwrap().id, "b");

        state.nodes.get_mut(&NodeId::from("b")).unwrap().x = 42.0;
        state.nodes.get_mut(&NodeId::from("a")).unwrap().collapsed = Some(true);
        scene.sync(&state, &oracle, HitContext::default());

        let rows: Vec<UiNode> = ui_nodes.iter().collect();
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r", "a", "b"]);
        assert_eq!(rows[2].x, 42.0);
        assert_eq!(rows[1].label, "a");
        assert_eq!(ui_edges.row_count(), 2);
        assert_eq!(ui_edges.row_data(1).unwrap(), ("t-b".into(), false));
    }

    #[test]
    fn test_bindings_are_shared_by_clones() {
        let scene = SceneModels::new();
        let ui_nodes: Rc<VecModel<SharedString>> = Rc::new(VecModel::default());
        scene.clone().bind_nodes(ui_nodes.clone(), |n| n.id.clone());

        scene.sync(&setup_state(), &SizingOracle::default(), HitContext::default());
        assert_eq!(ui_nodes.row_count(), 5);
    }

    #[test]
    fn test_edge_views_use_midpoint_paths() {
        let mut state = setup_state();
        state.nodes.get_mut(&NodeId::from("a")).unwrap().x = 200.0;
        let rows = edge_views(&state);
        let ra = rows.iter().find(|e| e.id == "t-a").unwrap();
        assert_eq!(ra.path, "M 0 0 C 100 0, 100 0, 200 0");
        assert!(!ra.is_link);
    }
}
