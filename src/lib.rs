//! # Mind-map engine
//!
//! The editing core of a mind-map canvas, built to sit behind a Slint front end.
//!
//! A map is a tree of text nodes (each node points at its parent) plus
//! free-form cross-links. The crate keeps that tree valid: it rejects cycles,
//! never lets the root be deleted or reparented, and deletes subtrees
//! together with their links.
//!
//! ## Features
//!
//! - **Pure edits** - [`GraphLogic`] returns a new [`GraphState`] or a [`ValidationError`]
//! - **Reactive store** - [`MapStore`] notifies subscribers and persists with a debounced [`slint::Timer`]
//! - **Layered layout** - [`auto_layout`] places nodes by breadth-first depth
//! - **Canvas input** - [`MindMapController`] handles drag, pan, zoom, links, editing and keys over any [`TextMeasurer`]
//! - **Render contract** - [`SceneModels`] keeps visible nodes and edges in Slint models and fills front-end row structs bound through `bind_nodes`/`bind_edges`
//! - **Interchange** - JSON import/export and indented outline import
//!
//! ## Rust Helpers
//!
//! - [`edge_path`] - Generate SVG path commands for an edge
//! - [`hit_test`] - Find the node or badge under a world point
//! - [`effective_color`] - Fill color with depth-based inheritance
//! - [`SizingOracle`] - Node box sizes from wrapped text
//! - [`Viewport`] - Screen/world mapping with anchored zoom
//! - [`SelectionManager`] - Single-node selection
//!
//! Logging goes through [`tracing`]; the library installs no subscriber.

pub mod controller;
pub mod error;
pub mod graph;
pub mod interchange;
pub mod layout;
pub mod model;
pub mod path;
pub mod persist;
pub mod selection;
pub mod sizing;
pub mod store;
pub mod transform;
pub mod view;

pub use controller::{InteractionState, KeyModifiers, MindMapController};
pub use error::{ImportError, ImportResult, PersistError, PersistResult, ValidationError};
pub use graph::{
    ancestors, children_of, compute_tree_edges, depth_of, subtree_ids, would_create_cycle,
    GraphLogic, StyleUpdate,
    // Link validation framework
    default_link_validator, validate_link, CompositeValidator, EndpointsExistValidator,
    LinkValidator, NoDuplicatesValidator, NoSelfLinkValidator, ValidationResult,
};
pub use hit_test::{hit_test, Badge, HitContext, HitTarget, Rect};
pub use interchange::{export_json, import_json, import_outline};
pub use layout::{auto_layout, auto_layout_default, LayoutConfig};
pub use model::{Edge, EdgeKind, GraphState, Node, NodeId, NodeShape};
pub use path::edge_path;
pub use persist::{
    DebouncedSaver, DirectoryStorage, MemoryStorage, PersistenceProvider, SaverConfig,
    STORAGE_KEY,
};
pub use selection::SelectionManager;
pub use sizing::{display_text, MonospaceMeasurer, NodeBox, SizingConfig, SizingOracle, TextMeasurer};
pub use store::{MapStore, Subscription, WeakMapStore};
pub use transform::{Point, Viewport, ViewportLimits, ZoomDirection};
pub use view::{
    effective_color, parse_hex_color, visible_edges, visible_nodes, EdgeView, NodeView,
    SceneModels,
};
