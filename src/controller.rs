//! Pointer, keyboard and command handling for a mind-map canvas.
//!
//! The [`MindMapController`] turns raw input into store updates and viewport
//! changes. It owns the interaction state machine, the selection and the
//! viewport; the graph itself lives in the injected [`MapStore`].
//!
//! # Example
//!
//! ```ignore
//! use mindmap_engine::{DirectoryStorage, MapStore, MindMapController, Point};
//! use slint::VecModel;
//! use std::rc::Rc;
//!
//! slint::include_modules!();
//!
//! fn main() {
//!     let window = MainWindow::new().unwrap();
//!     let store = MapStore::open(Rc::new(DirectoryStorage::new("maps")));
//!     let ctrl = MindMapController::new(store);
//!
//!     // NodeData and EdgeData are structs declared in the .slint file.
//!     let nodes = Rc::new(VecModel::<NodeData>::default());
//!     ctrl.scene().bind_nodes(nodes.clone(), |n| NodeData {
//!         id: n.id.clone(),
//!         text: n.text.clone(),
//!         x: n.x,
//!         y: n.y,
//!         width: n.width,
//!         height: n.height,
//!         fill: n.fill,
//!         selected: n.selected,
//!     });
//!     let edges = Rc::new(VecModel::<EdgeData>::default());
//!     ctrl.scene().bind_edges(edges.clone(), |e| EdgeData {
//!         path: e.path.clone(),
//!         is_link: e.is_link,
//!     });
//!     window.set_nodes(nodes.into());
//!     window.set_edges(edges.into());
//!
//!     window.on_pointer_down({
//!         let ctrl = ctrl.clone();
//!         move |x, y| ctrl.pointer_down(Point::new(x, y))
//!     });
//!     window.on_pointer_up({
//!         let ctrl = ctrl.clone();
//!         move || ctrl.pointer_up()
//!     });
//!
//!     window.run().unwrap();
//!     ctrl.store().flush();
//! }
//! ```

use crate::error::ValidationError;
use crate::graph::{default_link_validator, GraphLogic, LinkValidator, StyleUpdate};
use crate::hit_test::{hit_test, Badge, HitContext, HitTarget};
use crate::layout::{auto_layout, LayoutConfig};
use crate::model::{GraphState, NodeId};
use crate::selection::SelectionManager;
use crate::sizing::{MonospaceMeasurer, SizingOracle, TextMeasurer};
use crate::store::{MapStore, Subscription, WeakMapStore};
use crate::transform::{Point, Viewport, ZoomDirection};
use crate::view::SceneModels;
use slint::platform::Key;
use slint::SharedString;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// What the pointer (or the text editor) is currently doing.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    /// `grab_offset` is node position minus the world point that was grabbed.
    DraggingNode { id: NodeId, grab_offset: Point },
    /// `origin_offset` is pan minus the screen point where panning started.
    Panning { origin_offset: Point },
    /// Waiting for the target of a new cross-link.
    Connecting { source: NodeId },
    Editing { node: NodeId, draft: String },
}

impl InteractionState {
    /// Node the state refers to, if any.
    pub fn node(&self) -> Option<&NodeId> {
        match self {
            InteractionState::DraggingNode { id, .. } => Some(id),
            InteractionState::Connecting { source } => Some(source),
            InteractionState::Editing { node, .. } => Some(node),
            InteractionState::Idle | InteractionState::Panning { .. } => None,
        }
    }
}

/// Keyboard modifier flags accompanying a key press.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyModifiers {
    pub control: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl KeyModifiers {
    pub const NONE: KeyModifiers = KeyModifiers {
        control: false,
        meta: false,
        shift: false,
        alt: false,
    };

    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.control || self.meta
    }
}

fn is_key(text: &str, key: Key) -> bool {
    SharedString::from(key).as_str() == text
}

/// Controller shared by the canvas callbacks.
///
/// Clone this controller to share it across callbacks. `M` measures node
/// text; pass the renderer's measurer through [`with_parts`](Self::with_parts)
/// so hit regions match the drawn boxes.
pub struct MindMapController<M: TextMeasurer + 'static = MonospaceMeasurer> {
    store: MapStore,
    viewport: Rc<RefCell<Viewport>>,
    selection: Rc<RefCell<SelectionManager>>,
    interaction: Rc<RefCell<InteractionState>>,
    oracle: Rc<SizingOracle<M>>,
    validator: Rc<RefCell<Rc<dyn LinkValidator>>>,
    layout: Rc<RefCell<LayoutConfig>>,
    scene: SceneModels,
    save_handler: Rc<RefCell<Option<Rc<dyn Fn()>>>>,
    listener: Rc<ListenerGuard>,
}

impl<M: TextMeasurer + 'static> Clone for MindMapController<M> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            viewport: self.viewport.clone(),
            selection: self.selection.clone(),
            interaction: self.interaction.clone(),
            oracle: self.oracle.clone(),
            validator: self.validator.clone(),
            layout: self.layout.clone(),
            scene: self.scene.clone(),
            save_handler: self.save_handler.clone(),
            listener: self.listener.clone(),
        }
    }
}

impl MindMapController {
    /// Controller with the default viewport, monospace sizing and link policy.
    ///
    /// The root starts selected.
    pub fn new(store: MapStore) -> Self {
        Self::with_parts(store, Viewport::default(), SizingOracle::default())
    }
}

impl<M: TextMeasurer + 'static> MindMapController<M> {
    pub fn with_parts(store: MapStore, viewport: Viewport, oracle: SizingOracle<M>) -> Self {
        let root = store.get().root_id.clone();
        let ctrl = Self {
            store,
            viewport: Rc::new(RefCell::new(viewport)),
            selection: Rc::new(RefCell::new(SelectionManager::with_selected(root))),
            interaction: Rc::new(RefCell::new(InteractionState::Idle)),
            oracle: Rc::new(oracle),
            validator: Rc::new(RefCell::new(Rc::new(default_link_validator()))),
            layout: Rc::new(RefCell::new(LayoutConfig::default())),
            scene: SceneModels::new(),
            save_handler: Rc::new(RefCell::new(None)),
            listener: Rc::new(ListenerGuard::default()),
        };

        let subscription = ctrl.store.subscribe({
            let ctrl = ctrl.downgrade_parts();
            move || ctrl.on_store_changed()
        });
        *ctrl.listener.0.borrow_mut() = Some(subscription);
        ctrl.refresh_scene();
        ctrl
    }

    fn downgrade_parts(&self) -> StoreListener<M> {
        StoreListener {
            store: self.store.downgrade(),
            selection: Rc::downgrade(&self.selection),
            interaction: Rc::downgrade(&self.interaction),
            oracle: Rc::downgrade(&self.oracle),
            scene: self.scene.clone(),
        }
    }

    /// Stop listening to the store. The controller keeps working but the
    /// scene and selection no longer follow external store updates.
    ///
    /// Dropping the last clone of the controller detaches it as well.
    pub fn detach(&self) {
        self.listener.release();
    }

    // === Accessors ===

    pub fn store(&self) -> &MapStore {
        &self.store
    }

    pub fn viewport(&self) -> Viewport {
        *self.viewport.borrow()
    }

    pub fn zoom(&self) -> f32 {
        self.viewport.borrow().zoom()
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selection.borrow().selected().cloned()
    }

    pub fn interaction(&self) -> InteractionState {
        self.interaction.borrow().clone()
    }

    /// Current draft while editing.
    pub fn draft(&self) -> Option<String> {
        match &*self.interaction.borrow() {
            InteractionState::Editing { draft, .. } => Some(draft.clone()),
            _ => None,
        }
    }

    pub fn scene(&self) -> SceneModels {
        self.scene.clone()
    }

    pub fn oracle(&self) -> &SizingOracle<M> {
        &self.oracle
    }

    // === Configuration ===

    /// Replace the policy used when completing cross-links.
    pub fn set_link_validator(&self, validator: impl LinkValidator + 'static) {
        *self.validator.borrow_mut() = Rc::new(validator);
    }

    pub fn set_layout_config(&self, config: LayoutConfig) {
        *self.layout.borrow_mut() = config;
    }

    /// Screen position of the canvas' top-left corner.
    pub fn set_canvas_origin(&self, origin: Point) {
        self.viewport.borrow_mut().set_origin(origin);
    }

    /// Called on Ctrl/Cmd+S after pending state has been flushed.
    pub fn on_save(&self, handler: impl Fn() + 'static) {
        *self.save_handler.borrow_mut() = Some(Rc::new(handler));
    }

    // === Internal helpers ===

    fn set_interaction(&self, next: InteractionState) {
        let mut current = self.interaction.borrow_mut();
        if *current != next {
            tracing::debug!("interaction {:?} -> {:?}", *current, next);
            *current = next;
        }
    }

    /// Run a pure edit against the current state and publish the result.
    fn apply<F>(&self, what: &str, edit: F) -> Result<(), ValidationError>
    where
        F: FnOnce(&GraphState) -> Result<GraphState, ValidationError>,
    {
        let current = self.store.get();
        match edit(&current) {
            Ok(next) => {
                self.store.set(next);
                Ok(())
            }
            Err(e) => {
                tracing::debug!("{} rejected: {}", what, e);
                Err(e)
            }
        }
    }

    fn refresh_scene(&self) {
        self.downgrade_parts().sync_scene();
    }

    fn node_position(&self, id: &NodeId) -> Option<Point> {
        self.store.get().node(id).map(|n| Point::new(n.x, n.y))
    }

    // === Selection ===

    pub fn select(&self, id: NodeId) {
        if self.selection.borrow_mut().select(id) {
            self.refresh_scene();
        }
    }

    pub fn clear_selection(&self) {
        let was_selected = !self.selection.borrow().is_empty();
        self.selection.borrow_mut().clear();
        if was_selected {
            self.refresh_scene();
        }
    }

    // === Pointer input ===

    /// Primary button pressed at `screen`.
    pub fn pointer_down(&self, screen: Point) {
        if matches!(&*self.interaction.borrow(), InteractionState::Editing { .. }) {
            // Clicking away from the editor commits it.
            let _ = self.commit_edit();
        }

        let world = self.viewport.borrow().to_world(screen);
        let state = self.store.get();
        let interaction = self.interaction();

        if let InteractionState::Connecting { source } = interaction {
            let ctx = HitContext {
                selected: None,
                connecting: Some(&source),
            };
            match hit_test(&state, &*self.oracle, ctx, world).node() {
                Some(target) if *target == source => {}
                Some(target) => {
                    let target = target.clone();
                    let _ = self.complete_link(&target);
                }
                None => {
                    self.set_interaction(InteractionState::Idle);
                    self.refresh_scene();
                }
            }
            return;
        }

        let selected = self.selected();
        let ctx = HitContext {
            selected: selected.as_ref(),
            connecting: None,
        };
        match hit_test(&state, &*self.oracle, ctx, world) {
            HitTarget::Badge {
                node,
                badge: Badge::Collapse,
            } => {
                let _ = self.toggle_collapse_of(&node);
            }
            HitTarget::Badge {
                node,
                badge: Badge::Reparent,
            } => {
                let _ = self.reparent_selected_under(&node);
            }
            HitTarget::Badge { node, .. } | HitTarget::Node(node) => {
                let Some(position) = state.node(&node).map(|n| Point::new(n.x, n.y)) else {
                    return;
                };
                self.selection.borrow_mut().select(node.clone());
                self.set_interaction(InteractionState::DraggingNode {
                    id: node,
                    grab_offset: position - world,
                });
                self.refresh_scene();
            }
            HitTarget::Background => {
                let origin_offset = self.viewport.borrow().pan() - screen;
                self.selection.borrow_mut().clear();
                self.set_interaction(InteractionState::Panning { origin_offset });
                self.refresh_scene();
            }
        }
    }

    /// Pointer moved to `screen`; drags the grabbed node or pans.
    pub fn pointer_move(&self, screen: Point) {
        let interaction = self.interaction();
        match interaction {
            InteractionState::DraggingNode { id, grab_offset } => {
                let target = self.viewport.borrow().to_world(screen) + grab_offset;
                let _ = self.apply("drag", |s| GraphLogic::move_node(s, &id, target.x, target.y));
            }
            InteractionState::Panning { origin_offset } => {
                self.viewport.borrow_mut().pan_to(screen + origin_offset);
            }
            _ => {}
        }
    }

    /// Pointer released anywhere; ends drag and pan.
    pub fn pointer_up(&self) {
        let ends = matches!(
            &*self.interaction.borrow(),
            InteractionState::DraggingNode { .. } | InteractionState::Panning { .. }
        );
        if ends {
            self.set_interaction(InteractionState::Idle);
        }
    }

    /// Double click on a node opens its text editor.
    pub fn double_click(&self, screen: Point) {
        let world = self.viewport.borrow().to_world(screen);
        let state = self.store.get();
        if let HitTarget::Node(id) = hit_test(&state, &*self.oracle, HitContext::default(), world) {
            self.begin_edit(&id);
        }
    }

    /// Zoom one step around `screen`. Negative `delta_y` zooms in.
    pub fn wheel(&self, screen: Point, delta_y: f32) -> f32 {
        self.viewport
            .borrow_mut()
            .zoom_at(screen, ZoomDirection::from_wheel_delta(delta_y))
    }

    /// Zoom from a slider, clamped to the viewport limits.
    pub fn set_zoom(&self, zoom: f32) {
        self.viewport.borrow_mut().set_zoom(zoom);
    }

    pub fn reset_view(&self) {
        self.viewport.borrow_mut().reset();
    }

    // === Keyboard ===

    /// Handle a key press. Returns true if the key was consumed.
    pub fn key_pressed(&self, text: &str, modifiers: KeyModifiers) -> bool {
        if modifiers.command() && text.eq_ignore_ascii_case("s") {
            self.save();
            return true;
        }

        let interaction = self.interaction();
        if let InteractionState::Editing { .. } = interaction {
            if is_key(text, Key::Return) {
                let _ = self.commit_edit();
                return true;
            }
            if is_key(text, Key::Escape) {
                self.cancel_edit();
                return true;
            }
            return false;
        }

        if is_key(text, Key::Escape) {
            if let InteractionState::Connecting { .. } = interaction {
                self.cancel_link();
                return true;
            }
            return false;
        }

        if modifiers.command() && text.eq_ignore_ascii_case("a") {
            self.add_node();
            return true;
        }

        if interaction != InteractionState::Idle {
            return false;
        }

        if is_key(text, Key::Delete) || is_key(text, Key::Backspace) {
            return self.delete_selected().is_ok();
        }
        if is_key(text, Key::Return) {
            if let Some(id) = self.selected() {
                self.begin_edit(&id);
                return true;
            }
        }
        false
    }

    fn save(&self) {
        self.store.flush();
        let handler = self.save_handler.borrow().clone();
        if let Some(handler) = handler {
            handler();
        }
    }

    // === Text editing ===

    /// Open the text editor on `id`, seeding the draft with its text.
    pub fn begin_edit(&self, id: &NodeId) {
        let Some(text) = self.store.get().node(id).map(|n| n.text.clone()) else {
            tracing::debug!("cannot edit missing node {}", id);
            return;
        };
        self.selection.borrow_mut().select(id.clone());
        self.set_interaction(InteractionState::Editing {
            node: id.clone(),
            draft: text,
        });
        self.refresh_scene();
    }

    pub fn set_draft(&self, text: &str) {
        if let InteractionState::Editing { draft, .. } = &mut *self.interaction.borrow_mut() {
            *draft = text.to_owned();
        }
    }

    /// Write the draft to the node if it changed, then leave editing.
    pub fn commit_edit(&self) -> Result<(), ValidationError> {
        let InteractionState::Editing { node, draft } = self.interaction() else {
            return Ok(());
        };
        self.set_interaction(InteractionState::Idle);
        let unchanged = self.store.get().node(&node).is_some_and(|n| n.text == draft);
        let result = if unchanged {
            Ok(())
        } else {
            self.apply("text edit", |s| GraphLogic::commit_text(s, &node, &draft))
        };
        self.refresh_scene();
        result
    }

    /// Leave editing without writing.
    pub fn cancel_edit(&self) {
        if matches!(&*self.interaction.borrow(), InteractionState::Editing { .. }) {
            self.set_interaction(InteractionState::Idle);
            self.refresh_scene();
        }
    }

    /// The editor lost focus.
    pub fn blur(&self) {
        let _ = self.commit_edit();
    }

    // === Commands ===

    /// Add a parentless node at the world origin and start editing it.
    pub fn add_node(&self) -> NodeId {
        let _ = self.commit_edit();
        let id = NodeId::generate();
        let state = GraphLogic::add_node(&self.store.get(), id.clone());
        self.store.set(state);
        self.begin_edit(&id);
        id
    }

    /// Add a child of the selection (or of the root) and start editing it.
    pub fn add_child(&self) -> Result<NodeId, ValidationError> {
        let _ = self.commit_edit();
        let parent = self
            .selected()
            .unwrap_or_else(|| self.store.get().root_id.clone());
        let id = NodeId::generate();
        self.apply("add child", |s| GraphLogic::add_child(s, &parent, id.clone()))?;
        self.begin_edit(&id);
        Ok(id)
    }

    /// Delete the selected node with its subtree.
    pub fn delete_selected(&self) -> Result<(), ValidationError> {
        let Some(id) = self.selected() else {
            return Ok(());
        };
        self.apply("delete", |s| GraphLogic::delete_subtree(s, &id))
    }

    /// Start a cross-link from the selected node. Returns false without a selection.
    pub fn start_link(&self) -> bool {
        let Some(source) = self.selected() else {
            return false;
        };
        let _ = self.commit_edit();
        self.set_interaction(InteractionState::Connecting { source });
        self.refresh_scene();
        true
    }

    pub fn cancel_link(&self) {
        if matches!(&*self.interaction.borrow(), InteractionState::Connecting { .. }) {
            self.set_interaction(InteractionState::Idle);
            self.refresh_scene();
        }
    }

    /// Finish a pending cross-link at `target`.
    pub fn complete_link(&self, target: &NodeId) -> Result<(), ValidationError> {
        let InteractionState::Connecting { source } = self.interaction() else {
            return Ok(());
        };
        if *target == source {
            return Ok(());
        }
        self.set_interaction(InteractionState::Idle);
        let validator = self.validator.borrow().clone();
        let result = self.apply("link", |s| {
            GraphLogic::connect(s, &source, target, &*validator)
        });
        self.refresh_scene();
        result
    }

    /// Toggle collapse on the selected node.
    pub fn toggle_collapse(&self) -> Result<(), ValidationError> {
        match self.selected() {
            Some(id) => self.toggle_collapse_of(&id),
            None => Ok(()),
        }
    }

    pub fn toggle_collapse_of(&self, id: &NodeId) -> Result<(), ValidationError> {
        self.apply("collapse", |s| GraphLogic::toggle_collapse(s, id))
    }

    /// Make `parent` the parent of the selected node.
    pub fn reparent_selected_under(&self, parent: &NodeId) -> Result<(), ValidationError> {
        let Some(child) = self.selected() else {
            return Ok(());
        };
        self.apply("reparent", |s| GraphLogic::reparent(s, &child, parent))
    }

    /// Recompute every reachable node's position.
    pub fn relayout(&self) {
        let config = *self.layout.borrow();
        let next = auto_layout(&self.store.get(), &config);
        self.store.set(next);
    }

    /// Apply a color or shape change to the selected node.
    pub fn apply_style(&self, update: StyleUpdate) -> Result<(), ValidationError> {
        let Some(id) = self.selected() else {
            return Ok(());
        };
        self.apply("style", |s| GraphLogic::apply_style(s, &id, &update))
    }

    /// Screen position of a node's center, for overlays such as the text editor.
    pub fn node_screen_position(&self, id: &NodeId) -> Option<Point> {
        let world = self.node_position(id)?;
        let vp = self.viewport.borrow();
        Some(vp.to_screen(world) + vp.origin())
    }
}

/// Owns the controller's store subscription; dropping the last controller
/// clone unsubscribes.
#[derive(Default)]
struct ListenerGuard(RefCell<Option<Subscription>>);

impl ListenerGuard {
    fn release(&self) {
        let subscription = self.0.borrow_mut().take();
        if let Some(sub) = subscription {
            sub.unsubscribe();
        }
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Parts of the controller the store subscription needs.
///
/// Holds weak references so a dropped controller stops reacting.
struct StoreListener<M> {
    store: WeakMapStore,
    selection: Weak<RefCell<SelectionManager>>,
    interaction: Weak<RefCell<InteractionState>>,
    oracle: Weak<SizingOracle<M>>,
    scene: SceneModels,
}

impl<M: TextMeasurer> StoreListener<M> {
    fn on_store_changed(&self) {
        let Some(store) = self.store.upgrade() else {
            return;
        };
        let state = store.get();
        if let Some(selection) = self.selection.upgrade() {
            selection.borrow_mut().prune(&state);
        }
        if let Some(interaction) = self.interaction.upgrade() {
            let stale = interaction.borrow().node().is_some_and(|id| !state.contains(id));
            if stale {
                tracing::debug!("interaction target disappeared, returning to idle");
                *interaction.borrow_mut() = InteractionState::Idle;
            }
        }
        self.sync_scene();
    }

    fn sync_scene(&self) {
        let (Some(selection), Some(interaction), Some(oracle)) = (
            self.selection.upgrade(),
            self.interaction.upgrade(),
            self.oracle.upgrade(),
        ) else {
            return;
        };
        let Some(store) = self.store.upgrade() else {
            return;
        };
        let state = store.get();
        let selection = selection.borrow();
        let interaction = interaction.borrow();
        let connecting = match &*interaction {
            InteractionState::Connecting { source } => Some(source),
            _ => None,
        };
        let ctx = HitContext {
            selected: selection.selected(),
            connecting,
        };
        self.scene.sync(&state, &*oracle, ctx);
    }
}
