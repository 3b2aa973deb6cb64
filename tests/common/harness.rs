//! Test harness wiring a store, a controller and a tracker together.
//!
//! Pointer helpers take world coordinates and convert them to screen
//! coordinates through the controller's current viewport, so tests read in
//! terms of node positions.

#![allow(dead_code)]

use super::CallbackTracker;
use indexmap::IndexMap;
use mindmap_engine::{
    auto_layout_default, GraphState, KeyModifiers, MapStore, MemoryStorage, MindMapController,
    Node, NodeId, NodeShape, Point, Subscription,
};
use slint::platform::Key;
use slint::SharedString;
use std::rc::Rc;

/// Initialize the testing backend for this thread.
/// With init_no_event_loop(), each test thread can have its own backend instance.
/// Uses thread_local to ensure each thread only initializes once.
pub fn init_testing_backend() {
    use std::cell::Cell;
    thread_local! {
        static INITIALIZED: Cell<bool> = const { Cell::new(false) };
    }

    INITIALIZED.with(|init| {
        if !init.get() {
            i_slint_backend_testing::init_no_event_loop();
            init.set(true);
        }
    });
}

/// Demo-shaped map with fixed ids, laid out:
///
/// ```text
/// root (0,0) ─┬─ a "First branch"  (220,-90)
///             ├─ b "Second branch" (220,  0)
///             └─ c "Third branch"  (220, 90)
/// ```
pub fn fixture_state() -> GraphState {
    let mut nodes = IndexMap::new();
    let root = Node::new("root".into(), "Root idea", 0.0, 0.0)
        .with_color("#fde68a")
        .with_shape(NodeShape::Rounded);
    nodes.insert(root.id.clone(), root);
    for (id, text, color) in [
        ("a", "First branch", "#bfdbfe"),
        ("b", "Second branch", "#bbf7d0"),
        ("c", "Third branch", "#fecaca"),
    ] {
        let node = Node::new(id.into(), text, 0.0, 0.0)
            .with_parent("root".into())
            .with_color(color)
            .with_shape(NodeShape::Rounded);
        nodes.insert(node.id.clone(), node);
    }
    auto_layout_default(&GraphState {
        nodes,
        links: vec![],
        root_id: "root".into(),
    })
}

pub fn id(s: &str) -> NodeId {
    NodeId::from(s)
}

/// Store + controller + tracker.
pub struct MindMapHarness {
    pub store: MapStore,
    pub ctrl: MindMapController,
    pub storage: MemoryStorage,
    pub tracker: CallbackTracker,
    subscription: Option<Subscription>,
}

impl MindMapHarness {
    /// In-memory store holding [`fixture_state`].
    pub fn new() -> Self {
        Self::with_state(fixture_state())
    }

    /// In-memory store without persistence.
    pub fn with_state(state: GraphState) -> Self {
        Self::wire(MapStore::new(state), MemoryStorage::new())
    }

    /// Store opened from `storage`, with a debounced saver attached.
    pub fn persistent(storage: MemoryStorage) -> Self {
        init_testing_backend();
        let store = MapStore::open(Rc::new(storage.clone()));
        Self::wire(store, storage)
    }

    fn wire(store: MapStore, storage: MemoryStorage) -> Self {
        let ctrl = MindMapController::new(store.clone());
        let tracker = CallbackTracker::new();

        let subscription = store.subscribe({
            let store = store.downgrade();
            let tracker = tracker.clone();
            move || {
                *tracker.store_changed.borrow_mut() += 1;
                if let Some(store) = store.upgrade() {
                    tracker.node_counts.borrow_mut().push(store.get().len());
                }
            }
        });

        ctrl.on_save({
            let tracker = tracker.clone();
            move || *tracker.save_requested.borrow_mut() += 1
        });

        Self {
            store,
            ctrl,
            storage,
            tracker,
            subscription: Some(subscription),
        }
    }

    /// Stop tracking store notifications.
    pub fn stop_tracking(&mut self) {
        if let Some(sub) = self.subscription.take() {
            sub.unsubscribe();
        }
    }

    // === State helpers ===

    pub fn state(&self) -> Rc<GraphState> {
        self.store.get()
    }

    pub fn node(&self, id: &str) -> Node {
        self.store
            .get()
            .node(&NodeId::from(id))
            .cloned()
            .unwrap_or_else(|| panic!("node {id} missing"))
    }

    pub fn position(&self, id: &str) -> (f32, f32) {
        let n = self.node(id);
        (n.x, n.y)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.store.get().contains(&NodeId::from(id))
    }

    pub fn selected(&self) -> Option<String> {
        self.ctrl.selected().map(|id| id.to_string())
    }

    /// Screen point for a world point under the current viewport.
    pub fn screen(&self, x: f32, y: f32) -> Point {
        let vp = self.ctrl.viewport();
        vp.to_screen(Point::new(x, y)) + vp.origin()
    }

    // === Mouse event helpers (world coordinates) ===

    pub fn mouse_down(&self, x: f32, y: f32) {
        self.ctrl.pointer_down(self.screen(x, y));
    }

    pub fn mouse_move(&self, x: f32, y: f32) {
        self.ctrl.pointer_move(self.screen(x, y));
    }

    /// Move in screen coordinates (panning changes the world mapping mid-gesture).
    pub fn mouse_move_screen(&self, x: f32, y: f32) {
        self.ctrl.pointer_move(Point::new(x, y));
    }

    pub fn mouse_up(&self) {
        self.ctrl.pointer_up();
    }

    /// Simulate a click (press and release) at a world point.
    pub fn click(&self, x: f32, y: f32) {
        self.mouse_down(x, y);
        self.mouse_up();
    }

    /// Click the center of a node.
    pub fn click_node(&self, id: &str) {
        let (x, y) = self.position(id);
        self.click(x, y);
    }

    /// Simulate a complete drag between world points.
    pub fn drag(&self, start_x: f32, start_y: f32, end_x: f32, end_y: f32) {
        self.mouse_down(start_x, start_y);
        self.mouse_move(end_x, end_y);
        self.mouse_up();
    }

    pub fn double_click_node(&self, id: &str) {
        let (x, y) = self.position(id);
        self.ctrl.double_click(self.screen(x, y));
    }

    /// Simulate a wheel step at a world point.
    pub fn scroll(&self, x: f32, y: f32, delta_y: f32) -> f32 {
        self.ctrl.wheel(self.screen(x, y), delta_y)
    }

    // === Keyboard event helpers ===

    /// Simulate a key press without modifiers.
    pub fn key_tap(&self, key: Key) -> bool {
        let text: SharedString = key.into();
        self.ctrl.key_pressed(&text, KeyModifiers::NONE)
    }

    /// Simulate Ctrl+`letter`.
    pub fn ctrl_key(&self, letter: &str) -> bool {
        let mods = KeyModifiers {
            control: true,
            ..KeyModifiers::NONE
        };
        self.ctrl.key_pressed(letter, mods)
    }

    /// Simulate Cmd+`letter`.
    pub fn cmd_key(&self, letter: &str) -> bool {
        let mods = KeyModifiers {
            meta: true,
            ..KeyModifiers::NONE
        };
        self.ctrl.key_pressed(letter, mods)
    }

    /// Simulate typing into the text editor.
    pub fn type_text(&self, text: &str) {
        self.ctrl.set_draft(text);
    }
}

impl Default for MindMapHarness {
    fn default() -> Self {
        Self::new()
    }
}
