//! Reactive holder of the current [`GraphState`].
//!
//! [`MapStore`] is a cheap, cloneable handle: the application creates one
//! and passes clones to the controller and the rendering layer. Every
//! [`set`](MapStore::set) replaces the whole state (last writer wins),
//! schedules a debounced save when a saver is attached, then calls every
//! live subscriber once, synchronously.
//!
//! No borrow is held while subscribers run, so a subscriber may call `set`
//! again; that immediately starts a nested notification pass.

use crate::layout::auto_layout_default;
use crate::model::GraphState;
use crate::persist::{load_persisted, DebouncedSaver, PersistenceProvider, SaverConfig};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

struct Listener {
    id: u64,
    active: Cell<bool>,
    callback: Box<dyn Fn()>,
}

struct StoreInner {
    state: RefCell<Rc<GraphState>>,
    listeners: RefCell<Vec<Rc<Listener>>>,
    next_listener_id: Cell<u64>,
    saver: Option<DebouncedSaver>,
}

#[derive(Clone)]
pub struct MapStore {
    inner: Rc<StoreInner>,
}

impl MapStore {
    /// Store without persistence; used for isolated instances and tests.
    pub fn new(initial: GraphState) -> Self {
        Self::build(initial, None)
    }

    /// Store whose updates are saved through `saver`.
    pub fn with_saver(initial: GraphState, saver: DebouncedSaver) -> Self {
        Self::build(initial, Some(saver))
    }

    /// Load the persisted map (or the demo map), lay it out and attach a saver.
    pub fn open(provider: Rc<dyn PersistenceProvider>) -> Self {
        Self::open_with_config(provider, SaverConfig::default())
    }

    pub fn open_with_config(provider: Rc<dyn PersistenceProvider>, config: SaverConfig) -> Self {
        let initial = match load_persisted(provider.as_ref()) {
            Some(state) => {
                tracing::info!("loaded persisted mindmap with {} nodes", state.len());
                state
            }
            None => {
                tracing::info!("starting from the demo mindmap");
                GraphState::demo()
            }
        };
        let saver = DebouncedSaver::new(provider, config);
        Self::with_saver(auto_layout_default(&initial), saver)
    }

    fn build(initial: GraphState, saver: Option<DebouncedSaver>) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                state: RefCell::new(Rc::new(initial)),
                listeners: RefCell::new(Vec::new()),
                next_listener_id: Cell::new(0),
                saver,
            }),
        }
    }

    /// Weak handle for listeners that must not keep the store alive.
    pub fn downgrade(&self) -> WeakMapStore {
        WeakMapStore {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Current state snapshot. Treat it as immutable.
    pub fn get(&self) -> Rc<GraphState> {
        self.inner.state.borrow().clone()
    }

    /// Replace the state, schedule persistence and notify subscribers.
    pub fn set(&self, next: GraphState) {
        let next = Rc::new(next);
        *self.inner.state.borrow_mut() = next.clone();
        if let Some(saver) = &self.inner.saver {
            saver.schedule(next);
        }
        self.notify();
    }

    /// Compute the next state from the current one, then [`set`](Self::set) it.
    pub fn update(&self, f: impl FnOnce(&GraphState) -> GraphState) {
        let current = self.get();
        self.set(f(&current));
    }

    /// Register a notification callback.
    pub fn subscribe(&self, callback: impl Fn() + 'static) -> Subscription {
        let id = self.inner.next_listener_id.get();
        self.inner.next_listener_id.set(id + 1);
        self.inner.listeners.borrow_mut().push(Rc::new(Listener {
            id,
            active: Cell::new(true),
            callback: Box::new(callback),
        }));
        Subscription {
            store: Rc::downgrade(&self.inner),
            id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    fn notify(&self) {
        let snapshot: Vec<Rc<Listener>> = self.inner.listeners.borrow().clone();
        for listener in snapshot {
            if listener.active.get() {
                (listener.callback)();
            }
        }
    }

    /// Hand a complete document to the editor (document-library hook).
    pub fn load_doc(&self, state: GraphState) {
        self.set(state);
    }

    /// Copy of the current document (document-library hook).
    pub fn save_doc(&self) -> GraphState {
        self.get().as_ref().clone()
    }

    /// Write any pending persisted state immediately.
    pub fn flush(&self) {
        if let Some(saver) = &self.inner.saver {
            saver.flush();
        }
    }

    pub fn has_pending_save(&self) -> bool {
        self.inner.saver.as_ref().is_some_and(|s| s.has_pending())
    }
}

/// Non-owning [`MapStore`] handle.
#[derive(Clone)]
pub struct WeakMapStore {
    inner: Weak<StoreInner>,
}

impl WeakMapStore {
    pub fn upgrade(&self) -> Option<MapStore> {
        self.inner.upgrade().map(|inner| MapStore { inner })
    }
}

/// Handle returned by [`MapStore::subscribe`].
pub struct Subscription {
    store: Weak<StoreInner>,
    id: u64,
}

impl Subscription {
    /// Remove the callback. It will not be called again, even from a
    /// notification pass that is already running.
    pub fn unsubscribe(self) {
        let Some(inner) = self.store.upgrade() else {
            return;
        };
        let mut listeners = inner.listeners.borrow_mut();
        if let Some(pos) = listeners.iter().position(|l| l.id == self.id) {
            let listener = listeners.remove(pos);
            listener.active.set(false);
        }
    }
}
