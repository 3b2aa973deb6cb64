//! Common test utilities for integration tests.

#![allow(dead_code)]

pub mod harness;

use std::cell::RefCell;
use std::rc::Rc;

/// Tracks callback invocations for testing.
///
/// Each field records calls to the corresponding callback.
#[derive(Default, Clone)]
pub struct CallbackTracker {
    /// Count of store notifications
    pub store_changed: Rc<RefCell<usize>>,
    /// Node count seen by each notification
    pub node_counts: Rc<RefCell<Vec<usize>>>,
    /// Count of save requests (Ctrl/Cmd+S)
    pub save_requested: Rc<RefCell<usize>>,
}

impl CallbackTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all recorded callbacks.
    pub fn clear(&self) {
        *self.store_changed.borrow_mut() = 0;
        self.node_counts.borrow_mut().clear();
        *self.save_requested.borrow_mut() = 0;
    }

    pub fn store_changes(&self) -> usize {
        *self.store_changed.borrow()
    }
}
