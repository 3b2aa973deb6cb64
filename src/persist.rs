//! Persistence boundary.
//!
//! The engine stores one serialized [`GraphState`] under [`STORAGE_KEY`],
//! wrapped in a versioned envelope. Writes go through a [`DebouncedSaver`]
//! so a burst of edits (a drag, typing) costs one write after a quiet period.
//! Storage failures are logged and swallowed: the session keeps running in
//! memory.

use crate::error::{PersistError, PersistResult};
use crate::model::GraphState;
use serde::{Deserialize, Serialize};
use slint::{Timer, TimerMode};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

pub const STORAGE_KEY: &str = "mindmap:v1";
pub const FORMAT_VERSION: u32 = 1;
/// Quiet interval before a pending state is written.
pub const DEFAULT_SAVE_DELAY: Duration = Duration::from_millis(120);

/// Opaque key-value byte store.
pub trait PersistenceProvider {
    fn read(&self, key: &str) -> PersistResult<Option<Vec<u8>>>;
    fn write(&self, key: &str, bytes: &[u8]) -> PersistResult<()>;
}

/// In-memory provider. Clones share the same storage.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    entries: Rc<RefCell<HashMap<String, Vec<u8>>>>,
    writes: Rc<Cell<usize>>,
    unavailable: Rc<Cell<bool>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn insert(&self, key: &str, bytes: impl Into<Vec<u8>>) {
        self.entries.borrow_mut().insert(key.to_owned(), bytes.into());
    }

    /// Make every subsequent read and write fail, like a full or disabled store.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.set(unavailable);
    }
}

impl PersistenceProvider for MemoryStorage {
    fn read(&self, key: &str) -> PersistResult<Option<Vec<u8>>> {
        if self.unavailable.get() {
            return Err(PersistError::Unavailable("memory storage disabled".into()));
        }
        Ok(self.get(key))
    }

    fn write(&self, key: &str, bytes: &[u8]) -> PersistResult<()> {
        if self.unavailable.get() {
            return Err(PersistError::Unavailable("memory storage disabled".into()));
        }
        self.insert(key, bytes);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

/// One file per key inside a directory.
#[derive(Clone, Debug)]
pub struct DirectoryStorage {
    dir: PathBuf,
}

impl DirectoryStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl PersistenceProvider for DirectoryStorage {
    fn read(&self, key: &str) -> PersistResult<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, bytes: &[u8]) -> PersistResult<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[derive(Serialize)]
struct EnvelopeOut<'a> {
    version: u32,
    state: &'a GraphState,
}

#[derive(Deserialize)]
struct EnvelopeIn {
    version: u32,
    state: serde_json::Value,
}

/// Serialize `state` in the versioned storage envelope.
pub fn encode_state(state: &GraphState) -> PersistResult<Vec<u8>> {
    Ok(serde_json::to_vec(&EnvelopeOut {
        version: FORMAT_VERSION,
        state,
    })?)
}

/// Decode a storage envelope. `None` for malformed, mismatched or rootless data.
pub fn decode_state(bytes: &[u8]) -> Option<GraphState> {
    let envelope: EnvelopeIn = match serde_json::from_slice(bytes) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!("ignoring malformed persisted mindmap: {}", e);
            return None;
        }
    };
    if envelope.version != FORMAT_VERSION {
        tracing::info!(
            "ignoring persisted mindmap with format version {} (expected {})",
            envelope.version,
            FORMAT_VERSION
        );
        return None;
    }
    let state: GraphState = match serde_json::from_value(envelope.state) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("ignoring malformed persisted mindmap state: {}", e);
            return None;
        }
    };
    if !state.contains(&state.root_id) {
        tracing::warn!("ignoring persisted mindmap whose root {} is missing", state.root_id);
        return None;
    }
    Some(state)
}

/// Read the persisted state, if any usable one exists.
pub fn load_persisted(provider: &dyn PersistenceProvider) -> Option<GraphState> {
    match provider.read(STORAGE_KEY) {
        Ok(Some(bytes)) => decode_state(&bytes),
        Ok(None) => None,
        Err(e) => {
            tracing::warn!("persisted mindmap unavailable: {}", e);
            None
        }
    }
}

/// Encode and write `state`; failures are logged and dropped.
pub fn save_now(provider: &dyn PersistenceProvider, state: &GraphState) {
    let result = encode_state(state).and_then(|bytes| provider.write(STORAGE_KEY, &bytes));
    match result {
        Ok(()) => tracing::debug!("persisted mindmap with {} nodes", state.len()),
        Err(e) => tracing::warn!("failed to persist mindmap, continuing in memory: {}", e),
    }
}

/// Settings for [`DebouncedSaver`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaverConfig {
    pub delay: Duration,
}

impl Default for SaverConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_SAVE_DELAY,
        }
    }
}

/// Coalesces state writes into one write after a quiet interval.
///
/// Each [`schedule`](Self::schedule) replaces the pending state and restarts
/// a single-shot [`slint::Timer`]; the timer fires on the Slint event loop.
pub struct DebouncedSaver {
    provider: Rc<dyn PersistenceProvider>,
    pending: Rc<RefCell<Option<Rc<GraphState>>>>,
    timer: Timer,
    config: SaverConfig,
}

impl DebouncedSaver {
    pub fn new(provider: Rc<dyn PersistenceProvider>, config: SaverConfig) -> Self {
        Self {
            provider,
            pending: Rc::new(RefCell::new(None)),
            timer: Timer::default(),
            config,
        }
    }

    pub fn provider(&self) -> Rc<dyn PersistenceProvider> {
        self.provider.clone()
    }

    /// Replace the pending state and restart the countdown.
    pub fn schedule(&self, state: Rc<GraphState>) {
        *self.pending.borrow_mut() = Some(state);
        let pending = self.pending.clone();
        let provider = self.provider.clone();
        self.timer.start(TimerMode::SingleShot, self.config.delay, move || {
            let state = pending.borrow_mut().take();
            if let Some(state) = state {
                save_now(provider.as_ref(), &state);
            }
        });
    }

    pub fn has_pending(&self) -> bool {
        self.pending.borrow().is_some()
    }

    /// Write the pending state now and cancel the countdown.
    pub fn flush(&self) {
        self.timer.stop();
        let state = self.pending.borrow_mut().take();
        if let Some(state) = state {
            save_now(self.provider.as_ref(), &state);
        }
    }

    /// Drop the pending state without writing it.
    pub fn cancel(&self) {
        self.timer.stop();
        self.pending.borrow_mut().take();
    }
}
