//! Deduplication registry for in-flight convergence runs.
//!
//! Maps a [`ConvergenceKey`] to the event slot of the one run that owns it.
//! Claiming a key is a single check-and-insert under the map's lock, so two
//! callers racing on the same key can never both start a run.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use uuid::Uuid;

use crate::domain::models::{ConvergenceKey, MemberUpdate};

/// Sending half of a run's event slot. Holds at most one undelivered update.
pub type EventSink = watch::Sender<Option<MemberUpdate>>;

/// Receiving half of a run's event slot, owned by the run.
pub type EventStream = watch::Receiver<Option<MemberUpdate>>;

/// Create an empty event slot for a new run.
///
/// A dispatch overwrites any update the run has not consumed yet, so the run
/// always sees the most recent one.
pub fn event_slot() -> (EventSink, EventStream) {
    watch::channel(None)
}

/// Registry entry for one live run.
#[derive(Debug)]
struct RegistryEntry {
    run_id: Uuid,
    sink: EventSink,
}

/// Process-wide (per engine) map of live convergence runs.
#[derive(Debug, Clone, Default)]
pub struct RunRegistry {
    entries: Arc<Mutex<HashMap<ConvergenceKey, RegistryEntry>>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConvergenceKey, RegistryEntry>> {
        // Every critical section is a single map operation, so a poisoned
        // map is still consistent.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Claim `key` for the run `run_id`.
    ///
    /// Returns `true` when the caller now owns the key. Returns `false`, without
    /// touching the existing entry, when another run already owns it.
    pub fn try_start(&self, key: &ConvergenceKey, run_id: Uuid, sink: EventSink) -> bool {
        match self.lock().entry(key.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(RegistryEntry { run_id, sink });
                true
            }
        }
    }

    /// Remove the entry for `key`. Returns the run id that was registered, if any.
    pub fn remove(&self, key: &ConvergenceKey) -> Option<Uuid> {
        self.lock().remove(key).map(|entry| entry.run_id)
    }

    /// Remove the entry for `key` only while it still belongs to `run_id`.
    pub fn remove_if(&self, key: &ConvergenceKey, run_id: Uuid) -> bool {
        match self.lock().entry(key.clone()) {
            Entry::Occupied(entry) if entry.get().run_id == run_id => {
                entry.remove();
                true
            }
            _ => false,
        }
    }

    /// Deliver `update` to the live run for `key` without blocking.
    ///
    /// An update the run has not consumed yet is replaced. Returns `false`
    /// when no run owns the key or the run has stopped listening.
    pub fn dispatch(&self, key: &ConvergenceKey, update: MemberUpdate) -> bool {
        let sink = match self.lock().get(key) {
            Some(entry) => entry.sink.clone(),
            None => return false,
        };

        sink.send(Some(update)).is_ok()
    }

    /// Whether a run currently owns `key`.
    pub fn is_active(&self, key: &ConvergenceKey) -> bool {
        self.lock().contains_key(key)
    }

    /// Run id owning `key`, if any.
    pub fn run_id(&self, key: &ConvergenceKey) -> Option<Uuid> {
        self.lock().get(key).map(|entry| entry.run_id)
    }

    /// Number of live runs.
    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    /// Keys of all live runs.
    pub fn active_keys(&self) -> Vec<ConvergenceKey> {
        self.lock().keys().cloned().collect()
    }
}

/// Removes a run's registry entry when dropped.
///
/// Held by the run task for its whole lifetime. Only the entry owned by this
/// run is removed; a successor that claimed the key meanwhile keeps its entry.
#[derive(Debug)]
pub struct Registration {
    registry: RunRegistry,
    key: ConvergenceKey,
    run_id: Uuid,
}

impl Registration {
    pub const fn new(registry: RunRegistry, key: ConvergenceKey, run_id: Uuid) -> Self {
        Self {
            registry,
            key,
            run_id,
        }
    }

    pub fn key(&self) -> &ConvergenceKey {
        &self.key
    }

    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.remove_if(&self.key, self.run_id);
    }
}
