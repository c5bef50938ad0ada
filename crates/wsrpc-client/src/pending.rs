//! Outstanding-call bookkeeping.

use std::collections::HashMap;

use parking_lot::Mutex;

/// Request id → method name for calls sent but not yet answered.
///
/// An entry is created when a call is written and removed exactly once, when
/// the response header carrying its id is read. Notifications never appear.
#[derive(Debug, Default)]
pub struct PendingTable {
    calls: Mutex<HashMap<u64, String>>,
}

impl PendingTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a call. Returns the method previously stored under `id`, if any.
    pub fn insert(&self, id: u64, method: &str) -> Option<String> {
        self.calls.lock().insert(id, method.to_owned())
    }

    /// Remove and return the method recorded for `id`.
    pub fn take(&self, id: u64) -> Option<String> {
        self.calls.lock().remove(&id)
    }

    /// Whether `id` is outstanding.
    pub fn contains(&self, id: u64) -> bool {
        self.calls.lock().contains_key(&id)
    }

    /// Number of outstanding calls.
    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    /// Whether no call is outstanding.
    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }
}
