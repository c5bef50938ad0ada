//! Single-assignment connection error cell.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::TransportError;

/// Holds the first error that terminated a connection.
///
/// The first `set` wins; later errors are dropped. Once set, the cell never
/// clears.
#[derive(Debug, Default)]
pub struct StickyError {
    cell: Mutex<Option<Arc<TransportError>>>,
}

impl StickyError {
    /// Empty cell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch `err` if nothing is latched yet. Returns whether it was stored.
    pub fn set(&self, err: TransportError) -> bool {
        let mut cell = self.cell.lock();
        if cell.is_some() {
            return false;
        }
        *cell = Some(Arc::new(err));
        true
    }

    /// The latched error, if any.
    pub fn get(&self) -> Option<Arc<TransportError>> {
        self.cell.lock().clone()
    }

    /// Whether an error is latched.
    pub fn is_set(&self) -> bool {
        self.cell.lock().is_some()
    }
}
