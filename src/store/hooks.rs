//! Reactive views over a slice of the store
//!
//! A [`Selected`] value follows one slice of the state. Its change counter
//! only advances when the slice changes according to the equality function,
//! so a consumer can skip work (re-rendering, recomputing) when it has not.

use std::sync::{Arc, Mutex, PoisonError};

use super::subscription::Subscription;

struct Slot<T> {
    value: T,
    changes: u64,
}

/// A subscribed slice of the auth state
///
/// Dropping it unsubscribes.
pub struct Selected<T> {
    slot: Arc<Mutex<Slot<T>>>,
    _subscription: Subscription,
}

impl<T: Clone> Selected<T> {
    /// Returns a clone of the current slice value
    pub fn get(&self) -> T {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .value
            .clone()
    }

    /// Runs `f` against the current value without cloning it
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        f(&slot.value)
    }

    /// Number of times the slice has changed since this view was created
    pub fn changes(&self) -> u64 {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .changes
    }
}

impl<T: Clone + std::fmt::Debug> std::fmt::Debug for Selected<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selected")
            .field("value", &self.get())
            .field("changes", &self.changes())
            .finish()
    }
}

/// Write side of a [`Selected`], held by its listener
pub(crate) struct SelectedWriter<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> SelectedWriter<T> {
    pub(crate) fn new(initial: T) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                value: initial,
                changes: 0,
            })),
        }
    }

    /// Stores a new slice value and bumps the change counter
    pub(crate) fn publish(&self, value: T) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.value = value;
        slot.changes += 1;
    }

    /// Builds the read side, tied to the listener's subscription
    pub(crate) fn reader(&self, subscription: Subscription) -> Selected<T> {
        Selected {
            slot: Arc::clone(&self.slot),
            _subscription: subscription,
        }
    }
}

impl<T> Clone for SelectedWriter<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}
