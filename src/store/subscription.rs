//! Change listeners and subscription guards
//!
//! Listeners run synchronously, in registration order, after every state
//! transition. A listener that panics is logged and skipped; the others
//! still run and the transition stands.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use super::state::AuthState;

/// Listener invoked with `(next, previous)` state
pub type Listener = Arc<dyn Fn(&AuthState, &AuthState) + Send + Sync>;

/// Registry of change listeners
#[derive(Default)]
pub(crate) struct Listeners {
    next_id: AtomicU64,
    entries: Mutex<Vec<(u64, Listener)>>,
}

impl Listeners {
    /// Registers a listener and returns its guard
    pub(crate) fn add(self: &Arc<Self>, listener: Listener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));

        Subscription {
            id,
            listeners: Arc::downgrade(self),
            active: true,
        }
    }

    fn remove(&self, id: u64) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Number of registered listeners
    pub(crate) fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Notifies every listener registered at the time of the call
    ///
    /// The registry lock is not held while listeners run, so a listener may
    /// subscribe, unsubscribe or trigger another transition.
    pub(crate) fn notify(&self, next: &AuthState, previous: &AuthState) {
        let snapshot: Vec<(u64, Listener)> = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for (id, listener) in snapshot {
            let result = catch_unwind(AssertUnwindSafe(|| listener(next, previous)));
            if let Err(panic) = result {
                let message = if let Some(s) = panic.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic".to_string()
                };
                tracing::error!(listener = id, "Auth state listener panicked: {}", message);
            }
        }
    }
}

/// Guard for a registered listener
///
/// Dropping the guard unsubscribes. Use [`Subscription::forget`] to keep the
/// listener for the lifetime of the store.
#[must_use = "dropping a Subscription unsubscribes the listener immediately"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Listeners>,
    active: bool,
}

impl Subscription {
    /// Unsubscribes the listener
    ///
    /// Returns false if it was already gone (store dropped).
    pub fn unsubscribe(mut self) -> bool {
        self.active = false;
        self.listeners
            .upgrade()
            .map(|listeners| listeners.remove(self.id))
            .unwrap_or(false)
    }

    /// Detaches the guard, leaving the listener registered
    pub fn forget(mut self) {
        self.active = false;
    }

    /// Returns true while the listener is registered
    pub fn is_active(&self) -> bool {
        self.active && self.listeners.strong_count() > 0
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.active {
            if let Some(listeners) = self.listeners.upgrade() {
                listeners.remove(self.id);
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
