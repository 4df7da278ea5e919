//! Devtools inspection channel
//!
//! Outside production every state transition is broadcast here, tagged with
//! the store name and the action that caused it. Tooling attaches with
//! [`DevtoolsChannel::subscribe`]. Nothing in the store depends on anyone
//! listening.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use super::state::AuthState;

/// Upper bound on events buffered per receiver
const MAX_CAPACITY: usize = 4096;

/// One state transition as seen by devtools
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DevtoolsEvent {
    /// Store name tag (default "auth-store")
    pub store: String,
    /// Action that produced the transition
    pub action: &'static str,
    /// Resulting state, tokens sanitized
    pub state: Value,
    /// When the transition happened
    pub at: DateTime<Utc>,
}

/// Broadcast channel carrying [`DevtoolsEvent`]s
///
/// Slow receivers lose the oldest events once `capacity` is exceeded.
/// Capacity is clamped to `1..=4096`.
#[derive(Debug, Clone)]
pub struct DevtoolsChannel {
    name: String,
    sender: broadcast::Sender<DevtoolsEvent>,
}

impl DevtoolsChannel {
    /// Creates a channel named `name` buffering `capacity` events per receiver
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.clamp(1, MAX_CAPACITY));
        Self {
            name: name.into(),
            sender,
        }
    }

    /// Returns the store name tag
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attaches a new receiver; it sees events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<DevtoolsEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of attached receivers
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Emits a transition; returns how many receivers got it
    pub fn emit(&self, action: &'static str, state: &AuthState) -> usize {
        let event = DevtoolsEvent {
            store: self.name.clone(),
            action,
            state: state.redacted(),
            at: Utc::now(),
        };
        self.sender.send(event).unwrap_or_default()
    }
}
