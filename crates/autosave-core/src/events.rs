//! Event infrastructure for editing sessions.
//!
//! Provides `EditorEvent` for monitoring and `EventBus` for
//! subscriptions. The bus is dependency-injected into whichever
//! components need it — there is no global singleton. Dispatch is a
//! synchronous fan-out to the current subscribers.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};

use crate::client::SaveError;

/// Events emitted during an editing session for real-time monitoring.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EditorEvent {
    /// A save was issued to the persistence backend.
    SaveStarted {
        /// Entity id, if one has been assigned yet.
        #[serde(rename = "entityId")]
        entity_id: Option<String>,
        /// When the save was issued, in ms since epoch.
        timestamp: u64,
    },
    /// A save was confirmed by the backend.
    SaveCompleted {
        #[serde(rename = "entityId")]
        entity_id: Option<String>,
        /// When the confirmation arrived, in ms since epoch.
        timestamp: u64,
    },
    /// A save was rejected or lost.
    SaveFailed {
        /// Error category: "network" or "validation".
        kind: String,
        timestamp: u64,
    },
    /// First successful create assigned the entity its id.
    EntityCreated {
        #[serde(rename = "entityId")]
        entity_id: String,
        timestamp: u64,
    },
    /// A genuine external change overwrote the buffer.
    RemoteApplied {
        /// Actor the change is attributed to, if known.
        author: Option<String>,
        timestamp: u64,
    },
}

impl EditorEvent {
    pub(crate) fn save_failed(err: &SaveError, timestamp: u64) -> Self {
        let kind = match err {
            SaveError::Network(_) => "network",
            SaveError::Validation(_) => "validation",
        };
        EditorEvent::SaveFailed {
            kind: kind.to_string(),
            timestamp,
        }
    }
}

/// Subscription handle that unsubscribes automatically when dropped.
///
/// Follows the disposer pattern: hold this value to keep receiving
/// events, drop it (or let it go out of scope) to unsubscribe.
pub struct Subscription {
    bus: Weak<EventBus>,
    id: usize,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.unsubscribe(self.id);
        }
    }
}

/// Event bus for publishing editor events to subscribers.
///
/// Thread-safe; wrap in `Arc` to enable subscriptions.
pub struct EventBus {
    callbacks: RwLock<Vec<(usize, Arc<dyn Fn(EditorEvent) + Send + Sync>)>>,
    next_id: AtomicUsize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self {
            callbacks: RwLock::new(Vec::new()),
            next_id: AtomicUsize::new(0),
        }
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events. Returns `Subscription` that unsubscribes on drop.
    ///
    /// Requires `self` to be wrapped in `Arc`.
    pub fn subscribe(
        self: &Arc<Self>,
        callback: impl Fn(EditorEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.callbacks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(callback)));
        Subscription {
            bus: Arc::downgrade(self),
            id,
        }
    }

    fn unsubscribe(&self, id: usize) {
        // Use try_write to avoid deadlock if Drop runs during panic
        // unwinding while a read lock is held (e.g., during emit).
        if let Ok(mut guard) = self.callbacks.try_write() {
            guard.retain(|(i, _)| *i != id);
        }
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: EditorEvent) {
        // Clone the callback list to prevent deadlock if a callback calls
        // subscribe.
        let callbacks: Vec<_> = self
            .callbacks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        for callback in callbacks {
            callback(event.clone());
        }
    }
}
