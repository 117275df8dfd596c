//! Save status and event infrastructure.
//!
//! Provides `SaveStatus` for the status indicator, `SaveEvent` for
//! monitoring every save attempt, and `EventBus` for subscriptions.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::error::SaveError;
use crate::note::NoteId;

/// Transient save state shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved,
    /// For front ends that keep a failure visible. The scheduler itself
    /// reports a failed save as `Idle` plus a `Failed` event.
    Error,
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SaveStatus::Idle => "idle",
            SaveStatus::Saving => "saving",
            SaveStatus::Saved => "saved",
            SaveStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// What asked for a save attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SaveTrigger {
    /// Quiet period after an edit elapsed
    Debounce,
    /// Periodic backstop timer
    Interval,
    /// Explicit `save_now`
    Manual,
}

/// Events emitted by the save scheduler.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SaveEvent {
    /// Status indicator changed.
    StatusChanged { status: SaveStatus },
    /// A save reached the store and its result was adopted.
    Saved {
        id: NoteId,
        /// True when this save minted the session's identity.
        created: bool,
        trigger: SaveTrigger,
    },
    /// A save reached the store and failed.
    Failed {
        error: SaveError,
        trigger: SaveTrigger,
    },
    /// A trigger arrived while a save was in flight and was queued behind it.
    Coalesced { trigger: SaveTrigger },
    /// A save finished after the session was reset; its result was dropped.
    Discarded {
        #[serde(rename = "noteId")]
        note_id: Option<NoteId>,
    },
}

/// Keeps a listener registered on an `EventBus`.
///
/// Dropping it removes the listener.
pub struct Subscription {
    bus: Weak<EventBus>,
    key: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(self.key);
        }
    }
}

type Listener = Arc<dyn Fn(SaveEvent) + Send + Sync>;

/// Fan-out of `SaveEvent`s to registered listeners, in registration order.
///
/// Listeners run synchronously on the emitting task, so they should return
/// quickly. Must live in an `Arc` to hand out subscriptions.
#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<BTreeMap<u64, Listener>>,
    next_key: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        self: &Arc<Self>,
        listener: impl Fn(SaveEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let key = self.next_key.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(key, Arc::new(listener));
        Subscription {
            bus: Arc::downgrade(self),
            key,
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.lock().len()
    }

    pub fn emit(&self, event: SaveEvent) {
        // Listeners are called outside the lock so they may subscribe or drop
        // subscriptions themselves.
        let listeners: Vec<Listener> = self.lock().values().cloned().collect();
        for listener in listeners {
            listener(event.clone());
        }
    }

    fn remove(&self, key: u64) {
        self.lock().remove(&key);
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<u64, Listener>> {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }
}
