//! Event fan-out hub.
//!
//! Unsolicited inbound events are delivered synchronously to every current
//! subscriber, in registration order, on the dispatching task. The hub never
//! mutates a payload; listeners receive a shared reference.
//!
//! Dispatch iterates over a snapshot of the listener list, so a listener may
//! subscribe or unsubscribe from inside its callback without skipping or
//! double-delivering to the others in the same pass.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use log::warn;
use serde_json::Value;

type Listener = Arc<dyn Fn(&Value) + Send + Sync + 'static>;

/// Handle identifying one subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Ordered set of event listeners.
pub struct EventHub {
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_id: AtomicU64,
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a listener; it will receive every event published after this
    /// call, until unsubscribed or the connection closes.
    pub fn subscribe(&self, listener: impl Fn(&Value) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut listeners = self.listeners.lock().expect("event hub poisoned");
        listeners.push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if the id was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock().expect("event hub poisoned");
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() < before
    }

    /// Deliver one event to every listener subscribed at this moment, in
    /// registration order.
    ///
    /// A panicking listener is caught and logged; delivery to the remaining
    /// listeners is unaffected.
    pub fn publish(&self, event: &Value) {
        let snapshot: Vec<Listener> = {
            let listeners = self.listeners.lock().expect("event hub poisoned");
            listeners.iter().map(|(_, listener)| Arc::clone(listener)).collect()
        };

        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                warn!("An event listener panicked; continuing with the remaining listeners");
            }
        }
    }

    /// Drop every listener (implicit unsubscribe on connection close or
    /// re-authentication).
    pub fn clear(&self) {
        let mut listeners = self.listeners.lock().expect("event hub poisoned");
        listeners.clear();
    }

    /// Number of currently subscribed listeners.
    pub fn subscriber_count(&self) -> usize {
        let listeners = self.listeners.lock().expect("event hub poisoned");
        listeners.len()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}
