//! Pending-call table: correlates exactly one outbound call to exactly one
//! inbound response.
//!
//! Each outstanding call owns a oneshot channel keyed by its sync id. The
//! caller awaits the receiver under its deadline; the dispatch loop settles
//! the sender when the matching response arrives. Settlement happens exactly
//! once per call: resolve via [`PendingCalls::settle`], timeout via
//! [`PendingCalls::remove`] (so a late response is dropped rather than
//! mis-delivered), or waiter failure when [`PendingCalls::clear`] drops the
//! sender on connection close.

use crate::packet::SyncId;

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use log::warn;
use serde_json::Value;
use tokio::sync::oneshot;

/// Table of outstanding calls keyed by sync id.
pub struct PendingCalls {
    entries: Mutex<HashMap<SyncId, oneshot::Sender<Value>>>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Register an outstanding call and return the receiver its response
    /// will arrive on.
    ///
    /// Ids come from a [`SyncIdSource`] and are never reused while a call is
    /// outstanding; a duplicate registration would orphan the earlier waiter
    /// and is logged.
    pub fn register(&self, sync_id: SyncId) -> oneshot::Receiver<Value> {
        let (sender, receiver) = oneshot::channel();
        let mut entries = self.entries.lock().expect("pending table poisoned");
        if entries.insert(sync_id.clone(), sender).is_some() {
            warn!("Duplicate sync id {sync_id} replaced an outstanding call");
        }
        receiver
    }

    /// Deliver a response to the call registered under `sync_id`, removing
    /// the entry.
    ///
    /// Returns `false` when no entry exists (already timed out, or an
    /// unknown id); the response is then discarded by the caller.
    pub fn settle(&self, sync_id: &str, data: Value) -> bool {
        let sender = {
            let mut entries = self.entries.lock().expect("pending table poisoned");
            entries.remove(sync_id)
        };
        match sender {
            // The receiver may already be gone if the caller gave up between
            // the timeout firing and this lookup; either way the entry is
            // settled.
            Some(sender) => sender.send(data).is_ok(),
            None => false,
        }
    }

    /// Remove an entry without delivering anything (the timeout path).
    ///
    /// Returns `false` if the entry had already settled.
    pub fn remove(&self, sync_id: &str) -> bool {
        let mut entries = self.entries.lock().expect("pending table poisoned");
        entries.remove(sync_id).is_some()
    }

    /// Drop every entry, failing all waiters.
    ///
    /// Used when a fresh session is established (prior correlation state is
    /// meaningless) and when the socket closes.
    pub fn clear(&self) {
        let mut entries = self.entries.lock().expect("pending table poisoned");
        entries.clear();
    }

    /// Number of calls currently outstanding.
    pub fn outstanding(&self) -> usize {
        let entries = self.entries.lock().expect("pending table poisoned");
        entries.len()
    }
}

impl Default for PendingCalls {
    fn default() -> Self {
        Self::new()
    }
}

/// Monotonic source of sync ids.
///
/// The original protocol tags requests with a wall-clock millisecond
/// timestamp, which lets two calls issued in the same millisecond collide
/// and silently mis-deliver a response. A monotonic counter makes collision
/// impossible within one connection.
pub struct SyncIdSource {
    next: AtomicU64,
}

impl SyncIdSource {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// A fresh id, unique for the lifetime of this source.
    pub fn next(&self) -> SyncId {
        self.next.fetch_add(1, Ordering::Relaxed).to_string()
    }
}

impl Default for SyncIdSource {
    fn default() -> Self {
        Self::new()
    }
}
