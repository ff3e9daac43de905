//! # Ordered, fault-isolated subscriber registry.
//!
//! Provides [`SubscriberSet`], the membership table behind the
//! [`Bus`](crate::Bus).
//!
//! ## Architecture
//! ```text
//! deliver(event)
//!     │  snapshot (lock held only while cloning Arcs)
//!     ├──► sub #1 (mask ∋ kind?) ──► on_event() ── panic → caught, recorded
//!     ├──► sub #2 (mask ∌ kind)  ──► skipped
//!     └──► sub #N (mask ∋ kind?) ──► on_event()
//!     ▼
//! Vec<(name, panic info)>  ──► Bus publishes SubscriberPanicked
//! ```
//!
//! ## Rules
//! - **Subscription order**: entries are kept in insertion order.
//! - **Isolation**: each call is wrapped in `catch_unwind`.
//! - **Re-entrancy**: the lock is released before callbacks run, so handlers may
//!   subscribe, unsubscribe or publish.
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state
//! inconsistent if a subscriber panics while holding a lock of its own.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::events::{Event, KindMask, SubscriptionId};
use crate::subscribers::Subscribe;

struct Entry {
    id: u64,
    mask: KindMask,
    sub: Arc<dyn Subscribe>,
}

/// Ordered set of subscriptions.
pub(crate) struct SubscriberSet {
    entries: Mutex<Vec<Entry>>,
    next_id: AtomicU64,
}

impl SubscriberSet {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a subscription and returns its handle.
    pub(crate) fn add(&self, mask: KindMask, sub: Arc<dyn Subscribe>) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push(Entry { id, mask, sub });
        SubscriptionId(id)
    }

    /// Removes a subscription; `false` if it was not present.
    pub(crate) fn remove(&self, id: SubscriptionId) -> bool {
        let mut entries = self.lock();
        match entries.iter().position(|e| e.id == id.0) {
            Some(pos) => {
                entries.remove(pos);
                true
            }
            None => false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    /// Delivers `event` to every subscriber whose mask contains its kind.
    ///
    /// Returns `(subscriber name, panic info)` for each subscriber that panicked.
    pub(crate) fn deliver(&self, event: &Event) -> Vec<(&'static str, String)> {
        let targets: Vec<Arc<dyn Subscribe>> = {
            let entries = self.lock();
            entries
                .iter()
                .filter(|e| !e.mask.is_empty() && e.mask.contains(event.kind))
                .map(|e| Arc::clone(&e.sub))
                .collect()
        };

        let mut faults = Vec::new();
        for sub in targets {
            if let Err(panic_err) = catch_unwind(AssertUnwindSafe(|| sub.on_event(event))) {
                let info = {
                    let any = &*panic_err;
                    if let Some(msg) = any.downcast_ref::<&'static str>() {
                        (*msg).to_string()
                    } else if let Some(msg) = any.downcast_ref::<String>() {
                        msg.clone()
                    } else {
                        "unknown panic".to_string()
                    }
                };
                faults.push((sub.name(), info));
            }
        }
        faults
    }
}
