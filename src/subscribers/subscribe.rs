//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging custom event handlers (UI
//! refresh, analytics, revenue accounting) into the [`Bus`](crate::Bus).
//!
//! ## Contract
//! - Called **synchronously** on the task that published the event, in
//!   subscription order. Keep handlers short; hand heavy work to a channel or
//!   use [`Bus::receiver`](crate::Bus::receiver) instead.
//! - A panic inside `on_event` is caught by the bus and reported as a
//!   `SubscriberPanicked` event; other subscribers are unaffected.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use admediator::{Bus, Event, EventKind, Subscribe};
//!
//! #[derive(Default)]
//! struct RewardCounter(AtomicU32);
//!
//! impl Subscribe for RewardCounter {
//!     fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::AdRewarded {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!     fn name(&self) -> &'static str { "reward-counter" }
//! }
//!
//! let bus = Bus::new(16);
//! bus.subscribe([EventKind::AdRewarded], Arc::new(RewardCounter::default()));
//! ```

use crate::events::Event;

/// Contract for event subscribers.
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event.
    ///
    /// # Parameters
    /// - `event`: Reference to the event (does not transfer ownership)
    fn on_event(&self, event: &Event);

    /// Human-readable name (for logs and fault reports).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
