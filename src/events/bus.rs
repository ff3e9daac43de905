//! # Event bus for mediation events.
//!
//! [`Bus`] delivers every published [`Event`] in two ways:
//! 1. **Synchronously** to registered [`Subscribe`] implementations, on the
//!    publishing task, in subscription order.
//! 2. **Asynchronously** through a [`tokio::sync::broadcast`] mirror for
//!    consumers that prefer a `recv().await` loop.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                     Consumers:
//!   load task  ──┐                    ┌──► sub #1.on_event()   (topic match, in order)
//!   show task  ──┼──► Bus::publish ───┼──► sub #2.on_event()
//!   revenue    ──┤                    ├──► sub #N.on_event()
//!   lifecycle  ──┘                    └──► broadcast ring ──► Bus::receiver() ...
//! ```
//!
//! ## Rules
//! - **Synchronous fan-out**: `publish()` returns after every matching subscriber ran.
//! - **Isolation**: a panicking subscriber is caught; later subscribers still
//!   receive the event and a `SubscriberPanicked` event is published.
//! - **No recursion**: a panic while handling `SubscriberPanicked` is logged but
//!   not re-published.
//! - **Dynamic membership**: subscribe/unsubscribe at any time, including from
//!   inside a callback. The membership snapshot is taken when an event is
//!   published, so a change applies from the next event.
//! - **Broadcast mirror**: bounded ring; slow receivers observe
//!   `RecvError::Lagged(n)` and skip `n` oldest events. Events are dropped
//!   when nobody holds a receiver.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::error;

use super::event::{Event, EventKind, KindMask};
use crate::subscribers::{Subscribe, SubscriberFn, SubscriberSet};

/// Handle returned by [`Bus::subscribe`]; pass it to [`Bus::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

struct Inner {
    subs: SubscriberSet,
    tx: broadcast::Sender<Event>,
}

/// Process-wide publish/subscribe bus for mediation events.
///
/// ### Properties
/// - **Cloneable**: cheap to clone (internally `Arc`-backed); clones share subscribers.
/// - **Typed topics**: subscriptions name the [`EventKind`]s they want.
/// - **Fire-and-forget**: no delivery acknowledgements, no persistence.
#[derive(Clone)]
pub struct Bus {
    inner: Arc<Inner>,
}

impl Bus {
    /// Creates a new bus whose broadcast mirror holds `capacity` events.
    ///
    /// The minimum capacity is 1 (clamped).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                subs: SubscriberSet::new(),
                tx,
            }),
        }
    }

    /// Publishes an event to all matching subscribers, then to the broadcast mirror.
    pub fn publish(&self, ev: Event) {
        let faults = self.inner.subs.deliver(&ev);
        let is_fault_evt = ev.is_subscriber_panic();
        let _ = self.inner.tx.send(ev);

        for (subscriber, info) in faults {
            error!(subscriber, info = %info, "subscriber panicked");
            if !is_fault_evt {
                self.publish(Event::subscriber_panicked(subscriber, info));
            }
        }
    }

    /// Registers `subscriber` for the given topics.
    ///
    /// An empty topic list subscribes to nothing and is still a valid handle.
    pub fn subscribe(
        &self,
        kinds: impl IntoIterator<Item = EventKind>,
        subscriber: Arc<dyn Subscribe>,
    ) -> SubscriptionId {
        self.inner.subs.add(KindMask::of(kinds), subscriber)
    }

    /// Registers `subscriber` for the six ad lifecycle topics.
    pub fn subscribe_all(&self, subscriber: Arc<dyn Subscribe>) -> SubscriptionId {
        self.subscribe(EventKind::AD_TOPICS, subscriber)
    }

    /// Registers a closure for the given topics.
    ///
    /// ## Example
    /// ```rust
    /// use std::sync::{Arc, Mutex};
    /// use admediator::{AdChannel, AdResult, Bus, Event, EventKind};
    ///
    /// let bus = Bus::new(16);
    /// let seen = Arc::new(Mutex::new(Vec::new()));
    /// let sink = Arc::clone(&seen);
    /// let id = bus.subscribe_fn([EventKind::AdLoaded], "loaded", move |ev| {
    ///     sink.lock().unwrap().push(ev.channel());
    /// });
    ///
    /// bus.publish(Event::loaded(AdResult::success(AdChannel::Banner)));
    /// assert!(bus.unsubscribe(id));
    /// bus.publish(Event::loaded(AdResult::success(AdChannel::AppOpen)));
    ///
    /// assert_eq!(*seen.lock().unwrap(), vec![Some(AdChannel::Banner)]);
    /// ```
    pub fn subscribe_fn<F>(
        &self,
        kinds: impl IntoIterator<Item = EventKind>,
        name: &'static str,
        f: F,
    ) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.subscribe(kinds, SubscriberFn::arc(name, f))
    }

    /// Removes a subscription. Returns `false` if the handle was already removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.subs.remove(id)
    }

    /// Number of active subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subs.len()
    }

    /// Creates a new receiver on the broadcast mirror.
    ///
    /// - Each call creates an **independent** receiver.
    /// - A receiver only gets events **published after** it was created.
    pub fn receiver(&self) -> broadcast::Receiver<Event> {
        self.inner.tx.subscribe()
    }
}

impl std::fmt::Debug for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bus")
            .field("subscribers", &self.subscriber_count())
            .field("receivers", &self.inner.tx.receiver_count())
            .finish()
    }
}
