//! # Closure-backed subscriber (`SubscriberFn`)
//!
//! [`SubscriberFn`] wraps a closure `F: Fn(&Event)` so callers can subscribe
//! without declaring a type. Shared state goes through `Arc<...>` captured by
//! the closure.
//!
//! ## Example
//! ```rust
//! use admediator::{Subscribe, SubscriberFn};
//!
//! let s = SubscriberFn::arc("printer", |ev| println!("{:?}", ev.kind));
//! assert_eq!(s.name(), "printer");
//! ```

use std::sync::Arc;

use crate::events::Event;
use crate::subscribers::Subscribe;

/// Function-backed subscriber.
pub struct SubscriberFn<F> {
    name: &'static str,
    f: F,
}

impl<F> SubscriberFn<F>
where
    F: Fn(&Event) + Send + Sync + 'static,
{
    /// Creates a new function-backed subscriber.
    ///
    /// Prefer [`SubscriberFn::arc`] when you immediately need a shared handle.
    pub fn new(name: &'static str, f: F) -> Self {
        Self { name, f }
    }

    /// Creates the subscriber and returns it as `Arc<Self>`.
    pub fn arc(name: &'static str, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F> Subscribe for SubscriberFn<F>
where
    F: Fn(&Event) + Send + Sync + 'static,
{
    fn on_event(&self, event: &Event) {
        (self.f)(event)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
