//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the closure adapter
//! [`SubscriberFn`] and the built-in [`LogWriter`] (feature `logging`).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   MediationEngine ── publish(Event) ──► Bus ──► SubscriberSet::deliver(&Event)
//!                                                     │
//!                                          ┌──────────┼───────────┬────────┐
//!                                          ▼          ▼           ▼        ▼
//!                                      LogWriter   UI refresh  Analytics  ...
//! ```
//!
//! ## Subscriber types
//! - **Passive subscribers** observe and react (logging, analytics, UI)
//! - **Stateful subscribers** keep their own view (reward ledger, revenue totals)

#[cfg(feature = "logging")]
mod log;
mod subscribe;
mod subscriber_fn;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_fn::SubscriberFn;

pub(crate) use subscriber_set::SubscriberSet;
