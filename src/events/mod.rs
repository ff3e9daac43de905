//! Mediation events: types and the publish/subscribe bus.
//!
//! This module groups the event **data model** and the **bus** that fans
//! lifecycle notifications out to subscribers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`], [`EventPayload`] event classification and payload
//! - [`Bus`] synchronous fan-out to subscribers plus a `tokio::sync::broadcast` mirror
//!
//! ## Quick reference
//! - **Publishers**: `MediationEngine` (load/show completions, auto-show),
//!   backends through [`RevenueReporter`](crate::RevenueReporter), the bus itself
//!   (subscriber faults).
//! - **Consumers**: [`Subscribe`](crate::Subscribe) implementations registered per
//!   topic, and async receivers from [`Bus::receiver`].

mod bus;
mod event;

pub use bus::{Bus, SubscriptionId};
pub use event::{Event, EventKind, EventPayload};

pub(crate) use event::KindMask;
