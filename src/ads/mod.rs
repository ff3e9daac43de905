//! Ad domain model.
//!
//! ## Contents
//! - [`AdChannel`], [`BannerPosition`] identify a mediation slot and banner placement
//! - [`AdResult`] immutable outcome of one lifecycle transition (load, show, reward, close)
//! - [`AdRevenue`], [`RevenuePrecision`] impression-level revenue records
//!
//! Records are created at the moment a transition completes and handed to the
//! [`Bus`](crate::Bus) synchronously. The engine never queues or retains them.

mod channel;
mod result;

pub use channel::{AdChannel, BannerPosition};
pub use result::{AdResult, AdRevenue, RevenuePrecision};
