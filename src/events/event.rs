//! # Events published by the mediation engine.
//!
//! The [`EventKind`] enum names the bus topics:
//! - **Load topics**: `AdLoaded`, `AdFailedToLoad`
//! - **Show topics**: `AdShown`, `AdRewarded`, `AdClosed`
//! - **Accounting topic**: `AdRevenue`
//! - **Fault topic**: `SubscriberPanicked`
//!
//! The [`Event`] struct wraps the immutable record for the topic.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. For one show cycle of an incentivized channel the sequence is
//! always `AdShown < AdRewarded < AdClosed`.
//!
//! ## Example
//! ```rust
//! use admediator::{AdChannel, AdResult, Event, EventKind};
//!
//! let ev = Event::rewarded(AdResult::success(AdChannel::Rewarded).with_network("admob"));
//!
//! assert_eq!(ev.kind, EventKind::AdRewarded);
//! assert_eq!(ev.channel(), Some(AdChannel::Rewarded));
//! assert!(ev.result().is_some_and(|r| r.success));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use crate::ads::{AdChannel, AdResult, AdRevenue};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Bus topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Load ===
    /// A load completed with a fill.
    ///
    /// Payload: [`EventPayload::Result`] with `success = true`.
    AdLoaded,

    /// A load failed (no fill, timeout, backend error).
    ///
    /// Payload: [`EventPayload::Result`] with `success = false` and `error`.
    AdFailedToLoad,

    // === Show ===
    /// An ad was put on screen.
    ///
    /// Payload: [`EventPayload::Result`].
    AdShown,

    /// The user completed the incentivized interaction.
    ///
    /// Only for rewarded channels; always published before the matching `AdClosed`.
    AdRewarded,

    /// An ad left the screen (closed by the user, hidden, or failed to display).
    ///
    /// Payload: [`EventPayload::Result`]; `success = false` when display failed.
    AdClosed,

    // === Accounting ===
    /// Impression-level revenue reported by a backend.
    ///
    /// Payload: [`EventPayload::Revenue`].
    AdRevenue,

    // === Faults ===
    /// A subscriber panicked while handling an event.
    ///
    /// Payload: [`EventPayload::Fault`].
    SubscriberPanicked,
}

impl EventKind {
    /// The six ad lifecycle topics (everything except faults).
    pub const AD_TOPICS: [EventKind; 6] = [
        EventKind::AdLoaded,
        EventKind::AdFailedToLoad,
        EventKind::AdShown,
        EventKind::AdRewarded,
        EventKind::AdClosed,
        EventKind::AdRevenue,
    ];

    #[inline]
    const fn bit(self) -> u8 {
        1 << (self as u8)
    }

    /// Returns a short stable label (kebab-case) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::AdLoaded => "ad-loaded",
            EventKind::AdFailedToLoad => "ad-failed-to-load",
            EventKind::AdShown => "ad-shown",
            EventKind::AdRewarded => "ad-rewarded",
            EventKind::AdClosed => "ad-closed",
            EventKind::AdRevenue => "ad-revenue",
            EventKind::SubscriberPanicked => "subscriber-panicked",
        }
    }
}

/// Set of topics a subscription listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct KindMask(u8);

impl KindMask {
    pub(crate) fn of(kinds: impl IntoIterator<Item = EventKind>) -> Self {
        Self(kinds.into_iter().fold(0, |acc, k| acc | k.bit()))
    }

    #[inline]
    pub(crate) fn contains(self, kind: EventKind) -> bool {
        self.0 & kind.bit() != 0
    }

    #[inline]
    pub(crate) fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Record carried by an [`Event`].
#[derive(Debug, Clone)]
pub enum EventPayload {
    /// Lifecycle outcome (load, show, reward, close).
    Result(Arc<AdResult>),
    /// Impression-level revenue.
    Revenue(Arc<AdRevenue>),
    /// Subscriber fault details.
    Fault {
        /// Name of the faulty subscriber.
        subscriber: &'static str,
        /// Panic message.
        info: Arc<str>,
    },
}

/// Bus event.
///
/// - `seq`: monotonic global sequence for ordering
/// - `kind`: topic
/// - `payload`: immutable record, shared between subscribers
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Topic.
    pub kind: EventKind,
    /// Immutable record for the topic.
    pub payload: EventPayload,
}

impl Event {
    fn new(kind: EventKind, payload: EventPayload) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            kind,
            payload,
        }
    }

    fn with_result(kind: EventKind, result: AdResult) -> Self {
        Self::new(kind, EventPayload::Result(Arc::new(result)))
    }

    /// `AdLoaded` event.
    #[inline]
    pub fn loaded(result: AdResult) -> Self {
        Self::with_result(EventKind::AdLoaded, result)
    }

    /// `AdFailedToLoad` event.
    #[inline]
    pub fn failed_to_load(result: AdResult) -> Self {
        Self::with_result(EventKind::AdFailedToLoad, result)
    }

    /// `AdShown` event.
    #[inline]
    pub fn shown(result: AdResult) -> Self {
        Self::with_result(EventKind::AdShown, result)
    }

    /// `AdRewarded` event.
    #[inline]
    pub fn rewarded(result: AdResult) -> Self {
        Self::with_result(EventKind::AdRewarded, result)
    }

    /// `AdClosed` event.
    #[inline]
    pub fn closed(result: AdResult) -> Self {
        Self::with_result(EventKind::AdClosed, result)
    }

    /// `AdRevenue` event.
    #[inline]
    pub fn revenue(revenue: AdRevenue) -> Self {
        Self::new(EventKind::AdRevenue, EventPayload::Revenue(Arc::new(revenue)))
    }

    /// `SubscriberPanicked` event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: impl Into<Arc<str>>) -> Self {
        Self::new(
            EventKind::SubscriberPanicked,
            EventPayload::Fault {
                subscriber,
                info: info.into(),
            },
        )
    }

    /// Lifecycle record, if this is a result event.
    pub fn result(&self) -> Option<&AdResult> {
        match &self.payload {
            EventPayload::Result(r) => Some(r),
            _ => None,
        }
    }

    /// Revenue record, if this is an `AdRevenue` event.
    pub fn revenue_record(&self) -> Option<&AdRevenue> {
        match &self.payload {
            EventPayload::Revenue(r) => Some(r),
            _ => None,
        }
    }

    /// Channel the event refers to (none for faults).
    pub fn channel(&self) -> Option<AdChannel> {
        match &self.payload {
            EventPayload::Result(r) => Some(r.channel),
            EventPayload::Revenue(r) => Some(r.channel),
            EventPayload::Fault { .. } => None,
        }
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}
