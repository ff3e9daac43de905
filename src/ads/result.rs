//! # Lifecycle and revenue records.
//!
//! [`AdResult`] is produced when a lifecycle transition completes (load,
//! show, reward, close). [`AdRevenue`] is produced by a backend's
//! impression-level accounting callback, which may fire independently of
//! show/close.
//!
//! Both are immutable once built: fields are public for reading and the
//! `with_*` helpers consume `self`, so a value handed to the bus is never
//! mutated afterwards.
//!
//! ## Example
//! ```rust
//! use admediator::{AdChannel, AdResult};
//!
//! let r = AdResult::failure(AdChannel::Interstitial, "no fill")
//!     .with_unit_id("ca-app-pub-3940256099942544/1033173712")
//!     .with_network("admob");
//!
//! assert!(!r.success);
//! assert_eq!(r.error.as_deref(), Some("no fill"));
//! assert_eq!(r.network.as_deref(), Some("admob"));
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use super::AdChannel;

/// Outcome of one lifecycle transition.
#[derive(Debug, Clone, PartialEq)]
pub struct AdResult {
    /// Channel that produced the result.
    pub channel: AdChannel,
    /// Whether the transition succeeded.
    pub success: bool,
    /// Failure description, if any.
    pub error: Option<Arc<str>>,
    /// Vendor unit id used for the request.
    pub unit_id: Option<Arc<str>>,
    /// Backend network name.
    pub network: Option<Arc<str>>,
    /// Wall-clock timestamp of the transition.
    pub at: SystemTime,
}

impl AdResult {
    /// Successful transition on `channel`, timestamped now.
    pub fn success(channel: AdChannel) -> Self {
        Self {
            channel,
            success: true,
            error: None,
            unit_id: None,
            network: None,
            at: SystemTime::now(),
        }
    }

    /// Failed transition on `channel` with a reason, timestamped now.
    pub fn failure(channel: AdChannel, error: impl Into<Arc<str>>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::success(channel)
        }
    }

    #[inline]
    pub fn with_unit_id(mut self, unit_id: impl Into<Arc<str>>) -> Self {
        self.unit_id = Some(unit_id.into());
        self
    }

    #[inline]
    pub fn with_network(mut self, network: impl Into<Arc<str>>) -> Self {
        self.network = Some(network.into());
        self
    }
}

/// Accuracy tag attached to a revenue value by the reporting network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevenuePrecision {
    /// Estimated from historical data.
    Estimated,
    /// Value configured by the publisher (floor or fixed CPM).
    PublisherDefined,
    /// Exact amount paid for this impression.
    Precise,
    #[default]
    Undefined,
}

impl RevenuePrecision {
    /// Returns a short stable label (snake_case) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RevenuePrecision::Estimated => "estimated",
            RevenuePrecision::PublisherDefined => "publisher_defined",
            RevenuePrecision::Precise => "precise",
            RevenuePrecision::Undefined => "undefined",
        }
    }
}

impl fmt::Display for RevenuePrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Impression-level revenue.
///
/// Kept apart from [`AdResult`] because backends deliver revenue on their own
/// schedule, sometimes after the ad has already closed.
#[derive(Debug, Clone, PartialEq)]
pub struct AdRevenue {
    pub channel: AdChannel,
    pub unit_id: Arc<str>,
    pub network: Arc<str>,
    /// Revenue amount in `currency` units.
    pub amount: f64,
    /// ISO 4217 currency code.
    pub currency: Arc<str>,
    /// ISO country code of the impression, when reported.
    pub country: Option<Arc<str>>,
    pub precision: RevenuePrecision,
    /// Analytics placement of the impression.
    pub placement: Option<Arc<str>>,
    pub at: SystemTime,
}

impl AdRevenue {
    /// Revenue record in USD with undefined precision, timestamped now.
    pub fn new(
        channel: AdChannel,
        unit_id: impl Into<Arc<str>>,
        network: impl Into<Arc<str>>,
        amount: f64,
    ) -> Self {
        Self {
            channel,
            unit_id: unit_id.into(),
            network: network.into(),
            amount,
            currency: Arc::from("USD"),
            country: None,
            precision: RevenuePrecision::Undefined,
            placement: None,
            at: SystemTime::now(),
        }
    }

    #[inline]
    pub fn with_currency(mut self, currency: impl Into<Arc<str>>) -> Self {
        self.currency = currency.into();
        self
    }

    #[inline]
    pub fn with_country(mut self, country: impl Into<Arc<str>>) -> Self {
        self.country = Some(country.into());
        self
    }

    #[inline]
    pub fn with_precision(mut self, precision: RevenuePrecision) -> Self {
        self.precision = precision;
        self
    }

    #[inline]
    pub fn with_placement(mut self, placement: impl Into<Arc<str>>) -> Self {
        self.placement = Some(placement.into());
        self
    }
}
