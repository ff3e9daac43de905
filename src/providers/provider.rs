//! # Ad backend contract.
//!
//! This module defines the [`AdProvider`] trait (async) that every ad backend
//! implements, plus the values exchanged with the engine during a show:
//! [`Impression`] going in, [`ShowReport`] coming out.
//! The common handle type is [`ProviderRef`], an `Arc<dyn AdProvider>`.
//!
//! ## Preconditions are enforced by the engine
//! The engine never calls `load` while a load is in flight and never calls
//! `show` unless the channel is Loaded. Backends do not need to guard against
//! those races themselves.

use std::sync::Arc;

use async_trait::async_trait;

use crate::ads::{AdChannel, AdRevenue, BannerPosition, RevenuePrecision};
use crate::core::{MediationConfig, Network};
use crate::error::ProviderError;
use crate::events::{Bus, Event};

/// Shared handle to a backend.
pub type ProviderRef = Arc<dyn AdProvider>;

/// # Asynchronous ad backend.
///
/// One implementation serves exactly one [`AdChannel`].
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use admediator::{
///     AdChannel, AdProvider, Impression, MediationConfig, Network, ProviderError, ShowReport,
/// };
///
/// struct AlwaysEmpty;
///
/// #[async_trait]
/// impl AdProvider for AlwaysEmpty {
///     fn channel(&self) -> AdChannel { AdChannel::Interstitial }
///     fn network(&self) -> Network { Network::AdMob }
///
///     async fn initialize(&self, _cfg: &MediationConfig) -> Result<(), ProviderError> {
///         Ok(())
///     }
///     async fn load(&self, _unit_id: Option<&str>) -> Result<(), ProviderError> {
///         Err(ProviderError::NoFill)
///     }
///     async fn show(&self, _imp: Impression) -> Result<ShowReport, ProviderError> {
///         Err(ProviderError::NotReady)
///     }
///     fn is_loaded(&self) -> bool { false }
///     fn set_unit_id(&self, _unit_id: &str) {}
/// }
/// ```
#[async_trait]
pub trait AdProvider: Send + Sync + 'static {
    /// Channel served by this backend.
    fn channel(&self) -> AdChannel;

    /// Network behind this backend (used in results and logs).
    fn network(&self) -> Network;

    /// One-time backend setup.
    ///
    /// Must complete exactly once per call. A call after a previous success
    /// returns `Ok(())` immediately.
    async fn initialize(&self, config: &MediationConfig) -> Result<(), ProviderError>;

    /// Fetches one fill.
    ///
    /// `unit_id` overrides the unit id for this request; `None` uses the id set
    /// by [`set_unit_id`](AdProvider::set_unit_id) or the configured default.
    async fn load(&self, unit_id: Option<&str>) -> Result<(), ProviderError>;

    /// Displays the loaded fill and resolves when the ad closes.
    ///
    /// Banners resolve as soon as they are on screen. Incentivized channels set
    /// [`ShowReport::reward`] only if the user completed the interaction.
    async fn show(&self, impression: Impression) -> Result<ShowReport, ProviderError>;

    /// Returns `true` while the backend holds a displayable fill.
    fn is_loaded(&self) -> bool;

    /// Overrides the default unit id for subsequent loads.
    fn set_unit_id(&self, unit_id: &str);

    /// Unit id used by the last load, if any.
    fn unit_id(&self) -> Option<Arc<str>> {
        None
    }

    /// Removes a banner from screen. Full-screen backends ignore it.
    fn hide(&self) {}
}

/// Reward granted by an incentivized ad.
#[derive(Debug, Clone, PartialEq)]
pub struct Reward {
    /// Reward currency name configured on the network ("coins", "lives").
    pub label: Arc<str>,
    /// Reward amount.
    pub amount: u32,
}

impl Reward {
    pub fn new(label: impl Into<Arc<str>>, amount: u32) -> Self {
        Self {
            label: label.into(),
            amount,
        }
    }
}

/// What a backend reports when a show completes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShowReport {
    /// Present only if the user completed the incentivized interaction.
    pub reward: Option<Reward>,
}

impl ShowReport {
    /// Ad was displayed and closed without a reward.
    pub fn closed() -> Self {
        Self { reward: None }
    }

    /// Ad was displayed, completed and rewarded.
    pub fn rewarded(reward: Reward) -> Self {
        Self {
            reward: Some(reward),
        }
    }
}

/// Context for one show call.
#[derive(Debug, Clone)]
pub struct Impression {
    pub channel: AdChannel,
    /// Unit id of the fill being shown.
    pub unit_id: Arc<str>,
    /// Analytics placement.
    pub placement: Arc<str>,
    /// Banner anchor; `None` for full-screen channels.
    pub position: Option<BannerPosition>,
    /// Revenue sink for this impression.
    pub revenue: RevenueReporter,
}

/// Publishes impression-level revenue on the bus.
///
/// Cloneable and `'static`, so a backend may keep it and report after the
/// show call has returned.
#[derive(Debug, Clone)]
pub struct RevenueReporter {
    bus: Bus,
    channel: AdChannel,
    unit_id: Arc<str>,
    network: Network,
    placement: Arc<str>,
}

impl RevenueReporter {
    pub(crate) fn new(
        bus: Bus,
        channel: AdChannel,
        unit_id: Arc<str>,
        network: Network,
        placement: Arc<str>,
    ) -> Self {
        Self {
            bus,
            channel,
            unit_id,
            network,
            placement,
        }
    }

    /// Publishes a USD revenue record for this impression.
    pub fn report(&self, amount: f64, precision: RevenuePrecision) {
        self.publish(
            AdRevenue::new(
                self.channel,
                Arc::clone(&self.unit_id),
                self.network.as_label(),
                amount,
            )
            .with_precision(precision)
            .with_placement(Arc::clone(&self.placement)),
        );
    }

    /// Publishes a fully built revenue record.
    pub fn publish(&self, revenue: AdRevenue) {
        self.bus.publish(Event::revenue(revenue));
    }
}
