//! # Ad channels
//!
//! An [`AdChannel`] is one mediation slot. The set is closed: every table keyed
//! by channel goes through [`AdChannel::index`], an exhaustive match, so adding
//! a channel breaks the build until every table is updated.
//!
//! ## Consumption rules
//! ```text
//! Banner                → persistent: show/hide toggles visibility, fill survives
//! Interstitial          → consumed on show
//! Rewarded              → consumed on show, may grant a reward
//! RewardedInterstitial  → consumed on show, may grant a reward
//! AppOpen               → consumed on show, auto-shown on foreground
//! ```

use std::fmt;

/// Mediation slot category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AdChannel {
    Banner,
    Interstitial,
    Rewarded,
    RewardedInterstitial,
    AppOpen,
}

impl AdChannel {
    /// Number of channels.
    pub const COUNT: usize = 5;

    /// All channels in registry order.
    pub const ALL: [AdChannel; AdChannel::COUNT] = [
        AdChannel::Banner,
        AdChannel::Interstitial,
        AdChannel::Rewarded,
        AdChannel::RewardedInterstitial,
        AdChannel::AppOpen,
    ];

    /// Stable table index in `0..COUNT`.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            AdChannel::Banner => 0,
            AdChannel::Interstitial => 1,
            AdChannel::Rewarded => 2,
            AdChannel::RewardedInterstitial => 3,
            AdChannel::AppOpen => 4,
        }
    }

    /// Returns `true` if a successful show invalidates the fill.
    ///
    /// Only [`AdChannel::Banner`] keeps its fill across show/hide.
    #[inline]
    pub const fn consumes_on_show(self) -> bool {
        !matches!(self, AdChannel::Banner)
    }

    /// Returns `true` for incentivized channels that may emit `AdRewarded`.
    #[inline]
    pub const fn grants_reward(self) -> bool {
        matches!(self, AdChannel::Rewarded | AdChannel::RewardedInterstitial)
    }

    /// Default placement name reported to analytics.
    pub const fn placement(self) -> &'static str {
        match self {
            AdChannel::Banner => "banner",
            AdChannel::Interstitial => "interstitial",
            AdChannel::Rewarded => "rewarded",
            AdChannel::RewardedInterstitial => "rewarded_interstitial",
            AdChannel::AppOpen => "app_open",
        }
    }
}

impl fmt::Display for AdChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.placement())
    }
}

/// Vertical banner anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BannerPosition {
    Top,
    #[default]
    Bottom,
}

impl fmt::Display for BannerPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BannerPosition::Top => f.write_str("top"),
            BannerPosition::Bottom => f.write_str("bottom"),
        }
    }
}
