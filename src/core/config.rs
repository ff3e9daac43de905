//! # Mediation configuration.
//!
//! Provides [`MediationConfig`], the settings handed to the engine once at
//! build time and to every backend's `initialize`.
//!
//! ## Sentinel values
//! - `load_timeout = 0s` → loads never time out
//! - `init_timeout = 0s` → the initialization barrier waits for every provider
//!
//! ## Defaults
//! Every channel points at the AdMob public test units, so a default config is
//! safe to run against real SDK bridges during development.

use std::fmt;
use std::time::Duration;

use crate::ads::AdChannel;
use crate::core::BarrierPolicy;

/// Ad network behind a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Network {
    #[default]
    AdMob,
    AppLovinMax,
    LevelPlay,
    UnityAds,
}

impl Network {
    /// Returns a short stable label for results and logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Network::AdMob => "admob",
            Network::AppLovinMax => "applovin",
            Network::LevelPlay => "levelplay",
            Network::UnityAds => "unityads",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Provider selection and unit id for one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub network: Network,
    /// Default vendor unit id (overridable per load).
    pub unit_id: String,
}

impl ChannelConfig {
    pub fn new(network: Network, unit_id: impl Into<String>) -> Self {
        Self {
            network,
            unit_id: unit_id.into(),
        }
    }

    /// AdMob public test unit for `channel`.
    pub fn admob_test(channel: AdChannel) -> Self {
        let unit = match channel {
            AdChannel::Banner => "ca-app-pub-3940256099942544/9214589741",
            AdChannel::Interstitial => "ca-app-pub-3940256099942544/1033173712",
            AdChannel::Rewarded => "ca-app-pub-3940256099942544/5224354917",
            AdChannel::RewardedInterstitial => "ca-app-pub-3940256099942544/5354046379",
            AdChannel::AppOpen => "ca-app-pub-3940256099942544/9257395921",
        };
        Self::new(Network::AdMob, unit)
    }
}

/// Engine-wide configuration.
///
/// ## Field semantics
/// - `app_id`: network application id; backends refuse to initialize without one
/// - `test_mode`: ask backends to serve test creatives
/// - `test_device_ids`: devices registered as test devices with the networks
/// - `load_timeout`: deadline per load (`0s` = none)
/// - `init_timeout`: deadline for the whole initialization barrier (`0s` = none)
/// - `barrier_policy`: how provider init failures affect `initialize`
/// - `bus_capacity`: ring size of the bus broadcast mirror (min 1)
///
/// Treated as immutable once the engine is built.
#[derive(Clone, Debug)]
pub struct MediationConfig {
    pub app_id: String,
    pub test_mode: bool,
    pub test_device_ids: Vec<String>,
    pub load_timeout: Duration,
    pub init_timeout: Duration,
    pub barrier_policy: BarrierPolicy,
    pub bus_capacity: usize,
    channels: [ChannelConfig; AdChannel::COUNT],
}

impl MediationConfig {
    /// Per-channel provider selection.
    #[inline]
    pub fn channel(&self, channel: AdChannel) -> &ChannelConfig {
        &self.channels[channel.index()]
    }

    /// Replaces the provider selection of one channel.
    pub fn set_channel(&mut self, channel: AdChannel, cfg: ChannelConfig) {
        self.channels[channel.index()] = cfg;
    }

    /// Builder-style [`set_channel`](Self::set_channel).
    pub fn with_channel(mut self, channel: AdChannel, cfg: ChannelConfig) -> Self {
        self.set_channel(channel, cfg);
        self
    }

    /// Returns the load deadline as an `Option`.
    #[inline]
    pub fn load_deadline(&self) -> Option<Duration> {
        if self.load_timeout == Duration::ZERO {
            None
        } else {
            Some(self.load_timeout)
        }
    }

    /// Returns the initialization deadline as an `Option`.
    #[inline]
    pub fn init_deadline(&self) -> Option<Duration> {
        if self.init_timeout == Duration::ZERO {
            None
        } else {
            Some(self.init_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for MediationConfig {
    /// Default configuration:
    ///
    /// - AdMob test app id and test units on every channel
    /// - `test_mode = true`
    /// - `load_timeout = 30s`
    /// - `init_timeout = 0s` (wait for every provider)
    /// - `barrier_policy = Permissive`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            app_id: "ca-app-pub-3940256099942544~3347511713".to_string(),
            test_mode: true,
            test_device_ids: Vec::new(),
            load_timeout: Duration::from_secs(30),
            init_timeout: Duration::ZERO,
            barrier_policy: BarrierPolicy::default(),
            bus_capacity: 1024,
            channels: AdChannel::ALL.map(ChannelConfig::admob_test),
        }
    }
}
