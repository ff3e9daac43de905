//! # Simulated backend (`SimulatedProvider`)
//!
//! A backend that fakes network latency with `tokio::time::sleep`, used for
//! demos, integration tests and as the default wiring before real SDK bridges
//! exist. Under a paused tokio clock (`#[tokio::test(start_paused = true)]`)
//! the latencies cost no wall-clock time.
//!
//! ## Reference latencies
//! ```text
//! channel               init    load    show
//! banner                100ms   1s      -
//! interstitial          100ms   1.5s    3s
//! rewarded              100ms   2s      4s
//! rewarded-interstitial 100ms   2s      4s
//! app-open              100ms   1s      2s
//! ```
//!
//! Behavior is scriptable at runtime ([`FillBehavior`], [`WatchBehavior`]) and
//! every backend call is counted so tests can assert that the engine did not
//! reach the backend.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::ads::{AdChannel, RevenuePrecision};
use crate::core::{MediationConfig, Network};
use crate::error::ProviderError;
use crate::providers::{AdProvider, Impression, Reward, ShowReport};

/// Fake latency per backend operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyProfile {
    pub init: Duration,
    pub load: Duration,
    pub show: Duration,
}

impl LatencyProfile {
    /// Latencies of the reference backends for `channel`.
    pub const fn reference(channel: AdChannel) -> Self {
        let (load, show) = match channel {
            AdChannel::Banner => (1_000, 0),
            AdChannel::Interstitial => (1_500, 3_000),
            AdChannel::Rewarded | AdChannel::RewardedInterstitial => (2_000, 4_000),
            AdChannel::AppOpen => (1_000, 2_000),
        };
        Self {
            init: Duration::from_millis(100),
            load: Duration::from_millis(load),
            show: Duration::from_millis(show),
        }
    }

    /// Zero latency everywhere.
    pub const fn instant() -> Self {
        Self {
            init: Duration::ZERO,
            load: Duration::ZERO,
            show: Duration::ZERO,
        }
    }
}

/// Outcome of the next loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillBehavior {
    /// Load succeeds after the load latency.
    #[default]
    Fill,
    /// Load fails with [`ProviderError::NoFill`] after the load latency.
    NoFill,
    /// Load never completes.
    Hang,
}

/// How the simulated user treats the next shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchBehavior {
    /// Watches to the end (earns the reward on incentivized channels).
    #[default]
    Complete,
    /// Closes the ad early (no reward).
    SkipEarly,
    /// The ad fails to render.
    FailToDisplay,
}

#[derive(Debug)]
struct SimState {
    initialized: bool,
    init_ok: bool,
    default_unit: Option<Arc<str>>,
    unit_override: Option<Arc<str>>,
    current_unit: Option<Arc<str>>,
    loaded: bool,
    fill: FillBehavior,
    watch: WatchBehavior,
}

/// Latency-faking backend for one channel.
#[derive(Debug)]
pub struct SimulatedProvider {
    channel: AdChannel,
    network: Network,
    latency: LatencyProfile,
    reward: Reward,
    revenue: Option<f64>,
    state: Mutex<SimState>,
    init_calls: AtomicU32,
    load_calls: AtomicU32,
    show_calls: AtomicU32,
}

impl SimulatedProvider {
    /// Backend for `channel` with reference latencies, AdMob network and full fill.
    pub fn new(channel: AdChannel) -> Self {
        Self {
            channel,
            network: Network::AdMob,
            latency: LatencyProfile::reference(channel),
            reward: Reward::new("coins", 10),
            revenue: None,
            state: Mutex::new(SimState {
                initialized: false,
                init_ok: true,
                default_unit: None,
                unit_override: None,
                current_unit: None,
                loaded: false,
                fill: FillBehavior::Fill,
                watch: WatchBehavior::Complete,
            }),
            init_calls: AtomicU32::new(0),
            load_calls: AtomicU32::new(0),
            show_calls: AtomicU32::new(0),
        }
    }

    /// Creates the backend and returns it as a shared handle.
    pub fn arc(channel: AdChannel) -> Arc<Self> {
        Arc::new(Self::new(channel))
    }

    pub fn with_network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }

    pub fn with_latency(mut self, latency: LatencyProfile) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_reward(mut self, reward: Reward) -> Self {
        self.reward = reward;
        self
    }

    /// Reports `amount` USD of estimated revenue on every display.
    pub fn with_revenue(mut self, amount: f64) -> Self {
        self.revenue = Some(amount);
        self
    }

    /// Makes every initialize call fail.
    pub fn failing_init(self) -> Self {
        self.lock().init_ok = false;
        self
    }

    pub fn with_fill(self, fill: FillBehavior) -> Self {
        self.set_fill(fill);
        self
    }

    pub fn with_watch(self, watch: WatchBehavior) -> Self {
        self.set_watch(watch);
        self
    }

    /// Changes the outcome of subsequent loads.
    pub fn set_fill(&self, fill: FillBehavior) {
        self.lock().fill = fill;
    }

    /// Changes the outcome of subsequent shows.
    pub fn set_watch(&self, watch: WatchBehavior) {
        self.lock().watch = watch;
    }

    /// Allows initialize to succeed on the next call.
    pub fn recover_init(&self) {
        self.lock().init_ok = true;
    }

    /// Drops the held fill, as a network does when a fill expires.
    pub fn expire(&self) {
        self.lock().loaded = false;
    }

    pub fn init_calls(&self) -> u32 {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn load_calls(&self) -> u32 {
        self.load_calls.load(Ordering::SeqCst)
    }

    pub fn show_calls(&self) -> u32 {
        self.show_calls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl AdProvider for SimulatedProvider {
    fn channel(&self) -> AdChannel {
        self.channel
    }

    fn network(&self) -> Network {
        self.network
    }

    async fn initialize(&self, config: &MediationConfig) -> Result<(), ProviderError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        let initialized = self.lock().initialized;
        if initialized {
            return Ok(());
        }

        tokio::time::sleep(self.latency.init).await;

        let mut st = self.lock();
        if !st.init_ok {
            return Err(ProviderError::Backend {
                reason: format!("{} sdk rejected configuration", self.network),
            });
        }
        if config.app_id.trim().is_empty() {
            return Err(ProviderError::Backend {
                reason: format!("{} sdk requires an app id", self.network),
            });
        }
        st.initialized = true;
        st.default_unit = Some(Arc::from(config.channel(self.channel).unit_id.as_str()));
        debug!(
            channel = %self.channel,
            network = %self.network,
            app_id = %config.app_id,
            test_mode = config.test_mode,
            test_devices = ?config.test_device_ids,
            "simulated backend initialized"
        );
        Ok(())
    }

    async fn load(&self, unit_id: Option<&str>) -> Result<(), ProviderError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        let fill = {
            let mut st = self.lock();
            if !st.initialized {
                return Err(ProviderError::NotReady);
            }
            st.current_unit = unit_id
                .map(Arc::from)
                .or_else(|| st.unit_override.clone())
                .or_else(|| st.default_unit.clone());
            st.fill
        };

        if fill == FillBehavior::Hang {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(self.latency.load).await;

        match fill {
            FillBehavior::NoFill => Err(ProviderError::NoFill),
            _ => {
                self.lock().loaded = true;
                Ok(())
            }
        }
    }

    async fn show(&self, impression: Impression) -> Result<ShowReport, ProviderError> {
        self.show_calls.fetch_add(1, Ordering::SeqCst);
        let watch = {
            let st = self.lock();
            if !st.loaded {
                return Err(ProviderError::NotReady);
            }
            st.watch
        };

        if watch == WatchBehavior::FailToDisplay {
            if self.channel.consumes_on_show() {
                self.lock().loaded = false;
            }
            return Err(ProviderError::DisplayFailed);
        }

        if let Some(amount) = self.revenue {
            impression
                .revenue
                .report(amount, RevenuePrecision::Estimated);
        }
        tokio::time::sleep(self.latency.show).await;

        if self.channel.consumes_on_show() {
            self.lock().loaded = false;
        }

        let earned = watch == WatchBehavior::Complete && self.channel.grants_reward();
        Ok(if earned {
            ShowReport::rewarded(self.reward.clone())
        } else {
            ShowReport::closed()
        })
    }

    fn is_loaded(&self) -> bool {
        self.lock().loaded
    }

    fn set_unit_id(&self, unit_id: &str) {
        self.lock().unit_override = Some(Arc::from(unit_id));
    }

    fn unit_id(&self) -> Option<Arc<str>> {
        let st = self.lock();
        st.current_unit
            .clone()
            .or_else(|| st.unit_override.clone())
            .or_else(|| st.default_unit.clone())
    }

    fn hide(&self) {
        debug!(channel = %self.channel, "simulated banner hidden");
    }
}
