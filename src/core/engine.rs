//! # MediationEngine: initialization barrier, per-channel state, event routing.
//!
//! The [`MediationEngine`] owns the provider registry, one lazily created
//! [`ChannelStateMachine`] per channel, and the [`Bus`]. Callers drive it with
//! `initialize`, `load_ad` and `show_ad`; outcomes reach subscribers through
//! the bus.
//!
//! ## High-level architecture
//! ```text
//! initialize():
//!   registry.bindings() ──► tokio::spawn(provider.initialize(cfg))   (one per provider)
//!                                 └──► InitBarrier::arrive(channel, ok)
//!   InitBarrier fires (N arrivals, or init_timeout) ──► BarrierPolicy ──► ready
//!
//! load_ad(channel):
//!   ensure ready ─► registry.get() ─► machine.begin_load() ─► tokio::spawn(run_load)
//!                                                              └─► AdLoaded / AdFailedToLoad
//!
//! show_ad(channel):
//!   ensure ready ─► backend fill? ─► machine.begin_show() ─► publish AdShown ─► tokio::spawn(run_show)
//!                                                              └─► AdRewarded? ─► AdClosed
//!                                                              └─► oneshot(ShowOutcome)
//! ```
//!
//! ## Rules
//! - Every precondition is checked synchronously on the caller's task; a
//!   rejected call never reaches the backend.
//! - A show needs both the machine in `Loaded` and the backend holding the
//!   fill; a fill the backend dropped sends the channel back to `Idle`.
//! - Loads and shows run to completion once spawned, even if the caller
//!   drops the `show_ad` future.
//! - After [`shutdown`](MediationEngine::shutdown) every call returns
//!   [`MediationError::ShutDown`].
//!
//! ## Example
//! ```rust
//! use admediator::{AdChannel, MediationConfig, MediationEngine};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = MediationEngine::builder(MediationConfig::default())
//!         .with_simulated_providers()
//!         .build();
//!
//!     engine.initialize().await?;
//!     engine.load_ad(AdChannel::Interstitial, None)?;
//!     assert!(engine.is_ready());
//!     Ok(())
//! }
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use futures::FutureExt;
use tokio::sync::oneshot;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::ads::{AdChannel, AdResult, BannerPosition};
use crate::core::barrier::{BarrierOutcome, InitBarrier, InitProgress};
use crate::core::builder::EngineBuilder;
use crate::core::channel::{AdRequestState, ChannelStateMachine};
use crate::core::config::MediationConfig;
use crate::core::registry::{ProviderBinding, ProviderRegistry};
use crate::core::runner::{self, ShowOutcome};
use crate::error::{MediationError, ProviderError};
use crate::events::{Bus, Event};
use crate::providers::{Impression, RevenueReporter};

enum InitPhase {
    Idle,
    InFlight(Arc<InitBarrier>),
    Ready,
}

/// Orchestrates providers, channel state and event delivery.
pub struct MediationEngine {
    cfg: Arc<MediationConfig>,
    registry: ProviderRegistry,
    machines: [OnceLock<Arc<ChannelStateMachine>>; AdChannel::COUNT],
    phase: Mutex<InitPhase>,
    ready: AtomicBool,
    bus: Bus,
    runtime_token: CancellationToken,
}

/// Puts the phase back to `Idle` unless the initialization settled.
///
/// Covers a failed strict barrier and an `initialize` future dropped mid-flight.
struct PhaseReset<'a> {
    engine: &'a MediationEngine,
    armed: bool,
}

impl Drop for PhaseReset<'_> {
    fn drop(&mut self) {
        if self.armed {
            *self.engine.lock_phase() = InitPhase::Idle;
        }
    }
}

impl MediationEngine {
    /// Starts building an engine over `cfg`.
    pub fn builder(cfg: MediationConfig) -> EngineBuilder {
        EngineBuilder::new(cfg)
    }

    pub(crate) fn new_internal(cfg: MediationConfig, registry: ProviderRegistry, bus: Bus) -> Self {
        Self {
            cfg: Arc::new(cfg),
            registry,
            machines: std::array::from_fn(|_| OnceLock::new()),
            phase: Mutex::new(InitPhase::Idle),
            ready: AtomicBool::new(false),
            bus,
            runtime_token: CancellationToken::new(),
        }
    }

    /// Initializes every registered provider and waits for the barrier.
    ///
    /// ### Rules
    /// - Already ready: returns `Ok(())` without touching providers.
    /// - Another call in flight: logs a warning and returns
    ///   [`MediationError::InitInProgress`].
    /// - [`BarrierPolicy::Permissive`](crate::BarrierPolicy::Permissive): ready
    ///   whatever the provider outcomes.
    /// - [`BarrierPolicy::Strict`](crate::BarrierPolicy::Strict): any failure
    ///   returns [`MediationError::InitFailed`] and the call may be repeated.
    pub async fn initialize(&self) -> Result<(), MediationError> {
        self.ensure_running()?;

        let (barrier, mut rx) = {
            let mut phase = self.lock_phase();
            match &*phase {
                InitPhase::Ready => {
                    debug!("initialize skipped: already ready");
                    return Ok(());
                }
                InitPhase::InFlight(_) => {
                    warn!("initialize ignored: already in progress");
                    return Err(MediationError::InitInProgress);
                }
                InitPhase::Idle => {}
            }
            let (barrier, rx) = InitBarrier::new(self.registry.len());
            *phase = InitPhase::InFlight(Arc::clone(&barrier));
            (barrier, rx)
        };
        let mut reset = PhaseReset {
            engine: self,
            armed: true,
        };

        info!(providers = self.registry.len(), "initializing providers");
        for binding in self.registry.bindings() {
            self.spawn_provider_init(binding.clone(), Arc::clone(&barrier));
        }

        let wait = async {
            match self.cfg.init_deadline() {
                Some(dur) => match time::timeout(dur, &mut rx).await {
                    Ok(res) => res,
                    Err(_elapsed) => {
                        let channels = self.registry.bindings().map(|b| b.channel);
                        for channel in barrier.pending(channels) {
                            warn!(%channel, timeout = ?dur, "provider initialization timed out");
                            barrier.arrive(channel, false);
                        }
                        (&mut rx).await
                    }
                },
                None => (&mut rx).await,
            }
        };
        let outcome = tokio::select! {
            _ = self.runtime_token.cancelled() => return Err(MediationError::ShutDown),
            res = wait => res.unwrap_or_else(|_| BarrierOutcome {
                total: self.registry.len(),
                failed: self.registry.bindings().map(|b| b.channel).collect(),
            }),
        };

        let policy = self.cfg.barrier_policy;
        if !outcome.passes(policy) {
            error!(failed = ?outcome.failed, ?policy, "initialization failed");
            return Err(MediationError::InitFailed {
                failed: outcome.failed,
            });
        }
        if !outcome.failed.is_empty() {
            warn!(failed = ?outcome.failed, "providers failed to initialize; continuing");
        }

        reset.armed = false;
        *self.lock_phase() = InitPhase::Ready;
        self.ready.store(true, Ordering::Release);
        info!(total = outcome.total, "mediation engine ready");
        Ok(())
    }

    fn spawn_provider_init(&self, binding: ProviderBinding, barrier: Arc<InitBarrier>) {
        let cfg = Arc::clone(&self.cfg);
        tokio::spawn(async move {
            let channel = binding.channel;
            let res = AssertUnwindSafe(binding.provider.initialize(&cfg))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(runner::panicked(panic)));

            let ok = match res {
                Ok(()) => true,
                Err(e) => {
                    warn!(%channel, network = %binding.provider.network(), error = %e, "provider failed to initialize");
                    false
                }
            };
            if let Some(progress) = barrier.arrive(channel, ok) {
                debug!(%channel, ok, completed = progress.completed, total = progress.total, "provider initialized");
            }
        });
    }

    /// Starts loading one fill on `channel`.
    ///
    /// Returns once the load is started; completion is published as
    /// `AdLoaded` or `AdFailedToLoad`. `unit_id` overrides the unit id for this
    /// load only; `None` leaves the choice to the backend, which uses the last
    /// [`set_ad_unit_id`](Self::set_ad_unit_id) value or its configured default.
    pub fn load_ad(&self, channel: AdChannel, unit_id: Option<&str>) -> Result<(), MediationError> {
        self.ensure_running()?;
        self.ensure_ready(channel, "load")?;
        let binding = self.binding(channel)?.clone();
        let machine = self.machine(channel);

        if let Err(e) = machine.begin_load() {
            warn!(%channel, state = %machine.state(), "load ignored");
            return Err(e);
        }

        let unit: Option<Arc<str>> = unit_id.map(Arc::from);
        let timeout = self.cfg.load_deadline();
        let bus = self.bus.clone();
        debug!(%channel, unit = ?unit, "loading ad");

        tokio::spawn(async move {
            let _ = runner::run_load(&binding, &machine, unit, timeout, &bus).await;
        });
        Ok(())
    }

    /// Starts a show and returns a receiver for its outcome.
    ///
    /// `AdShown` is published before this returns. Dropping the receiver does
    /// not stop the show.
    pub fn start_show(
        &self,
        channel: AdChannel,
    ) -> Result<oneshot::Receiver<ShowOutcome>, MediationError> {
        self.ensure_running()?;
        self.ensure_ready(channel, "show")?;
        let (tx, rx) = oneshot::channel();

        if channel == AdChannel::Banner {
            self.show_banner(BannerPosition::default())?;
            let _ = tx.send(ShowOutcome {
                displayed: true,
                reward: None,
            });
            return Ok(rx);
        }

        let binding = self.binding(channel)?.clone();
        let machine = self.loaded_machine(channel, "show")?;
        self.ensure_fill(&binding, &machine)?;
        if let Err(e) = machine.begin_show() {
            warn!(%channel, state = %machine.state(), "show rejected");
            return Err(e);
        }

        let impression = self.impression(&binding, None);
        self.bus.publish(Event::shown(
            AdResult::success(channel)
                .with_unit_id(Arc::clone(&impression.unit_id))
                .with_network(binding.provider.network().as_label()),
        ));
        info!(%channel, unit = %impression.unit_id, "showing ad");

        let bus = self.bus.clone();
        tokio::spawn(async move {
            let outcome = runner::run_show(&binding, &machine, impression, &bus).await;
            let _ = tx.send(outcome);
        });
        Ok(rx)
    }

    /// Shows the loaded ad on `channel` and resolves when it closes.
    ///
    /// A banner resolves as soon as it is placed at the bottom of the screen.
    pub async fn show_ad(&self, channel: AdChannel) -> Result<ShowOutcome, MediationError> {
        let rx = self.start_show(channel)?;
        rx.await
            .map_err(|_| MediationError::ShowAborted { channel })
    }

    /// Whether `channel` holds a fill that can be shown now.
    pub fn is_loaded(&self, channel: AdChannel) -> bool {
        self.is_ready()
            && self.state(channel) == AdRequestState::Loaded
            && self
                .registry
                .get(channel)
                .is_ok_and(|b| b.provider.is_loaded())
    }

    /// Places the loaded banner at `position`.
    ///
    /// `AdShown` is published only when the banner becomes visible; showing a
    /// visible banner moves it.
    pub fn show_banner(&self, position: BannerPosition) -> Result<(), MediationError> {
        const CH: AdChannel = AdChannel::Banner;
        self.ensure_running()?;
        self.ensure_ready(CH, "show")?;
        let binding = self.binding(CH)?.clone();
        let machine = self.loaded_machine(CH, "show")?;
        self.ensure_fill(&binding, &machine)?;

        let ticket = match machine.show_banner(position) {
            Ok(t) => t,
            Err(e) => {
                warn!(state = %machine.state(), "banner show rejected");
                return Err(e);
            }
        };

        let impression = self.impression(&binding, Some(position));
        if ticket.was_visible {
            debug!(%position, "banner moved");
        } else {
            self.bus.publish(Event::shown(
                AdResult::success(CH)
                    .with_unit_id(Arc::clone(&impression.unit_id))
                    .with_network(binding.provider.network().as_label()),
            ));
            info!(%position, "banner shown");
        }

        let bus = self.bus.clone();
        tokio::spawn(async move {
            runner::run_banner(&binding, &machine, impression, ticket.generation, &bus).await;
        });
        Ok(())
    }

    /// Hides the banner. Returns `Ok(false)` if it was not visible.
    ///
    /// A show still waiting to reach the backend is cancelled; one already in
    /// flight is hidden again when it completes.
    pub fn hide_banner(&self) -> Result<bool, MediationError> {
        const CH: AdChannel = AdChannel::Banner;
        self.ensure_running()?;
        let Some(machine) = self.machines[CH.index()].get() else {
            return Ok(false);
        };
        if !machine.hide_banner() {
            return Ok(false);
        }

        let mut result = AdResult::success(CH);
        if let Ok(binding) = self.registry.get(CH) {
            binding.provider.hide();
            result = result.with_network(binding.provider.network().as_label());
            if let Some(unit) = binding.provider.unit_id() {
                result = result.with_unit_id(unit);
            }
        }
        self.bus.publish(Event::closed(result));
        info!("banner hidden");
        Ok(true)
    }

    /// Overrides the unit id the backend of `channel` uses for later loads.
    pub fn set_ad_unit_id(&self, channel: AdChannel, unit_id: &str) -> Result<(), MediationError> {
        let binding = self.binding(channel)?;
        binding.provider.set_unit_id(unit_id);
        debug!(%channel, unit_id, "unit id overridden");
        Ok(())
    }

    /// Current state of `channel` (`Idle` before the first load).
    pub fn state(&self, channel: AdChannel) -> AdRequestState {
        self.machines[channel.index()]
            .get()
            .map_or(AdRequestState::Idle, |m| m.state())
    }

    /// Outcome of the last finished cycle on `channel`.
    pub fn last_outcome(&self, channel: AdChannel) -> Option<AdRequestState> {
        self.machines[channel.index()]
            .get()
            .and_then(|m| m.last_outcome())
    }

    /// Arrival count of the current initialization.
    ///
    /// `None` before `initialize` is first called (or after a failed one).
    pub fn init_progress(&self) -> Option<InitProgress> {
        match &*self.lock_phase() {
            InitPhase::Idle => None,
            InitPhase::InFlight(barrier) => Some(barrier.progress()),
            InitPhase::Ready => Some(InitProgress {
                completed: self.registry.len(),
                total: self.registry.len(),
            }),
        }
    }

    /// Whether the initialization barrier has fired and passed.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Event bus of this engine.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn config(&self) -> &MediationConfig {
        &self.cfg
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Stops accepting calls and ends the lifecycle listener.
    ///
    /// Loads and shows already started run to completion.
    pub fn shutdown(&self) {
        if !self.runtime_token.is_cancelled() {
            info!("mediation engine shutting down");
            self.runtime_token.cancel();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.runtime_token.is_cancelled()
    }

    pub(crate) fn runtime_token(&self) -> &CancellationToken {
        &self.runtime_token
    }

    fn ensure_running(&self) -> Result<(), MediationError> {
        if self.runtime_token.is_cancelled() {
            return Err(MediationError::ShutDown);
        }
        Ok(())
    }

    fn ensure_ready(&self, channel: AdChannel, op: &'static str) -> Result<(), MediationError> {
        if !self.is_ready() {
            warn!(%channel, op, "engine not initialized");
            return Err(MediationError::NotInitialized);
        }
        Ok(())
    }

    fn binding(&self, channel: AdChannel) -> Result<&ProviderBinding, MediationError> {
        self.registry.get(channel).inspect_err(|e| {
            error!(%channel, label = e.as_label(), "no provider bound");
        })
    }

    /// State machine for `channel`, created on first use.
    fn machine(&self, channel: AdChannel) -> Arc<ChannelStateMachine> {
        Arc::clone(
            self.machines[channel.index()]
                .get_or_init(|| Arc::new(ChannelStateMachine::new(channel))),
        )
    }

    /// Existing state machine; a channel that was never loaded is `Idle`.
    fn loaded_machine(
        &self,
        channel: AdChannel,
        op: &'static str,
    ) -> Result<Arc<ChannelStateMachine>, MediationError> {
        match self.machines[channel.index()].get() {
            Some(m) => Ok(Arc::clone(m)),
            None => {
                warn!(%channel, op, "channel never loaded");
                Err(MediationError::InvalidState {
                    channel,
                    state: AdRequestState::Idle,
                    op,
                })
            }
        }
    }

    /// Rejects a show when the backend no longer holds the fill the machine
    /// recorded. The channel returns to `Idle` so it can be loaded again.
    fn ensure_fill(
        &self,
        binding: &ProviderBinding,
        machine: &ChannelStateMachine,
    ) -> Result<(), MediationError> {
        if binding.provider.is_loaded() {
            return Ok(());
        }
        let channel = binding.channel;
        let banner_visible = machine.banner().0;
        if machine.expire_fill() {
            warn!(%channel, "backend fill expired; channel reset to idle");
            if banner_visible {
                binding.provider.hide();
                self.bus.publish(Event::closed(
                    AdResult::failure(channel, ProviderError::NotReady.to_string())
                        .with_network(binding.provider.network().as_label()),
                ));
            }
        } else {
            warn!(%channel, state = %machine.state(), "show rejected: backend holds no fill");
        }
        Err(MediationError::InvalidState {
            channel,
            state: machine.state(),
            op: "show",
        })
    }

    fn impression(&self, binding: &ProviderBinding, position: Option<BannerPosition>) -> Impression {
        let channel = binding.channel;
        let unit_id = binding
            .provider
            .unit_id()
            .or_else(|| binding.unit_override.clone())
            .unwrap_or_else(|| Arc::from(self.cfg.channel(channel).unit_id.as_str()));
        let placement: Arc<str> = Arc::from(channel.placement());

        Impression {
            channel,
            unit_id: Arc::clone(&unit_id),
            placement: Arc::clone(&placement),
            position,
            revenue: RevenueReporter::new(
                self.bus.clone(),
                channel,
                unit_id,
                binding.provider.network(),
                placement,
            ),
        }
    }

    fn lock_phase(&self) -> MutexGuard<'_, InitPhase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for MediationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediationEngine")
            .field("ready", &self.is_ready())
            .field("providers", &self.registry.len())
            .field("shut_down", &self.is_shut_down())
            .field("bus", &self.bus)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::core::{BarrierPolicy, Network};
    use crate::error::ProviderError;
    use crate::events::EventKind;
    use crate::providers::{
        AdProvider, FillBehavior, LatencyProfile, ShowReport, SimulatedProvider, WatchBehavior,
    };

    fn instant(channel: AdChannel) -> Arc<SimulatedProvider> {
        Arc::new(SimulatedProvider::new(channel).with_latency(LatencyProfile::instant()))
    }

    fn engine_with(cfg: MediationConfig, providers: &[Arc<SimulatedProvider>]) -> Arc<MediationEngine> {
        MediationEngine::builder(cfg)
            .with_providers(providers.iter().map(|p| Arc::clone(p) as Arc<dyn AdProvider>))
            .build()
    }

    fn record(bus: &Bus) -> Arc<Mutex<Vec<(EventKind, bool)>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.subscribe_fn(EventKind::AD_TOPICS, "recorder", move |ev| {
            let ok = ev.result().is_none_or(|r| r.success);
            sink.lock().unwrap().push((ev.kind, ok));
        });
        seen
    }

    async fn settle() {
        time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn calls_before_initialize_are_rejected() {
        let p = instant(AdChannel::Interstitial);
        let engine = engine_with(MediationConfig::default(), &[Arc::clone(&p)]);

        assert_eq!(
            engine.load_ad(AdChannel::Interstitial, None),
            Err(MediationError::NotInitialized)
        );
        assert_eq!(
            engine.show_ad(AdChannel::Interstitial).await,
            Err(MediationError::NotInitialized)
        );
        assert_eq!(p.load_calls(), 0);
        assert!(engine.init_progress().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn unbound_channel_is_unsupported() {
        let engine = engine_with(MediationConfig::default(), &[instant(AdChannel::Rewarded)]);
        engine.initialize().await.unwrap();

        assert_eq!(
            engine.load_ad(AdChannel::Banner, None),
            Err(MediationError::UnsupportedChannel { channel: AdChannel::Banner })
        );
        assert_eq!(engine.state(AdChannel::Banner), AdRequestState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn interstitial_cycle_publishes_in_order() {
        let p = instant(AdChannel::Interstitial);
        let engine = engine_with(MediationConfig::default(), &[Arc::clone(&p)]);
        let events = record(engine.bus());
        engine.initialize().await.unwrap();

        engine.load_ad(AdChannel::Interstitial, None).unwrap();
        assert_eq!(engine.state(AdChannel::Interstitial), AdRequestState::Loading);
        assert_eq!(
            engine.load_ad(AdChannel::Interstitial, None),
            Err(MediationError::InvalidState {
                channel: AdChannel::Interstitial,
                state: AdRequestState::Loading,
                op: "load",
            })
        );
        settle().await;
        assert!(engine.is_loaded(AdChannel::Interstitial));

        let outcome = engine.show_ad(AdChannel::Interstitial).await.unwrap();
        assert!(outcome.displayed);
        assert!(!outcome.rewarded());
        assert_eq!(engine.state(AdChannel::Interstitial), AdRequestState::Idle);
        assert_eq!(
            engine.last_outcome(AdChannel::Interstitial),
            Some(AdRequestState::Closed)
        );
        assert_eq!(p.load_calls(), 1);
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                (EventKind::AdLoaded, true),
                (EventKind::AdShown, true),
                (EventKind::AdClosed, true),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn display_failure_closes_with_failure() {
        let p = Arc::new(
            SimulatedProvider::new(AdChannel::Rewarded)
                .with_latency(LatencyProfile::instant())
                .with_watch(WatchBehavior::FailToDisplay),
        );
        let engine = engine_with(MediationConfig::default(), &[p]);
        let events = record(engine.bus());
        engine.initialize().await.unwrap();
        engine.load_ad(AdChannel::Rewarded, None).unwrap();
        settle().await;

        let outcome = engine.show_ad(AdChannel::Rewarded).await.unwrap();
        assert!(!outcome.displayed);
        assert_eq!(engine.state(AdChannel::Rewarded), AdRequestState::Idle);
        assert_eq!(engine.last_outcome(AdChannel::Rewarded), Some(AdRequestState::Failed));
        assert_eq!(
            events.lock().unwrap().last(),
            Some(&(EventKind::AdClosed, false))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn no_fill_returns_to_idle_and_allows_retry() {
        let p = Arc::new(
            SimulatedProvider::new(AdChannel::AppOpen)
                .with_latency(LatencyProfile::instant())
                .with_fill(FillBehavior::NoFill),
        );
        let engine = engine_with(MediationConfig::default(), &[Arc::clone(&p)]);
        let events = record(engine.bus());
        engine.initialize().await.unwrap();

        engine.load_ad(AdChannel::AppOpen, None).unwrap();
        settle().await;
        assert_eq!(engine.state(AdChannel::AppOpen), AdRequestState::Idle);
        assert_eq!(events.lock().unwrap()[0], (EventKind::AdFailedToLoad, false));

        p.set_fill(FillBehavior::Fill);
        engine.load_ad(AdChannel::AppOpen, None).unwrap();
        settle().await;
        assert!(engine.is_loaded(AdChannel::AppOpen));
    }

    struct PanickyLoad;

    #[async_trait]
    impl AdProvider for PanickyLoad {
        fn channel(&self) -> AdChannel {
            AdChannel::Interstitial
        }
        fn network(&self) -> Network {
            Network::LevelPlay
        }
        async fn initialize(&self, _cfg: &MediationConfig) -> Result<(), ProviderError> {
            Ok(())
        }
        async fn load(&self, _unit_id: Option<&str>) -> Result<(), ProviderError> {
            panic!("sdk crashed");
        }
        async fn show(&self, _imp: Impression) -> Result<ShowReport, ProviderError> {
            Err(ProviderError::NotReady)
        }
        fn is_loaded(&self) -> bool {
            false
        }
        fn set_unit_id(&self, _unit_id: &str) {}
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_backend_load_fails_the_load() {
        let engine = MediationEngine::builder(MediationConfig::default())
            .with_provider(Arc::new(PanickyLoad))
            .build();
        let mut rx = engine.bus().receiver();
        engine.initialize().await.unwrap();

        engine.load_ad(AdChannel::Interstitial, None).unwrap();
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::AdFailedToLoad);
        let result = ev.result().unwrap();
        assert!(result.error.as_deref().is_some_and(|e| e.contains("sdk crashed")));
        assert_eq!(result.network.as_deref(), Some("levelplay"));
        assert_eq!(engine.state(AdChannel::Interstitial), AdRequestState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn init_timeout_counts_missing_providers_as_failed() {
        let slow = Arc::new(SimulatedProvider::new(AdChannel::Banner).with_latency(LatencyProfile {
            init: Duration::from_secs(60),
            ..LatencyProfile::instant()
        }));
        let fast = instant(AdChannel::Rewarded);

        let mut cfg = MediationConfig::default();
        cfg.init_timeout = Duration::from_secs(1);
        cfg.barrier_policy = BarrierPolicy::Strict;
        let engine = engine_with(cfg, &[slow, fast]);

        assert_eq!(
            engine.initialize().await,
            Err(MediationError::InitFailed { failed: vec![AdChannel::Banner] })
        );
        assert!(!engine.is_ready());
        assert!(engine.init_progress().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_fill_is_not_shown() {
        let p = instant(AdChannel::Interstitial);
        let engine = engine_with(MediationConfig::default(), &[Arc::clone(&p)]);
        let events = record(engine.bus());
        engine.initialize().await.unwrap();
        engine.load_ad(AdChannel::Interstitial, None).unwrap();
        settle().await;

        p.expire();
        assert!(!engine.is_loaded(AdChannel::Interstitial));
        assert_eq!(
            engine.show_ad(AdChannel::Interstitial).await,
            Err(MediationError::InvalidState {
                channel: AdChannel::Interstitial,
                state: AdRequestState::Idle,
                op: "show",
            })
        );
        assert_eq!(p.show_calls(), 0);
        assert_eq!(*events.lock().unwrap(), vec![(EventKind::AdLoaded, true)]);

        engine.load_ad(AdChannel::Interstitial, None).unwrap();
        settle().await;
        assert!(engine.show_ad(AdChannel::Interstitial).await.unwrap().displayed);
        assert_eq!(p.show_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_banner_fill_is_not_shown() {
        let p = instant(AdChannel::Banner);
        let engine = engine_with(MediationConfig::default(), &[Arc::clone(&p)]);
        let events = record(engine.bus());
        engine.initialize().await.unwrap();
        engine.load_ad(AdChannel::Banner, None).unwrap();
        settle().await;

        p.expire();
        assert!(engine.show_banner(BannerPosition::Top).is_err());
        settle().await;
        assert_eq!(p.show_calls(), 0);
        assert_eq!(engine.state(AdChannel::Banner), AdRequestState::Idle);
        assert_eq!(*events.lock().unwrap(), vec![(EventKind::AdLoaded, true)]);
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_and_bound_unit_ids_reach_the_backend() {
        let p = instant(AdChannel::Rewarded);
        let engine = MediationEngine::builder(MediationConfig::default())
            .with_provider_unit(Arc::clone(&p) as Arc<dyn AdProvider>, "bound-unit")
            .build();
        let mut rx = engine.bus().receiver();
        engine.initialize().await.unwrap();

        engine.load_ad(AdChannel::Rewarded, None).unwrap();
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.result().unwrap().unit_id.as_deref(), Some("bound-unit"));

        engine.show_ad(AdChannel::Rewarded).await.unwrap();
        while rx.try_recv().is_ok() {}

        engine.load_ad(AdChannel::Rewarded, Some("explicit-unit")).unwrap();
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.result().unwrap().unit_id.as_deref(), Some("explicit-unit"));
    }

    #[tokio::test(start_paused = true)]
    async fn runtime_unit_id_replaces_the_bound_one() {
        let p = instant(AdChannel::Rewarded);
        let engine = MediationEngine::builder(MediationConfig::default())
            .with_provider_unit(Arc::clone(&p) as Arc<dyn AdProvider>, "bound-unit")
            .build();
        let mut rx = engine.bus().receiver();
        engine.initialize().await.unwrap();

        engine.set_ad_unit_id(AdChannel::Rewarded, "runtime-unit").unwrap();
        engine.load_ad(AdChannel::Rewarded, None).unwrap();
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::AdLoaded);
        assert_eq!(ev.result().unwrap().unit_id.as_deref(), Some("runtime-unit"));
    }

    #[tokio::test(start_paused = true)]
    async fn revenue_is_published_on_its_own_topic() {
        let p = Arc::new(
            SimulatedProvider::new(AdChannel::Interstitial)
                .with_latency(LatencyProfile::instant())
                .with_revenue(0.015),
        );
        let engine = engine_with(MediationConfig::default(), &[p]);
        let revenue = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&revenue);
        engine.bus().subscribe_fn([EventKind::AdRevenue], "revenue", move |ev| {
            if let Some(r) = ev.revenue_record() {
                sink.lock().unwrap().push((r.channel, r.amount));
            }
        });

        engine.initialize().await.unwrap();
        engine.load_ad(AdChannel::Interstitial, None).unwrap();
        settle().await;
        engine.show_ad(AdChannel::Interstitial).await.unwrap();

        assert_eq!(*revenue.lock().unwrap(), vec![(AdChannel::Interstitial, 0.015)]);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_rejects_further_calls() {
        let engine = engine_with(MediationConfig::default(), &[instant(AdChannel::Banner)]);
        engine.initialize().await.unwrap();
        engine.shutdown();

        assert!(engine.is_shut_down());
        assert_eq!(engine.initialize().await, Err(MediationError::ShutDown));
        assert_eq!(
            engine.load_ad(AdChannel::Banner, None),
            Err(MediationError::ShutDown)
        );
        assert_eq!(
            engine.show_banner(BannerPosition::Top),
            Err(MediationError::ShutDown)
        );
        assert_eq!(engine.hide_banner(), Err(MediationError::ShutDown));
    }

    #[tokio::test(start_paused = true)]
    async fn hide_after_shutdown_leaves_backend_alone() {
        let banner = Arc::new(RecordingBanner::new(Duration::ZERO));
        let engine = MediationEngine::builder(MediationConfig::default())
            .with_provider(Arc::clone(&banner) as Arc<dyn AdProvider>)
            .build();
        let events = record(engine.bus());
        engine.initialize().await.unwrap();
        engine.load_ad(AdChannel::Banner, None).unwrap();
        settle().await;
        engine.show_banner(BannerPosition::Top).unwrap();
        settle().await;

        engine.shutdown();
        assert_eq!(engine.hide_banner(), Err(MediationError::ShutDown));
        assert_eq!(banner.calls(), vec!["show"]);
        assert_eq!(
            events.lock().unwrap().last(),
            Some(&(EventKind::AdShown, true))
        );
    }

    /// Banner backend that records the order of show and hide calls.
    struct RecordingBanner {
        show_latency: Duration,
        calls: Mutex<Vec<&'static str>>,
    }

    impl RecordingBanner {
        fn new(show_latency: Duration) -> Self {
            Self {
                show_latency,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AdProvider for RecordingBanner {
        fn channel(&self) -> AdChannel {
            AdChannel::Banner
        }
        fn network(&self) -> Network {
            Network::AdMob
        }
        async fn initialize(&self, _cfg: &MediationConfig) -> Result<(), ProviderError> {
            Ok(())
        }
        async fn load(&self, _unit_id: Option<&str>) -> Result<(), ProviderError> {
            Ok(())
        }
        async fn show(&self, _imp: Impression) -> Result<ShowReport, ProviderError> {
            self.calls.lock().unwrap().push("show");
            time::sleep(self.show_latency).await;
            Ok(ShowReport::closed())
        }
        fn is_loaded(&self) -> bool {
            true
        }
        fn set_unit_id(&self, _unit_id: &str) {}
        fn hide(&self) {
            self.calls.lock().unwrap().push("hide");
        }
    }

    async fn banner_engine(banner: &Arc<RecordingBanner>) -> Arc<MediationEngine> {
        let engine = MediationEngine::builder(MediationConfig::default())
            .with_provider(Arc::clone(banner) as Arc<dyn AdProvider>)
            .build();
        engine.initialize().await.unwrap();
        engine.load_ad(AdChannel::Banner, None).unwrap();
        settle().await;
        engine
    }

    #[tokio::test(start_paused = true)]
    async fn hide_right_after_show_keeps_backend_hidden() {
        let banner = Arc::new(RecordingBanner::new(Duration::ZERO));
        let engine = banner_engine(&banner).await;

        engine.show_banner(BannerPosition::Top).unwrap();
        assert_eq!(engine.hide_banner(), Ok(true));
        settle().await;

        assert_eq!(banner.calls(), vec!["hide"]);
        assert!(engine.is_loaded(AdChannel::Banner));
    }

    #[tokio::test(start_paused = true)]
    async fn hide_during_slow_show_hides_again() {
        let banner = Arc::new(RecordingBanner::new(Duration::from_millis(500)));
        let engine = banner_engine(&banner).await;

        engine.show_banner(BannerPosition::Top).unwrap();
        settle().await;
        assert_eq!(engine.hide_banner(), Ok(true));
        time::sleep(Duration::from_secs(1)).await;

        assert_eq!(banner.calls(), vec!["show", "hide", "hide"]);
    }

    #[tokio::test(start_paused = true)]
    async fn moving_banner_skips_the_superseded_show() {
        let banner = Arc::new(RecordingBanner::new(Duration::ZERO));
        let engine = banner_engine(&banner).await;

        engine.show_banner(BannerPosition::Top).unwrap();
        engine.show_banner(BannerPosition::Bottom).unwrap();
        settle().await;

        assert_eq!(banner.calls(), vec!["show"]);
        assert_eq!(
            engine.machines[AdChannel::Banner.index()].get().unwrap().banner(),
            (true, BannerPosition::Bottom)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn banner_show_ad_resolves_immediately() {
        let engine = engine_with(MediationConfig::default(), &[instant(AdChannel::Banner)]);
        let events = record(engine.bus());
        engine.initialize().await.unwrap();
        engine.load_ad(AdChannel::Banner, None).unwrap();
        settle().await;

        let outcome = engine.show_ad(AdChannel::Banner).await.unwrap();
        assert!(outcome.displayed);
        engine.show_banner(BannerPosition::Top).unwrap();
        assert_eq!(engine.hide_banner(), Ok(true));
        assert_eq!(engine.hide_banner(), Ok(false));
        assert_eq!(engine.state(AdChannel::Banner), AdRequestState::Loaded);

        let kinds: Vec<_> = events.lock().unwrap().iter().map(|(k, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![EventKind::AdLoaded, EventKind::AdShown, EventKind::AdClosed]
        );
    }
}
