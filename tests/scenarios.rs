//! End-to-end scenarios over simulated backends with reference latencies.
//!
//! Every test runs on tokio's paused clock, so the multi-second latencies cost
//! no wall-clock time.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use admediator::{
    AdChannel, AdProvider, AdRequestState, BarrierPolicy, BannerPosition, Bus, EventKind,
    FillBehavior, InitProgress, LatencyProfile, LifecycleSignal, MediationConfig, MediationEngine,
    MediationError, ProviderError, SimulatedProvider,
};
use tokio::time::{self, Instant};

fn simulated_all() -> Vec<Arc<SimulatedProvider>> {
    AdChannel::ALL
        .iter()
        .map(|&ch| Arc::new(SimulatedProvider::new(ch)))
        .collect()
}

fn build(cfg: MediationConfig, providers: &[Arc<SimulatedProvider>]) -> Arc<MediationEngine> {
    MediationEngine::builder(cfg)
        .with_providers(providers.iter().map(|p| Arc::clone(p) as Arc<dyn AdProvider>))
        .build()
}

fn record(bus: &Bus) -> Arc<Mutex<Vec<EventKind>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    bus.subscribe_fn(EventKind::AD_TOPICS, "scenario", move |ev| {
        sink.lock().unwrap().push(ev.kind);
    });
    seen
}

#[tokio::test(start_paused = true)]
async fn ready_only_after_every_provider_completes() {
    let providers: Vec<_> = AdChannel::ALL
        .iter()
        .enumerate()
        .map(|(i, &ch)| {
            Arc::new(SimulatedProvider::new(ch).with_latency(LatencyProfile {
                init: Duration::from_millis(100 * (i as u64 + 1)),
                ..LatencyProfile::reference(ch)
            }))
        })
        .collect();
    let engine = build(MediationConfig::default(), &providers);

    let init = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.initialize().await })
    };

    time::sleep(Duration::from_millis(250)).await;
    assert!(!engine.is_ready());
    assert_eq!(
        engine.init_progress(),
        Some(InitProgress { completed: 2, total: 5 })
    );

    time::sleep(Duration::from_millis(200)).await;
    assert!(!engine.is_ready());
    assert_eq!(engine.init_progress().map(|p| p.completed), Some(4));

    init.await.unwrap().unwrap();
    assert!(engine.is_ready());
    assert!(engine.init_progress().is_some_and(|p| p.is_complete()));
}

#[tokio::test(start_paused = true)]
async fn rewarded_cycle_publishes_reward_before_close() {
    let providers = simulated_all();
    let engine = build(MediationConfig::default(), &providers);
    let events = record(engine.bus());
    engine.initialize().await.unwrap();

    engine.load_ad(AdChannel::Rewarded, None).unwrap();
    assert_eq!(engine.state(AdChannel::Rewarded), AdRequestState::Loading);

    time::sleep(Duration::from_millis(2_001)).await;
    assert_eq!(engine.state(AdChannel::Rewarded), AdRequestState::Loaded);
    events.lock().unwrap().clear();

    let started = Instant::now();
    let outcome = engine.show_ad(AdChannel::Rewarded).await.unwrap();
    assert!(started.elapsed() >= Duration::from_secs(4));
    assert!(outcome.displayed);
    assert!(outcome.rewarded());

    assert_eq!(
        *events.lock().unwrap(),
        vec![EventKind::AdShown, EventKind::AdRewarded, EventKind::AdClosed]
    );
    assert_eq!(engine.state(AdChannel::Rewarded), AdRequestState::Idle);
    assert!(!engine.is_loaded(AdChannel::Rewarded));
}

#[tokio::test(start_paused = true)]
async fn show_without_load_fails_without_reaching_the_backend() {
    let providers = simulated_all();
    let engine = build(MediationConfig::default(), &providers);
    let events = record(engine.bus());
    engine.initialize().await.unwrap();

    let err = engine.show_ad(AdChannel::Interstitial).await.unwrap_err();
    assert_eq!(
        err,
        MediationError::InvalidState {
            channel: AdChannel::Interstitial,
            state: AdRequestState::Idle,
            op: "show",
        }
    );
    assert_eq!(engine.state(AdChannel::Interstitial), AdRequestState::Idle);
    assert_eq!(providers[AdChannel::Interstitial.index()].show_calls(), 0);
    assert!(events.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn focus_gained_auto_shows_loaded_app_open() {
    let providers = simulated_all();
    let engine = build(MediationConfig::default(), &providers);
    engine.initialize().await.unwrap();

    // Nothing loaded: foreground is a no-op.
    assert!(!engine.on_application_focus(true));

    engine.load_ad(AdChannel::AppOpen, None).unwrap();
    time::sleep(Duration::from_millis(1_001)).await;
    assert!(engine.is_loaded(AdChannel::AppOpen));

    assert!(!engine.on_application_focus(false));
    assert!(engine.on_application_focus(true));
    assert_eq!(engine.state(AdChannel::AppOpen), AdRequestState::Showing);

    // A second foreground signal does not start another show.
    assert!(!engine.on_application_pause(false));

    time::sleep(Duration::from_millis(2_001)).await;
    assert_eq!(engine.state(AdChannel::AppOpen), AdRequestState::Idle);
    assert_eq!(providers[AdChannel::AppOpen.index()].show_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn lifecycle_listener_drives_app_open() {
    let providers = simulated_all();
    let engine = build(MediationConfig::default(), &providers);
    engine.initialize().await.unwrap();
    engine.load_ad(AdChannel::AppOpen, None).unwrap();
    time::sleep(Duration::from_millis(1_001)).await;

    let (tx, rx) = tokio::sync::mpsc::channel(4);
    let listener = engine.spawn_lifecycle_listener(rx);
    tx.send(LifecycleSignal::Resumed).await.unwrap();
    time::sleep(Duration::from_millis(10)).await;
    assert_eq!(engine.state(AdChannel::AppOpen), AdRequestState::Showing);

    engine.shutdown();
    listener.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn load_timeout_returns_channel_to_idle() {
    let hanging = Arc::new(
        SimulatedProvider::new(AdChannel::Interstitial).with_fill(FillBehavior::Hang),
    );
    let mut cfg = MediationConfig::default();
    cfg.load_timeout = Duration::from_secs(5);
    let engine = build(cfg, &[Arc::clone(&hanging)]);
    let mut rx = engine.bus().receiver();
    engine.initialize().await.unwrap();

    let started = Instant::now();
    engine.load_ad(AdChannel::Interstitial, None).unwrap();
    let ev = rx.recv().await.unwrap();

    assert_eq!(ev.kind, EventKind::AdFailedToLoad);
    assert!(started.elapsed() >= Duration::from_secs(5));
    assert!(started.elapsed() < Duration::from_secs(6));
    let expected = ProviderError::Timeout { timeout: Duration::from_secs(5) }.to_string();
    assert_eq!(ev.result().unwrap().error.as_deref(), Some(expected.as_str()));
    assert_eq!(engine.state(AdChannel::Interstitial), AdRequestState::Idle);

    hanging.set_fill(FillBehavior::Fill);
    engine.load_ad(AdChannel::Interstitial, None).unwrap();
    assert_eq!(rx.recv().await.unwrap().kind, EventKind::AdLoaded);
}

#[tokio::test(start_paused = true)]
async fn permissive_barrier_is_ready_despite_failures() {
    let mut providers = simulated_all();
    providers[AdChannel::Banner.index()] =
        Arc::new(SimulatedProvider::new(AdChannel::Banner).failing_init());
    let engine = build(MediationConfig::default(), &providers);

    engine.initialize().await.unwrap();
    assert!(engine.is_ready());

    // The failed backend refuses loads; the failure is reported on the bus.
    let mut rx = engine.bus().receiver();
    engine.load_ad(AdChannel::Banner, None).unwrap();
    let ev = rx.recv().await.unwrap();
    assert_eq!(ev.kind, EventKind::AdFailedToLoad);
    assert_eq!(engine.state(AdChannel::Banner), AdRequestState::Idle);
}

#[tokio::test(start_paused = true)]
async fn strict_barrier_fails_then_allows_retry() {
    let flaky = Arc::new(SimulatedProvider::new(AdChannel::Rewarded).failing_init());
    let steady = Arc::new(SimulatedProvider::new(AdChannel::Interstitial));
    let mut cfg = MediationConfig::default();
    cfg.barrier_policy = BarrierPolicy::Strict;
    let engine = build(cfg, &[Arc::clone(&flaky), Arc::clone(&steady)]);

    assert_eq!(
        engine.initialize().await,
        Err(MediationError::InitFailed { failed: vec![AdChannel::Rewarded] })
    );
    assert!(!engine.is_ready());
    assert_eq!(
        engine.load_ad(AdChannel::Interstitial, None),
        Err(MediationError::NotInitialized)
    );

    flaky.recover_init();
    engine.initialize().await.unwrap();
    assert!(engine.is_ready());
    assert_eq!(flaky.init_calls(), 2);
    assert_eq!(steady.init_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn concurrent_initialize_is_rejected() {
    let providers = simulated_all();
    let engine = build(MediationConfig::default(), &providers);

    let first = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.initialize().await })
    };
    time::sleep(Duration::from_millis(10)).await;

    assert_eq!(engine.initialize().await, Err(MediationError::InitInProgress));
    first.await.unwrap().unwrap();
    assert!(providers.iter().all(|p| p.init_calls() == 1));
}

#[tokio::test(start_paused = true)]
async fn second_initialize_does_not_touch_providers() {
    let providers = simulated_all();
    let engine = build(MediationConfig::default(), &providers);

    engine.initialize().await.unwrap();
    let started = Instant::now();
    engine.initialize().await.unwrap();

    assert_eq!(started.elapsed(), Duration::ZERO);
    assert!(providers.iter().all(|p| p.init_calls() == 1));
}

#[tokio::test(start_paused = true)]
async fn banner_stays_loaded_across_show_and_hide() {
    let providers = simulated_all();
    let engine = build(MediationConfig::default(), &providers);
    let events = record(engine.bus());
    engine.initialize().await.unwrap();

    assert!(engine.show_banner(BannerPosition::Bottom).is_err());

    engine.load_ad(AdChannel::Banner, None).unwrap();
    time::sleep(Duration::from_millis(1_001)).await;

    for _ in 0..2 {
        engine.show_banner(BannerPosition::Top).unwrap();
        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(engine.state(AdChannel::Banner), AdRequestState::Loaded);
        assert_eq!(engine.hide_banner(), Ok(true));
        assert_eq!(engine.state(AdChannel::Banner), AdRequestState::Loaded);
    }
    assert!(engine.is_loaded(AdChannel::Banner));

    assert_eq!(
        *events.lock().unwrap(),
        vec![
            EventKind::AdLoaded,
            EventKind::AdShown,
            EventKind::AdClosed,
            EventKind::AdShown,
            EventKind::AdClosed,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn panicking_subscriber_does_not_block_delivery() {
    let providers = simulated_all();
    let engine = build(MediationConfig::default(), &providers);
    engine
        .bus()
        .subscribe_fn([EventKind::AdLoaded], "broken-ui", |_| panic!("ui crashed"));
    let events = record(engine.bus());
    let faults = Arc::new(Mutex::new(0));
    let sink = Arc::clone(&faults);
    engine
        .bus()
        .subscribe_fn([EventKind::SubscriberPanicked], "faults", move |_| {
            *sink.lock().unwrap() += 1;
        });

    engine.initialize().await.unwrap();
    engine.load_ad(AdChannel::Interstitial, None).unwrap();
    time::sleep(Duration::from_millis(1_501)).await;

    assert_eq!(*events.lock().unwrap(), vec![EventKind::AdLoaded]);
    assert_eq!(*faults.lock().unwrap(), 1);
    assert_eq!(engine.state(AdChannel::Interstitial), AdRequestState::Loaded);
}
