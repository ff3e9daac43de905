//! # Example: custom_subscriber
//!
//! Demonstrates how to build and attach custom event subscribers.
//!
//! Shows how to:
//! - Implement the [`Subscribe`] trait for a stateful subscriber (reward ledger).
//! - Subscribe to selected topics only (revenue totals).
//! - Attach the built-in [`LogWriter`].
//! - Survive a panicking subscriber: delivery continues and a
//!   `SubscriberPanicked` event is published.
//!
//! ## Flow
//! ```text
//! show_ad(Rewarded) ──► Bus.publish(AdShown / AdRevenue / AdRewarded / AdClosed)
//!     └─► SubscriberSet::deliver (in subscription order)
//!           ├─► LogWriter.on_event()
//!           ├─► Flaky.on_event()        (panics on AdShown → SubscriberPanicked)
//!           ├─► RewardLedger.on_event()
//!           └─► RevenueTotals.on_event()
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example custom_subscriber --features logging
//! ```

use std::sync::{Arc, Mutex};

use admediator::{
    AdChannel, Event, EventKind, EventPayload, LatencyProfile, LogWriter, MediationConfig,
    MediationEngine, SimulatedProvider, Subscribe,
};

/// Counts rewarded completions per channel.
#[derive(Default)]
struct RewardLedger {
    rewards: Mutex<Vec<AdChannel>>,
}

impl Subscribe for RewardLedger {
    fn on_event(&self, ev: &Event) {
        if ev.kind != EventKind::AdRewarded {
            return;
        }
        if let Some(channel) = ev.channel() {
            self.rewards.lock().unwrap().push(channel);
        }
    }

    fn name(&self) -> &'static str {
        "reward-ledger"
    }
}

/// Sums impression revenue.
#[derive(Default)]
struct RevenueTotals {
    usd: Mutex<f64>,
}

impl Subscribe for RevenueTotals {
    fn on_event(&self, ev: &Event) {
        if let EventPayload::Revenue(rev) = &ev.payload {
            *self.usd.lock().unwrap() += rev.amount;
        }
    }

    fn name(&self) -> &'static str {
        "revenue-totals"
    }
}

/// Panics on every `AdShown`.
struct Flaky;

impl Subscribe for Flaky {
    fn on_event(&self, ev: &Event) {
        if ev.kind == EventKind::AdShown {
            panic!("flaky subscriber");
        }
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(true).init();

    let ledger = Arc::new(RewardLedger::default());
    let revenue = Arc::new(RevenueTotals::default());

    let rewarded = Arc::new(
        SimulatedProvider::new(AdChannel::Rewarded)
            .with_latency(LatencyProfile {
                show: std::time::Duration::from_millis(300),
                ..LatencyProfile::reference(AdChannel::Rewarded)
            })
            .with_revenue(0.0125),
    );

    let engine = MediationEngine::builder(MediationConfig::default())
        .with_provider(rewarded)
        .with_subscriber(Arc::new(LogWriter::new()))
        .with_subscriber_for([EventKind::SubscriberPanicked], Arc::new(LogWriter::new()))
        .with_subscriber(Arc::new(Flaky))
        .with_subscriber(ledger.clone())
        .with_subscriber_for([EventKind::AdRevenue], revenue.clone())
        .build();

    engine.initialize().await?;

    for round in 1..=2 {
        let mut rx = engine.bus().receiver();
        engine.load_ad(AdChannel::Rewarded, None)?;
        while rx.recv().await?.kind != EventKind::AdLoaded {}

        let outcome = engine.show_ad(AdChannel::Rewarded).await?;
        println!("round {round}: displayed={} rewarded={}", outcome.displayed, outcome.rewarded());
    }

    println!("rewards: {:?}", ledger.rewards.lock().unwrap());
    println!("revenue: {:.4} USD", *revenue.usd.lock().unwrap());

    engine.shutdown();
    Ok(())
}
