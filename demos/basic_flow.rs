//! # Example: basic_flow
//!
//! End-to-end walk through one engine with simulated backends on every channel.
//!
//! Demonstrates how to:
//! - Build a [`MediationEngine`] with [`EngineBuilder::with_simulated_providers`].
//! - Wait for the initialization barrier.
//! - Load a rewarded ad, wait for `AdLoaded`, show it and read the reward.
//! - Show and hide a banner.
//!
//! ## Flow
//! ```text
//! MediationEngine::initialize()
//!     └─► 5 × provider.initialize() ──► InitBarrier fires ──► ready
//! load_ad(Rewarded)
//!     └─► Loading ──(2s)──► Loaded ──► publish(AdLoaded)
//! show_ad(Rewarded)
//!     ├─► publish(AdShown)
//!     ├─► (4s) user watches to the end
//!     ├─► publish(AdRewarded)
//!     └─► Idle ──► publish(AdClosed)
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=admediator=debug cargo run --example basic_flow
//! ```

use admediator::{
    AdChannel, BannerPosition, EventKind, MediationConfig, MediationEngine, MediationError,
};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // 1. Engine over the default config (AdMob test units everywhere)
    let engine = MediationEngine::builder(MediationConfig::default())
        .with_simulated_providers()
        .build();

    // 2. Print every ad event
    engine
        .bus()
        .subscribe_fn(EventKind::AD_TOPICS, "console", |ev| {
            println!("[event #{}] {} {:?}", ev.seq, ev.kind.as_label(), ev.channel());
        });

    // 3. Calls before initialize are rejected
    if let Err(MediationError::NotInitialized) = engine.load_ad(AdChannel::Rewarded, None) {
        println!("load rejected before initialize");
    }

    // 4. Initialize all five providers
    engine.initialize().await?;
    println!("ready: {:?}", engine.init_progress());

    // 5. Load and wait for the fill
    let mut rx = engine.bus().receiver();
    engine.load_ad(AdChannel::Rewarded, None)?;
    engine.load_ad(AdChannel::Banner, None)?;
    let mut pending = 2;
    while pending > 0 {
        let ev = rx.recv().await?;
        if matches!(ev.kind, EventKind::AdLoaded | EventKind::AdFailedToLoad) {
            pending -= 1;
        }
    }

    // 6. Show the rewarded ad
    let outcome = engine.show_ad(AdChannel::Rewarded).await?;
    match &outcome.reward {
        Some(reward) => println!("earned {} {}", reward.amount, reward.label),
        None => println!("no reward"),
    }
    println!("rewarded channel is now {}", engine.state(AdChannel::Rewarded));

    // 7. Banner stays loaded across show/hide
    engine.show_banner(BannerPosition::Top)?;
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    engine.hide_banner()?;
    println!("banner is {}", engine.state(AdChannel::Banner));

    engine.shutdown();
    Ok(())
}
