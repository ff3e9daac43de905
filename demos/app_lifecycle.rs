//! # Example: app_lifecycle
//!
//! Demonstrates the app-open flow driven by host lifecycle callbacks.
//!
//! Shows how to:
//! - Feed pause/focus callbacks into [`MediationEngine::spawn_lifecycle_listener`].
//! - Get an app-open ad shown automatically when the app returns to the
//!   foreground with a fill loaded.
//! - Stop the listener with [`MediationEngine::shutdown`].
//!
//! ## Flow
//! ```text
//! host ──mpsc──► lifecycle listener ──► on_lifecycle(signal)
//!                                          ├─ Paused / FocusLost  → ignored
//!                                          └─ Resumed / FocusGained
//!                                               └─ AppOpen loaded? → start_show(AppOpen)
//!                                                    └─► AdShown … AdClosed on the bus
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example app_lifecycle
//! ```

use std::time::Duration;

use admediator::{
    AdChannel, EventKind, LifecycleSignal, MediationConfig, MediationEngine,
};
use tokio::sync::mpsc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let engine = MediationEngine::builder(MediationConfig::default())
        .with_simulated_providers()
        .build();
    engine
        .bus()
        .subscribe_fn([EventKind::AdShown, EventKind::AdClosed], "app-open", |ev| {
            if ev.channel() == Some(AdChannel::AppOpen) {
                println!("[app-open] {}", ev.kind.as_label());
            }
        });

    let (tx, rx) = mpsc::channel(8);
    let listener = engine.spawn_lifecycle_listener(rx);

    engine.initialize().await?;

    // Nothing loaded yet: coming back to the foreground shows nothing.
    tx.send(LifecycleSignal::Paused).await?;
    tx.send(LifecycleSignal::Resumed).await?;

    let mut events = engine.bus().receiver();
    engine.load_ad(AdChannel::AppOpen, None)?;
    while events.recv().await?.kind != EventKind::AdLoaded {}
    println!("app-open loaded: {}", engine.is_loaded(AdChannel::AppOpen));

    // The user leaves and returns.
    tx.send(LifecycleSignal::from_focus(false)).await?;
    tx.send(LifecycleSignal::from_focus(true)).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    println!("app-open state: {}", engine.state(AdChannel::AppOpen));

    while events.recv().await?.kind != EventKind::AdClosed {}
    println!("app-open state: {}", engine.state(AdChannel::AppOpen));

    engine.shutdown();
    listener.await?;
    Ok(())
}
