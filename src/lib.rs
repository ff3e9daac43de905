//! # admediator
//!
//! **admediator** is an ad mediation orchestration library for Rust.
//!
//! It puts interchangeable ad backends behind one provider contract and
//! coordinates them: a fixed provider registry, a per-channel load/show state
//! machine, a multi-provider initialization barrier and an event bus that fans
//! lifecycle notifications out to any number of subscribers.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐         ┌──────────────┐
//!     │  AdProvider  │   │  AdProvider  │   ...   │  AdProvider  │
//!     │   (banner)   │   │  (rewarded)  │         │  (app-open)  │
//!     └──────┬───────┘   └──────┬───────┘         └──────┬───────┘
//!            ▼                  ▼                        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  MediationEngine                                                  │
//! │  - ProviderRegistry (one binding per channel)                     │
//! │  - InitBarrier (N provider initializations, fires once)           │
//! │  - ChannelStateMachine ×5 (created on first load)                 │
//! │  - Bus (synchronous fan-out + broadcast mirror)                   │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        │ initialize()     │ load_ad()        │ show_ad()
//!        ▼                  ▼                  ▼
//!   provider.initialize  provider.load     provider.show
//!        │                  │                  │
//!        │ barrier.arrive   │ Publishes:       │ Publishes:
//!        │                  │ - AdLoaded       │ - AdShown
//!        │                  │ - AdFailedToLoad │ - AdRewarded
//!        │                  │                  │ - AdClosed
//!        │                  │                  │ - AdRevenue (backend)
//!        ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                     Bus (capacity: bus_capacity)                  │
//! └─────────────┬──────────────────────────────────────┬──────────────┘
//!               ▼                                      ▼
//!        SubscriberSet                         broadcast receivers
//!     (in order, panic-isolated)               (Bus::receiver())
//!       ┌─────────┼─────────┐
//!       ▼         ▼         ▼
//!    sub1.on   sub2.on   subN.on
//!    _event()  _event()  _event()
//! ```
//!
//! ### Lifecycle of one channel
//! ```text
//! Idle ──load_ad──► Loading ──ok──► Loaded ──show_ad──► Showing ──close──► Idle
//!                      │                                   │
//!                      └──err/timeout──► Idle              └──display failed──► Idle
//!
//! Banner: Loaded ──show_banner/hide_banner──► Loaded (visibility only)
//! ```
//!
//! ## Features
//! | Area               | Description                                                   | Key types / traits                          |
//! |--------------------|---------------------------------------------------------------|---------------------------------------------|
//! | **Providers**      | One async contract for every ad backend.                      | [`AdProvider`], [`SimulatedProvider`]       |
//! | **Orchestration**  | Initialization barrier, load/show routing, app lifecycle.     | [`MediationEngine`], [`EngineBuilder`]      |
//! | **State**          | Per-channel load/show state machine.                          | [`AdRequestState`], [`ChannelStateMachine`] |
//! | **Events**         | Typed topics with subscribe/unsubscribe handles.              | [`Bus`], [`Event`], [`EventKind`]           |
//! | **Subscriber API** | Hook into ad lifecycle events (UI, analytics, rewards).       | [`Subscribe`], [`SubscriberFn`]             |
//! | **Errors**         | Typed errors for orchestration and backend operations.        | [`MediationError`], [`ProviderError`]       |
//! | **Configuration**  | Per-channel networks and unit ids, timeouts, barrier policy.  | [`MediationConfig`], [`BarrierPolicy`]      |
//!
//! ## Optional features
//! - `logging`: exports a built-in [`LogWriter`] subscriber that renders events
//!   as `tracing` records _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use admediator::{AdChannel, EventKind, MediationConfig, MediationEngine};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = MediationEngine::builder(MediationConfig::default())
//!         .with_simulated_providers()
//!         .build();
//!
//!     // React to rewards.
//!     engine.bus().subscribe_fn([EventKind::AdRewarded], "wallet", |ev| {
//!         println!("reward on {:?}", ev.channel());
//!     });
//!
//!     engine.initialize().await?;
//!     engine.load_ad(AdChannel::Rewarded, None)?;
//!     Ok(())
//! }
//! ```
mod ads;
mod core;
mod error;
mod events;
mod providers;
mod subscribers;

// ---- Public re-exports ----

pub use ads::{AdChannel, AdResult, AdRevenue, BannerPosition, RevenuePrecision};
pub use crate::core::{
    AdRequestState, BannerTicket, BarrierOutcome, BarrierPolicy, ChannelConfig,
    ChannelStateMachine, EngineBuilder, InitProgress, LifecycleSignal, MediationConfig,
    MediationEngine, Network, ProviderBinding, ProviderRegistry, ShowOutcome,
};
pub use error::{MediationError, ProviderError};
pub use events::{Bus, Event, EventKind, EventPayload, SubscriptionId};
pub use providers::{
    AdProvider, FillBehavior, Impression, LatencyProfile, ProviderRef, RevenueReporter, Reward,
    ShowReport, SimulatedProvider, WatchBehavior,
};
pub use subscribers::{Subscribe, SubscriberFn};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
