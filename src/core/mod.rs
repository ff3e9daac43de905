//! Runtime core: orchestration and lifecycle.
//!
//! This module contains the mediation runtime. The main public API is
//! [`MediationEngine`], which initializes providers, runs loads and shows, and
//! reports every outcome on the bus.
//!
//! Internal modules:
//! - [`config`]: engine configuration and per-channel provider selection;
//! - [`registry`]: fixed channel → provider table;
//! - [`barrier`]: counts provider initializations and fires once;
//! - [`channel`]: per-channel load/show state machine;
//! - [`runner`]: executes one load or show with timeout and event publishing;
//! - [`engine`]: the engine itself;
//! - [`builder`]: wires providers and subscribers into an engine;
//! - [`lifecycle`]: app foreground/background hook.

mod barrier;
mod builder;
mod channel;
mod config;
mod engine;
mod lifecycle;
mod registry;
mod runner;

pub use barrier::{BarrierOutcome, BarrierPolicy, InitProgress};
pub use builder::EngineBuilder;
pub use channel::{AdRequestState, BannerTicket, ChannelStateMachine};
pub use config::{ChannelConfig, MediationConfig, Network};
pub use engine::MediationEngine;
pub use lifecycle::LifecycleSignal;
pub use registry::{ProviderBinding, ProviderRegistry};
pub use runner::ShowOutcome;
