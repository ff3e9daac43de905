//! Ad backends.
//!
//! ## Contents
//! - [`AdProvider`] the capability every backend implements (initialize, load,
//!   show, query-loaded, set-unit-id)
//! - [`Impression`], [`ShowReport`], [`Reward`], [`RevenueReporter`] values
//!   exchanged during a show
//! - [`SimulatedProvider`] latency-faking reference backend
//!
//! ## Quick wiring
//! ```text
//! EngineBuilder::with_provider(Arc<dyn AdProvider>)
//!      └─► ProviderRegistry[provider.channel()] = ProviderBinding
//!           └─► MediationEngine dispatches initialize/load/show through the binding
//! ```

mod provider;
mod simulated;

pub use provider::{AdProvider, Impression, ProviderRef, RevenueReporter, Reward, ShowReport};
pub use simulated::{FillBehavior, LatencyProfile, SimulatedProvider, WatchBehavior};
