//! # Run one provider operation and report it.
//!
//! Drives a single load or show of a bound provider, updates the channel state
//! machine and publishes the lifecycle events to [`Bus`].
//!
//! - **Execute ONE operation** on the provider
//! - **Apply timeout** to loads if configured (wraps in `tokio::time::timeout`)
//! - **Catch panics** from the backend and treat them as backend errors
//! - **Update state first**, then publish, so subscribers observe the new state
//!
//! ## Event flow
//!
//! ```text
//! Load:
//!   provider.load() → Ok              → Loaded → publish AdLoaded
//!   provider.load() → Err / panic     → Idle   → publish AdFailedToLoad
//!   timeout exceeded                  → Idle   → publish AdFailedToLoad (timeout)
//!
//! Show (full-screen, AdShown already published by the engine):
//!   provider.show() → Ok(reward)      → publish AdRewarded → Idle → publish AdClosed
//!   provider.show() → Ok(no reward)   → Idle → publish AdClosed
//!   provider.show() → Err / panic     → Idle → publish AdClosed (success = false)
//!
//! Show (banner, tagged with a visibility generation):
//!   generation already superseded     → provider not called
//!   provider.show() → Ok              → stays visible (re-hidden if hidden meanwhile)
//!   provider.show() → Err / panic     → hidden → publish AdClosed (success = false)
//! ```
//!
//! ## Rules
//! - Always publishes **exactly one** terminal event per load and per show
//! - `AdRewarded` only for channels that grant rewards, and always before `AdClosed`
//! - A completion that finds the machine in an unexpected state is dropped

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::time;
use tracing::{debug, warn};

use crate::ads::AdResult;
use crate::core::channel::ChannelStateMachine;
use crate::core::registry::ProviderBinding;
use crate::error::ProviderError;
use crate::events::{Bus, Event};
use crate::providers::{Impression, Reward};

/// How a show ended.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShowOutcome {
    /// The ad reached the screen and closed normally.
    pub displayed: bool,
    /// Reward earned during the show, if any.
    pub reward: Option<Reward>,
}

impl ShowOutcome {
    pub fn rewarded(&self) -> bool {
        self.reward.is_some()
    }
}

/// Executes one load of `binding` and publishes its terminal event.
///
/// ### Flow
/// 1. Call `provider.load()` inside `catch_unwind`, under `timeout` if set
/// 2. Move the machine to `Loaded` or back to `Idle`
/// 3. Publish `AdLoaded` or `AdFailedToLoad`
pub(crate) async fn run_load(
    binding: &ProviderBinding,
    machine: &ChannelStateMachine,
    unit_id: Option<Arc<str>>,
    timeout: Option<Duration>,
    bus: &Bus,
) -> Result<(), ProviderError> {
    let provider = &binding.provider;
    let fut = AssertUnwindSafe(provider.load(unit_id.as_deref())).catch_unwind();

    let caught = if let Some(dur) = timeout.filter(|d| *d > Duration::ZERO) {
        match time::timeout(dur, fut).await {
            Ok(r) => r,
            Err(_elapsed) => Ok(Err(ProviderError::Timeout { timeout: dur })),
        }
    } else {
        fut.await
    };
    let res = caught.unwrap_or_else(|panic| Err(panicked(panic)));

    let channel = binding.channel;
    let mut result = match &res {
        Ok(()) => AdResult::success(channel),
        Err(e) => AdResult::failure(channel, e.to_string()),
    }
    .with_network(provider.network().as_label());
    if let Some(unit) = provider.unit_id().or(unit_id) {
        result = result.with_unit_id(unit);
    }

    if !machine.finish_load(res.is_ok()) {
        warn!(%channel, state = %machine.state(), "stale load completion dropped");
        return res;
    }

    match &res {
        Ok(()) => {
            debug!(%channel, network = %provider.network(), "ad loaded");
            bus.publish(Event::loaded(result));
        }
        Err(e) => {
            warn!(%channel, error = %e, label = e.as_label(), retryable = e.is_retryable(), "ad failed to load");
            bus.publish(Event::failed_to_load(result));
        }
    }
    res
}

/// Executes one full-screen show and publishes its closing events.
pub(crate) async fn run_show(
    binding: &ProviderBinding,
    machine: &ChannelStateMachine,
    impression: Impression,
    bus: &Bus,
) -> ShowOutcome {
    let channel = binding.channel;
    let unit = Arc::clone(&impression.unit_id);
    let network = binding.provider.network().as_label();
    let result = || {
        AdResult::success(channel)
            .with_unit_id(Arc::clone(&unit))
            .with_network(network)
    };

    let res = AssertUnwindSafe(binding.provider.show(impression))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(panicked(panic)));

    match res {
        Ok(report) => {
            let reward = report.reward.filter(|_| channel.grants_reward());
            if let Some(r) = &reward {
                debug!(%channel, reward = %r.label, amount = r.amount, "reward earned");
                bus.publish(Event::rewarded(result()));
            }
            machine.finish_show(true);
            bus.publish(Event::closed(result()));
            ShowOutcome {
                displayed: true,
                reward,
            }
        }
        Err(e) => {
            warn!(%channel, error = %e, label = e.as_label(), "ad failed to show");
            machine.finish_show(false);
            bus.publish(Event::closed(
                AdResult::failure(channel, e.to_string())
                    .with_unit_id(unit)
                    .with_network(network),
            ));
            ShowOutcome::default()
        }
    }
}

/// Puts the banner on screen; hides it again if the backend fails.
///
/// Backend calls follow the order of the engine's visibility changes: a show
/// whose `generation` was superseded before it ran never reaches the backend,
/// and one overtaken by a hide while in flight is hidden again.
pub(crate) async fn run_banner(
    binding: &ProviderBinding,
    machine: &ChannelStateMachine,
    impression: Impression,
    generation: u64,
    bus: &Bus,
) {
    let channel = binding.channel;
    if !machine.is_banner_current(generation) {
        debug!(%channel, generation, "superseded banner show skipped");
        return;
    }

    let unit = Arc::clone(&impression.unit_id);
    let res = AssertUnwindSafe(binding.provider.show(impression))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(panicked(panic)));

    match res {
        Ok(_) => {
            if !machine.banner().0 {
                debug!(%channel, generation, "banner hidden during show; hiding again");
                binding.provider.hide();
            }
        }
        Err(e) => {
            if !machine.hide_banner_at(generation) {
                debug!(%channel, generation, error = %e, "stale banner failure dropped");
                return;
            }
            warn!(%channel, error = %e, "banner failed to show");
            binding.provider.hide();
            bus.publish(Event::closed(
                AdResult::failure(channel, e.to_string())
                    .with_unit_id(unit)
                    .with_network(binding.provider.network().as_label()),
            ));
        }
    }
}

/// Converts a caught backend panic into a [`ProviderError::Backend`].
pub(crate) fn panicked(panic: Box<dyn Any + Send>) -> ProviderError {
    let reason = if let Some(msg) = panic.downcast_ref::<&'static str>() {
        format!("backend panicked: {msg}")
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("backend panicked: {msg}")
    } else {
        "backend panicked".to_string()
    };
    ProviderError::Backend { reason }
}
