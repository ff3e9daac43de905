//! # App lifecycle hook.
//!
//! Host applications forward pause and focus notifications as
//! [`LifecycleSignal`]s. When the app comes back to the foreground and an
//! app-open fill is held, the engine shows it without a completion handle;
//! the show is observable only on the bus.
//!
//! ## Signals
//! - `Resumed`, `FocusGained`: foreground (may trigger the app-open show)
//! - `Paused`, `FocusLost`: background (logged only)
//!
//! Hosts either call [`MediationEngine::on_lifecycle`] directly or feed an mpsc
//! stream to [`MediationEngine::spawn_lifecycle_listener`].

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::ads::AdChannel;
use crate::core::engine::MediationEngine;

/// Application state change reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleSignal {
    Resumed,
    Paused,
    FocusGained,
    FocusLost,
}

impl LifecycleSignal {
    /// Maps a pause callback (`paused = true` on background).
    pub fn from_pause(paused: bool) -> Self {
        if paused {
            LifecycleSignal::Paused
        } else {
            LifecycleSignal::Resumed
        }
    }

    /// Maps a focus callback.
    pub fn from_focus(has_focus: bool) -> Self {
        if has_focus {
            LifecycleSignal::FocusGained
        } else {
            LifecycleSignal::FocusLost
        }
    }

    pub fn is_foreground(&self) -> bool {
        matches!(self, LifecycleSignal::Resumed | LifecycleSignal::FocusGained)
    }
}

impl MediationEngine {
    /// Reacts to one lifecycle signal.
    ///
    /// Returns `true` if an app-open show was started.
    pub fn on_lifecycle(&self, signal: LifecycleSignal) -> bool {
        if !signal.is_foreground() {
            debug!(?signal, "app went to background");
            return false;
        }
        if !self.is_loaded(AdChannel::AppOpen) {
            debug!(?signal, "no app-open fill to show");
            return false;
        }

        match self.start_show(AdChannel::AppOpen) {
            Ok(_outcome) => {
                info!(?signal, "showing app-open ad on foreground");
                true
            }
            Err(e) => {
                warn!(?signal, error = %e, "app-open auto show failed");
                false
            }
        }
    }

    /// Host pause callback.
    pub fn on_application_pause(&self, paused: bool) -> bool {
        self.on_lifecycle(LifecycleSignal::from_pause(paused))
    }

    /// Host focus callback.
    pub fn on_application_focus(&self, has_focus: bool) -> bool {
        self.on_lifecycle(LifecycleSignal::from_focus(has_focus))
    }

    /// Drives [`on_lifecycle`](Self::on_lifecycle) from `signals`.
    ///
    /// The task ends when the engine shuts down or every sender is dropped.
    pub fn spawn_lifecycle_listener(
        self: &Arc<Self>,
        mut signals: mpsc::Receiver<LifecycleSignal>,
    ) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        let token = self.runtime_token().clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    msg = signals.recv() => match msg {
                        Some(signal) => {
                            engine.on_lifecycle(signal);
                        }
                        None => break,
                    }
                }
            }
            debug!("lifecycle listener stopped");
        })
    }
}
