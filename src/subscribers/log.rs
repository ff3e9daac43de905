//! # Logging subscriber for debugging and demos.
//!
//! [`LogWriter`] renders bus events as `tracing` records under the
//! `admediator::events` target. Install any `tracing` subscriber to see them.
//!
//! ## Output format (fmt subscriber)
//! ```text
//! INFO admediator::events: [loaded] channel=rewarded network=admob unit=ca-app-pub-...
//! WARN admediator::events: [load-failed] channel=interstitial err="no fill"
//! INFO admediator::events: [shown] channel=rewarded
//! INFO admediator::events: [rewarded] channel=rewarded
//! INFO admediator::events: [closed] channel=rewarded success=true
//! INFO admediator::events: [revenue] channel=banner amount=0.0012 currency=USD precision=estimated
//! ERROR admediator::events: [subscriber-panicked] subscriber=ui info="..."
//! ```
//!
//! ## Example
//! ```no_run
//! # use std::sync::Arc;
//! # use admediator::{Bus, LogWriter};
//! let bus = Bus::new(64);
//! bus.subscribe_all(Arc::new(LogWriter::new()));
//! ```

use tracing::{error, info, warn};

use crate::events::{Event, EventKind, EventPayload};
use crate::subscribers::Subscribe;

/// Tracing-backed event writer.
///
/// Enabled via the `logging` feature.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Subscribe for LogWriter {
    fn on_event(&self, e: &Event) {
        match &e.payload {
            EventPayload::Result(r) => {
                let network = r.network.as_deref().unwrap_or("-");
                let unit = r.unit_id.as_deref().unwrap_or("-");
                match e.kind {
                    EventKind::AdLoaded => {
                        info!(target: "admediator::events", "[loaded] channel={} network={network} unit={unit}", r.channel);
                    }
                    EventKind::AdFailedToLoad => {
                        warn!(target: "admediator::events", "[load-failed] channel={} err={:?}", r.channel, r.error.as_deref().unwrap_or("unknown"));
                    }
                    EventKind::AdShown => {
                        info!(target: "admediator::events", "[shown] channel={}", r.channel);
                    }
                    EventKind::AdRewarded => {
                        info!(target: "admediator::events", "[rewarded] channel={}", r.channel);
                    }
                    EventKind::AdClosed => {
                        info!(target: "admediator::events", "[closed] channel={} success={}", r.channel, r.success);
                    }
                    EventKind::AdRevenue | EventKind::SubscriberPanicked => {}
                }
            }
            EventPayload::Revenue(rev) => {
                info!(
                    target: "admediator::events",
                    "[revenue] channel={} amount={} currency={} precision={}",
                    rev.channel, rev.amount, rev.currency, rev.precision
                );
            }
            EventPayload::Fault { subscriber, info } => {
                error!(target: "admediator::events", "[subscriber-panicked] subscriber={subscriber} info={info:?}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
