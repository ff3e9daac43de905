//! # Multi-provider initialization barrier.
//!
//! [`InitBarrier`] is a count-based rendezvous: every provider task calls
//! [`arrive`](InitBarrier::arrive) once, successful or not, and the arrival
//! that completes the count fires the barrier exactly once.
//!
//! ```text
//! init task (banner)       ──arrive(ok)──┐
//! init task (interstitial) ──arrive(err)─┤
//! init task (rewarded)     ──arrive(ok)──┼──► completed == total ──► oneshot(BarrierOutcome)
//! ...                                    │
//! init timeout             ──pending()───┘   (missing providers count as failed)
//! ```
//!
//! How the outcome maps onto the `initialize` result is decided by
//! [`BarrierPolicy`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::warn;

use crate::ads::AdChannel;

/// How provider initialization failures affect `initialize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BarrierPolicy {
    /// Ready once every provider reported, whatever the outcomes.
    /// Failures are logged at warn level.
    #[default]
    Permissive,
    /// Any failed provider fails `initialize`; the call may be retried.
    Strict,
}

/// Arrival count of one initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitProgress {
    pub completed: usize,
    pub total: usize,
}

impl InitProgress {
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

/// What the barrier reports when it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarrierOutcome {
    pub total: usize,
    /// Channels whose provider failed (or never arrived), in arrival order.
    pub failed: Vec<AdChannel>,
}

impl BarrierOutcome {
    /// Whether `initialize` succeeds under `policy`.
    pub fn passes(&self, policy: BarrierPolicy) -> bool {
        match policy {
            BarrierPolicy::Permissive => true,
            BarrierPolicy::Strict => self.failed.is_empty(),
        }
    }
}

struct Arrivals {
    seen: Vec<(AdChannel, bool)>,
    done: Option<oneshot::Sender<BarrierOutcome>>,
}

/// Fires once after `total` arrivals.
pub(crate) struct InitBarrier {
    total: usize,
    completed: AtomicUsize,
    arrivals: Mutex<Arrivals>,
}

impl InitBarrier {
    /// Creates a barrier and the receiver that resolves when it fires.
    ///
    /// A barrier over zero providers fires immediately.
    pub(crate) fn new(total: usize) -> (Arc<Self>, oneshot::Receiver<BarrierOutcome>) {
        let (tx, rx) = oneshot::channel();
        let done = if total == 0 {
            let _ = tx.send(BarrierOutcome {
                total,
                failed: Vec::new(),
            });
            None
        } else {
            Some(tx)
        };

        let barrier = Arc::new(Self {
            total,
            completed: AtomicUsize::new(0),
            arrivals: Mutex::new(Arrivals {
                seen: Vec::with_capacity(total),
                done,
            }),
        });
        (barrier, rx)
    }

    /// Records one provider completion.
    ///
    /// Returns the progress after this arrival, or `None` if the arrival was
    /// ignored (duplicate channel, or the barrier already fired).
    pub(crate) fn arrive(&self, channel: AdChannel, ok: bool) -> Option<InitProgress> {
        let mut arrivals = self.lock();
        if arrivals.done.is_none() {
            warn!(%channel, "late initialization arrival ignored");
            return None;
        }
        if arrivals.seen.iter().any(|(ch, _)| *ch == channel) {
            warn!(%channel, "duplicate initialization arrival ignored");
            return None;
        }

        arrivals.seen.push((channel, ok));
        let completed = self.completed.fetch_add(1, Ordering::AcqRel) + 1;

        if completed == self.total {
            let failed = arrivals
                .seen
                .iter()
                .filter(|(_, ok)| !ok)
                .map(|(ch, _)| *ch)
                .collect();
            if let Some(tx) = arrivals.done.take() {
                let _ = tx.send(BarrierOutcome {
                    total: self.total,
                    failed,
                });
            }
        }

        Some(InitProgress {
            completed,
            total: self.total,
        })
    }

    /// Channels of `all` that have not arrived yet.
    pub(crate) fn pending(&self, all: impl IntoIterator<Item = AdChannel>) -> Vec<AdChannel> {
        let arrivals = self.lock();
        all.into_iter()
            .filter(|ch| !arrivals.seen.iter().any(|(seen, _)| seen == ch))
            .collect()
    }

    pub(crate) fn progress(&self) -> InitProgress {
        InitProgress {
            completed: self.completed.load(Ordering::Acquire),
            total: self.total,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Arrivals> {
        self.arrivals.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_after_all_arrivals() {
        let (barrier, mut rx) = InitBarrier::new(3);

        barrier.arrive(AdChannel::Rewarded, true);
        barrier.arrive(AdChannel::Banner, false);
        assert!(rx.try_recv().is_err());
        assert_eq!(barrier.progress(), InitProgress { completed: 2, total: 3 });

        let last = barrier.arrive(AdChannel::AppOpen, true).unwrap();
        assert!(last.is_complete());

        let outcome = rx.try_recv().unwrap();
        assert_eq!(outcome.failed, vec![AdChannel::Banner]);
        assert!(outcome.passes(BarrierPolicy::Permissive));
        assert!(!outcome.passes(BarrierPolicy::Strict));
    }

    #[test]
    fn late_and_duplicate_arrivals_are_ignored() {
        let (barrier, _rx) = InitBarrier::new(2);
        assert!(barrier.arrive(AdChannel::Banner, true).is_some());
        assert!(barrier.arrive(AdChannel::Banner, true).is_none());
        assert!(barrier.arrive(AdChannel::Interstitial, true).is_some());
        assert!(barrier.arrive(AdChannel::AppOpen, true).is_none());
        assert_eq!(barrier.progress().completed, 2);
    }

    #[test]
    fn empty_barrier_fires_immediately() {
        let (barrier, mut rx) = InitBarrier::new(0);
        let outcome = rx.try_recv().unwrap();
        assert_eq!(outcome.total, 0);
        assert!(outcome.passes(BarrierPolicy::Strict));
        assert!(barrier.progress().is_complete());
    }

    #[test]
    fn pending_lists_missing_channels() {
        let (barrier, _rx) = InitBarrier::new(3);
        barrier.arrive(AdChannel::Interstitial, true);
        assert_eq!(
            barrier.pending([AdChannel::Banner, AdChannel::Interstitial, AdChannel::AppOpen]),
            vec![AdChannel::Banner, AdChannel::AppOpen]
        );
    }
}
