//! # Per-channel load/show state machine.
//!
//! One [`ChannelStateMachine`] exists per [`AdChannel`]; the engine creates it
//! on the first load and reuses it for every later cycle.
//!
//! ## Transitions
//! ```text
//! Idle    ──begin_load──────────► Loading
//! Loading ──finish_load(ok)─────► Loaded
//! Loading ──finish_load(err)────► Failed ─► Idle
//! Loaded  ──begin_show──────────► Showing            (full-screen)
//! Showing ──finish_show(ok)─────► Closed ─► Idle
//! Showing ──finish_show(err)────► Failed ─► Idle
//! Loaded  ──show/hide banner────► Loaded             (visibility only)
//! Loaded  ──expire_fill─────────► Idle               (backend dropped the fill)
//! ```
//!
//! ## Rules
//! - `Closed` and `Failed` are outcomes, not resting states: the machine
//!   settles on `Idle` inside the same transition and keeps the outcome in
//!   [`last_outcome`](ChannelStateMachine::last_outcome).
//! - Every rejected transition returns [`MediationError::InvalidState`] and
//!   leaves the state untouched.
//! - Every banner show or hide bumps a generation; a backend call issued for
//!   an older generation is stale.
//! - The mutex is never held across `.await`.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::ads::{AdChannel, BannerPosition};
use crate::error::MediationError;

/// Lifecycle state of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AdRequestState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Showing,
    Closed,
    Failed,
}

impl AdRequestState {
    /// Returns a short stable label (lowercase).
    pub fn as_label(&self) -> &'static str {
        match self {
            AdRequestState::Idle => "idle",
            AdRequestState::Loading => "loading",
            AdRequestState::Loaded => "loaded",
            AdRequestState::Showing => "showing",
            AdRequestState::Closed => "closed",
            AdRequestState::Failed => "failed",
        }
    }
}

impl fmt::Display for AdRequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

#[derive(Debug, Default)]
struct Slot {
    state: AdRequestState,
    last_outcome: Option<AdRequestState>,
    banner_visible: bool,
    banner_position: BannerPosition,
    banner_gen: u64,
}

/// Result of marking the banner visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BannerTicket {
    /// The banner was already visible (the call moved it).
    pub was_visible: bool,
    /// Generation the backend show belongs to.
    pub generation: u64,
}

/// Guarded state of one channel.
#[derive(Debug)]
pub struct ChannelStateMachine {
    channel: AdChannel,
    slot: Mutex<Slot>,
}

impl ChannelStateMachine {
    pub fn new(channel: AdChannel) -> Self {
        Self {
            channel,
            slot: Mutex::new(Slot::default()),
        }
    }

    pub fn channel(&self) -> AdChannel {
        self.channel
    }

    /// Current resting state.
    pub fn state(&self) -> AdRequestState {
        self.lock().state
    }

    /// Outcome of the last finished cycle (`Closed`, `Failed`), if any.
    pub fn last_outcome(&self) -> Option<AdRequestState> {
        self.lock().last_outcome
    }

    /// Banner visibility and anchor.
    pub fn banner(&self) -> (bool, BannerPosition) {
        let slot = self.lock();
        (slot.banner_visible, slot.banner_position)
    }

    /// `Idle → Loading`.
    pub fn begin_load(&self) -> Result<(), MediationError> {
        let mut slot = self.lock();
        match slot.state {
            AdRequestState::Idle => {
                slot.state = AdRequestState::Loading;
                Ok(())
            }
            state => Err(self.invalid(state, "load")),
        }
    }

    /// `Loading → Loaded` on success, `Loading → Failed → Idle` otherwise.
    ///
    /// A completion that does not find the machine in `Loading` is ignored and
    /// reported as `false`.
    pub fn finish_load(&self, ok: bool) -> bool {
        let mut slot = self.lock();
        if slot.state != AdRequestState::Loading {
            return false;
        }
        if ok {
            slot.state = AdRequestState::Loaded;
        } else {
            slot.last_outcome = Some(AdRequestState::Failed);
            slot.state = AdRequestState::Idle;
        }
        true
    }

    /// `Loaded → Showing` for full-screen channels.
    pub fn begin_show(&self) -> Result<(), MediationError> {
        let mut slot = self.lock();
        match slot.state {
            AdRequestState::Loaded if self.channel.consumes_on_show() => {
                slot.state = AdRequestState::Showing;
                Ok(())
            }
            state => Err(self.invalid(state, "show")),
        }
    }

    /// `Loaded → Idle` when the backend no longer holds the fill.
    ///
    /// Also clears banner visibility. Returns `false` outside `Loaded`.
    pub fn expire_fill(&self) -> bool {
        let mut slot = self.lock();
        if slot.state != AdRequestState::Loaded {
            return false;
        }
        slot.state = AdRequestState::Idle;
        if std::mem::take(&mut slot.banner_visible) {
            slot.banner_gen += 1;
        }
        true
    }

    /// `Showing → Closed → Idle` or `Showing → Failed → Idle`.
    pub fn finish_show(&self, ok: bool) -> bool {
        let mut slot = self.lock();
        if slot.state != AdRequestState::Showing {
            return false;
        }
        slot.last_outcome = Some(if ok {
            AdRequestState::Closed
        } else {
            AdRequestState::Failed
        });
        slot.state = AdRequestState::Idle;
        true
    }

    /// Marks the banner visible at `position`. Requires `Loaded`.
    pub fn show_banner(&self, position: BannerPosition) -> Result<BannerTicket, MediationError> {
        let mut slot = self.lock();
        if slot.state != AdRequestState::Loaded {
            return Err(self.invalid(slot.state, "show"));
        }
        let was_visible = slot.banner_visible;
        slot.banner_visible = true;
        slot.banner_position = position;
        slot.banner_gen += 1;
        Ok(BannerTicket {
            was_visible,
            generation: slot.banner_gen,
        })
    }

    /// Clears the banner visibility flag. Returns whether it was visible.
    pub fn hide_banner(&self) -> bool {
        let mut slot = self.lock();
        let was_visible = std::mem::take(&mut slot.banner_visible);
        if was_visible {
            slot.banner_gen += 1;
        }
        was_visible
    }

    /// Hides the banner only if `generation` is still the visible one.
    pub fn hide_banner_at(&self, generation: u64) -> bool {
        let mut slot = self.lock();
        if !slot.banner_visible || slot.banner_gen != generation {
            return false;
        }
        slot.banner_visible = false;
        slot.banner_gen += 1;
        true
    }

    /// Whether `generation` is the banner currently meant to be on screen.
    pub fn is_banner_current(&self, generation: u64) -> bool {
        let slot = self.lock();
        slot.banner_visible && slot.banner_gen == generation
    }

    fn invalid(&self, state: AdRequestState, op: &'static str) -> MediationError {
        MediationError::InvalidState {
            channel: self.channel,
            state,
            op,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
