//! Error types used by the mediation engine and ad backends.
//!
//! This module defines two main error enums:
//!
//! - [`MediationError`]: errors raised by the orchestration layer itself
//!   (not initialized, unsupported channel, invalid state, ...).
//! - [`ProviderError`]: errors raised by an individual backend operation.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging
//! and [`ProviderError::is_retryable`] for callers deciding whether to load again.
//!
//! None of these errors is fatal: every failure leaves the affected channel in
//! a retryable state.

use std::time::Duration;
use thiserror::Error;

use crate::ads::AdChannel;
use crate::core::AdRequestState;

/// # Errors produced by the mediation engine.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MediationError {
    /// A load/show call arrived before the initialization barrier fired.
    #[error("mediation engine is not initialized")]
    NotInitialized,

    /// `initialize` was called while another initialization is still in flight.
    #[error("initialization already in progress")]
    InitInProgress,

    /// The strict barrier policy saw at least one failed provider.
    #[error("initialization failed for channels {failed:?}")]
    InitFailed {
        /// Channels whose provider failed to initialize.
        failed: Vec<AdChannel>,
    },

    /// No provider is bound to the channel.
    #[error("channel {channel} is not supported")]
    UnsupportedChannel {
        /// The requested channel.
        channel: AdChannel,
    },

    /// The operation is not legal in the channel's current state.
    #[error("cannot {op} {channel} while {state}")]
    InvalidState {
        /// The requested channel.
        channel: AdChannel,
        /// State observed when the call was rejected.
        state: AdRequestState,
        /// Rejected operation (`"load"`, `"show"`).
        op: &'static str,
    },

    /// The show task ended without reporting an outcome.
    #[error("show on {channel} ended without an outcome")]
    ShowAborted {
        /// The channel being shown.
        channel: AdChannel,
    },

    /// The engine was shut down.
    #[error("mediation engine is shut down")]
    ShutDown,
}

impl MediationError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use admediator::{AdChannel, MediationError};
    ///
    /// let err = MediationError::UnsupportedChannel { channel: AdChannel::AppOpen };
    /// assert_eq!(err.as_label(), "unsupported_channel");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            MediationError::NotInitialized => "not_initialized",
            MediationError::InitInProgress => "init_in_progress",
            MediationError::InitFailed { .. } => "init_failed",
            MediationError::UnsupportedChannel { .. } => "unsupported_channel",
            MediationError::InvalidState { .. } => "invalid_state",
            MediationError::ShowAborted { .. } => "show_aborted",
            MediationError::ShutDown => "shut_down",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            MediationError::InitFailed { failed } => format!("failed providers={failed:?}"),
            MediationError::UnsupportedChannel { channel } => format!("channel={channel}"),
            MediationError::InvalidState { channel, state, op } => {
                format!("op={op} channel={channel} state={state}")
            }
            MediationError::ShowAborted { channel } => format!("channel={channel}"),
            other => other.to_string(),
        }
    }
}

/// # Errors produced by an ad backend.
///
/// Returned from [`AdProvider`](crate::AdProvider) operations and forwarded to
/// subscribers as the `error` field of a failed [`AdResult`](crate::AdResult).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The network had no ad to serve.
    #[error("no fill")]
    NoFill,

    /// The operation exceeded its deadline.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// The backend is not initialized or has no fill to show.
    #[error("backend not ready")]
    NotReady,

    /// The ad could not be displayed (rendering failure, activity gone).
    #[error("ad failed to display")]
    DisplayFailed,

    /// Any other backend failure.
    #[error("backend error: {reason}")]
    Backend {
        /// The underlying error message.
        reason: String,
    },
}

impl ProviderError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use admediator::ProviderError;
    /// use std::time::Duration;
    ///
    /// let err = ProviderError::Timeout { timeout: Duration::from_secs(30) };
    /// assert_eq!(err.as_label(), "provider_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ProviderError::NoFill => "provider_no_fill",
            ProviderError::Timeout { .. } => "provider_timeout",
            ProviderError::NotReady => "provider_not_ready",
            ProviderError::DisplayFailed => "provider_display_failed",
            ProviderError::Backend { .. } => "provider_backend",
        }
    }

    /// Indicates whether loading again may succeed.
    ///
    /// Returns `true` for [`ProviderError::NoFill`] and [`ProviderError::Timeout`].
    ///
    /// # Example
    /// ```
    /// use admediator::ProviderError;
    ///
    /// assert!(ProviderError::NoFill.is_retryable());
    /// assert!(!ProviderError::Backend { reason: "bad app id".into() }.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::NoFill | ProviderError::Timeout { .. })
    }
}
