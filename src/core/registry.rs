//! # Provider registry.
//!
//! Fixed table of [`ProviderBinding`]s, one slot per [`AdChannel`], built once
//! by the [`EngineBuilder`](crate::EngineBuilder) and never mutated afterwards.
//!
//! ## Rules
//! - At most one binding per channel; a later registration replaces the
//!   earlier one with a warning.
//! - Lookups for an empty slot return [`MediationError::UnsupportedChannel`].
//! - [`len`](ProviderRegistry::len) is the initialization barrier total.
//! - A unit id given at registration is handed to the backend once, through
//!   `set_unit_id`; later overrides replace it.

use std::sync::Arc;

use tracing::warn;

use crate::ads::AdChannel;
use crate::error::MediationError;
use crate::providers::ProviderRef;

/// A backend bound to its channel.
#[derive(Clone)]
pub struct ProviderBinding {
    pub channel: AdChannel,
    pub provider: ProviderRef,
    /// Unit id given at registration, if any.
    pub unit_override: Option<Arc<str>>,
}

impl std::fmt::Debug for ProviderBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderBinding")
            .field("channel", &self.channel)
            .field("network", &self.provider.network())
            .field("unit_override", &self.unit_override)
            .finish()
    }
}

/// Channel-indexed provider table.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    bindings: [Option<ProviderBinding>; AdChannel::COUNT],
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `provider` to its own channel.
    pub fn insert(&mut self, provider: ProviderRef, unit_override: Option<Arc<str>>) {
        let channel = provider.channel();
        if let Some(unit) = &unit_override {
            provider.set_unit_id(unit);
        }
        let slot = &mut self.bindings[channel.index()];
        if let Some(prev) = slot {
            warn!(
                %channel,
                replaced = %prev.provider.network(),
                by = %provider.network(),
                "provider replaced"
            );
        }
        *slot = Some(ProviderBinding {
            channel,
            provider,
            unit_override,
        });
    }

    /// Binding for `channel`.
    pub fn get(&self, channel: AdChannel) -> Result<&ProviderBinding, MediationError> {
        self.bindings[channel.index()]
            .as_ref()
            .ok_or(MediationError::UnsupportedChannel { channel })
    }

    pub fn contains(&self, channel: AdChannel) -> bool {
        self.bindings[channel.index()].is_some()
    }

    /// Number of bound channels.
    pub fn len(&self) -> usize {
        self.bindings.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bindings in channel order.
    pub fn bindings(&self) -> impl Iterator<Item = &ProviderBinding> {
        self.bindings.iter().flatten()
    }
}
