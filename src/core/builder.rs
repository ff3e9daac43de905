use std::sync::Arc;

use crate::{
    ads::AdChannel,
    core::{MediationConfig, MediationEngine, ProviderRegistry},
    events::{Bus, EventKind},
    providers::{AdProvider, SimulatedProvider},
    subscribers::Subscribe,
};

/// Builder for constructing a MediationEngine with its providers and subscribers.
pub struct EngineBuilder {
    cfg: MediationConfig,
    registry: ProviderRegistry,
    subscribers: Vec<(Vec<EventKind>, Arc<dyn Subscribe>)>,
}

impl EngineBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: MediationConfig) -> Self {
        Self {
            cfg,
            registry: ProviderRegistry::new(),
            subscribers: Vec::new(),
        }
    }

    /// Binds `provider` to the channel it reports.
    ///
    /// A second provider for the same channel replaces the first.
    pub fn with_provider(mut self, provider: Arc<dyn AdProvider>) -> Self {
        self.registry.insert(provider, None);
        self
    }

    /// Binds `provider` and hands it `unit_id` as its default unit.
    ///
    /// [`MediationEngine::set_ad_unit_id`] replaces it later.
    pub fn with_provider_unit(mut self, provider: Arc<dyn AdProvider>, unit_id: &str) -> Self {
        self.registry.insert(provider, Some(Arc::from(unit_id)));
        self
    }

    pub fn with_providers(mut self, providers: impl IntoIterator<Item = Arc<dyn AdProvider>>) -> Self {
        for p in providers {
            self.registry.insert(p, None);
        }
        self
    }

    /// Binds a [`SimulatedProvider`] with reference latencies to every channel,
    /// using the network configured for it.
    pub fn with_simulated_providers(mut self) -> Self {
        for channel in AdChannel::ALL {
            let network = self.cfg.channel(channel).network;
            self.registry.insert(
                Arc::new(SimulatedProvider::new(channel).with_network(network)),
                None,
            );
        }
        self
    }

    /// Subscribes to the six ad lifecycle topics.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers
            .push((EventKind::AD_TOPICS.to_vec(), subscriber));
        self
    }

    /// Subscribes to the given topics only.
    pub fn with_subscriber_for(
        mut self,
        kinds: impl IntoIterator<Item = EventKind>,
        subscriber: Arc<dyn Subscribe>,
    ) -> Self {
        self.subscribers.push((kinds.into_iter().collect(), subscriber));
        self
    }

    /// Builds and returns the MediationEngine instance.
    ///
    /// This consumes the builder and wires the runtime components:
    /// - Event bus sized from `bus_capacity`
    /// - Subscribers registered in call order
    /// - The provider registry, frozen from here on
    pub fn build(self) -> Arc<MediationEngine> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        for (kinds, sub) in self.subscribers {
            bus.subscribe(kinds, sub);
        }
        Arc::new(MediationEngine::new_internal(self.cfg, self.registry, bus))
    }
}
