//! Registry of configured providers, built once at startup.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use adreel_models::ProviderKind;

use crate::chain::FallbackChain;
use crate::config::ProvidersConfig;
use crate::error::ProviderResult;
use crate::luma::LumaProvider;
use crate::provider::ClipProvider;
use crate::replicate::ReplicateProvider;
use crate::runway::RunwayProvider;

/// Ordered set of usable clip providers.
///
/// Providers without credentials are left out, so the registry only ever
/// holds adapters that can make a request.
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn ClipProvider>>,
    call_timeout: Duration,
}

impl ProviderRegistry {
    /// Build adapters for every configured provider, in priority order.
    pub fn from_config(config: &ProvidersConfig) -> ProviderResult<Self> {
        let mut providers: Vec<Arc<dyn ClipProvider>> = Vec::new();

        for kind in config.configured() {
            let settings = config.settings(kind).clone();
            let provider: Arc<dyn ClipProvider> = match kind {
                ProviderKind::Runway => Arc::new(RunwayProvider::new(settings)?),
                ProviderKind::Luma => Arc::new(LumaProvider::new(settings)?),
                ProviderKind::Replicate => Arc::new(ReplicateProvider::new(settings)?),
            };
            providers.push(provider);
        }

        let registry = Self {
            providers,
            call_timeout: config.call_timeout,
        };
        info!(providers = ?registry.kinds(), "Clip provider registry built");
        Ok(registry)
    }

    /// Use an explicit provider list, e.g. test doubles.
    pub fn from_providers(providers: Vec<Arc<dyn ClipProvider>>, call_timeout: Duration) -> Self {
        Self {
            providers,
            call_timeout,
        }
    }

    pub fn kinds(&self) -> Vec<ProviderKind> {
        self.providers.iter().map(|p| p.kind()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// A fallback chain over every registered provider.
    pub fn chain(&self) -> FallbackChain {
        FallbackChain::new(self.providers.clone(), self.call_timeout)
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.kinds())
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}
