//! Provider registry: a named collection of configured providers.
//!
//! Configuration selects the active provider by name (`[ai] provider`).

use std::collections::HashMap;
use std::sync::Arc;

use super::trait_def::PlanProvider;

/// Registered [`PlanProvider`] implementations keyed by name.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn PlanProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under [`PlanProvider::name`], returning any
    /// provider it replaced.
    pub fn register(
        &mut self,
        provider: impl PlanProvider + 'static,
    ) -> Option<Arc<dyn PlanProvider>> {
        let name = provider.name().to_string();
        self.providers.insert(name, Arc::new(provider))
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn PlanProvider>> {
        self.providers.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.list())
            .finish()
    }
}
