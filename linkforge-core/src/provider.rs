//! Identity provider configuration and registry.
//!
//! This module provides:
//! - [`ProviderConfig`] - What the resolver knows about one federated provider
//! - [`ProviderRegistry`] - Registry of known providers
//!
//! The registry decides two orderings the resolver depends on: the order in
//! which provider-specific credential recovery helpers are tried, and which
//! providers are eligible for the server-mediated token exchange.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::ProviderId;

/// Configuration for a federated identity provider.
///
/// # Example
///
/// ```
/// use linkforge_core::provider::ProviderConfig;
///
/// let github = ProviderConfig::new("github.com", "GitHub")
///     .with_exchange_name("github")
///     .with_recovery_priority(1);
/// assert!(github.exchange_name.is_some());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    /// Provider id as the SDK reports it (e.g., "google.com").
    pub id: ProviderId,

    /// Human-readable name (e.g., "Google").
    pub name: String,

    /// Backend name used for the custom-token exchange.
    ///
    /// Only providers with an exchange name take the server-mediated path.
    #[serde(default)]
    pub exchange_name: Option<String>,

    /// Position in the credential recovery order (lower runs first).
    ///
    /// Providers without a priority have no recovery helper.
    #[serde(default)]
    pub recovery_priority: Option<u32>,
}

impl ProviderConfig {
    /// Create a new provider configuration.
    pub fn new(id: impl Into<ProviderId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            exchange_name: None,
            recovery_priority: None,
        }
    }

    /// Make the provider eligible for the custom-token exchange.
    pub fn with_exchange_name(mut self, name: impl Into<String>) -> Self {
        self.exchange_name = Some(name.into());
        self
    }

    /// Give the provider a credential recovery helper at this priority.
    pub fn with_recovery_priority(mut self, priority: u32) -> Self {
        self.recovery_priority = Some(priority);
        self
    }
}

/// Registry of identity provider configurations.
///
/// # Example
///
/// ```
/// use linkforge_core::provider::ProviderRegistry;
///
/// let registry = ProviderRegistry::with_defaults();
/// let order: Vec<_> = registry.recovery_order().iter().map(|p| p.to_string()).collect();
/// assert_eq!(order, vec!["google.com", "github.com"]);
/// ```
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderId, ProviderConfig>,
}

impl ProviderRegistry {
    /// Create a new empty provider registry.
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Create a registry with the portal's two social providers.
    ///
    /// - Google: recovery helper runs first, no exchange
    /// - GitHub: recovery helper runs second, exchange name `github`
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register(ProviderConfig::new("google.com", "Google").with_recovery_priority(0));

        registry.register(
            ProviderConfig::new("github.com", "GitHub")
                .with_exchange_name("github")
                .with_recovery_priority(1),
        );

        registry
    }

    /// Register a provider configuration.
    ///
    /// If a provider with the same ID already exists, it will be replaced.
    pub fn register(&mut self, config: ProviderConfig) {
        self.providers.insert(config.id.clone(), config);
    }

    /// Get a provider configuration by ID.
    pub fn get(&self, id: &str) -> Option<&ProviderConfig> {
        self.providers.get(&ProviderId::new(id))
    }

    /// Check if a provider is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.providers.contains_key(&ProviderId::new(id))
    }

    /// List all registered provider IDs, sorted.
    pub fn list_ids(&self) -> Vec<&ProviderId> {
        let mut ids: Vec<&ProviderId> = self.providers.keys().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    /// Remove a provider from the registry.
    pub fn remove(&mut self, id: &str) -> Option<ProviderConfig> {
        self.providers.remove(&ProviderId::new(id))
    }

    /// Providers with a recovery helper, in the order their helpers run.
    pub fn recovery_order(&self) -> Vec<&ProviderId> {
        let mut with_priority: Vec<(u32, &ProviderId)> = self
            .providers
            .values()
            .filter_map(|c| c.recovery_priority.map(|p| (p, &c.id)))
            .collect();
        with_priority.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.as_str().cmp(b.1.as_str())));
        with_priority.into_iter().map(|(_, id)| id).collect()
    }

    /// Backend exchange name for a provider, if it is exchange-eligible.
    pub fn exchange_name(&self, id: &ProviderId) -> Option<&str> {
        self.providers
            .get(id)
            .and_then(|c| c.exchange_name.as_deref())
    }

    /// Human-readable name, falling back to the raw id for unknown providers.
    pub fn display_name<'a>(&'a self, id: &'a ProviderId) -> &'a str {
        self.providers
            .get(id)
            .map(|c| c.name.as_str())
            .unwrap_or(id.as_str())
    }

    /// Get the number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
