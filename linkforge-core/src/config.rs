//! Resolver configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::outcome::Stage;
use crate::provider::{ProviderConfig, ProviderRegistry};

/// Tunables for [`ConflictResolver`](crate::ConflictResolver).
///
/// Both timeouts are off by default: a provider popup may legitimately stay
/// open for as long as the user needs, and the caller's cancellation token
/// is always honoured regardless.
///
/// ```toml
/// network_timeout_secs = 15
/// interaction_timeout_secs = 300
///
/// [[providers]]
/// id = "facebook.com"
/// name = "Facebook"
/// recovery_priority = 2
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Limit for provider and backend network calls.
    #[serde(default)]
    pub network_timeout_secs: Option<u64>,

    /// Limit for popups and prompts.
    #[serde(default)]
    pub interaction_timeout_secs: Option<u64>,

    /// Providers registered on top of the defaults.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl ResolverConfig {
    /// Timeout that applies to a step, if any.
    pub fn timeout_for(&self, stage: Stage) -> Option<Duration> {
        let secs = if stage.is_interactive() {
            self.interaction_timeout_secs
        } else {
            self.network_timeout_secs
        };
        secs.filter(|s| *s > 0).map(Duration::from_secs)
    }

    /// Default providers plus any configured ones.
    pub fn build_registry(&self) -> ProviderRegistry {
        let mut registry = ProviderRegistry::with_defaults();
        for provider in &self.providers {
            registry.register(provider.clone());
        }
        registry
    }
}
