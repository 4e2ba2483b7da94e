//! Adapter construction and registration
//!
//! The factory is the single point enforcing "credential required unless
//! the provider is local". Construction is pure (no network calls); the
//! adapters validate lazily on first real use.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use super::adapter::ProviderAdapter;
use super::{
    AnthropicAdapter, OllamaAdapter, OpenAiAdapter, PerplexityAdapter, ProviderKind,
};
use crate::config::{OrchestratorConfig, ProviderSettings};
use crate::core::error::{OrchestratorError, Result};

/// Builds adapters from a provider identifier plus settings
pub struct AdapterFactory;

impl AdapterFactory {
    /// Construct one adapter. Fails with a configuration error when a
    /// non-local provider has no credential, and with an unknown-provider
    /// error for unrecognized identifiers (via [`Self::create_by_id`]).
    pub fn create(
        kind: ProviderKind,
        settings: &ProviderSettings,
    ) -> Result<Arc<dyn ProviderAdapter>> {
        let credential_missing = settings
            .credential
            .as_deref()
            .is_none_or(|c| c.trim().is_empty());
        if !kind.is_local() && credential_missing {
            return Err(OrchestratorError::configuration(format!(
                "provider '{}' requires a credential",
                kind
            )));
        }

        let adapter: Arc<dyn ProviderAdapter> = match kind {
            ProviderKind::Ollama => Arc::new(OllamaAdapter::new(settings).map_err(wrap)?),
            ProviderKind::OpenAi => Arc::new(OpenAiAdapter::new(settings).map_err(wrap)?),
            ProviderKind::Anthropic => Arc::new(AnthropicAdapter::new(settings).map_err(wrap)?),
            ProviderKind::Perplexity => Arc::new(PerplexityAdapter::new(settings).map_err(wrap)?),
        };
        Ok(adapter)
    }

    /// Construct from a textual provider identifier
    pub fn create_by_id(id: &str, settings: &ProviderSettings) -> Result<Arc<dyn ProviderAdapter>> {
        let kind = ProviderKind::from_str(id)?;
        Self::create(kind, settings)
    }
}

fn wrap(e: super::error::ProviderError) -> OrchestratorError {
    OrchestratorError::configuration(e.to_string())
}

/// Registry of constructed adapters, keyed by provider name
pub struct AdapterRegistry {
    providers: HashMap<String, Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Build a registry from configuration.
    ///
    /// A provider that fails construction (typically a missing credential)
    /// is skipped with a warning; fatal to that provider's registration,
    /// not to the whole service.
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        let mut registry = Self::new();
        for (name, settings) in config.enabled_providers() {
            match AdapterFactory::create_by_id(name, settings) {
                Ok(adapter) => {
                    info!(provider = %name, "registered provider");
                    registry.register(adapter);
                }
                Err(e) => {
                    warn!(provider = %name, error = %e, "skipping provider registration");
                }
            }
        }
        registry
    }

    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.providers.insert(adapter.name().to_string(), adapter);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ProviderAdapter>> {
        self.providers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Registered provider names, sorted for stable output
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn adapters(&self) -> impl Iterator<Item = &Arc<dyn ProviderAdapter>> {
        self.providers.values()
    }

    /// Release every adapter's transport
    pub fn close_all(&self) {
        for adapter in self.providers.values() {
            adapter.close();
        }
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("provider_count", &self.providers.len())
            .field("providers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosted_provider_requires_credential() {
        let err = AdapterFactory::create(ProviderKind::OpenAi, &ProviderSettings::new())
            .err()
            .expect("credential enforcement");
        assert!(matches!(err, OrchestratorError::Configuration(_)));

        // whitespace-only credentials do not count
        let settings = ProviderSettings::new().with_credential("   ");
        assert!(AdapterFactory::create(ProviderKind::Anthropic, &settings).is_err());
    }

    #[test]
    fn test_local_provider_needs_no_credential() {
        let adapter =
            AdapterFactory::create(ProviderKind::Ollama, &ProviderSettings::new()).unwrap();
        assert_eq!(adapter.name(), "ollama");
        assert!(adapter.validate_config());
    }

    #[test]
    fn test_unknown_provider_id() {
        let err = AdapterFactory::create_by_id("bedrock", &ProviderSettings::new())
            .err()
            .expect("unknown id rejected");
        assert!(matches!(err, OrchestratorError::UnknownProvider(_)));
    }

    #[test]
    fn test_from_config_skips_misconfigured() {
        let mut config = OrchestratorConfig::default();
        config
            .providers
            .insert("ollama".to_string(), ProviderSettings::new());
        // missing credential: registration skipped, not fatal
        config
            .providers
            .insert("openai".to_string(), ProviderSettings::new());
        config.providers.insert(
            "perplexity".to_string(),
            ProviderSettings::new().with_credential("pplx-k"),
        );

        let registry = AdapterRegistry::from_config(&config);
        assert_eq!(registry.names(), vec!["ollama", "perplexity"]);
        assert!(!registry.contains("openai"));
    }

    #[test]
    fn test_registry_basics() {
        let mut registry = AdapterRegistry::new();
        assert!(registry.is_empty());
        registry.register(
            AdapterFactory::create(ProviderKind::Ollama, &ProviderSettings::new()).unwrap(),
        );
        assert_eq!(registry.len(), 1);
        assert!(registry.get("ollama").is_some());
        assert!(registry.get("openai").is_none());
        registry.close_all();
    }
}
