//! Error handling for the orchestration layer

use crate::core::providers::ProviderError;
use thiserror::Error;

/// Result type alias for the orchestration layer
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Top-level error taxonomy
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Missing or invalid provider settings at construction time; fatal to
    /// that provider's registration, not to the whole service
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Caller named a provider that is not registered
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Caller named a model absent from the provider's list
    #[error("Unknown model '{model}' for provider {provider}")]
    UnknownModel { provider: String, model: String },

    /// No provider given and no default configured
    #[error("No provider specified and no default provider configured")]
    NoProvider,

    /// Provider exposes no models to default to
    #[error("Provider {0} exposes no models")]
    NoModel(String),

    /// A generation call failed inside the adapter
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Every provider in a fallback chain failed; carries the last error
    #[error("All providers failed (tried {})", attempted.join(", "))]
    AggregateFailure {
        attempted: Vec<String>,
        #[source]
        last: Box<OrchestratorError>,
    },

    /// IO failure while loading configuration
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration file
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl OrchestratorError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn unknown_model(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self::UnknownModel {
            provider: provider.into(),
            model: model.into(),
        }
    }
}
