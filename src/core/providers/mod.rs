//! Provider adapters and their shared infrastructure
//!
//! One module per backend, a capability trait they all implement, the
//! static pricing tables, and the registry/factory that constructs them
//! from configuration.

pub mod adapter;
pub mod error;
pub mod pricing;
pub mod registry;

pub mod anthropic;
pub mod ollama;
pub mod openai;
pub mod perplexity;

pub use adapter::ProviderAdapter;
pub use anthropic::AnthropicAdapter;
pub use error::ProviderError;
pub use ollama::OllamaAdapter;
pub use openai::OpenAiAdapter;
pub use perplexity::PerplexityAdapter;
pub use registry::{AdapterFactory, AdapterRegistry};

use serde::{Deserialize, Serialize};

/// Move a configured default model to the front of a fixed catalog.
///
/// Hosted catalogs are authoritative, so a default that is not in the
/// list is ignored rather than invented.
pub(crate) fn promote_default(mut models: Vec<String>, default: Option<&str>) -> Vec<String> {
    if let Some(default) = default {
        if let Some(pos) = models.iter().position(|m| m == default) {
            let model = models.remove(pos);
            models.insert(0, model);
        }
    }
    models
}

/// Backend family enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local inference daemon; no credential, zero cost
    Ollama,
    /// Hosted completion API, bearer auth
    OpenAi,
    /// Hosted completion API, dedicated system field
    Anthropic,
    /// Search-augmented completion API with citations
    Perplexity,
}

impl ProviderKind {
    /// All known kinds, in registration order
    pub fn all() -> &'static [ProviderKind] {
        &[
            ProviderKind::Ollama,
            ProviderKind::OpenAi,
            ProviderKind::Anthropic,
            ProviderKind::Perplexity,
        ]
    }

    /// Local providers need no credential and always cost 0.0
    pub fn is_local(&self) -> bool {
        matches!(self, ProviderKind::Ollama)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Ollama => "ollama",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Perplexity => "perplexity",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = crate::core::error::OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" | "local" => Ok(ProviderKind::Ollama),
            "openai" | "open-ai" => Ok(ProviderKind::OpenAi),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "perplexity" | "pplx" => Ok(ProviderKind::Perplexity),
            other => Err(crate::core::error::OrchestratorError::UnknownProvider(
                other.to_string(),
            )),
        }
    }
}
