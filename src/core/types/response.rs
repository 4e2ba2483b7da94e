//! Generation response types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Token accounting for one generation
///
/// Counts are zero (never absent) when a provider reports nothing, so that
/// aggregation over responses stays total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Build from a total only, splitting evenly between input and output.
    ///
    /// Deliberate approximation carried over from the source system for
    /// providers that report a single combined count.
    pub fn from_total_split_even(total_tokens: u32) -> Self {
        let prompt_tokens = total_tokens / 2;
        Self {
            prompt_tokens,
            completion_tokens: total_tokens - prompt_tokens,
            total_tokens,
        }
    }
}

/// The uniform generation response returned by every adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Generated text
    pub text: String,
    /// Originating provider identifier
    pub provider: String,
    /// Model that produced the text
    pub model: String,
    /// Token accounting; zeroed when unknown
    #[serde(default)]
    pub usage: TokenUsage,
    /// Computed monetary cost in USD; 0.0 when unknown or free
    #[serde(default)]
    pub cost: f64,
    /// Opaque per-provider metadata (finish reason, citations, ...)
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Whether this response was served from the cache
    #[serde(default)]
    pub cached: bool,
    /// Wall-clock latency of the upstream call; zero for cache hits
    #[serde(default)]
    pub latency_ms: u64,
}

impl GenerationResponse {
    pub fn new(
        text: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            provider: provider.into(),
            model: model.into(),
            usage: TokenUsage::default(),
            cost: 0.0,
            metadata: HashMap::new(),
            cached: false,
            latency_ms: 0,
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}
