//! Configuration models
//!
//! Per-provider settings plus the global orchestration knobs. Loadable from
//! YAML with an environment-variable overlay (see `loader`).

mod loader;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::error::{OrchestratorError, Result};

/// Settings for one provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Whether this provider should be registered
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// API credential; required for every provider except local inference
    #[serde(default)]
    pub credential: Option<String>,
    /// Base URL override (self-hosted gateways, local daemons)
    #[serde(default)]
    pub base_url: Option<String>,
    /// Model used when callers pass none; falls back to the provider's
    /// first listed model
    #[serde(default)]
    pub default_model: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            credential: None,
            base_url: None,
            default_model: None,
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl ProviderSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }
}

/// Response cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Time-to-live for cached responses, in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_cache_ttl(),
        }
    }
}

/// Numeric limits and defaults
///
/// `requests_per_minute` and `daily_cost_ceiling` are advisory metadata
/// recorded alongside usage; enforcement belongs to an outer layer, not to
/// this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Output-token default applied when callers set none
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Temperature default applied when callers set none
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Advisory request budget per minute
    #[serde(default = "default_rpm")]
    pub requests_per_minute: u32,
    /// Advisory daily spend ceiling in USD
    #[serde(default = "default_cost_ceiling")]
    pub daily_cost_ceiling: f64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            requests_per_minute: default_rpm(),
            daily_cost_ceiling: default_cost_ceiling(),
        }
    }
}

/// Root configuration for the orchestration layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Provider used when callers omit one
    #[serde(default)]
    pub default_provider: Option<String>,
    /// Provider id -> settings
    #[serde(default)]
    pub providers: HashMap<String, ProviderSettings>,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl OrchestratorConfig {
    /// Check internal consistency before building a registry from this
    pub fn validate(&self) -> Result<()> {
        if let Some(default) = &self.default_provider {
            if !self.providers.contains_key(default) {
                return Err(OrchestratorError::configuration(format!(
                    "default_provider '{}' has no provider entry",
                    default
                )));
            }
        }
        if self.cache.enabled && self.cache.ttl_secs == 0 {
            return Err(OrchestratorError::configuration(
                "cache ttl_secs must be greater than 0 when the cache is enabled",
            ));
        }
        if self.limits.max_tokens == 0 {
            return Err(OrchestratorError::configuration(
                "limits.max_tokens must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Enabled providers only
    pub fn enabled_providers(&self) -> impl Iterator<Item = (&String, &ProviderSettings)> {
        self.providers.iter().filter(|(_, s)| s.enabled)
    }
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    60
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.7
}

fn default_rpm() -> u32 {
    60
}

fn default_cost_ceiling() -> f64 {
    10.0
}
