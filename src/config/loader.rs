//! Configuration loading
//!
//! YAML file first, then an environment overlay in the
//! `PROVIDER_<NAME>_<FIELD>` convention so deployments can inject
//! credentials without writing them to disk.

use super::{OrchestratorConfig, ProviderSettings};
use crate::core::error::Result;
use std::collections::HashMap;
use std::env;
use std::path::Path;
use tracing::debug;

impl OrchestratorConfig {
    /// Load from a YAML file and validate
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        debug!(path = %path.as_ref().display(), "loading orchestrator configuration");
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse from a YAML string and validate
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay provider fields from the process environment.
    ///
    /// Recognized variables: `PROVIDER_<NAME>_CREDENTIAL`,
    /// `PROVIDER_<NAME>_BASE_URL`, `PROVIDER_<NAME>_DEFAULT_MODEL`,
    /// `PROVIDER_<NAME>_ENABLED`, plus `MODELGATE_DEFAULT_PROVIDER`.
    /// Unknown fields are ignored with a debug log.
    pub fn apply_env_overlay(&mut self) {
        let mut fields: HashMap<String, HashMap<String, String>> = HashMap::new();

        for (key, value) in env::vars() {
            let Some(rest) = key.strip_prefix("PROVIDER_") else {
                continue;
            };
            let Some((name, field)) = rest.split_once('_') else {
                continue;
            };
            fields
                .entry(name.to_lowercase())
                .or_default()
                .insert(field.to_lowercase(), value);
        }

        for (name, values) in fields {
            let settings = self
                .providers
                .entry(name.clone())
                .or_insert_with(ProviderSettings::default);
            for (field, value) in values {
                match field.as_str() {
                    "credential" => settings.credential = Some(value),
                    "base" | "base_url" => settings.base_url = Some(value),
                    "default_model" => settings.default_model = Some(value),
                    "enabled" => settings.enabled = value.parse().unwrap_or(true),
                    other => {
                        debug!(provider = %name, field = %other, "ignoring unknown provider env field");
                    }
                }
            }
        }

        if let Ok(default) = env::var("MODELGATE_DEFAULT_PROVIDER") {
            self.default_provider = Some(default);
        }
    }
}
