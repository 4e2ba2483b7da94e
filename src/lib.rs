//! # modelgate
//!
//! A unified orchestration layer over heterogeneous LLM provider APIs:
//! local inference, hosted completion, and search-augmented completion
//! behind one request/response contract.
//!
//! ## Features
//!
//! - **Uniform adapters**: one capability set ({generate, validate_config,
//!   list_models, estimate_cost}) across every backend; callers never
//!   branch on a concrete provider type
//! - **Response cache**: content-addressed by a deterministic request
//!   fingerprint, TTL-evicted, finalized responses only
//! - **Cost accounting**: static per-model price tables plus a word-count
//!   token approximation for pre-call estimates
//! - **Fan-out and fallback**: concurrent multi-provider comparison and
//!   ordered fallback chains, caller-invoked
//! - **Usage analytics**: time-bucketed request/token/cost aggregates and
//!   multi-turn conversation persistence behind a recorder boundary
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use modelgate::config::{OrchestratorConfig, ProviderSettings};
//! use modelgate::core::types::GenerationOptions;
//! use modelgate::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = OrchestratorConfig::default();
//!     config.providers.insert(
//!         "ollama".to_string(),
//!         ProviderSettings::new().with_base_url("http://localhost:11434"),
//!     );
//!     config.default_provider = Some("ollama".to_string());
//!
//!     let orchestrator = Orchestrator::from_config(&config)?;
//!     let response = orchestrator
//!         .generate("Why is the sky blue?", None, None, GenerationOptions::default())
//!         .await?;
//!
//!     println!("{} ({}, ${:.6})", response.text, response.provider, response.cost);
//!     orchestrator.shutdown();
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod utils;

// Re-export main types
pub use crate::config::OrchestratorConfig;
pub use crate::core::error::{OrchestratorError, Result};
pub use crate::core::orchestrator::{Orchestrator, ProviderComparison};
pub use crate::core::providers::{
    AdapterFactory, AdapterRegistry, ProviderAdapter, ProviderError, ProviderKind,
};
pub use crate::core::recorder::{MemoryRecorder, UsageRecorder};
pub use crate::core::types::{
    GenerationOptions, GenerationRequest, GenerationResponse, MessageRole, RequestContext,
    StructuredOutput, TokenUsage,
};

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
        assert_eq!(NAME, "modelgate");
    }
}
