//! The uniform adapter contract every provider implements
//!
//! One instance per enabled provider. Adapters are stateless apart from
//! their transport connection and are created once by the registry (or
//! lazily by callers embedding a single provider).

use async_trait::async_trait;

use super::ProviderKind;
use super::error::ProviderError;
use crate::core::types::{GenerationRequest, GenerationResponse};

/// Capability set shared by all providers
///
/// Implementations translate the uniform request into their wire format,
/// buffer any streamed output into one materialized response, and never
/// surface a silently-empty completion: a missing completion body is a
/// [`ProviderError::EmptyCompletion`], while an explicit empty string from
/// the upstream passes through.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Stable provider identifier ("ollama", "openai", ...)
    fn name(&self) -> &'static str;

    /// Which backend family this adapter speaks to
    fn kind(&self) -> ProviderKind;

    /// Perform one generation call
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError>;

    /// Check presence and shape of credentials without any network I/O.
    ///
    /// Fast and side-effect-free; used for readiness checks before
    /// registration.
    fn validate_config(&self) -> bool;

    /// Models this provider can serve, in preference order.
    ///
    /// Static for hosted providers; local inference may probe its daemon
    /// once and fall back to a static list.
    async fn available_models(&self) -> Vec<String>;

    /// Cost projection for a request without performing generation.
    ///
    /// Uses the static price table and the word-count token approximation;
    /// callers must treat the result as a bound estimate, not an exact
    /// figure. Always >= 0; exactly 0.0 for free providers.
    fn estimate_cost(&self, request: &GenerationRequest) -> f64;

    /// Release the underlying transport. Idempotent.
    fn close(&self) {}
}
