//! Orchestrator result types

use crate::core::types::GenerationResponse;

/// One provider's outcome within a comparison fan-out.
///
/// A failed provider yields an error marker instead of aborting the other
/// sub-calls; `compare` itself never fails.
#[derive(Debug, Clone)]
pub struct ProviderComparison {
    pub provider: String,
    pub outcome: Result<GenerationResponse, String>,
}

impl ProviderComparison {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}
