//! Core orchestration layer: types, errors, adapters, cache, service, and
//! the recording boundary

pub mod cache;
pub mod error;
pub mod orchestrator;
pub mod providers;
pub mod recorder;
pub mod types;

pub use error::{OrchestratorError, Result};
pub use orchestrator::{Orchestrator, ProviderComparison};
