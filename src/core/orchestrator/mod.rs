//! Request orchestration
//!
//! Routes generation requests to one adapter, consults the cache first,
//! fans out for comparison, walks fallback chains, probes health, and
//! writes usage through the recorder boundary.

mod service;
mod types;

#[cfg(test)]
mod tests;

pub use service::Orchestrator;
pub use types::ProviderComparison;
