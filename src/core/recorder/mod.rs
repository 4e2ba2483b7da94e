//! Usage and conversation recording boundary
//!
//! The orchestrator writes through this trait as a side effect of every
//! call; the storage engine behind it is out of scope. An in-memory
//! implementation ships for embedding and tests.

mod memory;
mod types;


pub use memory::MemoryRecorder;
pub use types::{
    BucketKey, Granularity, RecorderError, RequestMetadata, RequestRecord, ResponseRecord, Turn,
    UsageBucket, UsageEvent,
};

use async_trait::async_trait;
use uuid::Uuid;

use crate::core::types::{GenerationResponse, MessageRole};

/// Persistence operations the orchestrator depends on.
///
/// `record_usage` is called exactly once per terminal outcome of every
/// adapter invocation, cache hits included (they count as free,
/// zero-latency success events). Implementations must be safe for
/// concurrent use.
#[async_trait]
pub trait UsageRecorder: Send + Sync {
    /// Persist request metadata; returns the request id used to join the
    /// response record later
    async fn record_request(&self, meta: RequestMetadata) -> Result<Uuid, RecorderError>;

    /// Persist the outcome of a completed generation
    async fn record_response(
        &self,
        request_id: Uuid,
        response: &GenerationResponse,
        latency_ms: u64,
    ) -> Result<(), RecorderError>;

    /// Fold one terminal outcome into the rolling usage statistics
    async fn record_usage(&self, event: UsageEvent) -> Result<(), RecorderError>;

    /// Append one turn to a conversation; returns the turn id
    async fn append_turn(
        &self,
        session_id: &str,
        role: MessageRole,
        content: &str,
        request_id: Option<Uuid>,
    ) -> Result<Uuid, RecorderError>;

    /// Turns of a conversation in sequence order; with a limit, the most
    /// recent `limit` turns, still oldest-first
    async fn get_history(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Turn>, RecorderError>;
}
