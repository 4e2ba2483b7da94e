//! In-memory recorder
//!
//! DashMap-backed reference implementation of the recording boundary.
//! Suitable for embedding and tests; durable storage is a different
//! implementation of the same trait.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

use super::types::{
    BucketKey, Granularity, RecorderError, RequestMetadata, RequestRecord, ResponseRecord, Turn,
    UsageBucket, UsageEvent,
};
use super::UsageRecorder;
use crate::core::types::{GenerationResponse, MessageRole};

/// In-memory implementation of [`UsageRecorder`]
#[derive(Default)]
pub struct MemoryRecorder {
    requests: DashMap<Uuid, RequestRecord>,
    responses: DashMap<Uuid, ResponseRecord>,
    buckets: DashMap<BucketKey, UsageBucket>,
    /// session id -> ordered turns; the mutex keeps sequence numbers
    /// strictly increasing under concurrent appends
    conversations: DashMap<String, Mutex<Vec<Turn>>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one active bucket, if any events landed in it
    pub fn bucket(
        &self,
        provider: &str,
        model: &str,
        granularity: Granularity,
    ) -> Option<UsageBucket> {
        let key = BucketKey {
            bucket_start: granularity.bucket_start(Utc::now()),
            granularity,
            provider: provider.to_string(),
            model: model.to_string(),
        };
        self.buckets.get(&key).map(|b| b.value().clone())
    }

    /// Snapshot of every bucket
    pub fn usage_summary(&self) -> Vec<UsageBucket> {
        let mut buckets: Vec<UsageBucket> =
            self.buckets.iter().map(|entry| entry.value().clone()).collect();
        buckets.sort_by(|a, b| {
            (a.key.bucket_start, &a.key.provider, &a.key.model).cmp(&(
                b.key.bucket_start,
                &b.key.provider,
                &b.key.model,
            ))
        });
        buckets
    }

    pub fn request(&self, id: Uuid) -> Option<RequestRecord> {
        self.requests.get(&id).map(|r| r.value().clone())
    }

    pub fn response_for(&self, request_id: Uuid) -> Option<ResponseRecord> {
        self.responses.get(&request_id).map(|r| r.value().clone())
    }
}

#[async_trait]
impl UsageRecorder for MemoryRecorder {
    async fn record_request(&self, meta: RequestMetadata) -> Result<Uuid, RecorderError> {
        let id = Uuid::new_v4();
        self.requests.insert(
            id,
            RequestRecord {
                id,
                provider: meta.provider,
                model: meta.model,
                prompt_chars: meta.prompt_chars,
                stream: meta.stream,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn record_response(
        &self,
        request_id: Uuid,
        response: &GenerationResponse,
        latency_ms: u64,
    ) -> Result<(), RecorderError> {
        self.responses.insert(
            request_id,
            ResponseRecord {
                request_id,
                provider: response.provider.clone(),
                model: response.model.clone(),
                text_chars: response.text.chars().count(),
                usage: response.usage,
                cost: response.cost,
                latency_ms,
                recorded_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn record_usage(&self, event: UsageEvent) -> Result<(), RecorderError> {
        let now = Utc::now();
        for granularity in [Granularity::Hour, Granularity::Day] {
            let key = BucketKey {
                bucket_start: granularity.bucket_start(now),
                granularity,
                provider: event.provider.clone(),
                model: event.model.clone(),
            };
            self.buckets
                .entry(key.clone())
                .or_insert_with(|| UsageBucket::new(key))
                .record(&event);
        }
        Ok(())
    }

    async fn append_turn(
        &self,
        session_id: &str,
        role: MessageRole,
        content: &str,
        request_id: Option<Uuid>,
    ) -> Result<Uuid, RecorderError> {
        // assistant annotations come from the joined response record
        let annotations = request_id.and_then(|id| self.response_for(id));

        let conversation = self
            .conversations
            .entry(session_id.to_string())
            .or_insert_with(|| Mutex::new(Vec::new()));
        let mut turns = conversation.lock();

        let id = Uuid::new_v4();
        let seq = turns.last().map(|t| t.seq + 1).unwrap_or(0);
        turns.push(Turn {
            id,
            session_id: session_id.to_string(),
            seq,
            role,
            content: content.to_string(),
            provider: annotations.as_ref().map(|r| r.provider.clone()),
            model: annotations.as_ref().map(|r| r.model.clone()),
            cost: annotations.as_ref().map(|r| r.cost),
            tokens: annotations.as_ref().map(|r| r.usage.total_tokens),
            request_id,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn get_history(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Turn>, RecorderError> {
        let Some(conversation) = self.conversations.get(session_id) else {
            return Ok(Vec::new());
        };
        let turns = conversation.lock();
        let history = match limit {
            Some(n) if n < turns.len() => turns[turns.len() - n..].to_vec(),
            _ => turns.clone(),
        };
        Ok(history)
    }
}
