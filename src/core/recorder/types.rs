//! Recorder data shapes: request/response records, usage buckets,
//! conversation turns

use chrono::{DateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::core::types::{MessageRole, TokenUsage};

/// Failure inside the recorder. Never masks a successful generation; the
/// orchestrator logs these instead of raising them.
#[derive(Debug, Clone, Error)]
#[error("Recorder error: {0}")]
pub struct RecorderError(pub String);

/// Time-bucket width for usage statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Hour,
    Day,
}

impl Granularity {
    /// Truncate a timestamp to the start of its bucket
    pub fn bucket_start(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        let truncated = match self {
            Granularity::Hour => at.date_naive().and_hms_opt(at.hour(), 0, 0),
            Granularity::Day => at.date_naive().and_hms_opt(0, 0, 0),
        };
        truncated
            .map(|naive| Utc.from_utc_datetime(&naive))
            .unwrap_or(at)
    }
}

/// Metadata captured before dispatching a generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestMetadata {
    pub provider: String,
    pub model: String,
    pub prompt_chars: usize,
    pub stream: bool,
}

/// A persisted request record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestRecord {
    pub id: Uuid,
    pub provider: String,
    pub model: String,
    pub prompt_chars: usize,
    pub stream: bool,
    pub created_at: DateTime<Utc>,
}

/// A persisted response record, joined to its request by id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub request_id: Uuid,
    pub provider: String,
    pub model: String,
    pub text_chars: usize,
    pub usage: TokenUsage,
    pub cost: f64,
    pub latency_ms: u64,
    pub recorded_at: DateTime<Utc>,
}

/// One terminal adapter-invocation outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEvent {
    pub provider: String,
    pub model: String,
    pub usage: TokenUsage,
    pub cost: f64,
    pub success: bool,
    pub latency_ms: u64,
    pub cached: bool,
}

/// Key of one usage-statistic bucket: at most one active bucket exists per
/// key tuple and granularity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BucketKey {
    pub bucket_start: DateTime<Utc>,
    pub granularity: Granularity,
    pub provider: String,
    pub model: String,
}

/// Rolling aggregate for one (time bucket, provider, model).
///
/// Updates are monotonic increments and recomputed averages, never
/// decrements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageBucket {
    pub key: BucketKey,
    pub request_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub cached_count: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
    pub avg_latency_ms: f64,
}

impl UsageBucket {
    pub fn new(key: BucketKey) -> Self {
        Self {
            key,
            request_count: 0,
            success_count: 0,
            failure_count: 0,
            cached_count: 0,
            total_tokens: 0,
            total_cost: 0.0,
            avg_latency_ms: 0.0,
        }
    }

    /// Fold one event into the aggregate
    pub fn record(&mut self, event: &UsageEvent) {
        self.request_count += 1;
        if event.success {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
        if event.cached {
            self.cached_count += 1;
        }
        self.total_tokens += u64::from(event.usage.total_tokens);
        self.total_cost += event.cost;
        // running mean over every event in the bucket
        let count = self.request_count as f64;
        self.avg_latency_ms += (event.latency_ms as f64 - self.avg_latency_ms) / count;
    }

    pub fn cache_hit_rate(&self) -> f64 {
        if self.request_count == 0 {
            0.0
        } else {
            self.cached_count as f64 / self.request_count as f64
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.request_count == 0 {
            0.0
        } else {
            self.success_count as f64 / self.request_count as f64
        }
    }
}

/// One message within a persisted conversation.
///
/// `seq` increases monotonically per conversation; assistant turns carry
/// the originating request's provider/model/cost/token annotations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: Uuid,
    pub session_id: String,
    pub seq: u64,
    pub role: MessageRole,
    pub content: String,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub cost: Option<f64>,
    pub tokens: Option<u32>,
    pub request_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
