//! Cache entry and statistics types

use crate::core::types::GenerationResponse;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// One cached response plus its insertion timestamp.
///
/// An entry is visible only while `now - inserted_at < ttl`; past that it
/// is logically absent even before being physically swept.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub response: GenerationResponse,
    pub inserted_at: Instant,
}

impl CacheEntry {
    pub fn new(response: GenerationResponse) -> Self {
        Self {
            response,
            inserted_at: Instant::now(),
        }
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() >= ttl
    }
}

/// Lock-free counters updated on the hot path
#[derive(Debug, Default)]
pub(super) struct AtomicCacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub expirations: AtomicU64,
    pub insertions: AtomicU64,
}

impl AtomicCacheStats {
    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            insertions: self.insertions.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Lookups that found an entry past its TTL
    pub expirations: u64,
    pub insertions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}
