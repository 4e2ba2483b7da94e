//! The cache store

use dashmap::DashMap;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::debug;

use super::types::{AtomicCacheStats, CacheEntry, CacheStats};
use crate::core::types::GenerationResponse;

/// Default time-to-live for cached responses
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Fingerprint-keyed TTL cache for finalized generation responses.
///
/// Safe for concurrent read/write. Lookup and store are a plain
/// read-check-then-write: two racing identical requests may both reach the
/// upstream and the later `put` wins. That duplicate work is accepted; no
/// at-most-one-call-per-fingerprint claim is made.
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    stats: AtomicCacheStats,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            stats: AtomicCacheStats::default(),
        }
    }

    pub fn with_default_ttl() -> Self {
        Self::new(DEFAULT_TTL)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fetch a live entry. Returns `None` for both never-seen and expired
    /// keys; an expired entry is removed on the way out.
    pub fn get(&self, key: &str) -> Option<GenerationResponse> {
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired(self.ttl) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "cache hit");
                Some(entry.response.clone())
            }
            Some(entry) => {
                // lazily reclaim; drop the shard guard before removing
                drop(entry);
                self.entries.remove(key);
                self.stats.expirations.fetch_add(1, Ordering::Relaxed);
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a finalized response. Overwrites unconditionally; last write
    /// wins.
    pub fn put(&self, key: impl Into<String>, response: GenerationResponse) {
        let key = key.into();
        debug!(key = %key, "caching response");
        self.entries.insert(key, CacheEntry::new(response));
        self.stats.insertions.fetch_add(1, Ordering::Relaxed);
    }

    /// Physically remove every expired entry; returns how many went
    pub fn sweep(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(self.ttl));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "swept expired cache entries");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}
