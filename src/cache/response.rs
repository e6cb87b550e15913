//! Result cache for completed generations.
//!
//! [`ResultCache`] maps a request [`Fingerprint`] to the
//! [`GenerationResult`] produced for it. It is bounded two ways:
//!
//! - **Capacity.** An LRU list; inserting into a full cache evicts the
//!   least recently used entry. Hits and inserts both count as use.
//! - **Time.** Each entry carries an absolute expiry. A `get` that finds
//!   an expired entry drops it and reports a miss; entries nobody reads
//!   are removed by [`sweep_expired`](ResultCache::sweep_expired), which
//!   the service runs on an interval.
//!
//! # Concurrency
//!
//! One mutex guards the LRU list and the counters, so hit-then-promote
//! and insert-then-evict are atomic with respect to other callers. Locked
//! sections never await.
//!
//! Entries are replaced whole; there is no partial update.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lru::LruCache;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use super::Fingerprint;
use crate::telemetry;
use crate::types::GenerationResult;

/// Longest honoured TTL; larger values are clamped.
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// Configuration for the result cache.
///
/// ```rust
/// # use runesmith::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(500)
///     .ttl(Duration::from_secs(600));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of cached entries. Default: 100.
    pub max_entries: usize,
    /// Time-to-live for cached entries. Default: 1 hour.
    pub ttl: Duration,
    /// Interval between background expiry sweeps. Default: 5 minutes.
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            ttl: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(300),
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: usize) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the time-to-live for cached entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the background sweep interval.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

/// Counter snapshot for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub current_size: usize,
    pub max_size: usize,
}

impl CacheStats {
    /// Fraction of lookups that hit, or 0 with no lookups.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Description of one live entry, for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntryInfo {
    pub fingerprint: Fingerprint,
    pub age: Duration,
    pub expires_in: Duration,
    pub since_last_access: Duration,
    pub hit_count: u64,
    pub size_bytes: usize,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: GenerationResult,
    created_at: Instant,
    expires_at: Instant,
    last_accessed: Instant,
    hit_count: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

struct Inner {
    entries: LruCache<Fingerprint, CacheEntry>,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

/// Bounded, time-expiring store of generation results.
///
/// Shared across all concurrent dispatches. See module docs.
pub struct ResultCache {
    inner: Mutex<Inner>,
    ttl: Duration,
    capacity: NonZeroUsize,
}

impl ResultCache {
    /// Create an empty cache. A `max_entries` of zero is treated as one.
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                hits: 0,
                misses: 0,
                evictions: 0,
                expirations: 0,
            }),
            ttl: config.ttl.min(MAX_TTL),
            capacity,
        }
    }

    // Every critical section leaves `Inner` consistent, so a poisoned lock
    // is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a cached result, promoting it to most recently used.
    ///
    /// An expired entry is removed on the spot and reported as a miss.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<GenerationResult> {
        let now = Instant::now();
        let mut inner = self.lock();

        let expired = match inner.entries.get_mut(fingerprint) {
            Some(entry) if !entry.is_expired(now) => {
                entry.hit_count += 1;
                entry.last_accessed = now;
                let hits = entry.hit_count;
                let result = entry.result.clone();
                inner.hits += 1;
                drop(inner);
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                debug!(fingerprint = fingerprint.short(), hits, "cache hit");
                return Some(result);
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            inner.entries.pop(fingerprint);
            inner.expirations += 1;
            metrics::counter!(telemetry::CACHE_EXPIRATIONS_TOTAL).increment(1);
            debug!(fingerprint = fingerprint.short(), "cache entry expired");
        }
        inner.misses += 1;
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
        None
    }

    /// Insert or replace a result.
    ///
    /// Inserting a new fingerprint into a full cache evicts the least
    /// recently used entry first.
    pub fn set(&self, fingerprint: Fingerprint, result: GenerationResult) {
        let now = Instant::now();
        let entry = CacheEntry {
            result,
            created_at: now,
            expires_at: now + self.ttl,
            last_accessed: now,
            hit_count: 0,
        };

        let mut inner = self.lock();
        let replacing = inner.entries.contains(&fingerprint);
        let displaced = inner.entries.push(fingerprint.clone(), entry);
        if !replacing && let Some((evicted, _)) = displaced {
            inner.evictions += 1;
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL).increment(1);
            debug!(evicted = evicted.short(), "evicted least recently used entry");
        }
        debug!(fingerprint = fingerprint.short(), "cached result");
    }

    /// Remove one entry. Returns whether it was present.
    pub fn invalidate(&self, fingerprint: &Fingerprint) -> bool {
        let removed = self.lock().entries.pop(fingerprint).is_some();
        if removed {
            debug!(fingerprint = fingerprint.short(), "invalidated cache entry");
        }
        removed
    }

    /// Remove every entry. Returns the number removed.
    pub fn invalidate_all(&self) -> usize {
        let mut inner = self.lock();
        let count = inner.entries.len();
        inner.entries.clear();
        debug!(count, "cleared result cache");
        count
    }

    /// Drop every expired entry. Returns the number removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.lock();
        let expired: Vec<Fingerprint> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            inner.entries.pop(key);
        }
        let count = expired.len();
        inner.expirations += count as u64;
        drop(inner);

        if count > 0 {
            metrics::counter!(telemetry::CACHE_EXPIRATIONS_TOTAL).increment(count as u64);
            debug!(count, "swept expired cache entries");
        }
        count
    }

    /// Number of entries currently held (expired-but-unswept included).
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `fingerprint` is held, without promoting it.
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.lock().entries.contains(fingerprint)
    }

    /// Snapshot of the bookkeeping counters.
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            expirations: inner.expirations,
            current_size: inner.entries.len(),
            max_size: self.capacity.get(),
        }
    }

    /// Describe live entries, most recently used first.
    pub fn entries(&self) -> Vec<CacheEntryInfo> {
        let now = Instant::now();
        self.lock()
            .entries
            .iter()
            .map(|(key, entry)| CacheEntryInfo {
                fingerprint: key.clone(),
                age: now.saturating_duration_since(entry.created_at),
                expires_in: entry.expires_at.saturating_duration_since(now),
                since_last_access: now.saturating_duration_since(entry.last_accessed),
                hit_count: entry.hit_count,
                size_bytes: entry.result.content.len(),
            })
            .collect()
    }
}
