//! Bounded memoization of parsed connection strings.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::ConnstrError;
use crate::parse::NormalizedConnectionString;

/// Configuration for a [`NormalizationCache`].
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// Maximum number of distinct raw strings kept.
    pub capacity: usize,

    /// Age at which a cached entry is re-parsed. `None` keeps entries until
    /// LRU pressure evicts them.
    pub ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            ttl: None,
        }
    }
}

impl CacheConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entry capacity.
    #[must_use]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the entry TTL.
    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

struct CachedEntry {
    parsed: Arc<NormalizedConnectionString>,
    inserted_at: Instant,
}

/// Memoizes connection-string parsing behind an LRU bound.
///
/// Owned by the composition root and injected into every context that needs
/// it; there is deliberately no process-global instance. Entries are shared
/// out as `Arc`s, so a hit never copies the parsed map.
pub struct NormalizationCache {
    entries: Mutex<LruCache<String, CachedEntry>>,
    ttl: Option<Duration>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl NormalizationCache {
    /// Create a cache with the given bounds.
    ///
    /// A zero capacity is clamped to one entry rather than rejected; a cache
    /// that can hold nothing has no meaningful semantics.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        let capacity =
            NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        tracing::debug!(
            capacity = capacity.get(),
            ttl_ms = config.ttl.map(|t| t.as_millis() as u64),
            "normalization cache created"
        );
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl: config.ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    /// Return the parsed view of `raw`, parsing and caching it on first use.
    pub fn get_or_parse(
        &self,
        raw: &str,
    ) -> Result<Arc<NormalizedConnectionString>, ConnstrError> {
        {
            let mut entries = self.entries.lock();
            match entries.get(raw) {
                Some(entry) if !self.expired(entry) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(Arc::clone(&entry.parsed));
                }
                Some(_) => {
                    entries.pop(raw);
                    self.expirations.fetch_add(1, Ordering::Relaxed);
                }
                None => {}
            }
        }

        // Parse outside the critical section. Two callers racing on the same
        // raw string both parse; the loser's insert just refreshes the entry.
        self.misses.fetch_add(1, Ordering::Relaxed);
        let parsed = Arc::new(NormalizedConnectionString::parse(raw)?);

        let mut entries = self.entries.lock();
        if entries
            .push(raw.to_string(), CachedEntry {
                parsed: Arc::clone(&parsed),
                inserted_at: Instant::now(),
            })
            .is_some_and(|(evicted_key, _)| evicted_key != raw)
        {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }

        Ok(parsed)
    }

    /// Point-in-time counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            len: self.entries.lock().len(),
        }
    }

    fn expired(&self, entry: &CachedEntry) -> bool {
        self.ttl
            .is_some_and(|ttl| entry.inserted_at.elapsed() >= ttl)
    }
}

impl std::fmt::Debug for NormalizationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NormalizationCache")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CacheStats {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that had to parse.
    pub misses: u64,
    /// Entries displaced by LRU pressure.
    pub evictions: u64,
    /// Entries re-parsed because their TTL elapsed.
    pub expirations: u64,
    /// Entries currently cached.
    pub len: usize,
}

impl CacheStats {
    /// Fraction of lookups served from the cache, in `[0, 1]`.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 1.0;
        }
        self.hits as f64 / total as f64
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_and_miss_accounting() {
        let cache = NormalizationCache::new(CacheConfig::default());

        let first = cache.get_or_parse("Server=a;Database=b").unwrap();
        let second = cache.get_or_parse("Server=a;Database=b").unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.len, 1);
    }

    #[test]
    fn test_parse_errors_are_not_cached() {
        let cache = NormalizationCache::new(CacheConfig::default());
        assert!(cache.get_or_parse("garbage").is_err());
        assert!(cache.get_or_parse("garbage").is_err());
        let stats = cache.stats();
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.len, 0);
    }

    #[test]
    fn test_capacity_bound_evicts_lru() {
        let cache = NormalizationCache::new(CacheConfig::new().capacity(2));
        cache.get_or_parse("Server=a").unwrap();
        cache.get_or_parse("Server=b").unwrap();
        cache.get_or_parse("Server=c").unwrap();

        let stats = cache.stats();
        assert_eq!(stats.len, 2);
        assert_eq!(stats.evictions, 1);

        // "Server=a" was least recently used; re-reading it is a miss.
        cache.get_or_parse("Server=a").unwrap();
        assert_eq!(cache.stats().misses, 4);
    }

    #[test]
    fn test_ttl_expiry_reparses() {
        let cache =
            NormalizationCache::new(CacheConfig::new().ttl(Duration::ZERO));
        cache.get_or_parse("Server=a").unwrap();
        cache.get_or_parse("Server=a").unwrap();

        let stats = cache.stats();
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.expirations, 1);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = NormalizationCache::new(CacheConfig::new().capacity(0));
        cache.get_or_parse("Server=a").unwrap();
        assert_eq!(cache.stats().len, 1);
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 9,
            misses: 1,
            evictions: 0,
            expirations: 0,
            len: 1,
        };
        assert!((stats.hit_rate() - 0.9).abs() < f64::EPSILON);
    }
}
