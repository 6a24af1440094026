//! Cache counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the cache counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    /// Lookups answered from a ready slot
    pub hits: u64,
    /// Lookups that found nothing cached
    pub misses: u64,
    /// Lookups that joined a fetch already in flight
    pub joined: u64,
    /// Fetches issued to the fetcher
    pub fetches: u64,
    /// Fetches that failed
    pub fetch_errors: u64,
    /// Fetch results discarded because their slot was cleared meanwhile
    pub stale_discards: u64,
    /// Calls to `clear_cache`
    pub clears: u64,
}

impl CacheStatsSnapshot {
    /// Fraction of lookups answered without a new fetch.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.joined + self.misses;
        if lookups == 0 {
            return 0.0;
        }
        (self.hits + self.joined) as f64 / lookups as f64
    }
}

#[derive(Debug, Default)]
pub(crate) struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    joined: AtomicU64,
    fetches: AtomicU64,
    fetch_errors: AtomicU64,
    stale_discards: AtomicU64,
    clears: AtomicU64,
}

impl CacheStats {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn join(&self) {
        self.joined.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn fetch(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn fetch_error(&self) {
        self.fetch_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn stale_discard(&self) {
        self.stale_discards.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn clear(&self) {
        self.clears.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            joined: self.joined.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            fetch_errors: self.fetch_errors.load(Ordering::Relaxed),
            stale_discards: self.stale_discards.load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts() {
        let stats = CacheStats::default();
        stats.hit();
        stats.hit();
        stats.join();
        stats.miss();
        stats.fetch();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.hits, 2);
        assert_eq!(snapshot.joined, 1);
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.fetches, 1);
        assert_eq!(snapshot.hit_rate(), 0.75);
    }

    #[test]
    fn test_empty_hit_rate() {
        assert_eq!(CacheStatsSnapshot::default().hit_rate(), 0.0);
    }
}
