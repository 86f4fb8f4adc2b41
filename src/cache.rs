use std::time::{Duration, Instant};

use dashmap::DashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("counter cache unavailable: {0}")]
    Unavailable(String),
}

// Protocol offered by the fingerprint counter backend. Increments must be
// atomic across all racing callers, since the counter is the single
// authoritative source for admission decisions.
pub trait CounterCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<u64>, CacheError>;
    fn set(&self, key: &str, ttl: Duration) -> Result<(), CacheError>;
    fn incr(&self, key: &str) -> Result<u64, CacheError>;
}

// Counter entry with its expiration window
struct CounterEntry {
    count: u64,
    expires_at: Instant,
    ttl: Duration,
}

impl CounterEntry {
    fn fresh(ttl: Duration) -> Self {
        Self {
            count: 0,
            expires_at: Instant::now() + ttl,
            ttl,
        }
    }

    fn expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

// In-process counter cache. Per-key atomicity comes from the map's entry
// API; expired entries behave exactly like absent ones.
#[derive(Default)]
pub struct MemoryCounterCache {
    entries: DashMap<String, CounterEntry>,
}

impl MemoryCounterCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterCache for MemoryCounterCache {
    fn get(&self, key: &str) -> Result<Option<u64>, CacheError> {
        self.entries.remove_if(key, |_, entry| entry.expired());
        Ok(self.entries.get(key).map(|entry| entry.count))
    }

    fn set(&self, key: &str, ttl: Duration) -> Result<(), CacheError> {
        self.entries.insert(key.to_string(), CounterEntry::fresh(ttl));
        Ok(())
    }

    fn incr(&self, key: &str) -> Result<u64, CacheError> {
        let mut entry = self
            .entries
            .entry(key.to_string())
            // an incr without a prior set starts a window that lapses
            // immediately, so it can never wedge suppression on
            .or_insert_with(|| CounterEntry::fresh(Duration::ZERO));

        if entry.expired() && !entry.ttl.is_zero() {
            // window lapsed between set and incr, restart it
            let ttl = entry.ttl;
            *entry = CounterEntry::fresh(ttl);
        }

        entry.count += 1;
        Ok(entry.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_occurrences_within_window() {
        let cache = MemoryCounterCache::new();
        cache.set("url", Duration::from_secs(60)).expect("set");

        assert_eq!(cache.incr("url").expect("incr"), 1);
        assert_eq!(cache.incr("url").expect("incr"), 2);
        assert_eq!(cache.get("url").expect("get"), Some(2));
    }

    #[test]
    fn missing_key_reads_as_none() {
        let cache = MemoryCounterCache::new();
        assert_eq!(cache.get("url").expect("get"), None);
    }

    #[test]
    fn expired_entry_reads_as_absent_and_restarts() {
        let cache = MemoryCounterCache::new();
        cache.set("url", Duration::from_millis(20)).expect("set");
        cache.incr("url").expect("incr");
        cache.incr("url").expect("incr");

        std::thread::sleep(Duration::from_millis(30));

        assert_eq!(cache.get("url").expect("get"), None);
        cache.set("url", Duration::from_millis(20)).expect("set");
        assert_eq!(cache.incr("url").expect("incr"), 1);
    }

    #[test]
    fn set_overwrite_restarts_the_count() {
        let cache = MemoryCounterCache::new();
        cache.set("url", Duration::from_secs(60)).expect("set");
        cache.incr("url").expect("incr");

        cache.set("url", Duration::from_secs(60)).expect("set");
        assert_eq!(cache.incr("url").expect("incr"), 1);
    }

    #[test]
    fn concurrent_increments_lose_no_updates() {
        let cache = MemoryCounterCache::new();
        cache.set("url", Duration::from_secs(60)).expect("set");

        let mut counts: Vec<u64> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|_| scope.spawn(|| cache.incr("url").expect("incr")))
                .collect();
            handles.into_iter().map(|h| h.join().expect("join")).collect()
        });

        counts.sort_unstable();
        assert_eq!(counts, (1..=16).collect::<Vec<u64>>());
    }
}
