use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheError, CounterCache};

// Outcome of an admission check. The count is surfaced to the caller either
// way, as response header metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub count: u64,
    pub admitted: bool,
}

// TTL-counter duplicate suppression keyed by a fingerprint string
pub struct AdmissionController {
    cache: Arc<dyn CounterCache>,
}

impl AdmissionController {
    pub fn new(cache: Arc<dyn CounterCache>) -> Self {
        Self { cache }
    }

    pub fn check(
        &self,
        fingerprint: &str,
        ttl_seconds: i64,
        max_uses: u64,
    ) -> Result<Admission, CacheError> {
        if ttl_seconds <= 0 {
            // admission control disabled, everything goes through
            return Ok(Admission {
                count: 0,
                admitted: true,
            });
        }

        if self.cache.get(fingerprint)?.is_none() {
            // two callers racing on a fresh fingerprint may both land here;
            // the second set is a harmless overwrite, the increment below is
            // what decides
            self.cache
                .set(fingerprint, Duration::from_secs(ttl_seconds as u64))?;
        }

        let count = self.cache.incr(fingerprint)?;
        Ok(Admission {
            count,
            admitted: count <= max_uses,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCounterCache;

    fn controller() -> AdmissionController {
        AdmissionController::new(Arc::new(MemoryCounterCache::new()))
    }

    #[test]
    fn disabled_ttl_always_admits_with_zero_count() {
        let controller = controller();

        for _ in 0..50 {
            let admission = controller.check("anything", 0, 1).expect("check");
            assert_eq!(admission, Admission { count: 0, admitted: true });
        }

        let admission = controller.check("anything", -5, 0).expect("check");
        assert!(admission.admitted);
        assert_eq!(admission.count, 0);
    }

    #[test]
    fn suppresses_past_max_uses() {
        let controller = controller();

        for expected in 1..=3 {
            let admission = controller.check("http://s/7/store/", 60, 3).expect("check");
            assert!(admission.admitted);
            assert_eq!(admission.count, expected);
        }

        let fourth = controller.check("http://s/7/store/", 60, 3).expect("check");
        assert!(!fourth.admitted);
        assert_eq!(fourth.count, 4);
    }

    #[test]
    fn fingerprints_are_counted_independently() {
        let controller = controller();

        controller.check("7:foo.bar", 60, 1).expect("check");
        let other = controller.check("7:baz.qux", 60, 1).expect("check");

        assert!(other.admitted);
        assert_eq!(other.count, 1);
    }

    #[test]
    fn expired_window_starts_fresh() {
        let controller = controller();

        let first = controller.check("7:foo.bar", 1, 1).expect("check");
        assert!(first.admitted);
        let second = controller.check("7:foo.bar", 1, 1).expect("check");
        assert!(!second.admitted);

        std::thread::sleep(Duration::from_millis(1100));

        let after_expiry = controller.check("7:foo.bar", 1, 1).expect("check");
        assert!(after_expiry.admitted);
        assert_eq!(after_expiry.count, 1);
    }

    #[test]
    fn concurrent_checks_produce_distinct_counts() {
        let controller = controller();

        // first occurrence creates the window; the racing checks below all
        // land on the atomic increment
        assert_eq!(controller.check("shared", 60, 100).expect("check").count, 1);

        let mut counts: Vec<u64> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| controller.check("shared", 60, 100).expect("check").count))
                .collect();
            handles.into_iter().map(|h| h.join().expect("join")).collect()
        });

        counts.sort_unstable();
        assert_eq!(counts, (2..=9).collect::<Vec<u64>>());
    }
}
