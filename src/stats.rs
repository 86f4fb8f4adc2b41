use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// Body of the /stats endpoint
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct StatsSnapshot {
    pub count: usize,
    pub average: f64,
    pub percentile: f64,
    pub processed: u64,
    pub ignored: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct DeliveryTiming {
    average: f64,
    percentile: f64,
}

// Process-wide stats registry. processed/ignored grow monotonically for the
// process lifetime and together account for every completed admission
// decision. Latency figures are fed by the delivery workers; this component
// only stores what it is handed.
#[derive(Default)]
pub struct StatsAggregator {
    processed: AtomicU64,
    ignored: AtomicU64,
    timing: RwLock<DeliveryTiming>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_admitted(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ignored(&self) {
        self.ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_latency(&self, average: f64, percentile: f64) {
        let mut timing = self.timing.write().expect("stats lock poisoned");
        timing.average = average;
        timing.percentile = percentile;
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn ignored(&self) -> u64 {
        self.ignored.load(Ordering::Relaxed)
    }

    // queue_depth is sampled by the caller at read time; summing per-tenant
    // queues is not atomic across tenants, which is fine for monitoring
    pub fn snapshot(&self, queue_depth: usize) -> StatsSnapshot {
        let timing = *self.timing.read().expect("stats lock poisoned");
        StatsSnapshot {
            count: queue_depth,
            average: timing.average,
            percentile: timing.percentile,
            processed: self.processed(),
            ignored: self.ignored(),
        }
    }
}
