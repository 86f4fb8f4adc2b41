use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};

lazy_static! {
    pub static ref REQUESTS_TOTAL: Counter =
        register_counter!("cyclops_requests_total", "Total number of ingress requests").unwrap();
    pub static ref PROCESSED_TOTAL: Counter =
        register_counter!("cyclops_processed_total", "Requests admitted and enqueued").unwrap();
    pub static ref IGNORED_TOTAL: Counter =
        register_counter!("cyclops_ignored_total", "Requests suppressed by admission control")
            .unwrap();
    pub static ref QUEUE_DEPTH: Gauge =
        register_gauge!("cyclops_queue_depth", "Envelopes waiting across all tenant queues")
            .unwrap();
    pub static ref DELIVERY_LATENCY: Histogram = register_histogram!(
        "cyclops_delivery_latency_seconds",
        "Upstream delivery latency in seconds"
    )
    .unwrap();
}
