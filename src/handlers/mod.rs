mod health;
mod metrics;
mod stats;
mod store;

pub use health::health_handler;
pub use metrics::metrics_handler;
pub use stats::stats_handler;
pub use store::{CACHE_COUNT_HEADER, STATUS_HEADER, store_get, store_post};
