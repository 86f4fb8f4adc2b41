use std::sync::Arc;

use crate::admission::AdmissionController;
use crate::projects::ProjectCredentialRegistry;
use crate::queues::TenantQueueRouter;
use crate::stats::StatsAggregator;

// App's shared state, one instance for the process lifetime
pub struct AppState {
    pub registry: ProjectCredentialRegistry,
    pub admission: AdmissionController,
    pub queues: TenantQueueRouter,
    pub stats: Arc<StatsAggregator>,
    pub sentry_base_url: String,
    pub cache_ttl: i64,  // seconds, <= 0 disables admission control
    pub max_uses: u64,   // admitted occurrences per TTL window
}
