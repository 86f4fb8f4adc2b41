use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cyclops_gateway::admission::AdmissionController;
use cyclops_gateway::cache::MemoryCounterCache;
use cyclops_gateway::config::Args;
use cyclops_gateway::projects::ProjectCredentialRegistry;
use cyclops_gateway::queues::TenantQueueRouter;
use cyclops_gateway::state::AppState;
use cyclops_gateway::stats::StatsAggregator;
use cyclops_gateway::worker::delivery_worker;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // credentials are loaded once and stay immutable for the process
    let registry = match ProjectCredentialRegistry::load(&args.projects) {
        Ok(registry) => registry,
        Err(e) => {
            error!(path = %args.projects, error = %e, "cannot load project credentials");
            std::process::exit(1);
        }
    };

    let stats = Arc::new(StatsAggregator::new());
    let (queues, consumers) = TenantQueueRouter::new(registry.project_ids());

    // one delivery worker per registered project drains that project's queue
    let client = reqwest::Client::new();
    for consumer in consumers {
        tokio::spawn(delivery_worker(consumer, client.clone(), stats.clone()));
    }

    let state = Arc::new(AppState {
        registry,
        admission: AdmissionController::new(Arc::new(MemoryCounterCache::new())),
        queues,
        stats,
        sentry_base_url: args.sentry_url.clone(),
        cache_ttl: args.cache_ttl,
        max_uses: args.max_uses,
    });

    let app = cyclops_gateway::app(state.clone());

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();

    info!(port = args.port, upstream = %args.sentry_url, "gateway listening");
    info!(
        ttl = args.cache_ttl,
        max_uses = args.max_uses,
        projects = state.registry.len(),
        "admission control configured"
    );
    axum::serve(listener, app).await.unwrap();
}
