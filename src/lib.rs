use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

pub mod admission;
pub mod auth;
pub mod cache;
pub mod config;
pub mod envelope;
pub mod handlers;
pub mod metrics;
pub mod projects;
pub mod queues;
pub mod state;
pub mod stats;
pub mod worker;

use state::AppState;

// The ingress routes plus the operational endpoints
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/stats", get(handlers::stats_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/api/store/", post(handlers::store_post))
        .route("/{project_id}/store/", get(handlers::store_get))
        .with_state(state)
}
