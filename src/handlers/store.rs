use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use thiserror::Error;
use tracing::error;

use crate::auth::{self, AuthError};
use crate::cache::CacheError;
use crate::envelope::RequestEnvelope;
use crate::metrics::{IGNORED_TOTAL, PROCESSED_TOTAL, QUEUE_DEPTH, REQUESTS_TOTAL};
use crate::state::AppState;

pub const CACHE_COUNT_HEADER: &str = "X-CYCLOPS-CACHE-COUNT";
pub const STATUS_HEADER: &str = "X-CYCLOPS-STATUS";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("payload has no usable culprit field")]
    MalformedPayload,
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("envelope encoding failed: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        match self {
            Self::Auth(e) => e.into_response(),
            Self::MalformedPayload => StatusCode::BAD_REQUEST.into_response(),
            Self::Cache(e) => {
                error!(error = %e, "counter cache failure");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Self::Encode(e) => {
                error!(error = %e, "envelope encoding failure");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

#[derive(Deserialize)]
pub struct StoreParams {
    sentry_key: String,
}

// GET /{project_id}/store/?sentry_key=<k>
pub async fn store_get(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    Query(params): Query<StoreParams>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, StoreError> {
    REQUESTS_TOTAL.inc();

    // a non-numeric route segment cannot name a registered project
    let project_id: u64 = project_id.parse().map_err(|_| AuthError::InvalidProject)?;
    let project_id = auth::authenticate_query(&state.registry, project_id, &params.sentry_key)?;

    // the fully qualified upstream URL doubles as the fingerprint
    let target_url = format!(
        "{}{}?{}",
        state.sentry_base_url,
        uri.path(),
        uri.query().unwrap_or_default()
    );

    let admission = state
        .admission
        .check(&target_url, state.cache_ttl, state.max_uses)?;
    if !admission.admitted {
        return Ok(suppressed(&state, admission.count));
    }

    let envelope = RequestEnvelope {
        project_id,
        method: "GET".to_string(),
        headers: collect_headers(&headers),
        target_url,
        body: body.to_vec(),
    };

    admit(&state, project_id, envelope, admission.count)
}

// POST /api/store/ with an X-Sentry-Auth header and a JSON body carrying
// the culprit field
pub async fn store_post(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, StoreError> {
    REQUESTS_TOTAL.inc();

    let auth_header = headers.get("X-Sentry-Auth").and_then(|v| v.to_str().ok());
    let (project_id, credentials) = auth::authenticate_header(&state.registry, auth_header)?;

    let payload: serde_json::Value =
        serde_json::from_slice(&body).map_err(|_| StoreError::MalformedPayload)?;
    let culprit = payload
        .get("culprit")
        .and_then(|v| v.as_str())
        .ok_or(StoreError::MalformedPayload)?;

    let fingerprint = format!("{project_id}:{culprit}");
    let admission = state
        .admission
        .check(&fingerprint, state.cache_ttl, state.max_uses)?;
    if !admission.admitted {
        return Ok(suppressed(&state, admission.count));
    }

    // the upstream expects the credentials in the URL authority
    let (scheme, host) = state
        .sentry_base_url
        .split_once("://")
        .unwrap_or(("http", state.sentry_base_url.as_str()));
    let target_url = format!(
        "{scheme}://{}:{}@{host}{}?{}",
        credentials.key,
        credentials.secret,
        uri.path(),
        uri.query().unwrap_or_default()
    );

    let envelope = RequestEnvelope {
        project_id,
        method: "POST".to_string(),
        headers: collect_headers(&headers),
        target_url,
        body: body.to_vec(),
    };

    admit(&state, project_id, envelope, admission.count)
}

// Terminal ADMITTED -> ENQUEUED transition
fn admit(
    state: &AppState,
    project_id: u64,
    envelope: RequestEnvelope,
    count: u64,
) -> Result<Response, StoreError> {
    let encoded = envelope.encode()?;
    state.queues.enqueue(project_id, encoded);
    QUEUE_DEPTH.inc();

    state.stats.record_admitted();
    PROCESSED_TOTAL.inc();

    Ok((
        StatusCode::OK,
        [
            (CACHE_COUNT_HEADER, count.to_string()),
            (STATUS_HEADER, "PROCESSED".to_string()),
        ],
        "OK",
    )
        .into_response())
}

// Terminal REJECTED_DUPLICATE transition: suppressed, counted as ignored,
// never retried
fn suppressed(state: &AppState, count: u64) -> Response {
    state.stats.record_ignored();
    IGNORED_TOTAL.inc();

    (
        StatusCode::NOT_MODIFIED,
        [
            (CACHE_COUNT_HEADER, count.to_string()),
            (STATUS_HEADER, "IGNORED".to_string()),
        ],
    )
        .into_response()
}

fn collect_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}
