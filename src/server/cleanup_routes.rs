//! History cleanup HTTP routes.
//!
//! - `POST /v1/history/cleanup?immediatelyDue=<bool>` triggers a cleanup job
//! - `GET /v1/history/cleanup/job` returns the pending or running job
//! - `GET /v1/history/cleanup/configuration` returns the batch window
//! - `GET /v1/history/cleanup/runs?limit=N` lists finished runs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::{debug, error};

use crate::cleanup::{CleanupJobCoordinator, CoordinatorError};
use crate::server::state::{GuardedJobExecutionStore, ServerState};

pub const CLEANUP_ROUTES_PREFIX: &str = "/v1/history/cleanup";

const MAX_RUNS_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct TriggerQuery {
    #[serde(rename = "immediatelyDue", default = "default_immediately_due")]
    pub immediately_due: bool,
}

fn default_immediately_due() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct RunsQuery {
    #[serde(default = "default_runs_limit")]
    pub limit: usize,
}

fn default_runs_limit() -> usize {
    20
}

fn coordinator_error_response(err: CoordinatorError) -> Response {
    match err {
        CoordinatorError::NoBatchWindow => {
            debug!("Rejected deferred cleanup trigger: {}", err);
            (StatusCode::BAD_REQUEST, err.to_string()).into_response()
        }
        CoordinatorError::Store(e) => {
            error!("Cleanup job store failure: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Cleanup job store failure").into_response()
        }
    }
}

/// POST / - Trigger a cleanup job, or get back the one already pending
async fn trigger_cleanup(
    State(coordinator): State<CleanupJobCoordinator>,
    Query(query): Query<TriggerQuery>,
) -> Response {
    match coordinator.trigger(query.immediately_due) {
        Ok(job) => Json(job).into_response(),
        Err(e) => coordinator_error_response(e),
    }
}

/// GET /job - The active cleanup job, 404 when there is none
async fn get_cleanup_job(State(coordinator): State<CleanupJobCoordinator>) -> Response {
    match coordinator.find() {
        Ok(Some(job)) => Json(job).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => coordinator_error_response(e),
    }
}

/// GET /configuration - Batch window resolved against the current time
async fn get_cleanup_configuration(
    State(coordinator): State<CleanupJobCoordinator>,
) -> impl IntoResponse {
    Json(coordinator.configuration())
}

/// GET /runs - Most recent finished runs, newest first
async fn get_cleanup_runs(
    State(store): State<GuardedJobExecutionStore>,
    Query(query): Query<RunsQuery>,
) -> Response {
    let limit = query.limit.min(MAX_RUNS_LIMIT);
    match store.recent_runs(limit) {
        Ok(runs) => Json(runs).into_response(),
        Err(e) => {
            error!("Failed to load cleanup runs: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load cleanup runs").into_response()
        }
    }
}

pub fn cleanup_routes() -> Router<ServerState> {
    Router::new()
        .route(CLEANUP_ROUTES_PREFIX, post(trigger_cleanup))
        .route(&format!("{}/job", CLEANUP_ROUTES_PREFIX), get(get_cleanup_job))
        .route(
            &format!("{}/configuration", CLEANUP_ROUTES_PREFIX),
            get(get_cleanup_configuration),
        )
        .route(&format!("{}/runs", CLEANUP_ROUTES_PREFIX), get(get_cleanup_runs))
}
