use anyhow::{Context, Result};
use std::time::Duration;

use axum::{
    extract::State, middleware, response::IntoResponse, routing::get, Json, Router,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{cleanup_routes, log_requests, state::*, ServerConfig};
use crate::cleanup::CleanupJobCoordinator;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub batch_window_configured: bool,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    Json(ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        batch_window_configured: state.coordinator.window().is_some(),
    })
}

pub fn make_app(
    config: ServerConfig,
    coordinator: CleanupJobCoordinator,
    job_execution_store: GuardedJobExecutionStore,
) -> Router {
    let state = ServerState::new(config, coordinator, job_execution_store);

    Router::new()
        .route("/", get(home))
        .merge(cleanup_routes())
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
        .with_state(state)
}

/// Serves the HTTP API until `shutdown` is cancelled.
pub async fn run_server(
    config: ServerConfig,
    coordinator: CleanupJobCoordinator,
    job_execution_store: GuardedJobExecutionStore,
    shutdown: CancellationToken,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, coordinator, job_execution_store);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Ready to serve at port {}!", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
