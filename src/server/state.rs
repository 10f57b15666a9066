use axum::extract::FromRef;

use crate::cleanup::CleanupJobCoordinator;
use crate::cleanup_store::JobExecutionStore;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedJobExecutionStore = Arc<dyn JobExecutionStore>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub coordinator: CleanupJobCoordinator,
    pub job_execution_store: GuardedJobExecutionStore,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        coordinator: CleanupJobCoordinator,
        job_execution_store: GuardedJobExecutionStore,
    ) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            coordinator,
            job_execution_store,
        }
    }
}

impl FromRef<ServerState> for CleanupJobCoordinator {
    fn from_ref(input: &ServerState) -> Self {
        input.coordinator.clone()
    }
}

impl FromRef<ServerState> for GuardedJobExecutionStore {
    fn from_ref(input: &ServerState) -> Self {
        input.job_execution_store.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
