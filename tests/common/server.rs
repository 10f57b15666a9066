//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own cleanup database, a
//! controllable clock and a running cleanup worker.

use super::constants::*;
use chrono::{DateTime, FixedOffset, Utc};
use history_cleanup::batch_window::BatchWindow;
use history_cleanup::cleanup::{
    CleanupJobCoordinator, CleanupWorker, FixedClock, HistoryCleaner, RunHistoryCleaner,
};
use history_cleanup::cleanup_store::SqliteCleanupStore;
use history_cleanup::server::{make_app, RequestsLoggingLevel, ServerConfig};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Test server instance with an isolated database.
///
/// When dropped, the server and worker shut down and the temp dir is removed.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// Clock shared by the coordinator and the worker
    pub clock: Arc<FixedClock>,

    /// Store for direct database access in tests
    pub store: Arc<SqliteCleanupStore>,

    _temp_dir: TempDir,
    shutdown: CancellationToken,
}

impl TestServer {
    /// Spawns a server without a batch window.
    pub async fn spawn() -> Self {
        Self::spawn_with_window(None).await
    }

    /// Spawns a server on a random port.
    ///
    /// # Panics
    ///
    /// Panics if the database can't be created, the port can't be bound or
    /// the server doesn't become ready within the timeout.
    pub async fn spawn_with_window(window: Option<BatchWindow>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            SqliteCleanupStore::new(temp_dir.path().join("cleanup.db"))
                .expect("Failed to open cleanup store"),
        );

        let now: DateTime<Utc> = DateTime::parse_from_rfc3339(TEST_NOW)
            .expect("Invalid TEST_NOW")
            .with_timezone(&Utc);
        let clock = Arc::new(FixedClock::new(now));

        let zone = FixedOffset::east_opt(0).expect("Invalid offset");
        let coordinator = CleanupJobCoordinator::new(store.clone(), clock.clone(), window, zone);

        let shutdown = CancellationToken::new();

        let cleaner: Arc<dyn HistoryCleaner> = Arc::new(RunHistoryCleaner::new(store.clone(), 30));
        let worker = CleanupWorker::new(
            store.clone(),
            cleaner,
            clock.clone(),
            Duration::from_millis(WORKER_POLL_INTERVAL_MS),
            100,
            shutdown.clone(),
        )
        .with_batch_window(window, zone);
        tokio::spawn(worker.run());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            port,
        };
        let app = make_app(config, coordinator, store.clone());

        let server_shutdown = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            clock,
            store,
            _temp_dir: temp_dir,
            shutdown,
        };
        server.wait_for_ready().await;
        server
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
