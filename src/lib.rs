//! History Cleanup Server Library
//!
//! Batch window resolution, the single cleanup job coordinator and its
//! SQLite store, the background worker and the HTTP API. Exposed for the
//! binary and for end-to-end tests.

pub mod batch_window;
pub mod cleanup;
pub mod cleanup_store;
pub mod config;
pub mod server;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use batch_window::{BatchWindow, ResolvedWindow, TimeOfDay};
pub use cleanup::{CleanupJobCoordinator, CleanupWorker};
pub use cleanup_store::{JobExecutionStore, JobStore, SqliteCleanupStore};
pub use server::{run_server, RequestsLoggingLevel};
