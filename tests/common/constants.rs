//! Shared constants for end-to-end tests

/// Instant the test clock starts at.
pub const TEST_NOW: &str = "2024-01-01T12:00:00Z";

/// Overnight window used by tests that need one.
pub const WINDOW_START: &str = "23:59";
pub const WINDOW_END: &str = "00:00";

/// Due date of a deferred trigger made at [`TEST_NOW`] with the window above.
pub const DEFERRED_DUE_DATE: &str = "2024-01-01T23:59:00Z";

pub const REQUEST_TIMEOUT_SECS: u64 = 5;
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;

/// Worker poll interval, short so tests don't wait on it.
pub const WORKER_POLL_INTERVAL_MS: u64 = 20;
