use crate::cleanup_store::JobExecutionStore;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("Cleanup was cancelled after deleting {deleted} records")]
    Cancelled { deleted: usize },
    #[error("Cleanup failed: {0}")]
    ExecutionFailed(String),
}

/// Context handed to a cleaner for one job execution.
#[derive(Clone)]
pub struct CleanupContext {
    pub cancellation_token: CancellationToken,
    pub started_at: DateTime<Utc>,
    /// Upper bound on records removed per statement.
    pub batch_size: usize,
}

impl CleanupContext {
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }
}

/// The deletion work a cleanup job performs.
///
/// Runs on a blocking thread. Long-running implementations should check
/// `ctx.is_cancelled()` between batches and return
/// [`CleanupError::Cancelled`] when it is set.
pub trait HistoryCleaner: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns the number of records removed.
    fn clean(&self, ctx: &CleanupContext) -> Result<usize, CleanupError>;
}

/// Removes finished cleanup runs older than the retention period.
pub struct RunHistoryCleaner {
    store: Arc<dyn JobExecutionStore>,
    retention_days: u64,
}

impl RunHistoryCleaner {
    pub fn new(store: Arc<dyn JobExecutionStore>, retention_days: u64) -> Self {
        Self {
            store,
            retention_days,
        }
    }
}

impl HistoryCleaner for RunHistoryCleaner {
    fn name(&self) -> &'static str {
        "run_history"
    }

    fn clean(&self, ctx: &CleanupContext) -> Result<usize, CleanupError> {
        if self.retention_days == 0 {
            info!("Run history retention is disabled, nothing to clean up");
            return Ok(0);
        }

        let cutoff = ctx.started_at - Duration::days(self.retention_days as i64);
        info!(
            "Cleaning up cleanup runs older than {} days (cutoff: {})",
            self.retention_days, cutoff
        );

        let batch_size = ctx.batch_size.max(1);
        let mut total = 0;
        loop {
            if ctx.is_cancelled() {
                return Err(CleanupError::Cancelled { deleted: total });
            }

            let deleted = self
                .store
                .delete_runs_finished_before(cutoff, batch_size)
                .map_err(|e| CleanupError::ExecutionFailed(e.to_string()))?;
            total += deleted;

            if deleted < batch_size {
                break;
            }
        }

        if total > 0 {
            info!("Deleted {} old cleanup runs", total);
        } else {
            info!("No cleanup runs to delete");
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleanup_store::{JobRequest, JobStore, RunOutcome, RunStatus, SqliteCleanupStore};
    use tempfile::TempDir;

    fn at(text: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(text)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn immediate(text: &str) -> JobRequest {
        JobRequest::immediate(at(text))
    }

    fn store_with_runs(finished: &[&str]) -> (Arc<SqliteCleanupStore>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteCleanupStore::new(temp_dir.path().join("cleanup.db")).unwrap());
        for finished_at in finished {
            let job = store.create_or_reuse(&immediate(finished_at)).unwrap();
            store
                .finish(
                    &job.id,
                    &RunOutcome {
                        finished_at: at(finished_at),
                        status: RunStatus::Completed,
                        error_message: None,
                        deleted_count: 0,
                    },
                )
                .unwrap();
        }
        (store, temp_dir)
    }

    fn context(started_at: &str, batch_size: usize) -> CleanupContext {
        CleanupContext {
            cancellation_token: CancellationToken::new(),
            started_at: at(started_at),
            batch_size,
        }
    }

    #[test]
    fn test_deletes_runs_past_retention_in_batches() {
        let (store, _dir) = store_with_runs(&[
            "2024-01-01T00:00:00Z",
            "2024-01-02T00:00:00Z",
            "2024-01-03T00:00:00Z",
            "2024-01-20T00:00:00Z",
        ]);
        let cleaner = RunHistoryCleaner::new(store.clone(), 10);

        let deleted = cleaner.clean(&context("2024-01-25T00:00:00Z", 2)).unwrap();

        assert_eq!(deleted, 3);
        let remaining = store.recent_runs(10).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].finished_at, at("2024-01-20T00:00:00Z"));
    }

    #[test]
    fn test_zero_retention_disables_cleanup() {
        let (store, _dir) = store_with_runs(&["2020-01-01T00:00:00Z"]);
        let cleaner = RunHistoryCleaner::new(store.clone(), 0);

        assert_eq!(cleaner.clean(&context("2024-01-01T00:00:00Z", 10)).unwrap(), 0);
        assert_eq!(store.recent_runs(10).unwrap().len(), 1);
    }

    #[test]
    fn test_cancelled_before_first_batch() {
        let (store, _dir) = store_with_runs(&["2020-01-01T00:00:00Z"]);
        let cleaner = RunHistoryCleaner::new(store.clone(), 1);
        let ctx = context("2024-01-01T00:00:00Z", 10);
        ctx.cancellation_token.cancel();

        assert!(matches!(
            cleaner.clean(&ctx),
            Err(CleanupError::Cancelled { deleted: 0 })
        ));
        assert_eq!(store.recent_runs(10).unwrap().len(), 1);
    }
}
