mod models;
mod schema;
mod sqlite_cleanup_store;

pub use models::*;
pub use schema::CLEANUP_VERSIONED_SCHEMAS;
pub use sqlite_cleanup_store::SqliteCleanupStore;

use anyhow::Result;
use chrono::{DateTime, Utc};

/// Persistence for the single active cleanup job.
///
/// Implementations own the at-most-one-active-job guarantee: when a job is
/// already scheduled or running, `create_or_reuse` returns it instead of
/// creating another. A scheduled job takes the earlier of the two due
/// instants and stays deferred only if both requests were deferred.
#[cfg_attr(test, mockall::automock)]
pub trait JobStore: Send + Sync {
    fn create_or_reuse(&self, request: &JobRequest) -> Result<CleanupJobHandle>;
    fn find_active(&self) -> Result<Option<CleanupJobHandle>>;
}

/// Operations used by the executor that runs cleanup jobs.
pub trait JobExecutionStore: JobStore {
    /// Moves a scheduled job to running. Returns false if the job is gone or
    /// was not in the scheduled state.
    fn mark_running(&self, job_id: &str, started_at: DateTime<Utc>) -> Result<bool>;
    /// Removes the job from the active slot and records it as a finished run.
    fn finish(&self, job_id: &str, outcome: &RunOutcome) -> Result<()>;
    /// Puts jobs left running by a previous process back into the scheduled state.
    fn requeue_interrupted(&self) -> Result<usize>;
    fn recent_runs(&self, limit: usize) -> Result<Vec<CleanupRun>>;
    /// Deletes up to `limit` runs that finished before `cutoff`, oldest first.
    fn delete_runs_finished_before(&self, cutoff: DateTime<Utc>, limit: usize) -> Result<usize>;
}
