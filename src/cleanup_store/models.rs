use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle of the active cleanup job. Finished jobs leave the active
/// table and are recorded as a [`CleanupRun`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Scheduled,
    Running,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Scheduled => "scheduled",
            JobState::Running => "running",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(JobState::Scheduled),
            "running" => Some(JobState::Running),
            _ => None,
        }
    }
}

/// Reference to the single pending or running cleanup job.
///
/// `due_at` is stored with millisecond precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupJobHandle {
    pub id: String,
    #[serde(rename = "dueDate")]
    pub due_at: DateTime<Utc>,
    pub state: JobState,
    /// Only runs while the batch window is open.
    #[serde(skip)]
    pub deferred: bool,
}

/// A request for the active cleanup job, as built by a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobRequest {
    pub due_at: DateTime<Utc>,
    pub deferred: bool,
    pub requested_at: DateTime<Utc>,
}

impl JobRequest {
    pub fn immediate(now: DateTime<Utc>) -> Self {
        Self {
            due_at: now,
            deferred: false,
            requested_at: now,
        }
    }

    /// A job held back until the batch window opens, starting at `due_at`.
    pub fn deferred(due_at: DateTime<Utc>, requested_at: DateTime<Utc>) -> Self {
        Self {
            due_at,
            deferred: true,
            requested_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(RunStatus::Completed),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }
}

/// What the executor reports when a job finishes.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub finished_at: DateTime<Utc>,
    pub status: RunStatus,
    pub error_message: Option<String>,
    pub deleted_count: usize,
}

/// A finished cleanup job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupRun {
    pub id: i64,
    pub job_id: String,
    pub due_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: DateTime<Utc>,
    pub status: RunStatus,
    pub error_message: Option<String>,
    pub deleted_count: usize,
}
