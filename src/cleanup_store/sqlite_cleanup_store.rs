use super::models::{CleanupJobHandle, CleanupRun, JobRequest, JobState, RunOutcome, RunStatus};
use super::schema::CLEANUP_VERSIONED_SCHEMAS;
use super::{JobExecutionStore, JobStore};
use crate::sqlite_persistence::create_or_migrate;
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

const ACTIVE_SLOT: i64 = 1;
const JOB_COLUMNS: &str = "id, due_at, state, deferred";

pub struct SqliteCleanupStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCleanupStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let is_new_db = !path.exists();

        let mut conn = Connection::open(path).context("Failed to open cleanup database")?;
        if is_new_db {
            info!("Creating new cleanup database at {:?}", path);
        }
        create_or_migrate(&mut conn, CLEANUP_VERSIONED_SCHEMAS, is_new_db)
            .with_context(|| format!("Failed to initialize cleanup database at {:?}", path))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Cleanup database mutex poisoned"))
    }

    // Fixed-width UTC text keeps lexicographic order equal to time order.
    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn parse_datetime(idx: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<CleanupJobHandle> {
        let due_at: String = row.get(1)?;
        let state: String = row.get(2)?;

        Ok(CleanupJobHandle {
            id: row.get(0)?,
            due_at: Self::parse_datetime(1, &due_at)?,
            state: JobState::parse(&state).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    2,
                    Type::Text,
                    format!("unknown job state {:?}", state).into(),
                )
            })?,
            deferred: row.get(3)?,
        })
    }

    fn row_to_run(row: &rusqlite::Row) -> rusqlite::Result<CleanupRun> {
        let due_at: String = row.get("due_at")?;
        let started_at: Option<String> = row.get("started_at")?;
        let finished_at: String = row.get("finished_at")?;
        let status: String = row.get("status")?;
        let deleted_count: i64 = row.get("deleted_count")?;

        Ok(CleanupRun {
            id: row.get("id")?,
            job_id: row.get("job_id")?,
            due_at: Self::parse_datetime(2, &due_at)?,
            started_at: started_at
                .map(|s| Self::parse_datetime(3, &s))
                .transpose()?,
            finished_at: Self::parse_datetime(4, &finished_at)?,
            status: RunStatus::parse(&status).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    5,
                    Type::Text,
                    format!("unknown run status {:?}", status).into(),
                )
            })?,
            error_message: row.get("error_message")?,
            deleted_count: deleted_count as usize,
        })
    }
}

impl JobStore for SqliteCleanupStore {
    fn create_or_reuse(&self, request: &JobRequest) -> Result<CleanupJobHandle> {
        let due_at = request.due_at.trunc_subsecs(3);
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let existing = tx
            .query_row(
                &format!("SELECT {} FROM cleanup_jobs WHERE slot = ?1", JOB_COLUMNS),
                params![ACTIVE_SLOT],
                Self::row_to_job,
            )
            .optional()?;

        let job = match existing {
            Some(mut job) if job.state == JobState::Scheduled => {
                // An immediate request makes the whole job immediate.
                let merged_due_at = job.due_at.min(due_at);
                let merged_deferred = job.deferred && request.deferred;
                if merged_due_at != job.due_at || merged_deferred != job.deferred {
                    tx.execute(
                        "UPDATE cleanup_jobs SET due_at = ?1, deferred = ?2 WHERE id = ?3",
                        params![Self::format_datetime(&merged_due_at), merged_deferred, job.id],
                    )?;
                    debug!(
                        "Moved cleanup job {} from {} to {} (deferred: {})",
                        job.id, job.due_at, merged_due_at, merged_deferred
                    );
                    job.due_at = merged_due_at;
                    job.deferred = merged_deferred;
                } else {
                    debug!("Reusing scheduled cleanup job {}", job.id);
                }
                job
            }
            Some(job) => {
                debug!("Reusing running cleanup job {}", job.id);
                job
            }
            None => {
                let job = CleanupJobHandle {
                    id: Uuid::new_v4().to_string(),
                    due_at,
                    state: JobState::Scheduled,
                    deferred: request.deferred,
                };
                tx.execute(
                    "INSERT INTO cleanup_jobs (id, slot, due_at, state, created_at, deferred)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        job.id,
                        ACTIVE_SLOT,
                        Self::format_datetime(&job.due_at),
                        job.state.as_str(),
                        Self::format_datetime(&request.requested_at),
                        job.deferred,
                    ],
                )?;
                debug!(
                    "Created cleanup job {} due at {} (deferred: {})",
                    job.id, job.due_at, job.deferred
                );
                job
            }
        };

        tx.commit()?;
        Ok(job)
    }

    fn find_active(&self) -> Result<Option<CleanupJobHandle>> {
        let conn = self.lock()?;
        let job = conn
            .query_row(
                &format!("SELECT {} FROM cleanup_jobs WHERE slot = ?1", JOB_COLUMNS),
                params![ACTIVE_SLOT],
                Self::row_to_job,
            )
            .optional()?;
        Ok(job)
    }
}

impl JobExecutionStore for SqliteCleanupStore {
    fn mark_running(&self, job_id: &str, started_at: DateTime<Utc>) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE cleanup_jobs SET state = ?1, started_at = ?2 WHERE id = ?3 AND state = ?4",
            params![
                JobState::Running.as_str(),
                Self::format_datetime(&started_at),
                job_id,
                JobState::Scheduled.as_str()
            ],
        )?;
        Ok(changed == 1)
    }

    fn finish(&self, job_id: &str, outcome: &RunOutcome) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let row: Option<(String, Option<String>)> = tx
            .query_row(
                "SELECT due_at, started_at FROM cleanup_jobs WHERE id = ?1",
                params![job_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((due_at, started_at)) = row else {
            bail!("Cleanup job {} is not active", job_id);
        };

        tx.execute("DELETE FROM cleanup_jobs WHERE id = ?1", params![job_id])?;
        tx.execute(
            "INSERT INTO cleanup_runs
             (job_id, due_at, started_at, finished_at, status, error_message, deleted_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                job_id,
                due_at,
                started_at,
                Self::format_datetime(&outcome.finished_at),
                outcome.status.as_str(),
                outcome.error_message,
                outcome.deleted_count as i64,
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn requeue_interrupted(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count = conn.execute(
            "UPDATE cleanup_jobs SET state = ?1, started_at = NULL WHERE state = ?2",
            params![JobState::Scheduled.as_str(), JobState::Running.as_str()],
        )?;
        Ok(count)
    }

    fn recent_runs(&self, limit: usize) -> Result<Vec<CleanupRun>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, job_id, due_at, started_at, finished_at, status, error_message,
                    deleted_count
             FROM cleanup_runs ORDER BY finished_at DESC, id DESC LIMIT ?1",
        )?;
        let runs = stmt
            .query_map(params![limit as i64], Self::row_to_run)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(runs)
    }

    fn delete_runs_finished_before(&self, cutoff: DateTime<Utc>, limit: usize) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM cleanup_runs WHERE id IN (
                SELECT id FROM cleanup_runs WHERE finished_at < ?1
                ORDER BY finished_at LIMIT ?2
             )",
            params![Self::format_datetime(&cutoff), limit as i64],
        )?;
        Ok(deleted)
    }
}
