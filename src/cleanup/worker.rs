use super::cleaner::{CleanupContext, CleanupError, HistoryCleaner};
use super::clock::ClockProvider;
use crate::batch_window::BatchWindow;
use crate::cleanup_store::{JobExecutionStore, JobState, RunOutcome, RunStatus};
use anyhow::Result;
use chrono::{FixedOffset, Offset, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Executes the active cleanup job once it becomes due.
pub struct CleanupWorker {
    store: Arc<dyn JobExecutionStore>,
    cleaner: Arc<dyn HistoryCleaner>,
    clock: Arc<dyn ClockProvider>,
    poll_interval: Duration,
    batch_size: usize,
    shutdown_token: CancellationToken,
    window: Option<BatchWindow>,
    zone: FixedOffset,
}

impl CleanupWorker {
    pub fn new(
        store: Arc<dyn JobExecutionStore>,
        cleaner: Arc<dyn HistoryCleaner>,
        clock: Arc<dyn ClockProvider>,
        poll_interval: Duration,
        batch_size: usize,
        shutdown_token: CancellationToken,
    ) -> Self {
        Self {
            store,
            cleaner,
            clock,
            poll_interval,
            batch_size,
            shutdown_token,
            window: None,
            zone: Utc.fix(),
        }
    }

    /// Holds deferred jobs until `window`, read in `zone`, is open.
    pub fn with_batch_window(mut self, window: Option<BatchWindow>, zone: FixedOffset) -> Self {
        self.window = window;
        self.zone = zone;
        self
    }

    /// Main worker loop. Returns once the shutdown token is cancelled.
    pub async fn run(self) {
        info!(
            "Starting cleanup worker ({} cleaner, polling every {:?})",
            self.cleaner.name(),
            self.poll_interval
        );

        match self.store.requeue_interrupted() {
            Ok(count) if count > 0 => {
                info!("Requeued {} interrupted cleanup job(s)", count);
            }
            Ok(_) => {}
            Err(e) => {
                error!("Failed to requeue interrupted cleanup jobs: {}", e);
            }
        }

        loop {
            let sleep_duration = match self.run_due_job().await {
                Ok(duration) => duration,
                Err(e) => {
                    error!("Cleanup worker iteration failed: {:#}", e);
                    self.poll_interval
                }
            };
            debug!("Cleanup worker sleeping for {:?}", sleep_duration);

            tokio::select! {
                _ = tokio::time::sleep(sleep_duration) => {}
                _ = self.shutdown_token.cancelled() => {
                    info!("Cleanup worker received shutdown signal");
                    break;
                }
            }
        }
    }

    /// Runs the active job if it is due. A deferred job also waits for the
    /// batch window to be open.
    ///
    /// Returns how long to wait before looking again: the time until the job
    /// can run, capped at the poll interval.
    pub async fn run_due_job(&self) -> Result<Duration> {
        let Some(job) = self.store.find_active()? else {
            return Ok(self.poll_interval);
        };

        if job.state == JobState::Running {
            warn!("Cleanup job {} is already marked running", job.id);
            return Ok(self.poll_interval);
        }

        let now = self.clock.now();
        if job.due_at > now {
            let until_due = (job.due_at - now).to_std().unwrap_or(Duration::ZERO);
            return Ok(until_due.min(self.poll_interval));
        }

        if job.deferred {
            match &self.window {
                Some(window) => {
                    let local_now = now.with_timezone(&self.zone);
                    if !window.is_open_at(local_now) {
                        let opening = window.next_opening(local_now);
                        debug!("Cleanup job {} waits for the window at {}", job.id, opening);
                        let until_open = (opening - local_now).to_std().unwrap_or(Duration::ZERO);
                        return Ok(until_open.min(self.poll_interval));
                    }
                }
                None => {
                    warn!(
                        "Cleanup job {} is deferred but no batch window is configured, running it",
                        job.id
                    );
                }
            }
        }

        if !self.store.mark_running(&job.id, now)? {
            debug!("Cleanup job {} was claimed elsewhere", job.id);
            return Ok(self.poll_interval);
        }
        info!("Running cleanup job {} (due at {})", job.id, job.due_at);

        let ctx = CleanupContext {
            cancellation_token: self.shutdown_token.child_token(),
            started_at: now,
            batch_size: self.batch_size,
        };
        let cleaner = self.cleaner.clone();
        let result = tokio::task::spawn_blocking(move || cleaner.clean(&ctx)).await;

        let finished_at = self.clock.now();
        let outcome = match result {
            Ok(Ok(deleted_count)) => {
                info!(
                    "Cleanup job {} completed, {} records deleted",
                    job.id, deleted_count
                );
                RunOutcome {
                    finished_at,
                    status: RunStatus::Completed,
                    error_message: None,
                    deleted_count,
                }
            }
            Ok(Err(CleanupError::Cancelled { deleted })) => {
                // Left running on purpose, requeued on the next start.
                info!(
                    "Cleanup job {} cancelled after {} records, will resume on restart",
                    job.id, deleted
                );
                return Ok(Duration::ZERO);
            }
            Ok(Err(e)) => {
                error!("Cleanup job {} failed: {}", job.id, e);
                RunOutcome {
                    finished_at,
                    status: RunStatus::Failed,
                    error_message: Some(e.to_string()),
                    deleted_count: 0,
                }
            }
            Err(join_error) => {
                error!("Cleanup job {} panicked: {}", job.id, join_error);
                RunOutcome {
                    finished_at,
                    status: RunStatus::Failed,
                    error_message: Some(format!("Cleanup task panicked: {}", join_error)),
                    deleted_count: 0,
                }
            }
        };

        self.store.finish(&job.id, &outcome)?;
        Ok(Duration::ZERO)
    }
}
