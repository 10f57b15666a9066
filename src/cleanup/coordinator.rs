use super::clock::ClockProvider;
use crate::batch_window::{current_configuration, BatchWindow, CleanupConfiguration, ResolvedWindow};
use crate::cleanup_store::{CleanupJobHandle, JobRequest, JobStore};
use chrono::{DateTime, FixedOffset, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("No batch window is configured, cleanup can only be triggered immediately")]
    NoBatchWindow,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Applies the batch window policy to cleanup trigger requests.
///
/// Holds no state of its own. The job store decides whether a trigger creates
/// a new job or hands back the one that is already pending.
#[derive(Clone)]
pub struct CleanupJobCoordinator {
    store: Arc<dyn JobStore>,
    clock: Arc<dyn ClockProvider>,
    window: Option<BatchWindow>,
    zone: FixedOffset,
}

impl CleanupJobCoordinator {
    pub fn new(
        store: Arc<dyn JobStore>,
        clock: Arc<dyn ClockProvider>,
        window: Option<BatchWindow>,
        zone: FixedOffset,
    ) -> Self {
        Self {
            store,
            clock,
            window,
            zone,
        }
    }

    pub fn window(&self) -> Option<&BatchWindow> {
        self.window.as_ref()
    }

    /// Current instant in the reference zone.
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now().with_timezone(&self.zone)
    }

    pub fn resolve_window(&self) -> Option<ResolvedWindow> {
        self.window.map(|window| window.resolve(self.now()))
    }

    pub fn configuration(&self) -> CleanupConfiguration {
        current_configuration(self.window.as_ref(), self.now())
    }

    /// Requests a cleanup job.
    ///
    /// An immediate trigger is due now. A deferred one is due at the start of
    /// the window resolved for today and only runs while the window is open.
    /// If a job is already pending, the store returns that job.
    pub fn trigger(&self, immediate_due: bool) -> Result<CleanupJobHandle, CoordinatorError> {
        let now = self.now();
        let requested_at = now.with_timezone(&Utc);
        let request = if immediate_due {
            JobRequest::immediate(requested_at)
        } else {
            let window = self.window.ok_or(CoordinatorError::NoBatchWindow)?;
            let due_at: DateTime<Utc> = window.resolve(now).start.with_timezone(&Utc);
            JobRequest::deferred(due_at, requested_at)
        };

        let job = self.store.create_or_reuse(&request)?;
        info!(
            "Cleanup triggered (immediate: {}), job {} is {} and due at {}",
            immediate_due,
            job.id,
            job.state.as_str(),
            job.due_at
        );
        Ok(job)
    }

    pub fn find(&self) -> Result<Option<CleanupJobHandle>, CoordinatorError> {
        Ok(self.store.find_active()?)
    }
}
