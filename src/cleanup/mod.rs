//! Cleanup job coordination and execution.
//!
//! The coordinator turns trigger requests into a due instant and hands them to
//! the job store. The worker picks the job up once it is due and runs the
//! configured cleaner on a blocking thread.

mod cleaner;
mod clock;
mod coordinator;
mod worker;

pub use cleaner::{CleanupContext, CleanupError, HistoryCleaner, RunHistoryCleaner};
pub use clock::{ClockProvider, FixedClock, SystemClock};
pub use coordinator::{CleanupJobCoordinator, CoordinatorError};
pub use worker::CleanupWorker;
