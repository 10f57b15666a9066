use super::resolver::BatchWindow;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// Read-only snapshot of the batch window configuration at a given instant.
///
/// Every field is `None` when no window is configured. That is a normal
/// state: deferred cleanup is disabled but immediate triggers still work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CleanupConfiguration {
    pub batch_window_start_time: Option<DateTime<FixedOffset>>,
    pub batch_window_end_time: Option<DateTime<FixedOffset>>,
    pub batch_window_start_time_of_day: Option<String>,
    pub batch_window_end_time_of_day: Option<String>,
}

pub fn current_configuration(
    window: Option<&BatchWindow>,
    now: DateTime<FixedOffset>,
) -> CleanupConfiguration {
    match window {
        None => CleanupConfiguration::default(),
        Some(window) => {
            let resolved = window.resolve(now);
            CleanupConfiguration {
                batch_window_start_time: Some(resolved.start),
                batch_window_end_time: Some(resolved.end),
                batch_window_start_time_of_day: Some(window.start().to_string()),
                batch_window_end_time_of_day: Some(window.end().to_string()),
            }
        }
    }
}
