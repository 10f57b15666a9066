//! Daily maintenance batch window.
//!
//! Parses `HH:mm` configuration values and pins the recurring window to
//! concrete instants for a given reference time, including windows that
//! cross midnight.

mod resolver;
mod time_of_day;
mod view;

pub use resolver::{BatchWindow, ResolvedWindow};
pub use time_of_day::{ParseError, TimeOfDay};
pub use view::{current_configuration, CleanupConfiguration};

use chrono::FixedOffset;

/// Parses a `+HH:MM` / `-HH:MM` offset used as the window's reference zone.
pub fn parse_utc_offset(text: &str) -> Result<FixedOffset, ParseError> {
    text.parse::<FixedOffset>()
        .map_err(|_| ParseError::Offset(text.to_string()))
}
