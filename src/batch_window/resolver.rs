use super::time_of_day::{ParseError, TimeOfDay};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use serde::Serialize;

/// The configured daily maintenance window, as two wall-clock times.
///
/// An `end` that is earlier than or equal to `start` means the window runs
/// past midnight into the next calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchWindow {
    start: TimeOfDay,
    end: TimeOfDay,
}

/// A batch window pinned to concrete instants. `end` is always after `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl BatchWindow {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { start, end }
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, ParseError> {
        Ok(Self::new(TimeOfDay::parse(start)?, TimeOfDay::parse(end)?))
    }

    pub fn start(&self) -> TimeOfDay {
        self.start
    }

    pub fn end(&self) -> TimeOfDay {
        self.end
    }

    /// Pins the window to the calendar date of `now`, in `now`'s offset.
    ///
    /// The start always lands on `now`'s date, even if it already passed.
    /// When the end time is not after the start time the end moves to the
    /// following day, so equal times yield a full 24 hour window.
    pub fn resolve(&self, now: DateTime<FixedOffset>) -> ResolvedWindow {
        let date = now.date_naive();
        let offset = *now.offset();

        let start = at_time_on(date, self.start, offset);
        let mut end = at_time_on(date, self.end, offset);
        if end <= start {
            end = end + Duration::days(1);
        }

        ResolvedWindow { start, end }
    }

    /// Whether cleanup may run at `now`.
    ///
    /// Also checks the window that opened on the previous day, which is still
    /// open shortly after midnight for overnight windows.
    pub fn is_open_at(&self, now: DateTime<FixedOffset>) -> bool {
        self.resolve(now).contains(now) || self.resolve(now - Duration::days(1)).contains(now)
    }

    /// The first instant at or after `now` at which the window is open.
    pub fn next_opening(&self, now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        if self.is_open_at(now) {
            return now;
        }
        let today = self.resolve(now);
        if now < today.start {
            today.start
        } else {
            today.start + Duration::days(1)
        }
    }
}

impl ResolvedWindow {
    /// Half-open containment: the start instant is inside, the end is not.
    pub fn contains(&self, instant: DateTime<FixedOffset>) -> bool {
        self.start <= instant && instant < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

fn at_time_on(date: NaiveDate, time: TimeOfDay, offset: FixedOffset) -> DateTime<FixedOffset> {
    let local = date.and_time(time.to_naive_time());
    let utc = local - Duration::seconds(offset.local_minus_utc() as i64);
    DateTime::from_naive_utc_and_offset(utc, offset)
}
