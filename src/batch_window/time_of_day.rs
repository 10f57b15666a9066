use chrono::NaiveTime;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while parsing batch window configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid time of day {0:?}: expected HH:mm")]
    Format(String),
    #[error("invalid time of day {input:?}: hour {hour} is out of range 00..23")]
    HourOutOfRange { input: String, hour: u32 },
    #[error("invalid time of day {input:?}: minute {minute} is out of range 00..59")]
    MinuteOutOfRange { input: String, minute: u32 },
    #[error("invalid UTC offset {0:?}: expected +HH:MM or -HH:MM")]
    Offset(String),
}

/// A wall-clock time with minute precision, e.g. `23:59`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        if hour > 23 || minute > 59 {
            return None;
        }
        Some(Self {
            hour: hour as u8,
            minute: minute as u8,
        })
    }

    /// Parses a strict `HH:mm` string.
    ///
    /// Both fields must be exactly two ASCII digits. Surrounding whitespace,
    /// single-digit fields, seconds and any other delimiter are rejected.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let bytes = text.as_bytes();
        if bytes.len() != 5 || bytes[2] != b':' {
            return Err(ParseError::Format(text.to_string()));
        }

        let hour =
            two_digits(bytes[0], bytes[1]).ok_or_else(|| ParseError::Format(text.to_string()))?;
        let minute =
            two_digits(bytes[3], bytes[4]).ok_or_else(|| ParseError::Format(text.to_string()))?;

        if hour > 23 {
            return Err(ParseError::HourOutOfRange {
                input: text.to_string(),
                hour,
            });
        }
        if minute > 59 {
            return Err(ParseError::MinuteOutOfRange {
                input: text.to_string(),
                minute,
            });
        }

        Ok(Self {
            hour: hour as u8,
            minute: minute as u8,
        })
    }

    pub fn hour(&self) -> u32 {
        self.hour as u32
    }

    pub fn minute(&self) -> u32 {
        self.minute as u32
    }

    pub fn to_naive_time(self) -> NaiveTime {
        // Fields are range-checked on construction.
        NaiveTime::from_hms_opt(self.hour(), self.minute(), 0).unwrap_or(NaiveTime::MIN)
    }
}

fn two_digits(tens: u8, units: u8) -> Option<u32> {
    if !tens.is_ascii_digit() || !units.is_ascii_digit() {
        return None;
    }
    Some(((tens - b'0') * 10 + (units - b'0')) as u32)
}

impl FromStr for TimeOfDay {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_times() {
        let cases = [
            ("00:00", 0, 0),
            ("08:30", 8, 30),
            ("12:05", 12, 5),
            ("23:59", 23, 59),
        ];
        for (text, hour, minute) in cases {
            let time = TimeOfDay::parse(text).unwrap();
            assert_eq!((time.hour(), time.minute()), (hour, minute), "{}", text);
            assert_eq!(time.to_string(), text);
        }
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        assert!(matches!(
            TimeOfDay::parse("24:00"),
            Err(ParseError::HourOutOfRange { hour: 24, .. })
        ));
        assert!(matches!(
            TimeOfDay::parse("12:60"),
            Err(ParseError::MinuteOutOfRange { minute: 60, .. })
        ));
        assert!(TimeOfDay::parse("99:99").is_err());
    }

    #[test]
    fn test_parse_rejects_malformed_shapes() {
        let malformed = [
            "", "12-30", "12.30", "1:30", "12:3", "12:300", " 12:30", "12:30 ", "12:30:00",
            "ab:cd", "+1:30", "12:-1",
        ];
        for text in malformed {
            assert!(
                matches!(TimeOfDay::parse(text), Err(ParseError::Format(_))),
                "expected format error for {:?}",
                text
            );
        }
    }

    #[test]
    fn test_from_str_matches_parse() {
        let parsed: TimeOfDay = "06:15".parse().unwrap();
        assert_eq!(parsed, TimeOfDay::new(6, 15).unwrap());
    }

    #[test]
    fn test_new_range_checks() {
        assert!(TimeOfDay::new(23, 59).is_some());
        assert!(TimeOfDay::new(24, 0).is_none());
        assert!(TimeOfDay::new(0, 60).is_none());
    }

    #[test]
    fn test_to_naive_time() {
        let time = TimeOfDay::parse("23:59").unwrap();
        assert_eq!(time.to_naive_time(), NaiveTime::from_hms_opt(23, 59, 0).unwrap());
    }

    #[test]
    fn test_error_message_names_input() {
        let err = TimeOfDay::parse("25:00").unwrap_err();
        assert!(err.to_string().contains("25:00"));
    }
}
