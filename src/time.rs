//! Clock helpers and the time-of-day query driven by the slider.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;

use crate::error::QueryError;

/// Slider value meaning "no filter".
pub const ANY_TIME_SENTINEL: i32 = -1;

/// Last minute of the day.
pub const LAST_MINUTE: u32 = 24 * 60 - 1;

/// Text shown next to the slider when no time is selected.
pub const ANY_TIME_LABEL: &str = "(any time)";

/// Minutes elapsed since midnight, ignoring date and seconds.
pub fn minutes_since_midnight(timestamp: &NaiveDateTime) -> u32 {
    timestamp.hour() * 60 + timestamp.minute()
}

/// Formats a minute of the day as a short US clock string, e.g. `2:30 PM`.
///
/// Values past the end of the day are clamped to 11:59 PM.
pub fn format_time(minutes: u32) -> String {
    let minutes = minutes.min(LAST_MINUTE);
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
        .map(|t| t.format("%-I:%M %p").to_string())
        .unwrap_or_default()
}

/// Parses a 24h `HH:MM` string into minutes since midnight.
pub fn parse_clock(text: &str) -> Result<u32, QueryError> {
    let time = NaiveTime::parse_from_str(text.trim(), "%H:%M")
        .map_err(|_| QueryError::InvalidClockTime(text.to_string()))?;
    Ok(time.hour() * 60 + time.minute())
}

/// A time-of-day query: either every trip, or trips near a given minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFilter {
    #[default]
    Any,
    At(u32),
}

impl TimeFilter {
    pub fn is_any(&self) -> bool {
        matches!(self, TimeFilter::Any)
    }

    /// Display text for the slider readout.
    pub fn label(&self) -> String {
        match self {
            TimeFilter::Any => ANY_TIME_LABEL.to_string(),
            TimeFilter::At(minutes) => format_time(*minutes),
        }
    }

    /// The raw slider value this filter corresponds to.
    pub fn slider_value(&self) -> i32 {
        match self {
            TimeFilter::Any => ANY_TIME_SENTINEL,
            TimeFilter::At(minutes) => *minutes as i32,
        }
    }
}

impl TryFrom<i32> for TimeFilter {
    type Error = QueryError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            ANY_TIME_SENTINEL => Ok(TimeFilter::Any),
            v if (0..=LAST_MINUTE as i32).contains(&v) => Ok(TimeFilter::At(v as u32)),
            v => Err(QueryError::InvalidTimeFilter(v)),
        }
    }
}

/// Accepts `any`, a `HH:MM` clock time, or a raw slider value.
impl FromStr for TimeFilter {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("any") {
            return Ok(TimeFilter::Any);
        }
        if s.contains(':') {
            return parse_clock(s).map(TimeFilter::At);
        }
        let value: i32 = s
            .parse()
            .map_err(|_| QueryError::InvalidClockTime(s.to_string()))?;
        TimeFilter::try_from(value)
    }
}

impl fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
