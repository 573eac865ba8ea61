//! Error kinds surfaced by the loaders and query parsing.

use thiserror::Error;

/// Failures while loading one of the startup documents.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The source could not be fetched over HTTP or read from disk.
    #[error("failed to fetch {source_name}: {reason}")]
    FetchFailure { source_name: String, reason: String },

    /// The station document is neither `{"data": {"stations": [...]}}` nor a bare list.
    #[error("malformed station document: {0}")]
    MalformedStationDocument(String),

    /// A trip CSV row is missing a column or carries an unparsable timestamp.
    /// `row` is the 1-based data row (header excluded).
    #[error("malformed trip row {row}: {reason}")]
    MalformedTripRow { row: u64, reason: String },

    #[error("malformed lane document: {0}")]
    MalformedLaneDocument(String),
}

/// Rejected time-filter input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    /// Slider values other than the `-1` sentinel must lie in `0..=1439`.
    #[error("slider value {0} is outside -1..=1439")]
    InvalidTimeFilter(i32),

    #[error("'{0}' is not a HH:MM clock time")]
    InvalidClockTime(String),
}
