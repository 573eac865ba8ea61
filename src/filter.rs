//! Selects trips near a time of day.

use crate::model::Trip;
use crate::time::{TimeFilter, minutes_since_midnight};

/// Half-width of the window around the queried minute, inclusive.
pub const WINDOW_MINUTES: i64 = 60;

/// Returns the trips that start or end within [`WINDOW_MINUTES`] of the query.
///
/// [`TimeFilter::Any`] keeps every trip. The window does not wrap around
/// midnight: a query at 00:05 does not match a trip ending at 23:59.
pub fn filter_trips_by_time(trips: &[Trip], filter: TimeFilter) -> Vec<&Trip> {
    match filter {
        TimeFilter::Any => trips.iter().collect(),
        TimeFilter::At(query) => trips
            .iter()
            .filter(|trip| is_near(trip, query))
            .collect(),
    }
}

fn is_near(trip: &Trip, query: u32) -> bool {
    let query = i64::from(query);
    let started = i64::from(minutes_since_midnight(&trip.started_at));
    let ended = i64::from(minutes_since_midnight(&trip.ended_at));
    (started - query).abs() <= WINDOW_MINUTES || (ended - query).abs() <= WINDOW_MINUTES
}
