//! Per-station departure/arrival aggregation.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::model::{Station, Trip};

/// A station annotated with its traffic over one trip set.
///
/// `total_traffic` always equals `departures + arrivals`; values are only
/// ever produced by [`compute_station_traffic`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationTraffic {
    #[serde(flatten)]
    pub station: Station,
    pub departures: usize,
    pub arrivals: usize,
    pub total_traffic: usize,
}

impl StationTraffic {
    fn new(station: &Station, departures: usize, arrivals: usize) -> Self {
        Self {
            station: station.clone(),
            departures,
            arrivals,
            total_traffic: departures + arrivals,
        }
    }

    pub fn short_name(&self) -> &str {
        &self.station.short_name
    }

    /// Share of the traffic that leaves this station. Zero for idle stations.
    pub fn flow_ratio(&self) -> f64 {
        if self.total_traffic == 0 {
            0.0
        } else {
            self.departures as f64 / self.total_traffic as f64
        }
    }
}

/// Counts departures and arrivals per station code.
///
/// Returns fresh records in the order of `stations`; stations without any
/// matching trip get explicit zero counts. Trip endpoints that reference
/// codes missing from `stations` are counted but never surface.
pub fn compute_station_traffic<'a, I>(stations: &[Station], trips: I) -> Vec<StationTraffic>
where
    I: IntoIterator<Item = &'a Trip>,
{
    let mut departures: HashMap<&str, usize> = HashMap::new();
    let mut arrivals: HashMap<&str, usize> = HashMap::new();

    for trip in trips {
        *departures.entry(trip.start_station_id.as_str()).or_default() += 1;
        *arrivals.entry(trip.end_station_id.as_str()).or_default() += 1;
    }

    let snapshot: Vec<StationTraffic> = stations
        .iter()
        .map(|station| {
            let code = station.short_name.as_str();
            StationTraffic::new(
                station,
                departures.get(code).copied().unwrap_or(0),
                arrivals.get(code).copied().unwrap_or(0),
            )
        })
        .collect();

    if tracing::enabled!(tracing::Level::DEBUG) {
        let counted: usize = snapshot.iter().map(|s| s.total_traffic).sum();
        let endpoints: usize = departures.values().sum::<usize>() + arrivals.values().sum::<usize>();
        debug!(
            stations = stations.len(),
            endpoints,
            unknown_endpoints = endpoints.saturating_sub(counted),
            "Station traffic computed"
        );
    }

    snapshot
}

/// Largest total traffic in a snapshot, 0 when empty.
pub fn max_total_traffic(snapshot: &[StationTraffic]) -> usize {
    snapshot.iter().map(|s| s.total_traffic).max().unwrap_or(0)
}
