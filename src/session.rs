//! The map session: loaded data plus everything derived from it for the
//! current time filter and viewport.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{MapConfig, RadiusConfig};
use crate::error::QueryError;
use crate::events::{EventEmitter, EventKind, MapEvent};
use crate::filter::filter_trips_by_time;
use crate::loader::{LaneLayer, LoadedInputs};
use crate::model::{Station, Trip};
use crate::projection::Viewport;
use crate::scale::{QuantizeScale, SqrtScale};
use crate::time::TimeFilter;
use crate::traffic::{StationTraffic, compute_station_traffic, max_total_traffic};

/// One aggregation result. A new snapshot replaces the previous one wholesale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub filter: TimeFilter,
    pub trip_count: usize,
    pub stations: Vec<StationTraffic>,
}

/// A station circle as drawn over the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub short_name: String,
    pub cx: f64,
    pub cy: f64,
    pub r: f64,
    pub departure_ratio: f64,
    pub title: String,
}

/// What the slider readout shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeDisplay {
    pub selected_time: String,
    pub show_any_time_label: bool,
}

pub struct MapSession {
    stations: Vec<Station>,
    trips: Vec<Trip>,
    lanes: Vec<LaneLayer>,
    radius_ranges: RadiusConfig,
    radius_scale: SqrtScale,
    flow_scale: QuantizeScale,
    viewport: Viewport,
    snapshot: Arc<Snapshot>,
    markers: Vec<Marker>,
}

impl MapSession {
    /// Builds the session from the loaded inputs and computes the unfiltered
    /// baseline. The radius domain is fixed by the baseline's busiest station.
    pub fn new(inputs: LoadedInputs, config: &MapConfig) -> Self {
        let LoadedInputs {
            lanes,
            stations,
            trips,
        } = inputs;

        let baseline = compute_station_traffic(&stations, &trips);
        let max_traffic = max_total_traffic(&baseline);
        info!(
            stations = stations.len(),
            trips = trips.len(),
            max_traffic,
            "Baseline station traffic computed"
        );

        let snapshot = Arc::new(Snapshot {
            filter: TimeFilter::Any,
            trip_count: trips.len(),
            stations: baseline,
        });

        let mut session = Self {
            stations,
            trips,
            lanes,
            radius_ranges: config.radius,
            radius_scale: SqrtScale::new((0.0, max_traffic as f64), config.radius.unfiltered),
            flow_scale: QuantizeScale::new((0.0, 1.0), config.flow_buckets.clone()),
            viewport: config.viewport,
            snapshot,
            markers: Vec::new(),
        };
        session.rebuild_markers();
        session
    }

    /// Re-filters and re-aggregates from scratch for `filter`.
    pub fn set_time_filter(&mut self, filter: TimeFilter) -> Arc<Snapshot> {
        let trips = filter_trips_by_time(&self.trips, filter);
        let stations = compute_station_traffic(&self.stations, trips.iter().copied());

        self.radius_scale.set_range(if filter.is_any() {
            self.radius_ranges.unfiltered
        } else {
            self.radius_ranges.filtered
        });

        debug!(filter = %filter, trips = trips.len(), "Time filter applied");
        self.snapshot = Arc::new(Snapshot {
            filter,
            trip_count: trips.len(),
            stations,
        });
        self.rebuild_markers();
        Arc::clone(&self.snapshot)
    }

    /// Applies a raw slider value (`-1` for any time).
    pub fn handle_slider(&mut self, value: i32) -> Result<Arc<Snapshot>, QueryError> {
        let filter = TimeFilter::try_from(value)?;
        Ok(self.set_time_filter(filter))
    }

    /// Moves the map. Only marker positions change.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.project_markers();
    }

    /// Subscribes this session to map movement and slider input.
    pub fn register_handlers(emitter: &mut EventEmitter<MapSession>) {
        for kind in [
            EventKind::Move,
            EventKind::Zoom,
            EventKind::Resize,
            EventKind::MoveEnd,
        ] {
            emitter.subscribe(kind, |session: &mut MapSession, event: &MapEvent| {
                if let Some(viewport) = event.viewport() {
                    session.set_viewport(viewport);
                }
                Ok(())
            });
        }
        emitter.subscribe(
            EventKind::SliderInput,
            |session: &mut MapSession, event: &MapEvent| {
                if let MapEvent::SliderInput(value) = event {
                    session.handle_slider(*value)?;
                }
                Ok(())
            },
        );
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn filter(&self) -> TimeFilter {
        self.snapshot.filter
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn lanes(&self) -> &[LaneLayer] {
        &self.lanes
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn radius_scale(&self) -> &SqrtScale {
        &self.radius_scale
    }

    pub fn time_display(&self) -> TimeDisplay {
        match self.snapshot.filter {
            TimeFilter::Any => TimeDisplay {
                selected_time: String::new(),
                show_any_time_label: true,
            },
            filter => TimeDisplay {
                selected_time: filter.label(),
                show_any_time_label: false,
            },
        }
    }

    fn rebuild_markers(&mut self) {
        self.markers = self
            .snapshot
            .stations
            .iter()
            .map(|s| Marker {
                short_name: s.short_name().to_string(),
                cx: 0.0,
                cy: 0.0,
                r: self.radius_scale.apply(s.total_traffic as f64),
                departure_ratio: self.flow_scale.apply(s.flow_ratio()),
                title: format!(
                    "{} trips ({} departures, {} arrivals)",
                    s.total_traffic, s.departures, s.arrivals
                ),
            })
            .collect();
        self.project_markers();
    }

    // Markers and snapshot stations share the station-list order.
    fn project_markers(&mut self) {
        for (marker, traffic) in self.markers.iter_mut().zip(&self.snapshot.stations) {
            let (cx, cy) = self
                .viewport
                .project(traffic.station.lon, traffic.station.lat);
            marker.cx = cx;
            marker.cy = cy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn t(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn session() -> MapSession {
        let inputs = LoadedInputs {
            lanes: vec![],
            stations: vec![
                Station::new("A", -71.09415, 42.36027),
                Station::new("B", -71.08, 42.37),
                Station::new("C", -71.10, 42.35),
            ],
            trips: vec![
                Trip::new("A", "B", t(8, 0), t(8, 10)),
                Trip::new("A", "B", t(8, 20), t(8, 40)),
                Trip::new("B", "A", t(17, 30), t(17, 50)),
                Trip::new("A", "A", t(12, 0), t(12, 30)),
            ],
        };
        MapSession::new(inputs, &MapConfig::default())
    }

    #[test]
    fn test_baseline_snapshot() {
        let session = session();
        let snapshot = session.snapshot();
        assert_eq!(snapshot.filter, TimeFilter::Any);
        assert_eq!(snapshot.trip_count, 4);
        assert_eq!(snapshot.stations[0].total_traffic, 5);
        assert_eq!(snapshot.stations[1].total_traffic, 3);
        assert_eq!(snapshot.stations[2].total_traffic, 0);
        assert_eq!(session.radius_scale().domain(), (0.0, 5.0));
    }

    #[test]
    fn test_markers_follow_baseline() {
        let session = session();
        let markers = session.markers();
        assert_eq!(markers.len(), 3);
        assert_eq!(markers[0].r, 25.0);
        assert_eq!(markers[2].r, 0.0);
        assert_eq!(markers[2].departure_ratio, 0.0);
        assert_eq!(markers[1].title, "3 trips (1 departures, 2 arrivals)");
        // station A sits on the default centre
        assert!((markers[0].cx - 512.0).abs() < 1e-6);
        assert!((markers[0].cy - 384.0).abs() < 1e-6);
    }

    #[test]
    fn test_time_filter_produces_new_snapshot() {
        let mut session = session();
        let baseline = session.snapshot();

        let morning = session.set_time_filter(TimeFilter::At(480));

        assert_eq!(morning.trip_count, 2);
        assert_eq!(morning.stations[0].departures, 2);
        assert_eq!(morning.stations[1].arrivals, 2);
        assert_eq!(morning.stations[1].departures, 0);
        // the earlier snapshot is untouched
        assert_eq!(baseline.trip_count, 4);
        assert_eq!(baseline.stations[0].total_traffic, 5);
    }

    #[test]
    fn test_filtered_range_keeps_baseline_domain() {
        let mut session = session();
        session.set_time_filter(TimeFilter::At(480));
        assert_eq!(session.radius_scale().range(), (3.0, 25.0));
        assert_eq!(session.radius_scale().domain(), (0.0, 5.0));
        // idle station C now sits on the lower bound of the filtered range
        assert_eq!(session.markers()[2].r, 3.0);

        session.set_time_filter(TimeFilter::Any);
        assert_eq!(session.radius_scale().range(), (0.0, 25.0));
        assert_eq!(session.markers()[2].r, 0.0);
    }

    #[test]
    fn test_flow_buckets() {
        let mut session = session();
        session.set_time_filter(TimeFilter::At(480));
        let markers = session.markers();
        assert_eq!(markers[0].departure_ratio, 1.0);
        assert_eq!(markers[1].departure_ratio, 0.0);
    }

    #[test]
    fn test_handle_slider() {
        let mut session = session();
        let snap = session.handle_slider(1050).unwrap();
        assert_eq!(snap.filter, TimeFilter::At(1050));
        assert_eq!(snap.trip_count, 1);
        assert!(session.handle_slider(2000).is_err());
        // a rejected value leaves the previous snapshot in place
        assert_eq!(session.filter(), TimeFilter::At(1050));
    }

    #[test]
    fn test_time_display() {
        let mut session = session();
        assert_eq!(
            session.time_display(),
            TimeDisplay {
                selected_time: String::new(),
                show_any_time_label: true
            }
        );
        session.set_time_filter(TimeFilter::At(870));
        assert_eq!(
            session.time_display(),
            TimeDisplay {
                selected_time: "2:30 PM".to_string(),
                show_any_time_label: false
            }
        );
    }

    #[test]
    fn test_set_viewport_moves_markers_only() {
        let mut session = session();
        let before = session.markers().to_vec();
        let viewport = Viewport {
            zoom: 13.0,
            ..*session.viewport()
        };
        session.set_viewport(viewport);

        let after = session.markers();
        assert_eq!(after[0].r, before[0].r);
        assert!((after[0].cx - 512.0).abs() < 1e-6);
        assert!(((after[1].cx - 512.0) - 2.0 * (before[1].cx - 512.0)).abs() < 1e-6);
    }

    #[test]
    fn test_registered_handlers() {
        let mut session = session();
        let mut emitter = EventEmitter::new();
        MapSession::register_handlers(&mut emitter);

        assert_eq!(emitter.handler_count(EventKind::Move), 1);
        assert_eq!(emitter.handler_count(EventKind::SliderInput), 1);

        emitter
            .emit(&mut session, &MapEvent::SliderInput(480))
            .unwrap();
        assert_eq!(session.snapshot().trip_count, 2);

        let moved = Viewport {
            center: [-71.08, 42.37],
            ..*session.viewport()
        };
        emitter.emit(&mut session, &MapEvent::Move(moved)).unwrap();
        assert!((session.markers()[1].cx - 512.0).abs() < 1e-6);

        assert!(emitter
            .emit(&mut session, &MapEvent::SliderInput(-7))
            .is_err());
    }
}
