//! Parsing of the startup documents and the one-shot load of all inputs.

use std::time::Duration;

use geojson::{FeatureCollection, GeoJson};
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::{LineStyle, MapConfig};
use crate::error::LoadError;
use crate::fetch::{BasicClient, HttpClient, fetch_source};
use crate::model::{Station, Trip};

/// A static bike-lane overlay.
#[derive(Debug, Clone)]
pub struct LaneLayer {
    pub id: String,
    pub lanes: FeatureCollection,
    pub style: LineStyle,
}

/// Everything the map needs, loaded once at startup.
#[derive(Debug, Clone)]
pub struct LoadedInputs {
    pub lanes: Vec<LaneLayer>,
    pub stations: Vec<Station>,
    pub trips: Vec<Trip>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StationDocument {
    Nested { data: StationData },
    Bare(Vec<Station>),
}

#[derive(Deserialize)]
struct StationData {
    stations: Vec<Station>,
}

/// Parses a station list given either as `{"data": {"stations": [...]}}` or
/// as a bare array.
pub fn parse_stations(bytes: &[u8]) -> Result<Vec<Station>, LoadError> {
    let doc: StationDocument = serde_json::from_slice(bytes).map_err(|e| {
        LoadError::MalformedStationDocument(format!(
            "expected a station list or {{\"data\": {{\"stations\": [...]}}}}: {e}"
        ))
    })?;
    Ok(match doc {
        StationDocument::Nested { data } => data.stations,
        StationDocument::Bare(stations) => stations,
    })
}

/// Parses the trip log CSV. The first bad row aborts the load.
pub fn parse_trips(bytes: &[u8]) -> Result<Vec<Trip>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let mut trips = Vec::new();
    for (index, result) in rdr.deserialize::<Trip>().enumerate() {
        let trip = result.map_err(|e| LoadError::MalformedTripRow {
            row: index as u64 + 1,
            reason: e.to_string(),
        })?;
        trips.push(trip);
    }
    Ok(trips)
}

/// Parses a lane document. A single feature is wrapped into a collection.
pub fn parse_lanes(bytes: &[u8]) -> Result<FeatureCollection, LoadError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| LoadError::MalformedLaneDocument(e.to_string()))?;
    match text.parse::<GeoJson>() {
        Ok(GeoJson::FeatureCollection(fc)) => Ok(fc),
        Ok(GeoJson::Feature(feature)) => Ok(FeatureCollection {
            bbox: None,
            features: vec![feature],
            foreign_members: None,
        }),
        Ok(GeoJson::Geometry(_)) => Err(LoadError::MalformedLaneDocument(
            "expected a FeatureCollection, found a bare geometry".to_string(),
        )),
        Err(e) => Err(LoadError::MalformedLaneDocument(e.to_string())),
    }
}

/// Fetches and parses every configured input with a default HTTP client.
pub async fn load_inputs(config: &MapConfig) -> anyhow::Result<LoadedInputs> {
    let client = BasicClient::with_timeout(Duration::from_secs(config.request_timeout_secs))?;
    Ok(load_inputs_with(&client, config).await?)
}

/// Lanes first, then stations, then trips; all complete before returning.
#[tracing::instrument(skip_all, fields(stations = %config.stations_url, trips = %config.trips_url))]
pub async fn load_inputs_with<C: HttpClient>(
    client: &C,
    config: &MapConfig,
) -> Result<LoadedInputs, LoadError> {
    let mut lanes = Vec::with_capacity(config.lane_layers.len());
    for layer in &config.lane_layers {
        let bytes = fetch_source(client, &layer.source).await?;
        let collection = parse_lanes(&bytes)?;
        info!(layer = %layer.id, features = collection.features.len(), "Lane layer loaded");
        lanes.push(LaneLayer {
            id: layer.id.clone(),
            lanes: collection,
            style: layer.style.clone(),
        });
    }

    let stations = parse_stations(&fetch_source(client, &config.stations_url).await?)?;
    info!(count = stations.len(), "Stations loaded");
    if stations.is_empty() {
        warn!("Station document contained no stations");
    }

    let trips = parse_trips(&fetch_source(client, &config.trips_url).await?)?;
    info!(count = trips.len(), "Trips loaded");

    Ok(LoadedInputs {
        lanes,
        stations,
        trips,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Timelike;
    use std::collections::HashMap;

    const TRIPS_CSV: &str = "\
ride_id,rideable_type,started_at,ended_at,start_station_id,end_station_id,is_member
r1,classic_bike,2024-03-01 08:00:00.120,2024-03-01 08:10:05.000,A,B,1
r2,electric_bike,2024-03-01 17:45:00,2024-03-01 18:02:00,B,A,0
";

    #[test]
    fn test_parse_stations_nested() {
        let json = br#"{"data": {"stations": [{"short_name": "A", "lon": -71.1, "lat": 42.3}]}}"#;
        let stations = parse_stations(json).unwrap();
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].short_name, "A");
    }

    #[test]
    fn test_parse_stations_bare_list() {
        let json = br#"[{"short_name": "A", "lon": -71.1, "lat": 42.3},
                        {"short_name": "B", "lon": "-71.2", "lat": "42.4", "capacity": 19}]"#;
        let stations = parse_stations(json).unwrap();
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[1].capacity, Some(19));
    }

    #[test]
    fn test_parse_stations_malformed() {
        let err = parse_stations(br#"{"stations": 3}"#).unwrap_err();
        assert!(matches!(err, LoadError::MalformedStationDocument(_)));
    }

    #[test]
    fn test_parse_trips() {
        let trips = parse_trips(TRIPS_CSV.as_bytes()).unwrap();
        assert_eq!(trips.len(), 2);
        assert_eq!(trips[0].start_station_id, "A");
        assert_eq!(trips[0].ride_id.as_deref(), Some("r1"));
        assert_eq!(trips[1].started_at.hour(), 17);
        assert_eq!(trips[1].ended_at.minute(), 2);
    }

    #[test]
    fn test_parse_trips_reports_bad_row() {
        let csv = "started_at,ended_at,start_station_id,end_station_id\n\
                   2024-03-01 08:00:00,2024-03-01 08:10:00,A,B\n\
                   soon,2024-03-01 08:10:00,A,B\n";
        let err = parse_trips(csv.as_bytes()).unwrap_err();
        match err {
            LoadError::MalformedTripRow { row, .. } => assert_eq!(row, 2),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_parse_trips_missing_column() {
        let csv = "started_at,ended_at,start_station_id\n2024-03-01 08:00:00,2024-03-01 08:10:00,A\n";
        assert!(matches!(
            parse_trips(csv.as_bytes()),
            Err(LoadError::MalformedTripRow { row: 1, .. })
        ));
    }

    #[test]
    fn test_parse_lanes() {
        let doc = br#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {}, "geometry":
                {"type": "LineString", "coordinates": [[-71.1, 42.36], [-71.09, 42.37]]}}
        ]}"#;
        assert_eq!(parse_lanes(doc).unwrap().features.len(), 1);
    }

    #[test]
    fn test_parse_lanes_single_feature() {
        let doc = br#"{"type": "Feature", "properties": null, "geometry":
            {"type": "LineString", "coordinates": [[-71.1, 42.36], [-71.09, 42.37]]}}"#;
        assert_eq!(parse_lanes(doc).unwrap().features.len(), 1);
    }

    #[test]
    fn test_parse_lanes_rejects_geometry_and_garbage() {
        let geom = br#"{"type": "LineString", "coordinates": [[0, 0], [1, 1]]}"#;
        assert!(matches!(
            parse_lanes(geom),
            Err(LoadError::MalformedLaneDocument(_))
        ));
        assert!(matches!(
            parse_lanes(b"<html>"),
            Err(LoadError::MalformedLaneDocument(_))
        ));
    }

    struct MapClient(HashMap<String, &'static str>);

    #[async_trait]
    impl HttpClient for MapClient {
        async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            let resp = match self.0.get(req.url().as_str()) {
                Some(body) => http::Response::builder().status(200).body(*body),
                None => http::Response::builder().status(404).body(""),
            };
            Ok(reqwest::Response::from(resp.unwrap()))
        }
    }

    fn test_config() -> MapConfig {
        MapConfig {
            stations_url: "https://example.org/stations.json".to_string(),
            trips_url: "https://example.org/trips.csv".to_string(),
            lane_layers: vec![crate::config::LaneLayerConfig {
                id: "lanes".to_string(),
                source: "https://example.org/lanes.geojson".to_string(),
                style: LineStyle::default(),
            }],
            ..MapConfig::default()
        }
    }

    #[tokio::test]
    async fn test_load_inputs_with() {
        let client = MapClient(
            [
                (
                    "https://example.org/stations.json",
                    r#"{"data": {"stations": [{"short_name": "A", "lon": -71.1, "lat": 42.3}]}}"#,
                ),
                ("https://example.org/trips.csv", TRIPS_CSV),
                (
                    "https://example.org/lanes.geojson",
                    r#"{"type": "FeatureCollection", "features": []}"#,
                ),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
        );

        let inputs = load_inputs_with(&client, &test_config()).await.unwrap();
        assert_eq!(inputs.lanes.len(), 1);
        assert_eq!(inputs.lanes[0].id, "lanes");
        assert_eq!(inputs.stations.len(), 1);
        assert_eq!(inputs.trips.len(), 2);
    }

    #[tokio::test]
    async fn test_load_inputs_with_missing_document() {
        let client = MapClient(HashMap::new());
        let err = load_inputs_with(&client, &test_config()).await.unwrap_err();
        assert!(matches!(err, LoadError::FetchFailure { .. }));
    }
}
