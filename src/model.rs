//! Station and trip records as they arrive from the upstream documents.

use chrono::{DateTime, NaiveDateTime};
use geo_types::Point;
use serde::{Deserialize, Deserializer, Serialize};

/// A docking station. Identified by its `short_name` code, which is what
/// trip rows reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub short_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(deserialize_with = "deserialize_coord")]
    pub lon: f64,
    #[serde(deserialize_with = "deserialize_coord")]
    pub lat: f64,
    #[serde(default)]
    pub capacity: Option<u32>,
}

impl Station {
    pub fn new(short_name: &str, lon: f64, lat: f64) -> Self {
        Self {
            short_name: short_name.to_string(),
            name: None,
            lon,
            lat,
            capacity: None,
        }
    }

    pub fn point(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

/// A single rental. Only the hour and minute of the timestamps matter for
/// time filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    #[serde(default)]
    pub ride_id: Option<String>,
    #[serde(default)]
    pub rideable_type: Option<String>,
    pub start_station_id: String,
    pub end_station_id: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub started_at: NaiveDateTime,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub ended_at: NaiveDateTime,
    #[serde(default)]
    pub member_casual: Option<String>,
}

impl Trip {
    pub fn new(
        start_station_id: &str,
        end_station_id: &str,
        started_at: NaiveDateTime,
        ended_at: NaiveDateTime,
    ) -> Self {
        Self {
            ride_id: None,
            rideable_type: None,
            start_station_id: start_station_id.to_string(),
            end_station_id: end_station_id.to_string(),
            started_at,
            ended_at,
            member_casual: None,
        }
    }
}

const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// Parses the timestamp layouts seen in trip exports. Offsets in RFC 3339
/// input are dropped; the wall-clock reading is kept.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_local())
        })
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognised timestamp '{raw}'")))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Coord {
    Number(f64),
    Text(String),
}

// Station feeds are inconsistent about quoting coordinates.
fn deserialize_coord<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Coord::deserialize(deserializer)? {
        Coord::Number(v) => Ok(v),
        Coord::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid coordinate '{s}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_timestamp_variants() {
        let plain = parse_timestamp("2024-03-01 08:05:13").unwrap();
        assert_eq!((plain.hour(), plain.minute()), (8, 5));

        let millis = parse_timestamp("2024-03-01 08:05:13.145").unwrap();
        assert_eq!((millis.hour(), millis.minute()), (8, 5));

        let iso = parse_timestamp("2024-03-01T17:45:00").unwrap();
        assert_eq!((iso.hour(), iso.minute()), (17, 45));

        let rfc = parse_timestamp("2024-03-01T17:45:00-05:00").unwrap();
        assert_eq!((rfc.hour(), rfc.minute()), (17, 45));

        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_station_accepts_string_coordinates() {
        let json = r#"{"short_name":"A32000","name":"Fan Pier","lon":"-71.04","lat":42.35,"station_id":"x"}"#;
        let station: Station = serde_json::from_str(json).unwrap();
        assert_eq!(station.short_name, "A32000");
        assert_eq!(station.lon, -71.04);
        assert_eq!(station.lat, 42.35);
        assert_eq!(station.capacity, None);
    }

    #[test]
    fn test_station_rejects_bad_coordinate() {
        let json = r#"{"short_name":"A","lon":"west","lat":42.0}"#;
        assert!(serde_json::from_str::<Station>(json).is_err());
    }
}
