//! Runtime configuration: data sources, lane styling, marker scales and the
//! initial viewport.
//!
//! Every field has a default, so a config file only needs to name what it
//! changes:
//! ```json
//! {
//!   "trips_url": "data/trips-2024-04.csv",
//!   "radius": { "filtered": [3.0, 50.0] }
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::projection::Viewport;

pub const DEFAULT_STATIONS_URL: &str = "https://dsc106.com/labs/lab07/data/bluebikes-stations.json";
pub const DEFAULT_TRIPS_URL: &str = "https://dsc106.com/labs/lab07/data/bluebikes-traffic-2024-03.csv";

/// Stroke styling for a bike-lane overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineStyle {
    pub width: f64,
    pub opacity: f64,
    pub color: String,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            width: 2.0,
            opacity: 0.7,
            color: "#32D400".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneLayerConfig {
    pub id: String,
    pub source: String,
    #[serde(default)]
    pub style: LineStyle,
}

/// Marker radius ranges, in pixels, with and without a time filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadiusConfig {
    pub unfiltered: (f64, f64),
    pub filtered: (f64, f64),
}

impl Default for RadiusConfig {
    fn default() -> Self {
        Self {
            unfiltered: (0.0, 25.0),
            filtered: (3.0, 25.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub stations_url: String,
    pub trips_url: String,
    pub lane_layers: Vec<LaneLayerConfig>,
    pub radius: RadiusConfig,
    /// Colour buckets for the departure ratio.
    pub flow_buckets: Vec<f64>,
    pub viewport: Viewport,
    pub request_timeout_secs: u64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            stations_url: DEFAULT_STATIONS_URL.to_string(),
            trips_url: DEFAULT_TRIPS_URL.to_string(),
            lane_layers: vec![
                LaneLayerConfig {
                    id: "bostonBikeLanes".to_string(),
                    source: "Existing_Bike_Network_2022.geojson".to_string(),
                    style: LineStyle::default(),
                },
                LaneLayerConfig {
                    id: "cambridgeBikeLanes".to_string(),
                    source: "bike.geojson".to_string(),
                    style: LineStyle::default(),
                },
            ],
            radius: RadiusConfig::default(),
            flow_buckets: vec![0.0, 0.5, 1.0],
            viewport: Viewport::default(),
            request_timeout_secs: 60,
        }
    }
}

impl MapConfig {
    /// Reads a JSON config file, or starts from defaults when `path` is `None`,
    /// then applies environment overrides.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file '{path}'"))?;
                let config: MapConfig = serde_json::from_str(&content)
                    .with_context(|| format!("Invalid config file '{path}'"))?;
                info!(path, "Loaded config file");
                config
            }
            None => MapConfig::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        if config.flow_buckets.is_empty() {
            anyhow::bail!("flow_buckets must not be empty");
        }
        Ok(config)
    }

    /// `STATIONS_URL` and `TRIPS_URL` replace the configured sources.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("STATIONS_URL") {
            self.stations_url = url;
        }
        if let Some(url) = lookup("TRIPS_URL") {
            self.trips_url = url;
        }
    }
}
