//! Output formatting for traffic snapshots.
//!
//! Supports pretty-printing, JSON, CSV append, GeoJSON and an SVG overlay of
//! the current map session.

use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::path::Path;

use anyhow::{Context, Result};
use csv::WriterBuilder;
use geo_types::Point;
use geojson::Value;
use serde::Serialize;
use tracing::{debug, info};

use crate::session::{MapSession, Snapshot};

/// Logs a snapshot using Rust's debug pretty-print format.
pub fn print_pretty(snapshot: &Snapshot) {
    debug!("{:#?}", snapshot);
}

/// Logs a snapshot as pretty-printed JSON.
pub fn print_json(snapshot: &Snapshot) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(snapshot)?);
    Ok(())
}

pub fn write_json(path: &str, snapshot: &Snapshot) -> Result<()> {
    let file = std::fs::File::create(path).with_context(|| format!("Failed to create {path}"))?;
    serde_json::to_writer_pretty(file, snapshot)?;
    Ok(())
}

/// One CSV row per station and time filter.
#[derive(Debug, Serialize)]
struct StationRow<'a> {
    time: String,
    short_name: &'a str,
    name: Option<&'a str>,
    lon: f64,
    lat: f64,
    departures: usize,
    arrivals: usize,
    total_traffic: usize,
    flow_ratio: f64,
}

/// Appends every station of `snapshot` to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_snapshot_csv(path: &str, snapshot: &Snapshot) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV rows");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);

    let time = match snapshot.filter {
        crate::time::TimeFilter::Any => "any".to_string(),
        crate::time::TimeFilter::At(m) => format!("{:02}:{:02}", m / 60, m % 60),
    };

    for s in &snapshot.stations {
        writer.serialize(StationRow {
            time: time.clone(),
            short_name: &s.station.short_name,
            name: s.station.name.as_deref(),
            lon: s.station.lon,
            lat: s.station.lat,
            departures: s.departures,
            arrivals: s.arrivals,
            total_traffic: s.total_traffic,
            flow_ratio: s.flow_ratio(),
        })?;
    }
    writer.flush()?;

    Ok(())
}

#[derive(Serialize)]
struct StationFeature<'a> {
    #[serde(serialize_with = "geojson::ser::serialize_geometry")]
    geometry: Point<f64>,
    short_name: &'a str,
    name: Option<&'a str>,
    departures: usize,
    arrivals: usize,
    total_traffic: usize,
    flow_ratio: f64,
}

/// Renders a snapshot as a GeoJSON FeatureCollection of station points.
pub fn snapshot_to_geojson(snapshot: &Snapshot) -> Result<String> {
    let features: Vec<StationFeature> = snapshot
        .stations
        .iter()
        .map(|s| StationFeature {
            geometry: s.station.point(),
            short_name: &s.station.short_name,
            name: s.station.name.as_deref(),
            departures: s.departures,
            arrivals: s.arrivals,
            total_traffic: s.total_traffic,
            flow_ratio: s.flow_ratio(),
        })
        .collect();
    geojson::ser::to_feature_collection_string(&features).context("Failed to serialize")
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn polyline(session: &MapSession, coords: &[Vec<f64>]) -> String {
    coords
        .iter()
        .filter(|c| c.len() >= 2)
        .map(|c| {
            let (x, y) = session.viewport().project(c[0], c[1]);
            format!("{x:.1},{y:.1}")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Draws the lane layers and station markers of `session` as a standalone SVG.
pub fn render_svg(session: &MapSession) -> String {
    let vp = session.viewport();
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" class="stations-layer" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = vp.width,
        h = vp.height
    );

    for layer in session.lanes() {
        let _ = writeln!(
            svg,
            r#"  <g id="{}" fill="none" stroke="{}" stroke-width="{}" stroke-opacity="{}">"#,
            escape_xml(&layer.id),
            escape_xml(&layer.style.color),
            layer.style.width,
            layer.style.opacity
        );
        for feature in &layer.lanes.features {
            let lines: Vec<&Vec<Vec<f64>>> = match feature.geometry.as_ref().map(|g| &g.value) {
                Some(Value::LineString(line)) => vec![line],
                Some(Value::MultiLineString(lines)) => lines.iter().collect(),
                _ => continue,
            };
            for line in lines {
                let _ = writeln!(svg, r#"    <polyline points="{}"/>"#, polyline(session, line));
            }
        }
        svg.push_str("  </g>\n");
    }

    svg.push_str("  <g class=\"stations\">\n");
    for marker in session.markers() {
        let _ = writeln!(
            svg,
            r#"    <circle cx="{:.1}" cy="{:.1}" r="{:.2}" fill-opacity="0.6" stroke="white" stroke-width="1" style="--departure-ratio: {}"><title>{}</title></circle>"#,
            marker.cx,
            marker.cy,
            marker.r,
            marker.departure_ratio,
            escape_xml(&marker.title)
        );
    }
    svg.push_str("  </g>\n</svg>\n");
    svg
}
