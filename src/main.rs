//! CLI entry point for the bike traffic map.
//!
//! Loads the lane overlays, stations and trips, then computes per-station
//! traffic for a time of day and writes it out as data or as an SVG overlay.

use anyhow::Result;
use bike_traffic_map::{
    config::MapConfig,
    events::{EventEmitter, MapEvent},
    loader::load_inputs,
    output::{
        append_snapshot_csv, print_json, print_pretty, render_svg, snapshot_to_geojson, write_json,
    },
    projection::Viewport,
    session::MapSession,
    time::{LAST_MINUTE, TimeFilter},
};
use clap::{Parser, Subcommand, ValueEnum};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "bike_traffic_map")]
#[command(about = "Per-station bike traffic by time of day", long_about = None)]
struct Cli {
    /// JSON config file with data sources, lane styling and scales
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Csv,
    Geojson,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute station traffic for a time of day
    Stats {
        /// `any`, a HH:MM time or a raw slider value
        #[arg(short, long, default_value = "any", allow_negative_numbers = true)]
        time: TimeFilter,

        #[arg(short, long, value_enum, default_value_t = Format::Json)]
        format: Format,

        /// Output file; JSON is logged when omitted
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Draw lanes and station markers as an SVG overlay
    Render {
        /// `any`, a HH:MM time or a raw slider value
        #[arg(short, long, default_value = "any", allow_negative_numbers = true)]
        time: TimeFilter,

        #[arg(short, long, default_value = "overlay.svg")]
        output: String,

        #[arg(long)]
        width: Option<f64>,

        #[arg(long)]
        height: Option<f64>,

        #[arg(long)]
        zoom: Option<f64>,
    },
    /// Drag the time slider across the day and log the busiest station per step
    Sweep {
        /// Slider step in minutes
        #[arg(short, long, default_value_t = 60)]
        step: u32,

        /// Optional CSV file to append every step's snapshot to
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/bike_traffic_map.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("bike_traffic_map.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = MapConfig::load(cli.config.as_deref())?;

    let inputs = load_inputs(&config).await?;
    let mut session = MapSession::new(inputs, &config);

    match cli.command {
        Commands::Stats {
            time,
            format,
            output,
        } => {
            let snapshot = session.set_time_filter(time);
            info!(
                time = %time,
                trips = snapshot.trip_count,
                stations = snapshot.stations.len(),
                "Snapshot computed"
            );
            print_pretty(&snapshot);

            match (format, output) {
                (Format::Json, None) => print_json(&snapshot)?,
                (Format::Json, Some(path)) => write_json(&path, &snapshot)?,
                (Format::Csv, Some(path)) => append_snapshot_csv(&path, &snapshot)?,
                (Format::Geojson, Some(path)) => std::fs::write(&path, snapshot_to_geojson(&snapshot)?)?,
                (Format::Geojson, None) => println!("{}", snapshot_to_geojson(&snapshot)?),
                (Format::Csv, None) => anyhow::bail!("--format csv needs --output"),
            }
        }
        Commands::Render {
            time,
            output,
            width,
            height,
            zoom,
        } => {
            let current = *session.viewport();
            session.set_viewport(Viewport {
                width: width.unwrap_or(current.width),
                height: height.unwrap_or(current.height),
                zoom: zoom.unwrap_or(current.zoom),
                ..current
            });
            session.set_time_filter(time);

            let readout = session.time_display();
            let visible = session
                .markers()
                .iter()
                .filter(|m| session.viewport().contains((m.cx, m.cy)))
                .count();
            info!(
                time = %readout.selected_time,
                any_time = readout.show_any_time_label,
                visible,
                "Rendering overlay"
            );

            std::fs::write(&output, render_svg(&session))?;
            info!(output, "Overlay written");
        }
        Commands::Sweep { step, output } => {
            sweep(&mut session, step, output.as_deref())?;
        }
    }

    Ok(())
}

/// Replays slider input through the event emitter: first "any time", then
/// every `step` minutes across the day.
#[tracing::instrument(skip(session))]
fn sweep(session: &mut MapSession, step: u32, output: Option<&str>) -> Result<()> {
    let mut emitter = EventEmitter::new();
    MapSession::register_handlers(&mut emitter);

    let step = step.max(1);
    let values = std::iter::once(-1).chain((0..=LAST_MINUTE).step_by(step as usize).map(|m| m as i32));

    for value in values {
        emitter.emit(session, &MapEvent::SliderInput(value))?;
        let snapshot = session.snapshot();

        match snapshot.stations.iter().max_by_key(|s| s.total_traffic) {
            Some(busiest) if busiest.total_traffic > 0 => info!(
                time = %snapshot.filter,
                slider = snapshot.filter.slider_value(),
                trips = snapshot.trip_count,
                station = busiest.short_name(),
                total = busiest.total_traffic,
                departures = busiest.departures,
                arrivals = busiest.arrivals,
                "Busiest station"
            ),
            _ => warn!(time = %snapshot.filter, "No station traffic"),
        }

        if let Some(path) = output {
            append_snapshot_csv(path, &snapshot)?;
        }
    }

    Ok(())
}
