//! Map marker clustering tool
//!
//! Reads geographic points from a CSV file, clusters them for a zoom level,
//! optionally spiderifies some clusters, and writes the resulting marker
//! render instructions as CSV or JSON.

use clap::{Parser, ValueEnum};
use csv::{ReaderBuilder, WriterBuilder};
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use rust_spiderify::{
    Bounds, Clock, ClusterId, ManualClock, Point, PointStore, RenderInstruction, SpiderConfig,
    Spiderifier, SystemClock, Viewport,
};


/// Payload carried through for each point: the CSV columns after `id,lat,lng`
type Payload = Vec<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Csv,
    Json,
}

#[derive(Parser)]
#[command(name = "rust_spiderify")]
#[command(about = "Geo point marker clustering with spiderify", long_about = None)]
struct Args {
    /// Input CSV file with id,latitude,longitude columns
    #[arg(short, long, default_value = "points.csv")]
    input: PathBuf,

    /// Output file for render instructions (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Map zoom level
    #[arg(short, long, default_value_t = 14.0)]
    zoom: f64,

    /// Proximity threshold in pixels; 0 disables clustering
    #[arg(short, long, default_value_t = rust_spiderify::config::DEFAULT_PROXIMITY_PX)]
    threshold: f64,

    /// Spiral radius in degrees
    #[arg(short, long, default_value_t = rust_spiderify::config::DEFAULT_RADIUS_DEG)]
    radius: f64,

    /// Delay between member reveals in milliseconds
    #[arg(long, default_value_t = rust_spiderify::config::DEFAULT_STAGGER_MS)]
    stagger_ms: u64,

    /// Tile size in pixels
    #[arg(long, default_value_t = rust_spiderify::config::DEFAULT_TILE_SIZE)]
    tile_size: f64,

    /// Only cluster points inside south,west,north,east
    #[arg(long, value_parser = parse_bounds)]
    bounds: Option<Bounds>,

    /// Cluster id to spiderify (repeatable)
    #[arg(short = 'x', long = "expand")]
    expand: Vec<String>,

    /// Play the reveal animation in real time
    #[arg(long)]
    animate: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Csv)]
    format: Format,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn config(&self) -> SpiderConfig {
        SpiderConfig {
            proximity_px: self.threshold,
            tile_size: self.tile_size,
            radius_deg: self.radius,
            stagger_ms: self.stagger_ms,
        }
    }

    fn viewport(&self) -> Viewport {
        Viewport {
            zoom: self.zoom,
            bounds: self.bounds,
        }
    }
}

fn main() {
    let args = Args::parse();
    init_tracing(args.debug);

    let points = match read_points(&args.input) {
        Ok(points) => points,
        Err(e) => {
            error!("Error reading CSV: {}", e);
            std::process::exit(1);
        }
    };

    if points.is_empty() {
        error!("No points found in CSV file");
        std::process::exit(1);
    }

    info!("Read {} points from {:?}", points.len(), args.input);

    let result = if args.animate {
        let clock = SystemClock::default();
        run(&args, points, clock, |deadline| {
            let now = clock.now_ms();
            if deadline > now {
                std::thread::sleep(Duration::from_millis(deadline - now));
            }
        })
    } else {
        let clock = ManualClock::new();
        run(&args, points, clock.clone(), |deadline| clock.set(deadline))
    };

    let instructions = match result {
        Ok(instructions) => instructions,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = write_output(args.output.as_ref(), args.format, &instructions) {
        error!("Error writing output: {}", e);
        std::process::exit(1);
    }
    if let Some(output_file) = &args.output {
        info!("Render instructions written to {:?}", output_file);
    }
}

fn init_tracing(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(io::stderr)
        .init();
}

/// Clusters the points, expands the requested clusters and plays their
/// reveals to the end
///
/// `wait_until` must bring the clock to the given deadline.
fn run<C: Clock>(
    args: &Args,
    points: PointStore<Payload>,
    clock: C,
    wait_until: impl FnMut(u64),
) -> Result<Vec<RenderInstruction>, Box<dyn std::error::Error>> {
    let mut spider = Spiderifier::new(args.config(), clock);
    let clusters = spider.recluster(points, &args.viewport());
    info!(
        "Found {} clusters ({} multi-point)",
        clusters.len(),
        clusters.iter().filter(|c| !c.is_singleton()).count()
    );

    for id in &args.expand {
        let phase = spider.toggle(&ClusterId::from(id.as_str()))?;
        debug!("Cluster {} is now {:?}", id, phase);
    }

    drive(&mut spider, wait_until);
    Ok(spider.render_instructions())
}

/// Runs the scheduler until no reveal is pending
fn drive<P: Clone, C: Clock>(spider: &mut Spiderifier<P, C>, mut wait_until: impl FnMut(u64)) {
    while let Some(deadline) = spider.scheduler().next_deadline() {
        wait_until(deadline);
        spider.tick();
    }
}

/// Reads points from a file
///
/// Expected format: `id,latitude,longitude[,extra...]` (header row is optional).
/// Extra columns become the point payload. Rows without parsable coordinates
/// are skipped.
fn read_points(filename: &PathBuf) -> Result<PointStore<Payload>, Box<dyn std::error::Error>> {
    let file = File::open(filename)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut points = Vec::new();

    for (row, result) in reader.records().enumerate() {
        let record = result?;

        // Header row has a non-numeric latitude column
        if row == 0 && record.get(1).is_some_and(|s| s.trim().parse::<f64>().is_err()) {
            continue;
        }

        if record.len() < 3 {
            warn!("Skipping row {}: expected id,lat,lng", row + 1);
            continue;
        }

        let lat = record[1].trim().parse::<f64>();
        let lng = record[2].trim().parse::<f64>();
        match (lat, lng) {
            (Ok(lat), Ok(lng)) => {
                let payload = record.iter().skip(3).map(|s| s.to_string()).collect();
                points.push(Point::new(record[0].trim(), lat, lng, payload));
            }
            _ => warn!("Skipping row {}: bad coordinates", row + 1),
        }
    }

    Ok(PointStore::new(points))
}

/// Parses `south,west,north,east`
fn parse_bounds(s: &str) -> Result<Bounds, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid bounds {:?}: {}", s, e))?;

    match parts.as_slice() {
        &[south, west, north, east] => Ok(Bounds::new(south, west, north, east)),
        _ => Err(format!(
            "invalid bounds {:?}: expected south,west,north,east",
            s
        )),
    }
}

/// Flat CSV shape of a render instruction
#[derive(Debug, PartialEq, Serialize)]
struct OutputRow {
    kind: &'static str,
    cluster_id: String,
    point_id: Option<String>,
    lat: f64,
    lng: f64,
    count: Option<usize>,
    index: Option<usize>,
}

impl From<&RenderInstruction> for OutputRow {
    fn from(r: &RenderInstruction) -> Self {
        match r {
            RenderInstruction::Point {
                cluster_id,
                point_id,
                lat,
                lng,
            } => OutputRow {
                kind: "point",
                cluster_id: cluster_id.to_string(),
                point_id: Some(point_id.clone()),
                lat: *lat,
                lng: *lng,
                count: Some(1),
                index: None,
            },
            RenderInstruction::Cluster {
                cluster_id,
                lat,
                lng,
                count,
            } => OutputRow {
                kind: "cluster",
                cluster_id: cluster_id.to_string(),
                point_id: None,
                lat: *lat,
                lng: *lng,
                count: Some(*count),
                index: None,
            },
            RenderInstruction::Member {
                cluster_id,
                point_id,
                lat,
                lng,
                index,
            } => OutputRow {
                kind: "member",
                cluster_id: cluster_id.to_string(),
                point_id: Some(point_id.clone()),
                lat: *lat,
                lng: *lng,
                count: None,
                index: Some(*index),
            },
        }
    }
}

/// Writes render instructions to a file or stdout
fn write_output(
    output_file: Option<&PathBuf>,
    format: Format,
    instructions: &[RenderInstruction],
) -> Result<(), Box<dyn std::error::Error>> {
    let sink: Box<dyn Write> = match output_file {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };

    match format {
        Format::Json => {
            let mut sink = sink;
            serde_json::to_writer_pretty(&mut sink, instructions)?;
            writeln!(sink)?;
            sink.flush()?;
        }
        Format::Csv => {
            let mut writer = WriterBuilder::new().from_writer(sink);
            for row in instructions.iter().map(OutputRow::from) {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
    }

    Ok(())
}
