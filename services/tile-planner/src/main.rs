//! Tile build planner.
//!
//! Walks a tile matrix set from its root tiles down to a target zoom and
//! lists, for every tile, the source rasters it should be built from:
//! - Sources are pruned by footprint overlap
//! - An optional GeoJSON cutline narrows the sources and tracks cropping
//! - Irregular zoom steps are mapped onto the nearest quadkeys
//! - A generalized quadkey coverage of the output is reported last
//!
//! Output is JSON lines on stdout (or `--output`), logs go to stderr.

mod config;
mod planner;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cutline::{Cutline, CutlineConfig, SourceGeometryIndex};
use tiling_common::{TileMatrixSet, TileMatrixSetRegistry};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::{PlanFile, PlannerConfig};
use planner::Planner;

#[derive(Parser, Debug)]
#[command(name = "tile-planner")]
#[command(about = "Plan which tiles to build from which source rasters")]
struct Args {
    /// YAML plan listing the tile matrix set, cutline and sources
    #[arg(long, env = "PLANNER_PLAN")]
    plan: PathBuf,

    /// Tile matrix set identifier or CRS (overrides the plan)
    #[arg(long)]
    tile_matrix_set: Option<String>,

    /// GeoJSON cutline in the tile matrix set's CRS (overrides the plan)
    #[arg(long)]
    cutline: Option<PathBuf>,

    /// Zoom to emit tiles at
    #[arg(long)]
    max_zoom: Option<u32>,

    /// Minimum covered fraction for coverage generalization
    #[arg(long)]
    fill_ratio: Option<f64>,

    /// Shortest quadkey the coverage generalization may produce
    #[arg(long)]
    merge_min_z: Option<usize>,

    /// Longest quadkey the coverage generalization may produce
    #[arg(long)]
    merge_max_z: Option<usize>,

    /// Cutline padding factor around each tile
    #[arg(long)]
    padding: Option<f64>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log format: json or pretty
    #[arg(long, default_value = "pretty")]
    log_format: String,
}

impl Args {
    fn apply(&self, config: &mut PlannerConfig) {
        if let Some(max_zoom) = self.max_zoom {
            config.max_zoom = max_zoom;
        }
        if let Some(fill_ratio) = self.fill_ratio {
            config.fill_ratio = fill_ratio;
        }
        if let Some(min_z) = self.merge_min_z {
            config.merge_min_z = min_z;
        }
        if let Some(max_z) = self.merge_max_z {
            config.merge_max_z = max_z;
        }
        if let Some(padding) = self.padding {
            config.padding = padding;
        }
    }
}

fn init_tracing(log_level: &str, log_format: &str) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(io::stderr);

    if log_format.eq_ignore_ascii_case("json") {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn load_cutline(
    tms: Arc<TileMatrixSet>,
    path: Option<PathBuf>,
    padding: f64,
) -> Result<Cutline> {
    let config = CutlineConfig { padding };
    let Some(path) = path else {
        return Ok(Cutline::empty_with(tms, config));
    };

    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read cutline: {}", path.display()))?;
    let cutline = Cutline::from_geojson(tms, &json, config)
        .with_context(|| format!("Failed to load cutline: {}", path.display()))?;

    info!(
        path = %path.display(),
        polygons = cutline.polygons().len(),
        "Loaded cutline"
    );
    Ok(cutline)
}

fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, &args.log_format)?;

    let plan = PlanFile::load(&args.plan)?;

    let mut config = PlannerConfig::from_env();
    config.apply(&plan.settings);
    args.apply(&mut config);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid planner configuration: {}", e))?;

    let registry = TileMatrixSetRegistry::with_defaults();
    let tms_name = args
        .tile_matrix_set
        .clone()
        .unwrap_or_else(|| plan.tile_matrix_set.clone());
    let tms = registry.find(&tms_name).with_context(|| {
        format!(
            "Unknown tile matrix set '{}', known: {}",
            tms_name,
            registry.identifiers().join(", ")
        )
    })?;

    let index: SourceGeometryIndex = plan
        .sources
        .iter()
        .map(|source| (source.name.clone(), source.bounds()))
        .collect();
    if index.len() != plan.sources.len() {
        anyhow::bail!("Plan lists the same source name more than once");
    }

    let cutline = load_cutline(
        tms.clone(),
        args.cutline.clone().or(plan.cutline),
        config.padding,
    )?;

    let planner = Planner::new(tms, index, cutline, config)?;

    let summary = match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output: {}", path.display()))?;
            planner.run(&mut BufWriter::new(file))?
        }
        None => {
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            let summary = planner.run(&mut out)?;
            out.flush()?;
            summary
        }
    };

    info!(
        tiles = summary.tiles,
        coverage_keys = summary.coverage.len(),
        "Plan written"
    );
    Ok(())
}
