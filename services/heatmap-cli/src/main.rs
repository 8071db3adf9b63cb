//! Heatmap command-line driver.
//!
//! Loads station data (from a JSON file or generated), feeds it through the
//! async heatmap layer and writes the refined frame as a PNG:
//! - Configuration from defaults, `HEATMAP_*` environment variables, an
//!   optional JSON file and command-line overrides, in that order
//! - Optional simulated live edits to exercise the fast pass and the
//!   debounced refinement
//! - Render events and cache statistics are logged

mod stations;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use field_common::{BoundingBox, DataContainer};
use renderer::{write_png, HeatmapConfig, HeatmapLayer, RenderPass};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use stations::{parse_range, StationFile};

#[derive(Parser, Debug)]
#[command(name = "heatmap")]
#[command(about = "Interpolate station data onto a heatmap and export it as PNG")]
struct Args {
    /// Station file (JSON); generates synthetic stations when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Number of synthetic stations
    #[arg(long, default_value = "40")]
    stations: usize,

    /// Seed for synthetic stations and simulated edits
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Output PNG path
    #[arg(short, long, default_value = "heatmap.png")]
    output: PathBuf,

    /// Renderer configuration file (JSON)
    #[arg(long, env = "HEATMAP_CONFIG")]
    config: Option<PathBuf>,

    /// Colormap (viridis, plasma, inferno, magma, coolwarm, jet)
    #[arg(long)]
    colormap: Option<String>,

    /// Quality preset (very_low, low, medium, high, very_high, adaptive)
    #[arg(long)]
    quality: Option<String>,

    /// Target render time in ms (switches quality to adaptive)
    #[arg(long)]
    target_ms: Option<f64>,

    /// Nearest neighbors per cell, or "global"
    #[arg(long)]
    neighbors: Option<String>,

    /// RBF kernel
    #[arg(long)]
    kernel: Option<String>,

    /// Fixed color range as MIN,MAX (default: follow the data)
    #[arg(long, allow_hyphen_values = true)]
    color_range: Option<String>,

    /// Simulated value edits before the final frame
    #[arg(long, default_value = "0")]
    edits: usize,

    /// Pause between simulated edits in ms
    #[arg(long, default_value = "50")]
    edit_interval_ms: u64,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(args: &Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    if args.json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn build_config(args: &Args) -> Result<HeatmapConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            HeatmapConfig::from_json(&json)?
        }
        None => HeatmapConfig::from_env(),
    };

    if let Some(name) = &args.colormap {
        config.colormap = name.parse()?;
    }
    if let Some(name) = &args.quality {
        config.quality = name.parse()?;
    }
    if let Some(ms) = args.target_ms {
        config.target_render_time_ms = Some(ms);
        config.quality = renderer::Quality::Adaptive;
    }
    if let Some(n) = &args.neighbors {
        config.neighbors = renderer::config::parse_neighbors(n)?;
    }
    if let Some(name) = &args.kernel {
        config.kernel = name.parse()?;
    }
    if let Some(range) = &args.color_range {
        let (min, max) = parse_range(range)?;
        config.color_range = Some(renderer::ColorRange::new(min, max)?);
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args)?;

    let config = build_config(&args)?;
    let refine_delay = Duration::from_millis(config.refine_delay_ms);
    info!(
        colormap = %config.colormap,
        quality = %config.quality,
        target_ms = config.target_ms(),
        kernel = %config.kernel,
        neighbors = ?config.neighbors,
        "Starting heatmap renderer"
    );

    let file = match &args.input {
        Some(path) => StationFile::load(path)?,
        None => StationFile::synthetic(
            args.stations,
            &BoundingBox::new(0.0, 0.0, 100.0, 100.0),
            args.seed,
        ),
    };
    info!(stations = file.stations.len(), "Loaded stations");

    let layer = HeatmapLayer::spawn(config)?;
    let mut events = layer.events();

    if let Some(shape) = file.boundary.clone() {
        layer.set_boundary(shape).await?;
    }

    let mut container = DataContainer::new();
    let (points, values, labels) = file.columns();
    container.set_labeled_data(points, values, labels)?;
    let subscription = layer.attach(&mut container)?;

    if args.edits > 0 {
        simulate_edits(&mut container, args.edits, args.edit_interval_ms, args.seed)
            .await?;
    }

    // Wait for the debounced refinement after the last change
    let deadline = tokio::time::Instant::now() + refine_delay + Duration::from_secs(30);
    let refined = loop {
        match tokio::time::timeout_at(deadline, events.recv()).await {
            Ok(Ok(event)) => {
                info!(
                    pass = %event.pass,
                    grid_size = event.grid_size,
                    duration_ms = event.duration_ms,
                    "Render complete"
                );
                if event.pass == RenderPass::Refined {
                    break Some(event);
                }
            }
            Ok(Err(RecvError::Lagged(skipped))) => {
                warn!(skipped, "Render events dropped");
            }
            Ok(Err(RecvError::Closed)) | Err(_) => break None,
        }
    };

    container.unsubscribe(subscription);

    if refined.is_none() {
        warn!("No refined frame arrived");
    }
    let Some(frame) = layer.latest_frame() else {
        layer.shutdown().await?;
        bail!("Nothing to render: need at least 3 stations inside a valid boundary");
    };

    let bytes = write_png(&frame, &args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    let stats = layer.cache_stats().await?;
    info!(
        path = %args.output.display(),
        bytes,
        width = frame.width,
        height = frame.height,
        bounds = ?frame.bounds,
        "Wrote heatmap"
    );
    info!(
        hits = stats.hits,
        misses = stats.misses,
        evictions = stats.evictions,
        hit_rate = stats.hit_rate(),
        "Interpolator cache"
    );
    info!(adaptive_grid_size = layer.adaptive_grid_size().await?, "Final resolution");

    layer.shutdown().await?;
    Ok(())
}

/// Nudge random station values, one edit per interval.
async fn simulate_edits(
    container: &mut DataContainer,
    edits: usize,
    interval_ms: u64,
    seed: u64,
) -> Result<()> {
    use rand::{Rng, SeedableRng};

    if container.is_empty() {
        return Ok(());
    }
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed.wrapping_add(1));
    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));

    for _ in 0..edits {
        ticker.tick().await;
        let index = rng.gen_range(0..container.len());
        let value = container.values()[index] + rng.gen_range(-2.0..2.0);
        container.update_point(index, Some(value), None, None)?;
    }
    Ok(())
}
