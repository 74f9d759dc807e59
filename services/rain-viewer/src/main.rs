//! Headless rain layer driver.
//!
//! Attaches a rain layer to an in-memory map host, waits for its raster
//! source, feeds it tile images from disk, renders a run of frames and prints
//! a JSON report of the resulting scene.

mod tiles;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use clap::Parser;
use nalgebra::Matrix4;
use rain_common::load_presets;
use rain_layer::{HeadlessHost, HostTile, LayerOptions, RainLayer, StaticCatalogClient};
use scene::HeadlessDevice;
use serde_json::json;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "rain-viewer")]
#[command(about = "Headless driver for the animated precipitation layer")]
struct Args {
    /// Directory holding scales.json and sources.yaml
    #[arg(long, env = "RAIN_CONFIG_DIR", default_value = "config")]
    config_dir: PathBuf,

    /// Layer id
    #[arg(long, default_value = "rain")]
    layer_id: String,

    /// Source preset name
    #[arg(long, env = "RAIN_SOURCE", default_value = "rainviewer")]
    source: String,

    /// Scale preset name
    #[arg(long, env = "RAIN_SCALE", default_value = "noaa")]
    scale: String,

    /// Read the catalog from a JSON file instead of fetching it
    #[arg(long)]
    catalog_file: Option<PathBuf>,

    /// Directory of {z}_{x}_{y}.png tile images to load
    #[arg(long)]
    tiles_dir: Option<PathBuf>,

    /// Map zoom
    #[arg(long, default_value = "3")]
    zoom: f64,

    /// Number of frames to render
    #[arg(long, default_value = "60")]
    frames: u32,

    /// Simulated time between frames (ms)
    #[arg(long, default_value = "16")]
    frame_interval_ms: f64,

    /// Particle jitter seed
    #[arg(long)]
    seed: Option<u64>,

    /// How long to wait for the first source (seconds)
    #[arg(long, default_value = "30")]
    source_timeout_secs: u64,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting rain viewer");

    let (scales, sources) = load_presets(&args.config_dir)?;

    let mut options = LayerOptions::new(args.layer_id.as_str())
        .with_source(args.source.as_str())
        .with_scale(args.scale.as_str());
    options.seed = args.seed;

    let mut layer = RainLayer::new(options, &scales, &sources)?;
    if let Some(path) = &args.catalog_file {
        info!(path = %path.display(), "Using catalog file");
        layer = layer.with_catalog_client(Arc::new(StaticCatalogClient::from_file(path)?));
    }
    let mut events = layer.subscribe();

    let mut host = HeadlessHost::new(args.zoom);
    host.push_layer(&args.layer_id);
    let mut device = HeadlessDevice::new();
    let projection = world_projection();

    layer.on_add(&mut host)?;

    // The first refresh fires as soon as the layer is added; rendering
    // applies it.
    let deadline = Instant::now() + Duration::from_secs(args.source_timeout_secs);
    let generation = loop {
        layer.render(&mut host, &mut device, &projection, 0.0)?;
        if let Some(generation) = layer.current_generation() {
            break generation;
        }
        if Instant::now() >= deadline {
            let errors = layer.stats().refresh_errors;
            layer.on_remove(&mut host, &mut device)?;
            bail!("no raster source after {}s ({errors} refresh errors)", args.source_timeout_secs);
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    };
    let event = events.try_recv().ok();

    // Tiles
    let mut loaded = Vec::new();
    if let Some(dir) = &args.tiles_dir {
        for file in tiles::load_tile_dir(dir)? {
            let texture = device.insert_texture(file.image);
            let tile = HostTile::new(file.coord, generation).with_texture(texture);
            layer.load_tile(&mut device, &tile, |_| Ok::<(), anyhow::Error>(()))?;
            loaded.push(tile);
        }
        info!(tiles = loaded.len(), "Loaded tiles");
    }

    // Frames
    for frame in 0..args.frames {
        let now_ms = frame as f64 * args.frame_interval_ms;
        layer.render(&mut host, &mut device, &projection, now_ms)?;
    }

    let report = {
        let scene = layer.scene();
        let groups: Vec<_> = scene
            .map(|s| {
                s.groups()
                    .iter()
                    .filter(|g| !g.is_empty())
                    .map(|g| json!({ "level": g.level(), "meshes": g.len(), "visible": g.is_visible() }))
                    .collect()
            })
            .unwrap_or_default();
        let last_frame = device.last_frame().map(|f| {
            json!({
                "group": f.group,
                "commands": f.commands.len(),
                "instances": f.instance_count(),
                "materials": f.materials,
            })
        });

        json!({
            "layer": layer.id(),
            "raster": layer.raster_id(),
            "event": event,
            "base_zoom": scene.map(|s| s.base_zoom()),
            "groups": groups,
            "last_frame": last_frame,
            "live_buffers": device.live_buffers(),
            "live_bytes": device.live_bytes(),
        })
    };

    for tile in &loaded {
        layer.unload_tile(&mut device, tile, |_| Ok::<(), anyhow::Error>(()))?;
    }
    layer.on_remove(&mut host, &mut device)?;

    let report = json!({
        "scene": report,
        "stats": layer.stats(),
        "buffers_after_remove": device.live_buffers(),
        "repaints": host.repaints,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    info!(frames = args.frames, "Rain viewer finished");
    Ok(())
}

/// Orthographic view of the whole mercator square, north up.
fn world_projection() -> Matrix4<f64> {
    Matrix4::new_orthographic(0.0, 1.0, 1.0, 0.0, -1.0, 1.0)
}
