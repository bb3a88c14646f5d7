//! # Meadow Walk
//!
//! Walks an observer across the terrain with a headless renderer and reports
//! how the tile window streamed.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=meadow=debug meadow_walk --config config/meadow.toml --turns 12 --switch-every 200
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use meadow::{FrameDriver, ObserverPath};
use meadow_procedural::{HeadlessRenderer, NoiseAlgorithm, TerrainConfig};
use tracing::{error, info};

struct Options {
    config: Option<PathBuf>,
    algorithm: Option<NoiseAlgorithm>,
    turns: usize,
    speed: f32,
    switch_every: Option<usize>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            config: None,
            algorithm: None,
            turns: 8,
            speed: 2.0,
            switch_every: None,
        }
    }
}

fn print_help() {
    println!("Usage: meadow_walk [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>          TOML terrain configuration");
    println!("  -a, --algorithm <NAME>       perlin, ridged_multi, billow, random, worley");
    println!("  -t, --turns <N>              Legs of the spiral walk (default: 8)");
    println!("  -s, --speed <UNITS>          Distance per frame (default: 2.0)");
    println!("  -w, --switch-every <FRAMES>  Cycle the noise algorithm periodically");
    println!("  -h, --help                   Show this help");
}

/// Returns `None` when help was requested.
fn parse_args() -> Result<Option<Options>, String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut options = Options::default();

    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        if matches!(flag, "--help" | "-h") {
            return Ok(None);
        }

        let value = args
            .get(i + 1)
            .ok_or_else(|| format!("missing value for {flag}"))?;
        match flag {
            "--config" | "-c" => options.config = Some(PathBuf::from(value)),
            "--algorithm" | "-a" => {
                options.algorithm = Some(value.parse().map_err(|e| format!("{e}"))?);
            }
            "--turns" | "-t" => {
                options.turns = value.parse().map_err(|_| format!("invalid turns: {value}"))?;
            }
            "--speed" | "-s" => {
                options.speed = value.parse().map_err(|_| format!("invalid speed: {value}"))?;
            }
            "--switch-every" | "-w" => {
                options.switch_every = Some(
                    value
                        .parse()
                        .map_err(|_| format!("invalid frame count: {value}"))?,
                );
            }
            _ => return Err(format!("unknown option {flag}")),
        }
        i += 2;
    }

    Ok(Some(options))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let options = match parse_args() {
        Ok(Some(options)) => options,
        Ok(None) => {
            print_help();
            return ExitCode::SUCCESS;
        }
        Err(message) => {
            error!("{}", message);
            print_help();
            return ExitCode::FAILURE;
        }
    };

    let mut config = match &options.config {
        Some(path) => match TerrainConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => TerrainConfig::default(),
    };
    if let Some(algorithm) = options.algorithm {
        config.algorithm = algorithm;
    }

    let tile_width = config.tile_width as f32;
    let center = [tile_width / 2.0, tile_width / 2.0];
    let path = ObserverPath::spiral(center, tile_width, options.turns, options.speed);
    info!(
        "Walking {:.0} units over {} frames with {} noise",
        path.length(),
        path.frame_count(),
        config.algorithm
    );

    let mut driver = match FrameDriver::new(config, center, HeadlessRenderer::new()) {
        Ok(driver) => driver,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let stats = driver.run(&path, options.switch_every);
    let renderer = driver.shutdown();
    let render = renderer.stats();

    info!(
        "Frames: {}, crossings: {}, rebuilds: {}, algorithm switches: {}",
        stats.frames, stats.crossings, stats.recenters, stats.algorithm_switches
    );
    info!(
        "Average frame {:?}, slowest {:?}",
        stats.average_frame(),
        stats.slowest_frame
    );
    info!(
        "Geometry created: {}, updated: {}, released: {}, uploaded {:.1} MiB",
        render.created,
        render.updated,
        render.released,
        render.bytes_uploaded as f64 / (1024.0 * 1024.0)
    );

    ExitCode::SUCCESS
}
