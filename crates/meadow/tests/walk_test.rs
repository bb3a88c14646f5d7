//! # Headless Walk Tests
//!
//! Drives whole walks through the frame loop and checks the totals the
//! renderer saw.

use std::path::Path;

use meadow::{FrameDriver, ObserverPath};
use meadow_procedural::{HeadlessRenderer, NoiseAlgorithm, TerrainConfig, WINDOW_SIZE};

fn driver(config: TerrainConfig) -> FrameDriver<HeadlessRenderer> {
    let center = config.tile_width as f32 / 2.0;
    FrameDriver::new(config, [center, center], HeadlessRenderer::new()).unwrap()
}

/// Test: A spiral walk never rebuilds the window and never reallocates geometry.
#[test]
fn test_spiral_walk_streams_incrementally() {
    let config = TerrainConfig::default().scaled_to_tile_width(16);
    let mut driver = driver(config);
    let path = ObserverPath::spiral([8.0, 8.0], 16.0, 10, 3.0);

    let stats = driver.run(&path, None);

    assert_eq!(stats.frames as usize, path.frame_count());
    assert_eq!(stats.recenters, 0);
    assert!(stats.crossings > 0);

    let render = driver.renderer().stats();
    assert_eq!(render.created, WINDOW_SIZE as u32);
    assert_eq!(
        u64::from(render.created + render.updated),
        stats.tiles_uploaded
    );

    let renderer = driver.shutdown();
    assert_eq!(renderer.live_geometry(), 0);
}

/// Test: Cycling algorithms re-uploads the whole window each time.
#[test]
fn test_algorithm_cycle_reuploads_window() {
    let config = TerrainConfig::default().scaled_to_tile_width(16);
    let mut driver = driver(config);
    // Stationary observer: every upload comes from an algorithm switch.
    let path = ObserverPath::line([8.0, 8.0], [8.0, 8.0], 1.0);
    for _ in 0..NoiseAlgorithm::ALL.len() {
        driver.run(&path, None);
        let next = meadow::next_algorithm(driver.manager().active_algorithm());
        driver.switch_algorithm(next);
    }
    driver.frame([8.0, 8.0]);

    let stats = driver.stats();
    assert_eq!(stats.algorithm_switches, NoiseAlgorithm::ALL.len() as u64);
    assert_eq!(
        stats.tiles_uploaded,
        (WINDOW_SIZE * (1 + NoiseAlgorithm::ALL.len())) as u64
    );
    assert_eq!(driver.manager().active_algorithm(), NoiseAlgorithm::Perlin);
}

/// Test: The shipped configuration file loads.
#[test]
fn test_sample_config_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/meadow.toml");
    let config = TerrainConfig::load(&path).unwrap();
    assert_eq!(config, TerrainConfig::default());
}
