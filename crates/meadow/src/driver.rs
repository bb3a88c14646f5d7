//! # Frame Driver
//!
//! The per-frame loop around a [`TileManager`]: feed the observer position,
//! then hand every changed tile to the renderer. Everything runs on the
//! calling thread; a frame that crosses a tile boundary blocks until the
//! three new tiles are generated.

use std::time::{Duration, Instant};

use meadow_procedural::{
    NoiseAlgorithm, TerrainConfig, TerrainResult, TileManager, TileRenderer, WindowShift,
};
use tracing::{debug, info};

use crate::path::ObserverPath;

/// What happened during one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameReport {
    /// Window movement caused by the observer.
    pub shift: WindowShift,
    /// Tiles handed to the renderer.
    pub uploaded: usize,
    /// Wall time of update plus upload.
    pub elapsed: Duration,
}

/// Totals over every frame driven so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DriverStats {
    /// Frames driven.
    pub frames: u64,
    /// Frames in which the observer entered another tile.
    pub crossings: u64,
    /// Frames in which the whole window was rebuilt.
    pub recenters: u64,
    /// Tiles handed to the renderer.
    pub tiles_uploaded: u64,
    /// Algorithm switches.
    pub algorithm_switches: u64,
    /// Slowest frame.
    pub slowest_frame: Duration,
    /// Sum of all frame times.
    pub total_time: Duration,
}

impl DriverStats {
    /// Returns the mean frame time.
    #[must_use]
    pub fn average_frame(&self) -> Duration {
        if self.frames == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total_time.as_nanos() / u128::from(self.frames);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

/// Drives a tile manager and a renderer frame by frame.
pub struct FrameDriver<R: TileRenderer> {
    manager: TileManager,
    renderer: R,
    stats: DriverStats,
}

impl<R: TileRenderer> FrameDriver<R> {
    /// Builds the tile window around `observer` and uploads it.
    ///
    /// # Errors
    ///
    /// Returns the configuration errors of [`TileManager::new`].
    pub fn new(config: TerrainConfig, observer: [f32; 2], mut renderer: R) -> TerrainResult<Self> {
        let mut manager = TileManager::new(config, observer)?;
        let uploaded = manager.upload(&mut renderer);
        debug!("Initial upload of {} tiles", uploaded);

        Ok(Self {
            manager,
            renderer,
            stats: DriverStats {
                tiles_uploaded: uploaded as u64,
                ..DriverStats::default()
            },
        })
    }

    /// Returns the tile manager.
    #[must_use]
    pub fn manager(&self) -> &TileManager {
        &self.manager
    }

    /// Returns the tile manager for settings changes.
    ///
    /// Changes are uploaded on the next frame.
    pub fn manager_mut(&mut self) -> &mut TileManager {
        &mut self.manager
    }

    /// Returns the renderer.
    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Returns the totals so far.
    #[must_use]
    pub const fn stats(&self) -> DriverStats {
        self.stats
    }

    /// Runs one frame with the observer at `[x, z]`.
    pub fn frame(&mut self, observer: [f32; 2]) -> FrameReport {
        let start = Instant::now();
        let shift = self.manager.update(observer);
        let uploaded = self.manager.upload(&mut self.renderer);
        let elapsed = start.elapsed();

        self.stats.frames += 1;
        self.stats.tiles_uploaded += uploaded as u64;
        self.stats.total_time += elapsed;
        self.stats.slowest_frame = self.stats.slowest_frame.max(elapsed);
        if !shift.is_unchanged() {
            self.stats.crossings += 1;
        }
        if shift.recentered {
            self.stats.recenters += 1;
        }

        FrameReport {
            shift,
            uploaded,
            elapsed,
        }
    }

    /// Switches the noise algorithm; the window is re-uploaded next frame.
    pub fn switch_algorithm(&mut self, algorithm: NoiseAlgorithm) {
        if algorithm != self.manager.active_algorithm() {
            self.manager.set_tile_algorithm(algorithm);
            self.stats.algorithm_switches += 1;
        }
    }

    /// Walks the whole path, one frame per position.
    ///
    /// With `switch_every` set, the algorithm advances to the next one in
    /// identifier order every that many frames.
    pub fn run(&mut self, path: &ObserverPath, switch_every: Option<usize>) -> DriverStats {
        for (frame, observer) in path.positions().enumerate() {
            if let Some(every) = switch_every.filter(|&every| every > 0) {
                if frame > 0 && frame % every == 0 {
                    let next = next_algorithm(self.manager.active_algorithm());
                    self.switch_algorithm(next);
                }
            }

            let report = self.frame(observer);
            if !report.shift.is_unchanged() {
                debug!(
                    "Frame {}: entered tile ({}, {}), {} tiles uploaded in {:?}",
                    frame,
                    self.manager.current_tile().x,
                    self.manager.current_tile().z,
                    report.uploaded,
                    report.elapsed
                );
            }
        }

        info!(
            "Walked {} frames, {} tile crossings, {} uploads, slowest frame {:?}",
            self.stats.frames, self.stats.crossings, self.stats.tiles_uploaded, self.stats.slowest_frame
        );
        self.stats
    }

    /// Releases every tile's geometry and returns the renderer.
    pub fn shutdown(mut self) -> R {
        self.manager.cleanup(&mut self.renderer);
        self.renderer
    }
}

/// Returns the algorithm after `algorithm` in identifier order, wrapping.
#[must_use]
pub fn next_algorithm(algorithm: NoiseAlgorithm) -> NoiseAlgorithm {
    let count = NoiseAlgorithm::ALL.len() as i32;
    NoiseAlgorithm::from_id((algorithm.id() + 1) % count).unwrap_or(NoiseAlgorithm::Perlin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meadow_procedural::HeadlessRenderer;

    fn driver() -> FrameDriver<HeadlessRenderer> {
        FrameDriver::new(
            TerrainConfig::default().scaled_to_tile_width(16),
            [8.0, 8.0],
            HeadlessRenderer::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_initial_upload() {
        let driver = driver();
        assert_eq!(driver.stats().tiles_uploaded, 9);
        assert_eq!(driver.renderer().stats().created, 9);
    }

    #[test]
    fn test_frame_counts_crossings() {
        let mut driver = driver();

        let still = driver.frame([9.0, 9.0]);
        assert!(still.shift.is_unchanged());
        assert_eq!(still.uploaded, 0);

        let moved = driver.frame([17.0, 9.0]);
        assert_eq!(moved.shift.diff_x, 1);
        assert_eq!(moved.uploaded, 3);

        let stats = driver.stats();
        assert_eq!(stats.frames, 2);
        assert_eq!(stats.crossings, 1);
        assert_eq!(stats.tiles_uploaded, 12);
        assert!(stats.slowest_frame >= moved.elapsed);
    }

    #[test]
    fn test_next_algorithm_wraps() {
        assert_eq!(next_algorithm(NoiseAlgorithm::Perlin), NoiseAlgorithm::RidgedMulti);
        assert_eq!(next_algorithm(NoiseAlgorithm::Worley), NoiseAlgorithm::Perlin);
    }

    #[test]
    fn test_run_switches_algorithms() {
        let mut driver = driver();
        let path = ObserverPath::line([8.0, 8.0], [8.0, 8.0 + 9.0 * 4.0], 4.0);

        let stats = driver.run(&path, Some(5));

        assert_eq!(stats.frames, 10);
        assert_eq!(stats.algorithm_switches, 1);
        assert_eq!(driver.manager().active_algorithm(), NoiseAlgorithm::RidgedMulti);
    }

    #[test]
    fn test_shutdown_releases_geometry() {
        let mut driver = driver();
        driver.frame([40.0, 8.0]);
        let renderer = driver.shutdown();
        assert_eq!(renderer.live_geometry(), 0);
        assert_eq!(renderer.stats().released, 9);
    }

    #[test]
    fn test_average_frame() {
        let stats = DriverStats {
            frames: 4,
            total_time: Duration::from_millis(10),
            ..DriverStats::default()
        };
        assert_eq!(stats.average_frame(), Duration::from_micros(2_500));
        assert_eq!(DriverStats::default().average_frame(), Duration::ZERO);
    }
}
