//! # Tile Streaming
//!
//! Keeps a 3x3 window of tiles centered on the observer.
//!
//! ## Window Layout
//!
//! ```text
//! +----- x
//! | 0 1 2      -1,-1 | 0,-1 | 1,-1
//! | 3 4 5      -1, 0 | 0, 0 | 1, 0
//! | 6 7 8      -1, 1 | 0, 1 | 1, 1
//! z
//! ```
//!
//! Slot 4 always holds the tile containing the observer. When the observer
//! crosses into a neighboring tile the slot array is rotated so the row or
//! column that fell off the trailing edge becomes the new leading one, and
//! only those three tiles are regenerated. Tiles are never reallocated: their
//! identity, quadtree and renderer handle live for the whole session.
//!
//! ## Algorithm Cache
//!
//! Noise sources are cached per algorithm. Switching back to an algorithm
//! reuses its source together with any options tuned on it.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::config::TerrainConfig;
use crate::error::{TerrainError, TerrainResult};
use crate::noise_source::{NoiseAlgorithm, NoiseOptions, NoiseSource, SharedNoise};
use crate::render::TileRenderer;
use crate::tile::{Tile, TileCoord};

/// Number of tiles in the window.
pub const WINDOW_SIZE: usize = 9;

/// Number of tiles along one window edge.
pub const WINDOW_WIDTH: usize = 3;

/// Slot of the tile containing the observer.
pub const CENTER_SLOT: usize = 4;

/// Outcome of one [`TileManager::update`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WindowShift {
    /// Tiles moved along x since the previous update.
    pub diff_x: i32,
    /// Tiles moved along z since the previous update.
    pub diff_z: i32,
    /// The observer jumped more than one tile and all nine were regenerated.
    pub recentered: bool,
}

impl WindowShift {
    /// Returns true if the observer stayed inside the center tile.
    #[inline]
    #[must_use]
    pub const fn is_unchanged(&self) -> bool {
        self.diff_x == 0 && self.diff_z == 0
    }

    /// Returns how many tile regenerations the shift caused. A diagonal move
    /// regenerates the corner tile twice.
    #[must_use]
    pub const fn regenerated_tiles(&self) -> usize {
        if self.recentered {
            return WINDOW_SIZE;
        }
        match (self.diff_x != 0, self.diff_z != 0) {
            (false, false) => 0,
            (true, true) => 2 * WINDOW_WIDTH,
            _ => WINDOW_WIDTH,
        }
    }
}

/// Streams terrain tiles around a moving observer.
pub struct TileManager {
    config: Rc<TerrainConfig>,
    tiles: Vec<Tile>,
    previous_pos: [f32; 2],
    current_tile: TileCoord,
    algorithm: NoiseAlgorithm,
    noise_cache: HashMap<NoiseAlgorithm, SharedNoise>,
    sea_level: f32,
    show_sea: bool,
}

impl TileManager {
    /// Builds the window around the tile containing `observer` (`[x, z]`).
    ///
    /// # Errors
    ///
    /// Returns the configuration errors of [`TerrainConfig::validate`].
    pub fn new(config: TerrainConfig, observer: [f32; 2]) -> TerrainResult<Self> {
        config.validate()?;
        let config = Rc::new(config);
        let current_tile = TileCoord::from_world_pos(observer[0], observer[1], config.tile_width);

        let mut manager = Self {
            tiles: Vec::with_capacity(WINDOW_SIZE),
            previous_pos: observer,
            current_tile,
            algorithm: config.algorithm,
            noise_cache: HashMap::new(),
            sea_level: config.sea_level,
            show_sea: config.show_sea,
            config,
        };

        let noise = manager.noise_for(manager.algorithm);
        for slot in 0..WINDOW_SIZE {
            let coord = manager.slot_coord(slot);
            let tile = Tile::new(coord, Rc::clone(&noise), Rc::clone(&manager.config))?;
            manager.tiles.push(tile);
        }

        info!(
            "Tile window created around ({}, {}) with {} noise, tile width {}",
            current_tile.x, current_tile.z, manager.algorithm, manager.config.tile_width
        );
        Ok(manager)
    }

    /// Returns the configuration shared by every tile.
    #[must_use]
    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Returns the nine tiles in slot order.
    #[must_use]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Returns the tile at `slot`.
    ///
    /// # Errors
    ///
    /// Returns `SlotOutOfRange` for slots outside `0..9`.
    pub fn tile(&self, slot: usize) -> TerrainResult<&Tile> {
        self.tiles.get(slot).ok_or(TerrainError::SlotOutOfRange(slot))
    }

    /// Returns the tile containing the observer.
    #[must_use]
    pub fn center_tile(&self) -> &Tile {
        &self.tiles[CENTER_SLOT]
    }

    /// Returns the coordinate of the tile containing the observer.
    #[inline]
    #[must_use]
    pub const fn current_tile(&self) -> TileCoord {
        self.current_tile
    }

    /// Returns the observer position of the last update.
    #[inline]
    #[must_use]
    pub const fn previous_position(&self) -> [f32; 2] {
        self.previous_pos
    }

    /// Returns the coordinate slot `slot` should hold.
    #[must_use]
    pub fn slot_coord(&self, slot: usize) -> TileCoord {
        let dx = (slot % WINDOW_WIDTH) as i32 - 1;
        let dz = (slot / WINDOW_WIDTH) as i32 - 1;
        TileCoord::new(
            self.current_tile.x.saturating_add(dx),
            self.current_tile.z.saturating_add(dz),
        )
    }

    /// Moves the window to follow the observer at `[x, z]`.
    ///
    /// Crossing into a neighboring tile rotates the window and regenerates
    /// the three tiles of the new leading edge. A diagonal crossing shifts
    /// rows and columns in the same call. A jump of more than one tile
    /// regenerates all nine tiles in place.
    pub fn update(&mut self, observer: [f32; 2]) -> WindowShift {
        let width = self.config.tile_width;
        let current = TileCoord::from_world_pos(observer[0], observer[1], width);
        let previous = TileCoord::from_world_pos(self.previous_pos[0], self.previous_pos[1], width);
        let diff_x = current.x.saturating_sub(previous.x);
        let diff_z = current.z.saturating_sub(previous.z);

        self.previous_pos = observer;

        if diff_x == 0 && diff_z == 0 {
            return WindowShift::default();
        }

        self.current_tile = current;

        if diff_x.abs() > 1 || diff_z.abs() > 1 {
            self.recenter();
            info!(
                "Observer jumped to tile ({}, {}), window rebuilt",
                current.x, current.z
            );
            return WindowShift {
                diff_x,
                diff_z,
                recentered: true,
            };
        }

        // Rows first, at the previous column. The column shift then sees
        // every row already at its final z.
        if diff_z != 0 {
            self.shift_rows(diff_z, TileCoord::new(previous.x, current.z));
        }
        if diff_x != 0 {
            self.shift_columns(diff_x, current);
        }

        debug!(
            "Window shifted by ({}, {}) to tile ({}, {})",
            diff_x, diff_z, current.x, current.z
        );
        WindowShift {
            diff_x,
            diff_z,
            recentered: false,
        }
    }

    /// Moving north rotates rows down, moving south rotates them up.
    ///
    /// ```text
    /// north         south
    /// 0 1 2  6 7 8  0 1 2  3 4 5
    /// 3 4 5  0 1 2  3 4 5  6 7 8
    /// 6 7 8  3 4 5  6 7 8  0 1 2
    /// ```
    fn shift_rows(&mut self, diff_z: i32, center: TileCoord) {
        let row = if diff_z < 0 {
            self.tiles.rotate_right(WINDOW_WIDTH);
            0
        } else {
            self.tiles.rotate_left(WINDOW_WIDTH);
            WINDOW_WIDTH - 1
        };

        let z = center.z + row as i32 - 1;
        for column in 0..WINDOW_WIDTH {
            let coord = TileCoord::new(center.x + column as i32 - 1, z);
            self.tiles[row * WINDOW_WIDTH + column].update_coordinates(coord);
        }
    }

    /// Moving west rotates each row right, moving east rotates it left.
    ///
    /// ```text
    /// west          east
    /// 0 1 2  2 0 1  0 1 2  1 2 0
    /// 3 4 5  5 3 4  3 4 5  4 5 3
    /// 6 7 8  8 6 7  6 7 8  7 8 6
    /// ```
    fn shift_columns(&mut self, diff_x: i32, center: TileCoord) {
        let column = if diff_x < 0 {
            for row in self.tiles.chunks_mut(WINDOW_WIDTH) {
                row.rotate_right(1);
            }
            0
        } else {
            for row in self.tiles.chunks_mut(WINDOW_WIDTH) {
                row.rotate_left(1);
            }
            WINDOW_WIDTH - 1
        };

        let x = center.x + column as i32 - 1;
        for row in 0..WINDOW_WIDTH {
            let coord = TileCoord::new(x, center.z + row as i32 - 1);
            self.tiles[row * WINDOW_WIDTH + column].update_coordinates(coord);
        }
    }

    fn recenter(&mut self) {
        for slot in 0..WINDOW_SIZE {
            let coord = self.slot_coord(slot);
            self.tiles[slot].update_coordinates(coord);
        }
    }

    /// Returns the active noise algorithm.
    #[inline]
    #[must_use]
    pub const fn active_algorithm(&self) -> NoiseAlgorithm {
        self.algorithm
    }

    /// Returns the options of the active noise source.
    #[must_use]
    pub fn tile_algorithm_options(&self) -> NoiseOptions {
        self.center_tile().noise().borrow().options()
    }

    fn noise_for(&mut self, algorithm: NoiseAlgorithm) -> SharedNoise {
        let config = &self.config;
        let noise = self.noise_cache.entry(algorithm).or_insert_with(|| {
            debug!("Creating {} noise source", algorithm);
            NoiseSource::with_options(
                algorithm,
                *config.noise.options_for(algorithm),
                f64::from(config.tile_width),
            )
            .into_shared()
        });
        Rc::clone(noise)
    }

    /// Switches every tile to `algorithm` and regenerates them.
    ///
    /// A previously used algorithm keeps the options tuned on it.
    pub fn set_tile_algorithm(&mut self, algorithm: NoiseAlgorithm) {
        if algorithm == self.algorithm {
            return;
        }

        let noise = self.noise_for(algorithm);
        self.algorithm = algorithm;
        for tile in &mut self.tiles {
            tile.update_algorithm(Rc::clone(&noise));
        }
        info!("Switched terrain to {} noise", algorithm);
    }

    /// Switches by numeric identifier.
    ///
    /// # Errors
    ///
    /// Returns `UnknownAlgorithm` and keeps the current algorithm if `id` is
    /// not registered.
    pub fn set_tile_algorithm_by_id(&mut self, id: i32) -> TerrainResult<()> {
        let Some(algorithm) = NoiseAlgorithm::from_id(id) else {
            warn!("Unknown noise algorithm id {}, keeping {}", id, self.algorithm);
            return Err(TerrainError::UnknownAlgorithm(id.to_string()));
        };
        self.set_tile_algorithm(algorithm);
        Ok(())
    }

    /// Switches by configuration name, e.g. `"ridged_multi"`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownAlgorithm` and keeps the current algorithm if `name`
    /// is not registered.
    pub fn set_tile_algorithm_by_name(&mut self, name: &str) -> TerrainResult<()> {
        match name.parse::<NoiseAlgorithm>() {
            Ok(algorithm) => {
                self.set_tile_algorithm(algorithm);
                Ok(())
            }
            Err(e) => {
                warn!("Unknown noise algorithm {:?}, keeping {}", name, self.algorithm);
                Err(e)
            }
        }
    }

    /// Replaces the options of the active noise source and regenerates every
    /// tile.
    pub fn set_tile_algorithm_options(&mut self, options: NoiseOptions) {
        let noise = self.noise_for(self.algorithm);
        noise.borrow_mut().set_options(options);
        self.regenerate_all();
        debug!("Updated {} options: {:?}", self.algorithm, options);
    }

    /// Restores the family defaults of the active noise source.
    pub fn reset_tile_algorithm_options(&mut self) {
        let defaults = *self.config.noise.options_for(self.algorithm);
        self.set_tile_algorithm_options(defaults);
    }

    fn regenerate_all(&mut self) {
        for tile in &mut self.tiles {
            tile.regenerate();
        }
    }

    /// Returns the sea plane height.
    #[inline]
    #[must_use]
    pub const fn sea_level(&self) -> f32 {
        self.sea_level
    }

    /// Moves the sea plane of every tile.
    pub fn set_sea_level(&mut self, sea_level: f32) {
        self.sea_level = sea_level;
        for tile in &mut self.tiles {
            tile.set_sea_level(sea_level);
        }
    }

    /// Returns whether the sea plane is shown.
    #[inline]
    #[must_use]
    pub const fn show_sea(&self) -> bool {
        self.show_sea
    }

    /// Shows or hides the sea plane of every tile.
    pub fn set_show_sea(&mut self, show_sea: bool) {
        self.show_sea = show_sea;
        for tile in &mut self.tiles {
            tile.set_show_sea(show_sea);
        }
    }

    /// Hands every out-of-date tile to the renderer. Returns the number of
    /// tiles uploaded.
    pub fn upload<R: TileRenderer + ?Sized>(&mut self, renderer: &mut R) -> usize {
        let mut uploaded = 0;
        for tile in self.tiles.iter_mut().filter(|tile| tile.needs_upload()) {
            tile.setup(renderer);
            uploaded += 1;
        }
        uploaded
    }

    /// Releases the renderer geometry of every tile.
    pub fn cleanup<R: TileRenderer + ?Sized>(&mut self, renderer: &mut R) {
        for tile in &mut self.tiles {
            tile.cleanup(renderer);
        }
        debug!("Released geometry of {} tiles", self.tiles.len());
    }
}

impl std::fmt::Debug for TileManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileManager")
            .field("current_tile", &self.current_tile)
            .field("algorithm", &self.algorithm)
            .field("cached_algorithms", &self.noise_cache.len())
            .field("tiles", &self.tiles)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::HeadlessRenderer;
    use crate::tile::{TileId, TileState};

    const W: f32 = 16.0;

    fn manager() -> TileManager {
        TileManager::new(TerrainConfig::default().scaled_to_tile_width(16), [8.0, 8.0]).unwrap()
    }

    fn ids(manager: &TileManager) -> Vec<TileId> {
        manager.tiles().iter().map(Tile::id).collect()
    }

    fn assert_window_consistent(manager: &TileManager) {
        for slot in 0..WINDOW_SIZE {
            assert_eq!(
                manager.tiles()[slot].coordinates(),
                manager.slot_coord(slot),
                "slot {slot}"
            );
        }
    }

    #[test]
    fn test_initial_window_centered_on_observer() {
        let manager =
            TileManager::new(TerrainConfig::default().scaled_to_tile_width(16), [-20.0, 40.0]).unwrap();

        assert_eq!(manager.current_tile(), TileCoord::new(-2, 2));
        assert_eq!(manager.tiles().len(), WINDOW_SIZE);
        assert_eq!(manager.center_tile().coordinates(), TileCoord::new(-2, 2));
        assert_eq!(manager.tile(0).unwrap().coordinates(), TileCoord::new(-3, 1));
        assert_eq!(manager.tile(8).unwrap().coordinates(), TileCoord::new(-1, 3));
        assert_window_consistent(&manager);
    }

    #[test]
    fn test_observer_far_from_origin() {
        let limit = TileCoord::limit(64);

        let far = TileManager::new(TerrainConfig::default(), [3.0e9, 0.0]).unwrap();
        assert_eq!(far.current_tile(), TileCoord::new(limit, 0));
        assert_window_consistent(&far);

        let mut manager = TileManager::new(TerrainConfig::default(), [32.0, 32.0]).unwrap();
        let shift = manager.update([3.0e9, 0.0]);
        assert!(shift.recentered);
        assert_eq!(manager.current_tile(), TileCoord::new(limit, 0));
        assert_window_consistent(&manager);
        for tile in manager.tiles() {
            assert!(tile.vertices().iter().all(|v| v.position[1].is_finite()));
        }

        let back = manager.update([-3.0e9, 0.0]);
        assert!(back.recentered);
        assert_eq!(manager.current_tile(), TileCoord::new(-limit, 0));
        assert_window_consistent(&manager);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = TerrainConfig {
            tile_width: 24,
            ..TerrainConfig::default()
        };
        assert_eq!(
            TileManager::new(config, [0.0, 0.0]).err(),
            Some(TerrainError::TileWidthNotPowerOfTwo(24))
        );
    }

    #[test]
    fn test_slot_out_of_range() {
        let manager = manager();
        assert_eq!(manager.tile(9).err(), Some(TerrainError::SlotOutOfRange(9)));
    }

    #[test]
    fn test_move_inside_center_tile_is_noop() {
        let mut manager = manager();
        let before = ids(&manager);

        let shift = manager.update([15.9, 0.1]);

        assert!(shift.is_unchanged());
        assert_eq!(shift.regenerated_tiles(), 0);
        assert_eq!(ids(&manager), before);
        assert_eq!(manager.previous_position(), [15.9, 0.1]);
    }

    #[test]
    fn test_move_north_recycles_bottom_row() {
        let mut manager = manager();
        let before = ids(&manager);

        let shift = manager.update([8.0, -1.0]);

        assert_eq!(
            shift,
            WindowShift {
                diff_x: 0,
                diff_z: -1,
                recentered: false
            }
        );
        assert_eq!(manager.current_tile(), TileCoord::new(0, -1));
        // Old bottom row became the new top row, at the new north-west coordinates.
        assert_eq!(manager.tiles()[0].id(), before[6]);
        assert_eq!(manager.tiles()[0].coordinates(), TileCoord::new(-1, -2));
        // Old top row kept its content and moved down.
        assert_eq!(manager.tiles()[3].id(), before[0]);
        assert_eq!(manager.tiles()[3].coordinates(), TileCoord::new(-1, -1));
        assert_window_consistent(&manager);
    }

    #[test]
    fn test_move_south_recycles_top_row() {
        let mut manager = manager();
        let before = ids(&manager);

        manager.update([8.0, W + 1.0]);

        assert_eq!(manager.tiles()[6].id(), before[0]);
        assert_eq!(manager.tiles()[0].id(), before[3]);
        assert_window_consistent(&manager);
    }

    #[test]
    fn test_move_east_and_west() {
        let mut manager = manager();
        let before = ids(&manager);

        manager.update([W + 1.0, 8.0]);
        assert_eq!(manager.tiles()[2].id(), before[0]);
        assert_eq!(manager.tiles()[5].id(), before[3]);
        assert_eq!(manager.tiles()[8].id(), before[6]);
        assert_eq!(manager.center_tile().coordinates(), TileCoord::new(1, 0));
        assert_window_consistent(&manager);

        manager.update([8.0, 8.0]);
        assert_eq!(ids(&manager), before);
        assert_window_consistent(&manager);
    }

    #[test]
    fn test_diagonal_move_composes_both_shifts() {
        let mut manager = manager();
        let before = ids(&manager);

        let shift = manager.update([-1.0, -1.0]);

        assert_eq!(shift.regenerated_tiles(), 6);
        assert_eq!(manager.current_tile(), TileCoord::new(-1, -1));
        // The old north-west tile is the new center.
        assert_eq!(manager.center_tile().id(), before[0]);
        assert_window_consistent(&manager);
    }

    #[test]
    fn test_teleport_recenters_in_place() {
        let mut manager = manager();
        let before = ids(&manager);

        let shift = manager.update([10.0 * W, -5.0 * W]);

        assert!(shift.recentered);
        assert_eq!(shift.regenerated_tiles(), WINDOW_SIZE);
        assert_eq!(ids(&manager), before);
        assert_eq!(manager.current_tile(), TileCoord::new(10, -5));
        assert_window_consistent(&manager);
    }

    #[test]
    fn test_walk_keeps_seams() {
        let mut manager = manager();
        for step in 0..40 {
            manager.update([8.0 + step as f32 * 3.0, 8.0 - step as f32 * 2.0]);
        }
        assert_window_consistent(&manager);

        let center = manager.center_tile();
        let east = &manager.tiles()[5];
        for i in 0..=16 {
            assert_eq!(center.height_at(16, i), east.height_at(0, i));
        }
    }

    #[test]
    fn test_algorithm_cache_preserves_options() {
        let mut manager = manager();
        let mut tuned = manager.tile_algorithm_options();
        tuned.octave_count = 2;
        tuned.seed = 42;
        manager.set_tile_algorithm_options(tuned);

        manager.set_tile_algorithm(NoiseAlgorithm::Billow);
        assert_eq!(manager.active_algorithm(), NoiseAlgorithm::Billow);
        assert_eq!(
            manager.tile_algorithm_options(),
            NoiseAlgorithm::Billow.default_options()
        );

        manager.set_tile_algorithm(NoiseAlgorithm::Perlin);
        assert_eq!(manager.tile_algorithm_options(), tuned);
    }

    #[test]
    fn test_algorithm_switch_reaches_every_tile() {
        let mut manager = manager();
        manager.set_tile_algorithm_by_name("ridged").unwrap();

        for tile in manager.tiles() {
            assert_eq!(tile.noise().borrow().algorithm(), NoiseAlgorithm::RidgedMulti);
            assert_eq!(tile.state(), TileState::VerticesBuilt);
        }

        manager.set_tile_algorithm_by_id(4).unwrap();
        assert_eq!(manager.active_algorithm(), NoiseAlgorithm::Worley);
    }

    #[test]
    fn test_unknown_algorithm_keeps_previous() {
        let mut manager = manager();

        assert_eq!(
            manager.set_tile_algorithm_by_id(17),
            Err(TerrainError::UnknownAlgorithm("17".to_string()))
        );
        assert!(matches!(
            manager.set_tile_algorithm_by_name("simplex"),
            Err(TerrainError::UnknownAlgorithm(_))
        ));
        assert_eq!(manager.active_algorithm(), NoiseAlgorithm::Perlin);
    }

    #[test]
    fn test_options_regenerate_tiles() {
        let mut manager = manager();
        let before = manager.center_tile().vertices().to_vec();

        let mut options = manager.tile_algorithm_options();
        options.seed = 1234;
        manager.set_tile_algorithm_options(options);
        assert_ne!(manager.center_tile().vertices(), before.as_slice());

        manager.reset_tile_algorithm_options();
        assert_eq!(manager.center_tile().vertices(), before.as_slice());
    }

    #[test]
    fn test_sea_settings_fan_out() {
        let mut manager = manager();
        manager.set_sea_level(1.5);
        manager.set_show_sea(false);

        assert!((manager.sea_level() - 1.5).abs() < f32::EPSILON);
        assert!(!manager.show_sea());
        for tile in manager.tiles() {
            assert!((tile.sea_level() - 1.5).abs() < f32::EPSILON);
            assert!(!tile.show_sea());
        }
    }

    #[test]
    fn test_upload_only_dirty_tiles() {
        let mut manager = manager();
        let mut renderer = HeadlessRenderer::new();

        assert_eq!(manager.upload(&mut renderer), 9);
        assert_eq!(manager.upload(&mut renderer), 0);

        manager.update([W + 1.0, 8.0]);
        assert_eq!(manager.upload(&mut renderer), 3);
        assert_eq!(renderer.stats().created, 9);
        assert_eq!(renderer.stats().updated, 3);

        manager.cleanup(&mut renderer);
        assert_eq!(renderer.live_geometry(), 0);
        assert!(manager.tiles().iter().all(|t| t.state() == TileState::Released));
    }
}
