//! # Terrain Configuration
//!
//! Static parameters read once at startup and shared by the tile manager,
//! every tile and every noise source.
//!
//! ## Format
//!
//! ```toml
//! tile_width = 64
//! max_mesh_height = 32.0
//! river_spring_ratio = 0.9
//! sea_level = 8.0
//! algorithm = "ridged_multi"
//!
//! [noise.ridged_multi]
//! frequency = 1.5
//! lacunarity = 2.0
//! octave_count = 5
//! persistence = 0.0
//! seed = 7
//! ```
//!
//! Every key is optional; missing keys take their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{TerrainError, TerrainResult};
use crate::noise_source::{NoiseAlgorithm, NoiseOptions};

/// Largest accepted tile width.
///
/// A tile holds `(W + 1)^2` vertices plus a quadtree with about `4/3 W^2`
/// nodes, so wider tiles exhaust memory long before `u32` indices overflow.
pub const MAX_TILE_WIDTH: u32 = 4096;

/// Startup configuration of the terrain system.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Width of a tile in grid cells. Must be a power of two.
    pub tile_width: u32,
    /// Height of the tallest possible vertex.
    pub max_mesh_height: f32,
    /// Fraction of `max_mesh_height` a vertex must exceed to become a river spring.
    pub river_spring_ratio: f32,
    /// Maximum number of vertices in one river course.
    pub maximum_river_length: usize,
    /// Number of rivers generated per tile.
    pub rivers_per_tile: usize,
    /// Height of the sea plane.
    pub sea_level: f32,
    /// Whether the sea plane is handed to the renderer.
    pub show_sea: bool,
    /// Amplitude of the deterministic ripple applied to sea vertices.
    pub sea_wave_amplitude: f32,
    /// Algorithm active when the tile manager starts.
    pub algorithm: NoiseAlgorithm,
    /// Per-family noise defaults.
    pub noise: NoiseDefaults,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        let max_mesh_height = 32.0;
        Self {
            tile_width: 64,
            max_mesh_height,
            river_spring_ratio: 0.9,
            maximum_river_length: 100,
            rivers_per_tile: 1,
            sea_level: max_mesh_height * 0.25,
            show_sea: true,
            sea_wave_amplitude: 0.15,
            algorithm: NoiseAlgorithm::Perlin,
            noise: NoiseDefaults::default(),
        }
    }
}

impl TerrainConfig {
    /// Parses a configuration from TOML text and validates it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigParse` for malformed TOML and any `validate` error.
    pub fn from_toml_str(text: &str) -> TerrainResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| TerrainError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file and validates it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigRead` if the file cannot be read, otherwise the errors
    /// of [`TerrainConfig::from_toml_str`].
    pub fn load(path: &Path) -> TerrainResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| TerrainError::ConfigRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks every invariant the generators rely on.
    ///
    /// # Errors
    ///
    /// Returns `TileWidthNotPowerOfTwo` or `InvalidConfig`.
    pub fn validate(&self) -> TerrainResult<()> {
        if !self.tile_width.is_power_of_two() {
            return Err(TerrainError::TileWidthNotPowerOfTwo(self.tile_width));
        }
        if self.tile_width > MAX_TILE_WIDTH {
            return Err(TerrainError::InvalidConfig(format!(
                "tile_width {} exceeds {MAX_TILE_WIDTH}",
                self.tile_width
            )));
        }
        if !(self.max_mesh_height.is_finite() && self.max_mesh_height > 0.0) {
            return Err(TerrainError::InvalidConfig(format!(
                "max_mesh_height must be positive, got {}",
                self.max_mesh_height
            )));
        }
        if !(0.0..=1.0).contains(&self.river_spring_ratio) {
            return Err(TerrainError::InvalidConfig(format!(
                "river_spring_ratio must be within [0, 1], got {}",
                self.river_spring_ratio
            )));
        }
        if !self.sea_level.is_finite() {
            return Err(TerrainError::InvalidConfig("sea_level must be finite".to_string()));
        }
        if !(self.sea_wave_amplitude.is_finite() && self.sea_wave_amplitude >= 0.0) {
            return Err(TerrainError::InvalidConfig(format!(
                "sea_wave_amplitude must be non-negative, got {}",
                self.sea_wave_amplitude
            )));
        }
        Ok(())
    }

    /// Returns the finest level of detail, `log2(tile_width)`.
    #[inline]
    #[must_use]
    pub const fn maximum_lod(&self) -> u32 {
        self.tile_width.trailing_zeros()
    }

    /// Returns the number of vertices along one tile edge.
    #[inline]
    #[must_use]
    pub const fn vertices_per_row(&self) -> u32 {
        self.tile_width + 1
    }

    /// Returns the number of vertices in one tile.
    #[inline]
    #[must_use]
    pub const fn vertex_count(&self) -> usize {
        let row = self.vertices_per_row() as usize;
        row * row
    }

    /// Returns the height a vertex must exceed to become a river spring.
    #[inline]
    #[must_use]
    pub fn minimum_height_of_river_spring(&self) -> f32 {
        self.max_mesh_height * self.river_spring_ratio
    }

    /// Returns a copy with a different tile width and `max_mesh_height` reset
    /// to half that width.
    ///
    /// `sea_level` keeps its ratio to the maximum height.
    #[must_use]
    pub fn scaled_to_tile_width(mut self, tile_width: u32) -> Self {
        let ratio = self.sea_level / self.max_mesh_height;
        self.tile_width = tile_width;
        self.max_mesh_height = tile_width as f32 / 2.0;
        self.sea_level = self.max_mesh_height * ratio;
        self
    }
}

/// Default options of every algorithm family.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseDefaults {
    /// Options for [`NoiseAlgorithm::Perlin`].
    pub perlin: NoiseOptions,
    /// Options for [`NoiseAlgorithm::RidgedMulti`].
    pub ridged_multi: NoiseOptions,
    /// Options for [`NoiseAlgorithm::Billow`].
    pub billow: NoiseOptions,
    /// Options for [`NoiseAlgorithm::Random`].
    pub random: NoiseOptions,
    /// Options for [`NoiseAlgorithm::Worley`].
    pub worley: NoiseOptions,
}

impl Default for NoiseDefaults {
    fn default() -> Self {
        Self {
            perlin: NoiseAlgorithm::Perlin.default_options(),
            ridged_multi: NoiseAlgorithm::RidgedMulti.default_options(),
            billow: NoiseAlgorithm::Billow.default_options(),
            random: NoiseAlgorithm::Random.default_options(),
            worley: NoiseAlgorithm::Worley.default_options(),
        }
    }
}

impl NoiseDefaults {
    /// Returns the configured options of `algorithm`.
    #[must_use]
    pub const fn options_for(&self, algorithm: NoiseAlgorithm) -> &NoiseOptions {
        match algorithm {
            NoiseAlgorithm::Perlin => &self.perlin,
            NoiseAlgorithm::RidgedMulti => &self.ridged_multi,
            NoiseAlgorithm::Billow => &self.billow,
            NoiseAlgorithm::Random => &self.random,
            NoiseAlgorithm::Worley => &self.worley,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = TerrainConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.maximum_lod(), 6);
        assert_eq!(config.vertices_per_row(), 65);
        assert_eq!(config.vertex_count(), 65 * 65);
        assert!((config.minimum_height_of_river_spring() - 28.8).abs() < 1e-4);
    }

    #[test]
    fn test_rejects_non_power_of_two() {
        let config = TerrainConfig {
            tile_width: 48,
            ..TerrainConfig::default()
        };
        assert_eq!(config.validate(), Err(TerrainError::TileWidthNotPowerOfTwo(48)));

        let zero = TerrainConfig {
            tile_width: 0,
            ..TerrainConfig::default()
        };
        assert_eq!(zero.validate(), Err(TerrainError::TileWidthNotPowerOfTwo(0)));
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let too_wide = TerrainConfig {
            tile_width: MAX_TILE_WIDTH * 2,
            ..TerrainConfig::default()
        };
        assert!(matches!(too_wide.validate(), Err(TerrainError::InvalidConfig(_))));

        let widest = TerrainConfig {
            tile_width: MAX_TILE_WIDTH,
            ..TerrainConfig::default()
        };
        assert!(widest.validate().is_ok());
        assert!(matches!(
            TerrainConfig::from_toml_str("tile_width = 8192"),
            Err(TerrainError::InvalidConfig(_))
        ));

        let flat = TerrainConfig {
            max_mesh_height: 0.0,
            ..TerrainConfig::default()
        };
        assert!(matches!(flat.validate(), Err(TerrainError::InvalidConfig(_))));

        let springs = TerrainConfig {
            river_spring_ratio: 1.5,
            ..TerrainConfig::default()
        };
        assert!(matches!(springs.validate(), Err(TerrainError::InvalidConfig(_))));
    }

    #[test]
    fn test_parse_partial_toml() {
        let text = r#"
            tile_width = 16
            max_mesh_height = 8.0
            algorithm = "billow"

            [noise.billow]
            frequency = 2.0
            lacunarity = 2.5
            octave_count = 4
            persistence = 0.25
            seed = 99
        "#;

        let config = TerrainConfig::from_toml_str(text).unwrap();
        assert_eq!(config.tile_width, 16);
        assert_eq!(config.algorithm, NoiseAlgorithm::Billow);
        assert_eq!(config.noise.billow.seed, 99);
        assert_eq!(config.noise.billow.octave_count, 4);
        // Untouched families keep their own defaults.
        assert_eq!(
            *config.noise.options_for(NoiseAlgorithm::RidgedMulti),
            NoiseAlgorithm::RidgedMulti.default_options()
        );
        assert_eq!(config.rivers_per_tile, 1);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(
            TerrainConfig::from_toml_str("tile_width = \"wide\""),
            Err(TerrainError::ConfigParse(_))
        ));
        assert_eq!(
            TerrainConfig::from_toml_str("tile_width = 100"),
            Err(TerrainError::TileWidthNotPowerOfTwo(100))
        );
        assert!(matches!(
            TerrainConfig::from_toml_str("algorithm = \"simplex\""),
            Err(TerrainError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("meadow_missing_config_for_test.toml");
        std::fs::remove_file(&path).ok();
        assert!(matches!(
            TerrainConfig::load(&path),
            Err(TerrainError::ConfigRead { .. })
        ));
    }

    #[test]
    fn test_scaled_to_tile_width_keeps_sea_ratio() {
        let config = TerrainConfig::default().scaled_to_tile_width(16);
        assert_eq!(config.tile_width, 16);
        assert!((config.max_mesh_height - 8.0).abs() < f32::EPSILON);
        assert!((config.sea_level - 2.0).abs() < 1e-5);
        assert!(config.validate().is_ok());
    }
}
