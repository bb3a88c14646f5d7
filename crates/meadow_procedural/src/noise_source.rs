//! # Noise Sources
//!
//! Swappable scalar fields that turn a world coordinate into a height value.
//!
//! ## Algorithms
//!
//! | Algorithm     | Module                | Range        |
//! |---------------|-----------------------|--------------|
//! | `Perlin`      | fBm over Perlin noise | about [-1, 1] |
//! | `RidgedMulti` | ridged multifractal   | about [-1, 1] |
//! | `Billow`      | billow (abs fBm)      | about [-1, 1] |
//! | `Worley`      | cellular distance     | about [-1, 1] |
//! | `Random`      | uniform white noise   | [0, 1)       |
//!
//! ## Determinism Guarantee
//!
//! Except for `Random`, `value` is a pure function of the coordinate and the
//! active `NoiseOptions`. Neighboring tiles sample the same world coordinate
//! along their shared edge, so identical options give seamless terrain.
//!
//! `Random` is spatially incoherent: it is a degenerate algorithm
//! used to eyeball the mesh topology.
//!
//! ## Resolution
//!
//! Every coherent algorithm divides its input by a resolution (the tile width)
//! before sampling. The rescaling belongs to the algorithm, so tiles never need
//! to know which algorithm they are sampling.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use noise::core::worley::ReturnType;
use noise::{Billow, Fbm, MultiFractal, NoiseFn, Perlin, RidgedMulti, Worley};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::TerrainError;

/// Reference-counted handle to a noise source.
///
/// All nine tiles of a window hold the same handle. Changing options through
/// the handle does NOT regenerate the tiles; the owner must push the change to
/// every tile afterwards.
///
/// Terrain generation is single-threaded, and the cellular module is not
/// `Send`, so the handle is `Rc`-based.
pub type SharedNoise = Rc<RefCell<NoiseSource>>;

/// Identifies a noise algorithm family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum NoiseAlgorithm {
    /// Fractal Brownian motion over Perlin gradient noise.
    Perlin = 0,
    /// Ridged multifractal, sharp mountain crests.
    RidgedMulti = 1,
    /// Billowy, rounded hills.
    Billow = 2,
    /// Uniform white noise, no spatial coherence.
    Random = 3,
    /// Cellular (Voronoi/Worley) distance field.
    Worley = 4,
}

impl NoiseAlgorithm {
    /// Every algorithm, in identifier order.
    pub const ALL: [Self; 5] = [
        Self::Perlin,
        Self::RidgedMulti,
        Self::Billow,
        Self::Random,
        Self::Worley,
    ];

    /// Returns the numeric identifier used by the UI.
    #[inline]
    #[must_use]
    pub const fn id(self) -> i32 {
        self as i32
    }

    /// Converts a numeric identifier back into an algorithm.
    #[must_use]
    pub const fn from_id(id: i32) -> Option<Self> {
        match id {
            0 => Some(Self::Perlin),
            1 => Some(Self::RidgedMulti),
            2 => Some(Self::Billow),
            3 => Some(Self::Random),
            4 => Some(Self::Worley),
            _ => None,
        }
    }

    /// Returns the configuration name of this algorithm.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Perlin => "perlin",
            Self::RidgedMulti => "ridged_multi",
            Self::Billow => "billow",
            Self::Random => "random",
            Self::Worley => "worley",
        }
    }

    /// Returns the default options of this algorithm family.
    #[must_use]
    pub fn default_options(self) -> NoiseOptions {
        match self {
            Self::Perlin => PerlinNoise::DEFAULT_OPTIONS,
            Self::RidgedMulti => RidgedMultiNoise::DEFAULT_OPTIONS,
            Self::Billow => BillowNoise::DEFAULT_OPTIONS,
            Self::Random => RandomNoise::DEFAULT_OPTIONS,
            Self::Worley => WorleyNoise::DEFAULT_OPTIONS,
        }
    }
}

impl fmt::Display for NoiseAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NoiseAlgorithm {
    type Err = TerrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "perlin" => Ok(Self::Perlin),
            "ridged_multi" | "ridged" | "ridgedmulti" => Ok(Self::RidgedMulti),
            "billow" => Ok(Self::Billow),
            "random" => Ok(Self::Random),
            "worley" | "voronoi" => Ok(Self::Worley),
            _ => Err(TerrainError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Tunable parameters of a noise algorithm.
///
/// Algorithms ignore the fields they have no use for: ridged multifractal
/// ignores `persistence`, worley only reads `frequency` and `seed`, random
/// ignores everything except `seed`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoiseOptions {
    /// Frequency of the first octave.
    pub frequency: f64,
    /// Frequency multiplier between successive octaves.
    pub lacunarity: f64,
    /// Number of octaves.
    pub octave_count: u32,
    /// Amplitude multiplier between successive octaves.
    pub persistence: f64,
    /// Seed of the underlying permutation tables.
    pub seed: u32,
}

/// Fractal Brownian motion over Perlin noise.
pub struct PerlinNoise {
    options: NoiseOptions,
    resolution: f64,
    module: Fbm<Perlin>,
}

impl PerlinNoise {
    /// Default options for the Perlin family.
    pub const DEFAULT_OPTIONS: NoiseOptions = NoiseOptions {
        frequency: 1.0,
        lacunarity: 2.0,
        octave_count: 6,
        persistence: 0.5,
        seed: 0,
    };

    fn new(options: NoiseOptions, resolution: f64) -> Self {
        Self {
            options,
            resolution,
            module: Self::build(&options),
        }
    }

    fn build(options: &NoiseOptions) -> Fbm<Perlin> {
        Fbm::<Perlin>::new(options.seed)
            .set_frequency(options.frequency)
            .set_lacunarity(options.lacunarity)
            .set_octaves(options.octave_count as usize)
            .set_persistence(options.persistence)
    }

    fn set_options(&mut self, options: NoiseOptions) {
        self.options = options;
        self.module = Self::build(&options);
    }
}

/// Ridged multifractal noise.
pub struct RidgedMultiNoise {
    options: NoiseOptions,
    resolution: f64,
    module: RidgedMulti<Perlin>,
}

impl RidgedMultiNoise {
    /// Default options for the ridged multifractal family.
    pub const DEFAULT_OPTIONS: NoiseOptions = NoiseOptions {
        frequency: 1.0,
        lacunarity: 2.0,
        octave_count: 6,
        persistence: 0.0,
        seed: 0,
    };

    fn new(options: NoiseOptions, resolution: f64) -> Self {
        Self {
            options,
            resolution,
            module: Self::build(&options),
        }
    }

    // Persistence is not a ridged multifractal parameter.
    fn build(options: &NoiseOptions) -> RidgedMulti<Perlin> {
        RidgedMulti::<Perlin>::new(options.seed)
            .set_frequency(options.frequency)
            .set_lacunarity(options.lacunarity)
            .set_octaves(options.octave_count as usize)
    }

    fn set_options(&mut self, options: NoiseOptions) {
        self.options = options;
        self.module = Self::build(&options);
    }
}

/// Billow noise.
pub struct BillowNoise {
    options: NoiseOptions,
    resolution: f64,
    module: Billow<Perlin>,
}

impl BillowNoise {
    /// Default options for the billow family.
    pub const DEFAULT_OPTIONS: NoiseOptions = NoiseOptions {
        frequency: 1.0,
        lacunarity: 2.0,
        octave_count: 6,
        persistence: 0.5,
        seed: 0,
    };

    fn new(options: NoiseOptions, resolution: f64) -> Self {
        Self {
            options,
            resolution,
            module: Self::build(&options),
        }
    }

    fn build(options: &NoiseOptions) -> Billow<Perlin> {
        Billow::<Perlin>::new(options.seed)
            .set_frequency(options.frequency)
            .set_lacunarity(options.lacunarity)
            .set_octaves(options.octave_count as usize)
            .set_persistence(options.persistence)
    }

    fn set_options(&mut self, options: NoiseOptions) {
        self.options = options;
        self.module = Self::build(&options);
    }
}

/// Cellular noise returning the distance to the nearest feature point.
pub struct WorleyNoise {
    options: NoiseOptions,
    resolution: f64,
    module: Worley,
}

impl WorleyNoise {
    /// Default options for the worley family.
    pub const DEFAULT_OPTIONS: NoiseOptions = NoiseOptions {
        frequency: 1.0,
        lacunarity: 0.0,
        octave_count: 1,
        persistence: 0.0,
        seed: 0,
    };

    fn new(options: NoiseOptions, resolution: f64) -> Self {
        Self {
            options,
            resolution,
            module: Self::build(&options),
        }
    }

    fn build(options: &NoiseOptions) -> Worley {
        Worley::new(options.seed)
            .set_frequency(options.frequency)
            .set_return_type(ReturnType::Distance)
    }

    fn set_options(&mut self, options: NoiseOptions) {
        self.options = options;
        self.module = Self::build(&options);
    }
}

/// White noise drawn from a seeded generator.
pub struct RandomNoise {
    options: NoiseOptions,
    rng: RefCell<ChaCha8Rng>,
}

impl RandomNoise {
    /// Default options for the random family.
    pub const DEFAULT_OPTIONS: NoiseOptions = NoiseOptions {
        frequency: 0.0,
        lacunarity: 0.0,
        octave_count: 0,
        persistence: 0.0,
        seed: 0,
    };

    fn new(options: NoiseOptions) -> Self {
        Self {
            options,
            rng: RefCell::new(ChaCha8Rng::seed_from_u64(u64::from(options.seed))),
        }
    }

    fn set_options(&mut self, options: NoiseOptions) {
        self.options = options;
        *self.rng.get_mut() = ChaCha8Rng::seed_from_u64(u64::from(options.seed));
    }
}

/// A noise algorithm together with its active options.
///
/// # Example
///
/// ```rust,ignore
/// let mut noise = NoiseSource::new(NoiseAlgorithm::Perlin, 64.0);
/// let height = noise.value(12.0, 0.0, -40.0);
///
/// let mut options = noise.options();
/// options.octave_count = 3;
/// noise.set_options(options);
/// ```
pub enum NoiseSource {
    /// See [`PerlinNoise`].
    Perlin(PerlinNoise),
    /// See [`RidgedMultiNoise`].
    RidgedMulti(RidgedMultiNoise),
    /// See [`BillowNoise`].
    Billow(BillowNoise),
    /// See [`WorleyNoise`].
    Worley(WorleyNoise),
    /// See [`RandomNoise`].
    Random(RandomNoise),
}

impl NoiseSource {
    /// Creates a noise source with the family defaults of `algorithm`.
    ///
    /// `resolution` is the world-space distance mapped to one unit of the
    /// underlying field, normally the tile width.
    #[must_use]
    pub fn new(algorithm: NoiseAlgorithm, resolution: f64) -> Self {
        Self::with_options(algorithm, algorithm.default_options(), resolution)
    }

    /// Creates a noise source with explicit options.
    #[must_use]
    pub fn with_options(algorithm: NoiseAlgorithm, options: NoiseOptions, resolution: f64) -> Self {
        let resolution = if resolution > 0.0 { resolution } else { 1.0 };
        match algorithm {
            NoiseAlgorithm::Perlin => Self::Perlin(PerlinNoise::new(options, resolution)),
            NoiseAlgorithm::RidgedMulti => {
                Self::RidgedMulti(RidgedMultiNoise::new(options, resolution))
            }
            NoiseAlgorithm::Billow => Self::Billow(BillowNoise::new(options, resolution)),
            NoiseAlgorithm::Worley => Self::Worley(WorleyNoise::new(options, resolution)),
            NoiseAlgorithm::Random => Self::Random(RandomNoise::new(options)),
        }
    }

    /// Wraps this source in a shareable handle.
    #[must_use]
    pub fn into_shared(self) -> SharedNoise {
        Rc::new(RefCell::new(self))
    }

    /// Returns the algorithm family of this source.
    #[must_use]
    pub const fn algorithm(&self) -> NoiseAlgorithm {
        match self {
            Self::Perlin(_) => NoiseAlgorithm::Perlin,
            Self::RidgedMulti(_) => NoiseAlgorithm::RidgedMulti,
            Self::Billow(_) => NoiseAlgorithm::Billow,
            Self::Worley(_) => NoiseAlgorithm::Worley,
            Self::Random(_) => NoiseAlgorithm::Random,
        }
    }

    /// Samples the field at a world coordinate.
    #[must_use]
    pub fn value(&self, x: f64, y: f64, z: f64) -> f64 {
        match self {
            Self::Perlin(n) => n.module.get(scaled(x, y, z, n.resolution)),
            Self::RidgedMulti(n) => n.module.get(scaled(x, y, z, n.resolution)),
            Self::Billow(n) => n.module.get(scaled(x, y, z, n.resolution)),
            Self::Worley(n) => n.module.get(scaled(x, y, z, n.resolution)),
            Self::Random(n) => n.rng.borrow_mut().gen::<f64>(),
        }
    }

    /// Returns the active options.
    #[must_use]
    pub fn options(&self) -> NoiseOptions {
        match self {
            Self::Perlin(n) => n.options,
            Self::RidgedMulti(n) => n.options,
            Self::Billow(n) => n.options,
            Self::Worley(n) => n.options,
            Self::Random(n) => n.options,
        }
    }

    /// Replaces the options wholesale and rebuilds the underlying module.
    pub fn set_options(&mut self, options: NoiseOptions) {
        match self {
            Self::Perlin(n) => n.set_options(options),
            Self::RidgedMulti(n) => n.set_options(options),
            Self::Billow(n) => n.set_options(options),
            Self::Worley(n) => n.set_options(options),
            Self::Random(n) => n.set_options(options),
        }
    }

    /// Restores the family defaults.
    pub fn reset_options(&mut self) {
        self.set_options(self.algorithm().default_options());
    }
}

impl fmt::Debug for NoiseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoiseSource")
            .field("algorithm", &self.algorithm())
            .field("options", &self.options())
            .finish()
    }
}

#[inline]
fn scaled(x: f64, y: f64, z: f64, resolution: f64) -> [f64; 3] {
    [x / resolution, y / resolution, z / resolution]
}
