//! # Terrain Error Types
//!
//! All errors that can occur while configuring or streaming terrain.
//!
//! Every input except configuration is generated internally. A river
//! running off the edge of its tile is a normal end of the walk, not an
//! error.

use thiserror::Error;

/// Errors that can occur in the terrain system.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TerrainError {
    /// The tile width cannot be partitioned by a quadtree.
    #[error("tile width {0} is not a power of two")]
    TileWidthNotPowerOfTwo(u32),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration file could not be read.
    #[error("failed to read configuration {path}: {reason}")]
    ConfigRead {
        /// Path of the file.
        path: String,
        /// Underlying I/O error message.
        reason: String,
    },

    /// The configuration file is not valid TOML for `TerrainConfig`.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(String),

    /// No noise algorithm is registered under this identifier.
    #[error("unknown noise algorithm: {0}")]
    UnknownAlgorithm(String),

    /// Window slots are numbered 0..9.
    #[error("tile slot {0} is outside the 3x3 window")]
    SlotOutOfRange(usize),
}

/// Result type for terrain operations.
pub type TerrainResult<T> = Result<T, TerrainError>;
