//! # Meadow Procedural Terrain
//!
//! Infinite, tile-based terrain streamed around a moving observer.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: the same options always produce the same terrain
//! 2. **Seamless**: neighboring tiles sample shared edges at identical world coordinates
//! 3. **Recycled**: the nine window tiles are allocated once and regenerated in place
//! 4. **Renderer-agnostic**: geometry leaves the crate through [`TileRenderer`]
//!
//! ## Core Components
//!
//! - `NoiseSource`: Perlin, ridged multifractal, billow, worley and random fields
//! - `Quadtree`: level-of-detail index buffers over a tile's vertex grid
//! - `BoundingBox`: cube/sphere intersection for quadtree nodes
//! - `Tile`: heightmap, colors, rivers and sea plane of one tile
//! - `TileManager`: the 3x3 sliding window and algorithm switching
//!
//! ## Example
//!
//! ```rust,ignore
//! use meadow_procedural::{HeadlessRenderer, TerrainConfig, TileManager};
//!
//! let mut manager = TileManager::new(TerrainConfig::default(), [0.0, 0.0])?;
//! let mut renderer = HeadlessRenderer::new();
//!
//! // Observer walks east into the next tile
//! manager.update([70.0, 0.0]);
//! manager.upload(&mut renderer);
//!
//! manager.set_tile_algorithm_by_name("ridged_multi")?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]

pub mod bounding_box;
pub mod config;
pub mod error;
pub mod noise_source;
pub mod quadtree;
pub mod render;
pub mod tile;
pub mod tile_manager;

pub use bounding_box::BoundingBox;
pub use config::{NoiseDefaults, TerrainConfig, MAX_TILE_WIDTH};
pub use error::{TerrainError, TerrainResult};
pub use noise_source::{NoiseAlgorithm, NoiseOptions, NoiseSource, SharedNoise};
pub use quadtree::{Quadtree, INDICES_PER_NODE};
pub use render::{HeadlessRenderer, RenderHandle, RenderStats, SeaMesh, TileMesh, TileRenderer};
pub use tile::{HeightZone, Tile, TileCoord, TileId, TileState, Vertex, VertexAttribute};
pub use tile_manager::{TileManager, WindowShift, CENTER_SLOT, WINDOW_SIZE, WINDOW_WIDTH};
