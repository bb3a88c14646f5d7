//! # Terrain Tiles
//!
//! A tile is a square patch of `tile_width` cells whose vertex heights are
//! sampled from a noise source. Tiles are the unit of streaming: the tile
//! manager keeps nine of them around the observer and recycles the ones that
//! fall out of the window by moving them to new coordinates.
//!
//! ## Coordinates
//!
//! Tile `(x, z)` covers world positions `x * W ..= (x + 1) * W` (same for z).
//! Neighboring tiles share their edge vertices, and because heights are
//! sampled at absolute world coordinates the shared vertices are identical.
//!
//! ## Buffers
//!
//! - terrain vertices, `(W + 1)^2`, row-major
//! - terrain indices from the quadtree at its finest level
//! - river courses, as vertex index sequences
//! - sea plane vertices, reusing the terrain index buffer

use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use bytemuck::{Pod, Zeroable};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::trace;

use crate::bounding_box::BoundingBox;
use crate::config::TerrainConfig;
use crate::error::TerrainResult;
use crate::noise_source::SharedNoise;
use crate::quadtree::Quadtree;
use crate::render::{RenderHandle, SeaMesh, TileMesh, TileRenderer};

/// Color of the sea plane.
pub const SEA_COLOR: [f32; 3] = [0.1, 0.3, 0.7];

/// Spatial frequency of the sea ripple.
const SEA_RIPPLE_FREQUENCY: f32 = 0.5;

static NEXT_TILE_ID: AtomicU32 = AtomicU32::new(0);

/// Interleaved vertex as uploaded to the renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex {
    /// World-space position.
    pub position: [f32; 3],
    /// Linear RGB color.
    pub color: [f32; 3],
}

/// Layout of one vertex attribute inside [`Vertex`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Shader input location.
    pub location: u32,
    /// Number of `f32` components.
    pub components: u32,
    /// Byte offset from the start of the vertex.
    pub offset: usize,
}

impl Vertex {
    /// Size of one vertex in bytes.
    pub const STRIDE: usize = std::mem::size_of::<Self>();

    /// Returns the position and color attribute layouts.
    #[must_use]
    pub const fn attributes() -> [VertexAttribute; 2] {
        [
            VertexAttribute {
                location: 0,
                components: 3,
                offset: 0,
            },
            VertexAttribute {
                location: 2,
                components: 3,
                offset: std::mem::size_of::<[f32; 3]>(),
            },
        ]
    }
}

/// Tile coordinate in the tile grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// X coordinate (in tiles).
    pub x: i32,
    /// Z coordinate (in tiles).
    pub z: i32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Returns the largest tile coordinate magnitude for `tile_width`.
    ///
    /// Every vertex of a tile within the bound, and of its window neighbors,
    /// has a world coordinate that fits in `i32`.
    #[inline]
    #[must_use]
    pub const fn limit(tile_width: u32) -> i32 {
        let width = if tile_width == 0 { 1 } else { tile_width as i32 };
        i32::MAX / width - 2
    }

    /// Returns the tile containing a world position.
    ///
    /// Positions beyond [`TileCoord::limit`] tiles from the origin are
    /// clamped to the outermost tile.
    #[inline]
    #[must_use]
    pub fn from_world_pos(world_x: f32, world_z: f32, tile_width: u32) -> Self {
        let width = tile_width.max(1) as f32;
        let limit = Self::limit(tile_width);
        let clamp = |v: f32| ((v / width).floor() as i32).clamp(-limit, limit);
        Self {
            x: clamp(world_x),
            z: clamp(world_z),
        }
    }

    /// Returns the world X coordinate of the tile's origin.
    #[inline]
    #[must_use]
    pub const fn world_x(self, tile_width: u32) -> i32 {
        self.x.saturating_mul(tile_width as i32)
    }

    /// Returns the world Z coordinate of the tile's origin.
    #[inline]
    #[must_use]
    pub const fn world_z(self, tile_width: u32) -> i32 {
        self.z.saturating_mul(tile_width as i32)
    }
}

/// Height band a vertex falls into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HeightZone {
    /// Below the beach line.
    Water = 0,
    /// Thin strip above the water.
    Beach = 1,
    /// Grass and forest.
    Forest = 2,
    /// Bare rock.
    Rock = 3,
    /// Peaks.
    Snow = 4,
}

impl HeightZone {
    /// Classifies a height given as a fraction of the maximum mesh height.
    #[must_use]
    pub fn classify(ratio: f32) -> Self {
        if ratio > 0.9 {
            Self::Snow
        } else if ratio > 0.6 {
            Self::Rock
        } else if ratio > 0.15 {
            Self::Forest
        } else if ratio > 0.1 {
            Self::Beach
        } else {
            Self::Water
        }
    }

    /// Returns the vertex color of this zone.
    #[must_use]
    pub const fn color(self) -> [f32; 3] {
        match self {
            Self::Water => [0.15, 0.25, 0.6],
            Self::Beach => [0.85, 0.8, 0.55],
            Self::Forest => [0.2, 0.55, 0.2],
            Self::Rock => [0.45, 0.42, 0.4],
            Self::Snow => [0.95, 0.95, 0.97],
        }
    }
}

/// Stable identity of a tile across coordinate changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(pub u32);

impl TileId {
    fn next() -> Self {
        Self(NEXT_TILE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Lifecycle of a tile's renderer-side copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileState {
    /// CPU buffers changed since the last upload.
    VerticesBuilt,
    /// The renderer holds the current buffers.
    Ready,
    /// Renderer geometry was released.
    Released,
}

/// One streamed terrain tile.
pub struct Tile {
    id: TileId,
    config: Rc<TerrainConfig>,
    coord: TileCoord,
    x_offset: i32,
    z_offset: i32,
    noise: SharedNoise,
    quadtree: Quadtree,
    vertices: Vec<Vertex>,
    terrain_indices: Vec<u32>,
    river_indices: Vec<u32>,
    /// Start of each river course inside `river_indices`.
    river_starts: Vec<usize>,
    sea_vertices: Vec<Vertex>,
    sea_indices: Vec<u32>,
    sea_level: f32,
    show_sea: bool,
    state: TileState,
    render_handle: Option<RenderHandle>,
}

impl Tile {
    /// Builds the tile at `coord` with every buffer generated.
    ///
    /// # Errors
    ///
    /// Returns the configuration errors of [`TerrainConfig::validate`].
    pub fn new(
        coord: TileCoord,
        noise: SharedNoise,
        config: Rc<TerrainConfig>,
    ) -> TerrainResult<Self> {
        config.validate()?;
        let quadtree = Quadtree::new(config.tile_width)?;
        let vertex_count = config.vertex_count();
        let index_count = quadtree.index_count_of_level(config.maximum_lod());

        let mut tile = Self {
            id: TileId::next(),
            coord,
            x_offset: coord.world_x(config.tile_width),
            z_offset: coord.world_z(config.tile_width),
            noise,
            quadtree,
            vertices: Vec::with_capacity(vertex_count),
            terrain_indices: Vec::with_capacity(index_count),
            river_indices: Vec::new(),
            river_starts: Vec::new(),
            sea_vertices: Vec::with_capacity(vertex_count),
            sea_indices: Vec::with_capacity(index_count),
            sea_level: config.sea_level,
            show_sea: config.show_sea,
            state: TileState::VerticesBuilt,
            render_handle: None,
            config,
        };
        tile.regenerate();
        Ok(tile)
    }

    /// Returns the stable identity of this tile.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> TileId {
        self.id
    }

    /// Returns the tile coordinate.
    #[inline]
    #[must_use]
    pub const fn coordinates(&self) -> TileCoord {
        self.coord
    }

    /// Returns the renderer lifecycle state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> TileState {
        self.state
    }

    /// Returns true if the renderer copy is out of date.
    #[inline]
    #[must_use]
    pub fn needs_upload(&self) -> bool {
        self.state != TileState::Ready
    }

    /// Returns the renderer handle, once set up.
    #[inline]
    #[must_use]
    pub const fn render_handle(&self) -> Option<RenderHandle> {
        self.render_handle
    }

    /// Returns the noise source heights are sampled from.
    #[must_use]
    pub fn noise(&self) -> &SharedNoise {
        &self.noise
    }

    /// Returns the level-of-detail tree.
    #[must_use]
    pub const fn quadtree(&self) -> &Quadtree {
        &self.quadtree
    }

    /// Returns the terrain vertices.
    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Returns the terrain index buffer at the finest level of detail.
    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &self.terrain_indices
    }

    /// Returns an index buffer for a coarser level of detail.
    #[must_use]
    pub fn indices_of_level(&self, lod: u32) -> Vec<u32> {
        self.quadtree.indices_of_level(lod)
    }

    /// Returns every river course, concatenated.
    #[must_use]
    pub fn river_indices(&self) -> &[u32] {
        &self.river_indices
    }

    /// Returns the river courses one by one, each ordered from its spring.
    pub fn river_courses(&self) -> impl Iterator<Item = &[u32]> + '_ {
        self.river_starts.iter().enumerate().map(|(i, &start)| {
            let end = self
                .river_starts
                .get(i + 1)
                .copied()
                .unwrap_or(self.river_indices.len());
            &self.river_indices[start..end]
        })
    }

    /// Returns the sea plane vertices.
    #[must_use]
    pub fn sea_vertices(&self) -> &[Vertex] {
        &self.sea_vertices
    }

    /// Returns the sea plane index buffer.
    #[must_use]
    pub fn sea_indices(&self) -> &[u32] {
        &self.sea_indices
    }

    /// Returns the sea plane height.
    #[inline]
    #[must_use]
    pub const fn sea_level(&self) -> f32 {
        self.sea_level
    }

    /// Returns whether the sea plane is handed to the renderer.
    #[inline]
    #[must_use]
    pub const fn show_sea(&self) -> bool {
        self.show_sea
    }

    /// Moves the sea plane and rebuilds its vertices.
    pub fn set_sea_level(&mut self, sea_level: f32) {
        self.sea_level = sea_level;
        self.create_sea();
        self.state = TileState::VerticesBuilt;
    }

    /// Shows or hides the sea plane.
    pub fn set_show_sea(&mut self, show_sea: bool) {
        if self.show_sea != show_sea {
            self.show_sea = show_sea;
            self.state = TileState::VerticesBuilt;
        }
    }

    /// Returns the terrain height at tile-local grid position `(x, z)`.
    #[must_use]
    pub fn height_at(&self, x: u32, z: u32) -> Option<f32> {
        let row = self.config.vertices_per_row();
        if x >= row || z >= row {
            return None;
        }
        self.vertices
            .get((z * row + x) as usize)
            .map(|vertex| vertex.position[1])
    }

    /// Returns the world-space bounds of the tile.
    #[must_use]
    pub fn bounding_box(&self) -> BoundingBox {
        let half = self.config.tile_width as f32 / 2.0;
        let half_height = self.config.max_mesh_height / 2.0;
        BoundingBox::new(
            [
                self.x_offset as f32 + half,
                half_height,
                self.z_offset as f32 + half,
            ],
            half.max(half_height),
        )
    }

    /// Moves the tile to `coord` and regenerates it.
    ///
    /// The quadtree and buffer capacity are kept.
    pub fn update_coordinates(&mut self, coord: TileCoord) {
        self.coord = coord;
        self.x_offset = coord.world_x(self.config.tile_width);
        self.z_offset = coord.world_z(self.config.tile_width);
        self.regenerate();
    }

    /// Switches the noise source and regenerates the tile in place.
    pub fn update_algorithm(&mut self, noise: SharedNoise) {
        self.noise = noise;
        self.regenerate();
    }

    /// Rebuilds every buffer from the current coordinates and noise source.
    pub fn regenerate(&mut self) {
        self.create_vertices();
        self.create_terrain();
        self.create_river();
        self.create_sea();
        self.state = TileState::VerticesBuilt;
        trace!(
            "Tile {} generated at ({}, {}) with {} river vertices",
            self.id.0, self.coord.x, self.coord.z, self.river_indices.len()
        );
    }

    /// Returns the buffers the renderer should draw.
    #[must_use]
    pub fn mesh(&self) -> TileMesh<'_> {
        TileMesh {
            terrain_vertices: &self.vertices,
            terrain_indices: &self.terrain_indices,
            river_indices: &self.river_indices,
            sea: self.show_sea.then(|| SeaMesh {
                vertices: &self.sea_vertices,
                indices: &self.sea_indices,
            }),
        }
    }

    /// Hands the current buffers to the renderer.
    ///
    /// The first call creates geometry, later calls update it in place.
    pub fn setup<R: TileRenderer + ?Sized>(&mut self, renderer: &mut R) -> RenderHandle {
        let handle = {
            let mesh = self.mesh();
            match self.render_handle {
                Some(handle) => {
                    renderer.update_geometry(handle, &mesh);
                    handle
                }
                None => renderer.create_geometry(&mesh),
            }
        };
        self.render_handle = Some(handle);
        self.state = TileState::Ready;
        handle
    }

    /// Releases the renderer geometry. CPU buffers stay intact.
    pub fn cleanup<R: TileRenderer + ?Sized>(&mut self, renderer: &mut R) {
        if let Some(handle) = self.render_handle.take() {
            renderer.release_geometry(handle);
        }
        self.state = TileState::Released;
    }

    fn create_vertices(&mut self) {
        let row = self.config.vertices_per_row() as i32;
        let max_height = self.config.max_mesh_height;
        let noise = self.noise.borrow();

        self.vertices.clear();
        for z in 0..row {
            for x in 0..row {
                let world_x = self.x_offset.saturating_add(x);
                let world_z = self.z_offset.saturating_add(z);
                let value = noise.value(f64::from(world_x), 0.0, f64::from(world_z));
                let height = height_from_noise(value, max_height);

                self.vertices.push(Vertex {
                    position: [world_x as f32, height, world_z as f32],
                    color: HeightZone::classify(height / max_height).color(),
                });
            }
        }
    }

    fn create_terrain(&mut self) {
        self.terrain_indices.clear();
        self.quadtree
            .append_indices_of_level(self.config.maximum_lod(), &mut self.terrain_indices);
    }

    fn create_river(&mut self) {
        self.river_indices.clear();
        self.river_starts.clear();

        let Some(first) = self.vertices.first() else {
            return;
        };
        if self.config.rivers_per_tile == 0 || self.config.maximum_river_length == 0 {
            return;
        }

        let threshold = self.config.minimum_height_of_river_spring();
        let mut springs: Vec<usize> = self
            .vertices
            .iter()
            .enumerate()
            .filter(|(_, vertex)| vertex.position[1] > threshold)
            .map(|(i, _)| i)
            .collect();

        // Same tile content, same rivers.
        let mut rng = ChaCha8Rng::seed_from_u64(u64::from(first.position[1].to_bits()));
        springs.shuffle(&mut rng);

        let row = self.config.vertices_per_row() as usize;
        for &spring in springs.iter().take(self.config.rivers_per_tile) {
            let start = self.river_indices.len();
            self.river_starts.push(start);

            let mut current = spring;
            loop {
                self.river_indices.push(current as u32);
                if self.river_indices.len() - start >= self.config.maximum_river_length {
                    break;
                }
                match lowest_neighbor(&self.vertices, row, current, &self.river_indices[start..]) {
                    Some(next) => current = next,
                    None => break,
                }
            }
        }
    }

    fn create_sea(&mut self) {
        let amplitude = self.config.sea_wave_amplitude;

        self.sea_vertices.clear();
        for vertex in &self.vertices {
            let [x, _, z] = vertex.position;
            let ripple = amplitude
                * (x * SEA_RIPPLE_FREQUENCY).sin()
                * (z * SEA_RIPPLE_FREQUENCY).cos();
            self.sea_vertices.push(Vertex {
                position: [x, self.sea_level + ripple, z],
                color: SEA_COLOR,
            });
        }

        self.sea_indices.clear();
        self.sea_indices.extend_from_slice(&self.terrain_indices);
    }
}

impl std::fmt::Debug for Tile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tile")
            .field("id", &self.id)
            .field("coord", &self.coord)
            .field("state", &self.state)
            .field("vertices", &self.vertices.len())
            .field("rivers", &self.river_starts.len())
            .finish_non_exhaustive()
    }
}

/// Maps a noise value in `[-1, 1]` to `[0, max_height]`.
#[inline]
#[must_use]
pub fn height_from_noise(value: f64, max_height: f32) -> f32 {
    ((value.clamp(-1.0, 1.0) + 1.0) / 2.0) as f32 * max_height
}

/// Picks the next vertex of a river course.
///
/// Returns `None` on the tile border, where the river leaves the tile, and
/// when every unvisited neighbor is higher than `current`.
fn lowest_neighbor(vertices: &[Vertex], row: usize, current: usize, visited: &[u32]) -> Option<usize> {
    let x = current % row;
    let z = current / row;
    if x == 0 || z == 0 || x + 1 == row || z + 1 == row {
        return None;
    }

    let height = vertices[current].position[1];
    // Neighbors along the triangle edges of the grid.
    let neighbors = [
        current - row - 1,
        current - row,
        current - 1,
        current + 1,
        current + row,
        current + row + 1,
    ];

    let mut lowest: Option<(usize, f32)> = None;
    for next in neighbors {
        if visited.contains(&(next as u32)) {
            continue;
        }
        let next_height = vertices[next].position[1];
        if next_height <= height && lowest.map_or(true, |(_, h)| next_height < h) {
            lowest = Some((next, next_height));
        }
    }
    lowest.map(|(next, _)| next)
}
