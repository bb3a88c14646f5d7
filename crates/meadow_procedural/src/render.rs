//! # Renderer Boundary
//!
//! The terrain core never talks to a graphics API. Tiles hand their buffers
//! to a [`TileRenderer`], which owns whatever GPU objects back them.
//!
//! ## Contract
//!
//! - `create_geometry` is called once per tile, the first time it is set up.
//! - `update_geometry` is called with the same handle every time the tile's
//!   content changes afterwards. Tiles are recycled, so a handle lives for the
//!   whole session even though the terrain it shows changes.
//! - `release_geometry` is called once, when the tile is cleaned up.
//!
//! Vertex buffers are interleaved `[position: 3 x f32, color: 3 x f32]`, see
//! [`Vertex::attributes`].

use std::collections::HashMap;

use crate::tile::Vertex;

/// Opaque identifier of renderer-side geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderHandle(pub u32);

/// Sea plane buffers.
#[derive(Clone, Copy, Debug)]
pub struct SeaMesh<'a> {
    /// Sea vertices, same layout as terrain vertices.
    pub vertices: &'a [Vertex],
    /// Triangle list over `vertices`.
    pub indices: &'a [u32],
}

/// Everything a renderer needs to draw one tile.
#[derive(Clone, Copy, Debug)]
pub struct TileMesh<'a> {
    /// Terrain vertices, row-major.
    pub terrain_vertices: &'a [Vertex],
    /// Triangle list over `terrain_vertices`.
    pub terrain_indices: &'a [u32],
    /// River courses as vertex index sequences into `terrain_vertices`.
    pub river_indices: &'a [u32],
    /// Sea plane, present only while the sea is shown.
    pub sea: Option<SeaMesh<'a>>,
}

impl TileMesh<'_> {
    /// Returns the terrain vertex buffer as raw bytes for upload.
    #[must_use]
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.terrain_vertices)
    }

    /// Returns the terrain index buffer as raw bytes for upload.
    #[must_use]
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.terrain_indices)
    }

    /// Returns the total number of bytes this mesh uploads.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        let sea = self.sea.map_or(0, |sea| {
            std::mem::size_of_val(sea.vertices) + std::mem::size_of_val(sea.indices)
        });
        self.vertex_bytes().len()
            + self.index_bytes().len()
            + std::mem::size_of_val(self.river_indices)
            + sea
    }
}

/// Receives tile geometry.
pub trait TileRenderer {
    /// Allocates geometry for a tile seen for the first time.
    fn create_geometry(&mut self, mesh: &TileMesh<'_>) -> RenderHandle;

    /// Replaces the content of existing geometry.
    fn update_geometry(&mut self, handle: RenderHandle, mesh: &TileMesh<'_>);

    /// Frees geometry. The handle is not used again.
    fn release_geometry(&mut self, handle: RenderHandle);
}

/// Sizes of the last upload to one handle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UploadRecord {
    /// Number of terrain vertices.
    pub vertex_count: usize,
    /// Number of terrain indices.
    pub index_count: usize,
    /// Number of river indices.
    pub river_index_count: usize,
    /// Number of sea indices, `None` if the sea was hidden.
    pub sea_index_count: Option<usize>,
    /// How many times this handle was written.
    pub uploads: u32,
}

/// Counters over the lifetime of a renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Geometry allocations.
    pub created: u32,
    /// Geometry re-uploads.
    pub updated: u32,
    /// Geometry releases.
    pub released: u32,
    /// Total bytes handed over.
    pub bytes_uploaded: u64,
}

/// Renderer that keeps upload records in memory instead of drawing.
///
/// Used by the headless driver and by tests to observe what the terrain core
/// would have sent to the GPU.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    next_handle: u32,
    buffers: HashMap<RenderHandle, UploadRecord>,
    stats: RenderStats,
}

impl HeadlessRenderer {
    /// Creates an empty renderer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lifetime counters.
    #[must_use]
    pub const fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Returns the last upload to `handle`, if it is live.
    #[must_use]
    pub fn record(&self, handle: RenderHandle) -> Option<&UploadRecord> {
        self.buffers.get(&handle)
    }

    /// Returns the number of live geometry handles.
    #[must_use]
    pub fn live_geometry(&self) -> usize {
        self.buffers.len()
    }

    fn write(&mut self, handle: RenderHandle, mesh: &TileMesh<'_>) {
        let record = self.buffers.entry(handle).or_default();
        record.vertex_count = mesh.terrain_vertices.len();
        record.index_count = mesh.terrain_indices.len();
        record.river_index_count = mesh.river_indices.len();
        record.sea_index_count = mesh.sea.map(|sea| sea.indices.len());
        record.uploads += 1;
        self.stats.bytes_uploaded += mesh.byte_size() as u64;
    }
}

impl TileRenderer for HeadlessRenderer {
    fn create_geometry(&mut self, mesh: &TileMesh<'_>) -> RenderHandle {
        let handle = RenderHandle(self.next_handle);
        self.next_handle += 1;
        self.stats.created += 1;
        self.write(handle, mesh);
        handle
    }

    fn update_geometry(&mut self, handle: RenderHandle, mesh: &TileMesh<'_>) {
        self.stats.updated += 1;
        self.write(handle, mesh);
    }

    fn release_geometry(&mut self, handle: RenderHandle) {
        if self.buffers.remove(&handle).is_some() {
            self.stats.released += 1;
        }
    }
}
