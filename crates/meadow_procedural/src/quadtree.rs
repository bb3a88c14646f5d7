//! # Level-of-Detail Quadtree
//!
//! Partitions the vertex grid of one tile into quads so that an index buffer
//! for any level of detail can be read off the tree.
//!
//! ## Layout
//!
//! A tile of width `W` has `(W + 1) * (W + 1)` vertices in row-major order
//! (`index = z * (W + 1) + x`). The root (level 0) spans the whole tile; each
//! level halves the quad size until level `log2(W)`, where every quad is a
//! single grid cell.
//!
//! ```text
//! +---x
//! |
//! |   tl_tr   Each quad is split into two counterclockwise triangles:
//! z   |\  |   left:  TL -> BL -> BR
//!     | \ |   right: TL -> BR -> TR
//!     |__\|
//!     bl br
//! ```
//!
//! Children are stored NW, SW, SE, NE.
//!
//! The tree depends only on the tile width, never on heights or tile
//! position, so one tree serves a tile for its whole lifetime.

use crate::bounding_box::BoundingBox;
use crate::config::MAX_TILE_WIDTH;
use crate::error::{TerrainError, TerrainResult};

/// Number of indices in a node (two triangles).
pub const INDICES_PER_NODE: usize = 6;

/// One node of the level-of-detail quadtree.
#[derive(Debug, Clone)]
pub struct Quadtree {
    /// Depth of this node; the root is level 0.
    level: u32,
    /// Finest level of the tree, `log2(tile_width)`.
    maximum_lod: u32,
    /// Vertex index of the top-left corner.
    startpoint: u32,
    /// Two triangles covering this node's quad.
    indices: [u32; INDICES_PER_NODE],
    /// Tile-local bounds of the quad.
    bounding_box: BoundingBox,
    /// NW, SW, SE, NE children; `None` at the finest level.
    children: Option<Box<[Quadtree; 4]>>,
}

impl Quadtree {
    /// Builds the full tree for a tile of the given width.
    ///
    /// # Errors
    ///
    /// Returns `TileWidthNotPowerOfTwo` if the grid cannot be halved down to
    /// single cells, or `InvalidConfig` if the width is too large for `u32`
    /// vertex indices.
    pub fn new(tile_width: u32) -> TerrainResult<Self> {
        Self::node(tile_width, 0, 0)
    }

    /// Builds the subtree rooted at `level` whose top-left vertex is
    /// `startpoint`.
    ///
    /// # Errors
    ///
    /// Same as [`Quadtree::new`], plus `InvalidConfig` if `level` is deeper
    /// than `log2(tile_width)`.
    pub fn node(tile_width: u32, level: u32, startpoint: u32) -> TerrainResult<Self> {
        if !tile_width.is_power_of_two() {
            return Err(TerrainError::TileWidthNotPowerOfTwo(tile_width));
        }
        if tile_width > MAX_TILE_WIDTH {
            return Err(TerrainError::InvalidConfig(format!(
                "tile_width {tile_width} exceeds {MAX_TILE_WIDTH}"
            )));
        }

        let maximum_lod = tile_width.trailing_zeros();
        if level > maximum_lod {
            return Err(TerrainError::InvalidConfig(format!(
                "quadtree level {level} is deeper than maximum lod {maximum_lod}"
            )));
        }

        Ok(Self::build(tile_width + 1, maximum_lod, level, startpoint))
    }

    fn build(row: u32, maximum_lod: u32, level: u32, startpoint: u32) -> Self {
        // Root spans the tile, the finest level spans one cell.
        let offset = 1u32 << (maximum_lod - level);

        let tl = startpoint;
        let tr = tl + offset;
        let bl = tl + row * offset;
        let br = bl + offset;

        let half = offset as f32 / 2.0;
        let bounding_box = BoundingBox::new(
            [(tl % row) as f32 + half, 0.0, (tl / row) as f32 + half],
            half,
        );

        let children = (level < maximum_lod).then(|| {
            let step = offset / 2;
            let next = level + 1;
            let nw = tl;
            let sw = tl + row * step;
            let se = sw + step;
            let ne = tl + step;

            Box::new([
                Self::build(row, maximum_lod, next, nw),
                Self::build(row, maximum_lod, next, sw),
                Self::build(row, maximum_lod, next, se),
                Self::build(row, maximum_lod, next, ne),
            ])
        });

        Self {
            level,
            maximum_lod,
            startpoint,
            indices: [tl, bl, br, tl, br, tr],
            bounding_box,
            children,
        }
    }

    /// Returns the depth of this node.
    #[inline]
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Returns the finest level of the tree.
    #[inline]
    #[must_use]
    pub const fn maximum_lod(&self) -> u32 {
        self.maximum_lod
    }

    /// Returns the vertex index of the top-left corner.
    #[inline]
    #[must_use]
    pub const fn startpoint(&self) -> u32 {
        self.startpoint
    }

    /// Returns true if this node has no children.
    #[inline]
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Returns the children in NW, SW, SE, NE order (empty for a leaf).
    #[must_use]
    pub fn children(&self) -> &[Quadtree] {
        match &self.children {
            Some(children) => children.as_slice(),
            None => &[],
        }
    }

    /// Returns this node's own two triangles.
    #[inline]
    #[must_use]
    pub const fn indices(&self) -> &[u32; INDICES_PER_NODE] {
        &self.indices
    }

    /// Returns the tile-local bounds of this node.
    #[inline]
    #[must_use]
    pub const fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    /// Returns the index buffer for level of detail `lod`.
    ///
    /// Level 0 is a single quad; `maximum_lod` is one quad per grid cell.
    /// Values above `maximum_lod` yield the finest level, values at or below
    /// this node's own level yield just this node.
    #[must_use]
    pub fn indices_of_level(&self, lod: u32) -> Vec<u32> {
        let mut indices = Vec::with_capacity(self.index_count_of_level(lod));
        self.append_indices_of_level(lod, &mut indices);
        indices
    }

    /// Appends the index buffer for `lod` to `out`.
    pub fn append_indices_of_level(&self, lod: u32, out: &mut Vec<u32>) {
        match &self.children {
            Some(children) if self.level < lod => {
                for child in children.iter() {
                    child.append_indices_of_level(lod, out);
                }
            }
            _ => out.extend_from_slice(&self.indices),
        }
    }

    /// Returns the number of indices `indices_of_level(lod)` produces.
    #[must_use]
    pub fn index_count_of_level(&self, lod: u32) -> usize {
        let depth = lod.clamp(self.level, self.maximum_lod) - self.level;
        INDICES_PER_NODE << (2 * depth)
    }

    /// Returns the index buffer for `lod`, limited to quads whose bounds touch
    /// the sphere at `center` (tile-local coordinates) with `radius`.
    #[must_use]
    pub fn visible_indices_of_level(&self, lod: u32, center: [f32; 3], radius: f32) -> Vec<u32> {
        let mut indices = Vec::new();
        self.append_visible(lod, center, radius, &mut indices);
        indices
    }

    fn append_visible(&self, lod: u32, center: [f32; 3], radius: f32, out: &mut Vec<u32>) {
        if !self.bounding_box.intersects_with_sphere(center, radius) {
            return;
        }
        match &self.children {
            Some(children) if self.level < lod => {
                for child in children.iter() {
                    child.append_visible(lod, center, radius, out);
                }
            }
            _ => out.extend_from_slice(&self.indices),
        }
    }
}
