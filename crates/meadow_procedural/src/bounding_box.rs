//! Axis-aligned cube bounding volumes.
//!
//! Used by the quadtree to decide which parts of a tile lie near an
//! observer.

/// Axis-aligned bounding cube.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundingBox {
    /// Center of the cube.
    center: [f32; 3],
    /// Distance from the center to each face (half the edge length).
    extents: f32,
}

impl BoundingBox {
    /// Creates a cube around `center` with half edge length `extents`.
    #[must_use]
    pub const fn new(center: [f32; 3], extents: f32) -> Self {
        Self { center, extents }
    }

    /// Returns the center of the cube.
    #[must_use]
    pub const fn center(&self) -> [f32; 3] {
        self.center
    }

    /// Returns the half edge length.
    #[must_use]
    pub const fn extents(&self) -> f32 {
        self.extents
    }

    /// Returns true if `point` lies inside or on the cube.
    #[must_use]
    pub fn contains_point(&self, point: [f32; 3]) -> bool {
        (0..3).all(|axis| (point[axis] - self.center[axis]).abs() <= self.extents)
    }

    /// Tests whether a sphere touches the cube.
    ///
    /// Sums the squared distance from the sphere center to the cube along
    /// each axis and compares it with the squared radius, so no square root
    /// is taken.
    #[must_use]
    pub fn intersects_with_sphere(&self, sphere: [f32; 3], radius: f32) -> bool {
        let mut distance = 0.0;

        for axis in 0..3 {
            let min = self.center[axis] - self.extents;
            let max = self.center[axis] + self.extents;

            if sphere[axis] < min {
                let s = sphere[axis] - min;
                distance += s * s;
            } else if sphere[axis] > max {
                let s = sphere[axis] - max;
                distance += s * s;
            }
        }

        distance <= radius * radius
    }
}
