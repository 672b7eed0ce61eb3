//! Axis-aligned bounding boxes
//!
//! Broad-phase geometry for the octree: growing a box around inserted
//! triangles, splitting a cell into octants, and cheap overlap tests against
//! rays, spheres, capsules and triangles.

use crate::foundation::math::{utils, Vec3};
use crate::physics::collision::{Capsule, Ray, Sphere, Triangle};

/// Relative slack on separating-axis tests so boundary triangles are kept
const SAT_TOLERANCE: f32 = 1e-6;

/// Axis-Aligned Bounding Box for spatial queries
///
/// An empty box has `min = +inf` and `max = -inf`, so expanding it by any
/// point yields a box around exactly that point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Default for AABB {
    fn default() -> Self {
        Self::empty()
    }
}

impl AABB {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an empty AABB that contains nothing
    pub fn empty() -> Self {
        Self {
            min: Vec3::repeat(f32::INFINITY),
            max: Vec3::repeat(f32::NEG_INFINITY),
        }
    }

    /// Whether the box contains no points
    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y || self.max.z < self.min.z
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Get the full size of the AABB
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Grow the box to include a point
    pub fn expand_by_point(&mut self, point: &Vec3) {
        self.min = utils::component_min(&self.min, point);
        self.max = utils::component_max(&self.max, point);
    }

    /// Grow the box to include all three vertices of a triangle
    pub fn expand_by_triangle(&mut self, triangle: &Triangle) {
        self.expand_by_point(&triangle.a);
        self.expand_by_point(&triangle.b);
        self.expand_by_point(&triangle.c);
    }

    /// Copy of the box pushed outward by `margin` on every face
    ///
    /// An empty box stays empty.
    pub fn expanded(&self, margin: f32) -> Self {
        if self.is_empty() {
            return *self;
        }
        let offset = Vec3::repeat(margin);
        Self::new(self.min - offset, self.max + offset)
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &AABB) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Box of one octant of this box
    ///
    /// Octant layout (bit 0 = +X, bit 1 = +Y, bit 2 = +Z):
    /// 0: -X, -Y, -Z ... 7: +X, +Y, +Z
    pub fn octant(&self, index: usize) -> Self {
        let half = self.size() * 0.5;
        let offset = Vec3::new(
            if index & 1 != 0 { half.x } else { 0.0 },
            if index & 2 != 0 { half.y } else { 0.0 },
            if index & 4 != 0 { half.z } else { 0.0 },
        );
        let min = self.min + offset;
        Self::new(min, min + half)
    }

    /// Check if a sphere overlaps this box
    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        if self.is_empty() {
            return false;
        }
        let closest_point = Vec3::new(
            sphere.center.x.clamp(self.min.x, self.max.x),
            sphere.center.y.clamp(self.min.y, self.max.y),
            sphere.center.z.clamp(self.min.z, self.max.z),
        );
        (closest_point - sphere.center).magnitude_squared() <= sphere.radius * sphere.radius
    }

    /// Conservative capsule overlap: the capsule's own bounding box against this one
    pub fn intersects_capsule(&self, capsule: &Capsule) -> bool {
        if self.is_empty() {
            return false;
        }
        let mut bounds = Self::empty();
        bounds.expand_by_point(&capsule.start);
        bounds.expand_by_point(&capsule.end);
        self.intersects(&bounds.expanded(capsule.radius))
    }

    /// Test ray intersection with this AABB using the slab method
    ///
    /// Returns the distance parameter of the entry point (0 if the origin is
    /// inside), or `None` if the ray misses. Axes the ray does not move along
    /// reduce to an interval check on the origin.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        if self.is_empty() {
            return None;
        }

        let mut tmin = f32::NEG_INFINITY;
        let mut tmax = f32::INFINITY;

        for axis in 0..3 {
            let origin = ray.origin[axis];
            let direction = ray.direction[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if direction == 0.0 {
                if origin < lo || origin > hi {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / direction;
            let t1 = (lo - origin) * inv;
            let t2 = (hi - origin) * inv;
            tmin = tmin.max(t1.min(t2));
            tmax = tmax.min(t1.max(t2));
        }

        // Ray intersects if tmax >= tmin and tmax >= 0
        if tmax >= tmin && tmax >= 0.0 {
            Some(tmin.max(0.0))
        } else {
            None
        }
    }

    /// Separating-axis test between this box and a triangle
    ///
    /// Tests the nine edge/axis cross products, the three box face normals
    /// and the triangle normal. Touching counts as overlapping, with a small
    /// tolerance so triangles lying on a cell boundary land on both sides.
    /// A NaN projection counts as separating, so NaN or infinite vertices
    /// never land in a cell.
    pub fn intersects_triangle(&self, triangle: &Triangle) -> bool {
        if self.is_empty() {
            return false;
        }

        let center = self.center();
        let extents = self.extents();

        let v0 = triangle.a - center;
        let v1 = triangle.b - center;
        let v2 = triangle.c - center;

        let f0 = v1 - v0;
        let f1 = v2 - v1;
        let f2 = v0 - v2;

        let separated = |axis: &Vec3| -> bool {
            let r = extents.x * axis.x.abs() + extents.y * axis.y.abs() + extents.z * axis.z.abs();
            let p0 = v0.dot(axis);
            let p1 = v1.dot(axis);
            let p2 = v2.dot(axis);
            let max = p0.max(p1).max(p2);
            let min = p0.min(p1).min(p2);
            let gap = (-max).max(min);
            let limit = r + SAT_TOLERANCE * (1.0 + r);
            gap.is_nan() || limit.is_nan() || gap > limit
        };

        for edge in [f0, f1, f2] {
            let axes = [
                Vec3::new(0.0, -edge.z, edge.y),
                Vec3::new(edge.z, 0.0, -edge.x),
                Vec3::new(-edge.y, edge.x, 0.0),
            ];
            if axes.iter().any(|axis| separated(axis)) {
                return false;
            }
        }

        if [Vec3::x(), Vec3::y(), Vec3::z()].iter().any(|axis| separated(axis)) {
            return false;
        }

        !separated(&f0.cross(&f1))
    }
}
