//! Primitive collision shapes
//!
//! Provides basic geometric primitives (rays, planes, segments, triangles,
//! spheres, capsules) and the point-level operations on them.

use crate::foundation::math::{utils, Vec3};

/// A ray for ray casting
///
/// The direction is stored as given; a zero direction is a valid value that
/// every query treats as "hits nothing".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// The origin point of the ray in world space
    pub origin: Vec3,
    /// The direction of the ray (any length)
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray with the given origin and direction
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Get a point along the ray at parameter t
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Copy of this ray with a unit direction, or `None` for a zero direction
    pub fn normalized(&self) -> Option<Self> {
        self.direction
            .try_normalize(f32::EPSILON)
            .map(|direction| Self { origin: self.origin, direction })
    }
}

/// Plane defined by a unit normal and signed offset from origin
///
/// Points satisfy `normal · p + constant = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal
    pub normal: Vec3,
    /// Signed offset
    pub constant: f32,
}

impl Plane {
    /// Plane through a point with the given unit normal
    pub fn from_normal_and_point(normal: Vec3, point: &Vec3) -> Self {
        Self {
            normal,
            constant: -normal.dot(point),
        }
    }

    /// Signed distance from the plane to a point
    pub fn distance_to_point(&self, point: &Vec3) -> f32 {
        self.normal.dot(point) + self.constant
    }

    /// Orthogonal projection of a point onto the plane
    pub fn project_point(&self, point: &Vec3) -> Vec3 {
        point - self.normal * self.distance_to_point(point)
    }
}

/// A line segment between two points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    /// Start point
    pub start: Vec3,
    /// End point
    pub end: Vec3,
}

impl LineSegment {
    /// Create a segment
    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self { start, end }
    }

    /// Vector from start to end
    pub fn delta(&self) -> Vec3 {
        self.end - self.start
    }

    /// Midpoint of the segment
    pub fn center(&self) -> Vec3 {
        (self.start + self.end) * 0.5
    }

    /// Point at parameter t (0 = start, 1 = end)
    pub fn at(&self, t: f32) -> Vec3 {
        utils::lerp_vec(&self.start, &self.end, t)
    }

    /// Parameter of the point on the segment closest to `point`, clamped to [0, 1]
    pub fn closest_parameter_to_point(&self, point: &Vec3) -> f32 {
        let delta = self.delta();
        let length_sq = delta.magnitude_squared();
        if length_sq <= f32::EPSILON {
            return 0.0;
        }
        utils::clamp((point - self.start).dot(&delta) / length_sq, 0.0, 1.0)
    }

    /// Point on the segment closest to `point`
    pub fn closest_point_to_point(&self, point: &Vec3) -> Vec3 {
        self.at(self.closest_parameter_to_point(point))
    }
}

/// A triangle for collision detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// First vertex
    pub a: Vec3,
    /// Second vertex
    pub b: Vec3,
    /// Third vertex
    pub c: Vec3,
}

impl Triangle {
    /// Creates a new triangle
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { a, b, c }
    }

    /// Vertices in order
    pub fn vertices(&self) -> [Vec3; 3] {
        [self.a, self.b, self.c]
    }

    /// Edges as segments: ab, bc, ca
    pub fn edges(&self) -> [LineSegment; 3] {
        [
            LineSegment::new(self.a, self.b),
            LineSegment::new(self.b, self.c),
            LineSegment::new(self.c, self.a),
        ]
    }

    /// Unit normal (right-hand rule); zero for a degenerate triangle
    pub fn normal(&self) -> Vec3 {
        (self.b - self.a)
            .cross(&(self.c - self.a))
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vec3::zeros)
    }

    /// Supporting plane of the triangle
    pub fn plane(&self) -> Plane {
        Plane::from_normal_and_point(self.normal(), &self.a)
    }

    /// Whether every vertex component is finite
    pub fn is_finite(&self) -> bool {
        self.vertices().iter().all(|v| v.iter().all(|c| c.is_finite()))
    }

    /// Barycentric coordinates of the projection of `point` onto the triangle
    /// plane, or `None` for a degenerate triangle
    pub fn barycentric(&self, point: &Vec3) -> Option<Vec3> {
        let v0 = self.c - self.a;
        let v1 = self.b - self.a;
        let v2 = point - self.a;

        let dot00 = v0.dot(&v0);
        let dot01 = v0.dot(&v1);
        let dot02 = v0.dot(&v2);
        let dot11 = v1.dot(&v1);
        let dot12 = v1.dot(&v2);

        let denom = dot00 * dot11 - dot01 * dot01;
        if denom.abs() <= f32::EPSILON * dot00 * dot11 {
            return None;
        }

        let inv_denom = 1.0 / denom;
        let u = (dot11 * dot02 - dot01 * dot12) * inv_denom;
        let v = (dot00 * dot12 - dot01 * dot02) * inv_denom;

        Some(Vec3::new(1.0 - u - v, v, u))
    }

    /// Whether the projection of `point` onto the triangle plane lies inside
    /// the triangle (edges inclusive)
    pub fn contains_point(&self, point: &Vec3) -> bool {
        self.barycentric(point)
            .is_some_and(|bary| bary.x >= 0.0 && bary.y >= 0.0 && bary.z >= 0.0)
    }

    /// Double-sided Möller-Trumbore ray intersection
    ///
    /// Returns the ray parameter of the hit if it lies in front of the origin.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        const EPSILON: f32 = 0.000_001;

        let edge1 = self.b - self.a;
        let edge2 = self.c - self.a;

        let h = ray.direction.cross(&edge2);
        let det = edge1.dot(&h);

        // Ray parallel to triangle
        if det.abs() < EPSILON {
            return None;
        }

        let f = 1.0 / det;
        let s = ray.origin - self.a;
        let u = f * s.dot(&h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = f * ray.direction.dot(&q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(&q);
        (t >= 0.0).then_some(t)
    }
}

/// A sphere for collision detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    /// The center position of the sphere in world space
    pub center: Vec3,
    /// The radius of the sphere
    pub radius: f32,
}

impl Sphere {
    /// Creates a new sphere with the given center and radius
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Move the sphere by `offset`
    pub fn translate(&mut self, offset: &Vec3) {
        self.center += offset;
    }
}

/// A capsule: a sphere swept along a segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capsule {
    /// Start of the axis
    pub start: Vec3,
    /// End of the axis
    pub end: Vec3,
    /// Radius around the axis
    pub radius: f32,
}

impl Capsule {
    /// Creates a new capsule
    pub fn new(start: Vec3, end: Vec3, radius: f32) -> Self {
        Self { start, end, radius }
    }

    /// Midpoint of the axis
    pub fn center(&self) -> Vec3 {
        self.axis().center()
    }

    /// Axis as a segment
    pub fn axis(&self) -> LineSegment {
        LineSegment::new(self.start, self.end)
    }

    /// Move both axis endpoints by `offset`
    pub fn translate(&mut self, offset: &Vec3) {
        self.start += offset;
        self.end += offset;
    }
}
