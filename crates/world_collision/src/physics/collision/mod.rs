//! Geometry kernel for collision detection
//!
//! # Module Organization
//!
//! - [`primitives`] - Value types (rays, planes, segments, triangles, spheres, capsules)
//! - [`intersect`] - Narrow-phase predicates between those types
//!
//! Everything here is pure math over world-space `f32` vectors: no state,
//! no allocation.

pub mod intersect;
pub mod primitives;

// Re-export commonly used types
pub use intersect::{
    closest_segment_parameters, closest_segment_points, triangle_capsule_intersect,
    triangle_sphere_intersect, Contact,
};
pub use primitives::{Capsule, LineSegment, Plane, Ray, Sphere, Triangle};

/// Penetrations shallower than this are treated as resting contact
pub const CONTACT_EPSILON: f32 = 1e-5;
