//! Physics module for narrow-phase collision geometry
//!
//! Holds the stateless geometry kernel the octree queries are built on.

pub mod collision;

pub use collision::{Capsule, Contact, LineSegment, Plane, Ray, Sphere, Triangle};
