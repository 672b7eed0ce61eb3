//! Spatial partitioning data structures
//!
//! Provides the octree index over a static triangle mesh, its incremental
//! construction, and the ray, sphere and capsule queries that run against it.

mod aabb;
mod builder;
mod ingest;
mod octree;
mod query;
mod snapshot;

#[cfg(test)]
mod tests;

pub use aabb::AABB;
pub use builder::{BuildStatus, OctreeBuilder};
pub use ingest::{MeshSource, OctreeLoader, TriangleIngest};
pub use octree::{NodeKey, Octree, OctreeError, OctreeNode, TriangleId};
pub use query::{Collision, RayHit};
pub use snapshot::{AabbRecord, OctreeSnapshot, SnapshotError, TriangleRecord, Vec3Record};
