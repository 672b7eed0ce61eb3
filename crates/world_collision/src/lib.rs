//! # World Collision
//!
//! Collision support for a character controller moving through a static
//! triangle-mesh world.
//!
//! ## Features
//!
//! - **Octree Index**: Triangles pooled once, referenced by id from every leaf they touch
//! - **Incremental Builds**: Subdivision runs in bounded batches with progress reporting
//! - **Queries**: Ray casts, sphere and capsule push-out resolution
//! - **Snapshots**: Built trees round-trip through plain serde records
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use world_collision::prelude::*;
//!
//! let mut octree = Octree::new(OctreeConfig::default());
//! octree.add_triangle(Triangle::new(
//!     Vec3::new(0.0, 0.0, 0.0),
//!     Vec3::new(0.0, 0.0, 1.0),
//!     Vec3::new(1.0, 0.0, 0.0),
//! )).unwrap();
//!
//! let octree = OctreeBuilder::new(octree, BuildConfig::default())
//!     .run_to_completion(|progress| log::info!("build {:.0}%", progress.fraction() * 100.0));
//!
//! let capsule = Capsule::new(Vec3::new(0.2, 0.1, 0.2), Vec3::new(0.2, 1.0, 0.2), 0.3);
//! if let Some(collision) = octree.capsule_intersect(&capsule) {
//!     let correction = collision.normal * collision.depth;
//!     println!("push out by {correction:?}");
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod physics;
pub mod spatial;

/// Common imports for library users
pub mod prelude {
    pub use crate::{
        config::{BuildConfig, CollisionConfig, Config, ConfigError, OctreeConfig},
        foundation::{
            math::{Mat4, Vec3},
            progress::{Progress, WeightedProgress},
        },
        physics::collision::{Capsule, Contact, LineSegment, Plane, Ray, Sphere, Triangle},
        spatial::{
            BuildStatus, Collision, MeshSource, Octree, OctreeBuilder, OctreeLoader,
            OctreeSnapshot, RayHit, SnapshotError, TriangleId, TriangleIngest, AABB,
        },
    };
}
