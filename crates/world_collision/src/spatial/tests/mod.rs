//! Cross-module tests for the octree: structural invariants, the reference
//! scenarios, push-out convergence and snapshot round-trips

mod round_trip;
mod scenarios;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{BuildConfig, OctreeConfig};
use crate::foundation::math::Vec3;
use crate::physics::collision::Triangle;
use crate::spatial::Octree;

/// Random triangles of up to ~3 units across scattered through a 100 unit cube
pub(super) fn random_soup(count: usize, seed: u64) -> Vec<Triangle> {
    let mut rng = StdRng::seed_from_u64(seed);
    let offset = |rng: &mut StdRng| {
        Vec3::new(rng.gen_range(-1.5..1.5), rng.gen_range(-1.5..1.5), rng.gen_range(-1.5..1.5))
    };
    (0..count)
        .map(|_| {
            let center = Vec3::new(
                rng.gen_range(-50.0..50.0),
                rng.gen_range(-50.0..50.0),
                rng.gen_range(-50.0..50.0),
            );
            Triangle::new(center + offset(&mut rng), center + offset(&mut rng), center + offset(&mut rng))
        })
        .collect()
}

/// Height of the rolling test terrain
pub(super) fn terrain_height(x: f32, z: f32) -> f32 {
    0.3 * (x * 0.5).sin() + 0.3 * (z * 0.4).cos()
}

/// Gently rolling heightfield over `cells` x `cells` unit squares, normals up
pub(super) fn terrain(cells: usize) -> Vec<Triangle> {
    let vertex = |i: usize, j: usize| {
        let (x, z) = (i as f32, j as f32);
        Vec3::new(x, terrain_height(x, z), z)
    };
    let mut triangles = Vec::with_capacity(cells * cells * 2);
    for i in 0..cells {
        for j in 0..cells {
            triangles.push(Triangle::new(vertex(i, j), vertex(i, j + 1), vertex(i + 1, j)));
            triangles.push(Triangle::new(vertex(i + 1, j), vertex(i, j + 1), vertex(i + 1, j + 1)));
        }
    }
    triangles
}

/// Build synchronously with default batching
pub(super) fn build(triangles: Vec<Triangle>, config: OctreeConfig) -> Octree {
    Octree::from_triangles(triangles, config).build(BuildConfig::default(), |_| {})
}
