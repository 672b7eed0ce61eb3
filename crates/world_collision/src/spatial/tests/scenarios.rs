//! Reference scenarios: unit quad queries, empty trees and large incremental builds

use super::random_soup;
use crate::config::{BuildConfig, OctreeConfig};
use crate::foundation::math::Vec3;
use crate::foundation::progress::Progress;
use crate::physics::collision::{Ray, Sphere, Triangle};
use crate::spatial::{BuildStatus, Octree, OctreeBuilder};

/// Unit quad in the XZ plane at y = 0, both triangles facing +Y
fn unit_quad() -> Octree {
    let triangles = vec![
        Triangle::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0)),
        Triangle::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 1.0)),
    ];
    Octree::from_triangles(triangles, OctreeConfig::default()).build(BuildConfig::default(), |_| {})
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ray_down_onto_quad() {
        let octree = unit_quad();
        let hit = octree
            .ray_intersect(&Ray::new(Vec3::new(0.5, 5.0, 0.5), Vec3::new(0.0, -1.0, 0.0)))
            .unwrap();
        assert_relative_eq!(hit.distance, 5.0, epsilon = 1e-5);
        assert_relative_eq!(hit.position, Vec3::new(0.5, 0.0, 0.5), epsilon = 1e-5);
    }

    #[test]
    fn test_sphere_resting_in_quad() {
        let octree = unit_quad();
        let collision = octree.sphere_intersect(&Sphere::new(Vec3::new(0.5, 0.1, 0.5), 0.5)).unwrap();
        assert_relative_eq!(collision.depth, 0.4, epsilon = 1e-5);
        assert_relative_eq!(collision.normal, Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_sphere_just_touching_is_not_a_collision() {
        let octree = unit_quad();
        assert!(octree.sphere_intersect(&Sphere::new(Vec3::new(0.5, 0.5, 0.5), 0.5)).is_none());
    }

    #[test]
    fn test_ray_with_zero_direction() {
        let octree = unit_quad();
        assert!(octree.ray_intersect(&Ray::new(Vec3::new(0.5, 5.0, 0.5), Vec3::zeros())).is_none());
    }

    #[test]
    fn test_empty_build_completes_with_full_progress() {
        let mut reports = Vec::new();
        let octree = Octree::default().build(BuildConfig::default(), |progress| reports.push(progress));
        assert!(octree.is_built());
        assert_eq!(octree.node_count(), 1);
        assert_eq!(reports, vec![Progress::complete()]);
    }

    #[test]
    fn test_large_build_is_incremental() {
        let octree = Octree::from_triangles(random_soup(10_000, 21), OctreeConfig::default());
        let mut builder = OctreeBuilder::new(octree, BuildConfig::default().with_batch_size(100));

        assert!(matches!(builder.step(), BuildStatus::InProgress(_)));
        while builder.step() != BuildStatus::Complete {}
        let steps = builder.steps_taken();
        let octree = builder.into_octree().unwrap();

        let mut splits: usize = 0;
        octree.walk(octree.root(), &mut |node| {
            if !node.is_leaf() {
                splits += 1;
            }
        });
        assert!(steps > 1);
        assert!(steps >= splits.div_ceil(100));
    }
}
