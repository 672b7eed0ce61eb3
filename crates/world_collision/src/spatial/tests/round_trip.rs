//! Snapshot round-trips preserve query results

use super::{build, random_soup, terrain};
use crate::config::OctreeConfig;
use crate::foundation::math::Vec3;
use crate::physics::collision::{Capsule, Ray, Sphere};
use crate::physics::collision::Triangle;
use crate::spatial::{Octree, OctreeSnapshot};

fn reload(octree: &Octree) -> Octree {
    let text = octree.to_snapshot().to_ron().unwrap();
    Octree::from_snapshot(&OctreeSnapshot::from_ron(&text).unwrap(), OctreeConfig::default()).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_point(rng: &mut StdRng, extent: f32) -> Vec3 {
        Vec3::new(
            rng.gen_range(-extent..extent),
            rng.gen_range(-extent..extent),
            rng.gen_range(-extent..extent),
        )
    }

    #[test]
    fn test_decoded_tree_answers_queries_identically() {
        let octree = build(random_soup(2000, 31), OctreeConfig::default());
        let decoded = reload(&octree);

        let mut rng = StdRng::seed_from_u64(32);
        for _ in 0..100 {
            let origin = random_point(&mut rng, 60.0);
            let ray = Ray::new(origin, random_point(&mut rng, 40.0) - origin);
            assert_eq!(octree.ray_intersect(&ray), decoded.ray_intersect(&ray));

            let sphere = Sphere::new(random_point(&mut rng, 50.0), rng.gen_range(0.5..3.0));
            assert_eq!(octree.sphere_intersect(&sphere), decoded.sphere_intersect(&sphere));

            let start = random_point(&mut rng, 50.0);
            let capsule = Capsule::new(start, start + Vec3::new(0.0, 2.0, 0.0), rng.gen_range(0.3..1.5));
            assert_eq!(octree.capsule_intersect(&capsule), decoded.capsule_intersect(&capsule));
        }
    }

    #[test]
    fn test_ray_hit_survives_pool_reordering() {
        // The far triangle is pooled first, so decoding renumbers the pool
        let far = Triangle::new(Vec3::new(9.0, 0.0, 9.0), Vec3::new(9.0, 0.0, 10.0), Vec3::new(10.0, 0.0, 9.0));
        let near = Triangle::new(Vec3::zeros(), Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0));
        let mut triangles = vec![far, near];
        for i in 1..8 {
            let step = Vec3::new(i as f32, 0.0, i as f32);
            triangles.push(Triangle::new(near.a + step, near.b + step, near.c + step));
        }
        let octree = build(triangles, OctreeConfig::default());
        let decoded = reload(&octree);

        let ray = Ray::new(Vec3::new(0.2, 3.0, 0.2), Vec3::new(0.0, -1.0, 0.0));
        let hit = octree.ray_intersect(&ray);
        assert_eq!(hit.map(|hit| hit.triangle), Some(near));
        assert_eq!(hit, decoded.ray_intersect(&ray));
    }

    #[test]
    fn test_terrain_snapshot_keeps_collisions() {
        let octree = build(terrain(12), OctreeConfig::default());
        let decoded = Octree::from_snapshot(&octree.to_snapshot(), OctreeConfig::default()).unwrap();

        let capsule = Capsule::new(Vec3::new(6.3, 0.0, 6.6), Vec3::new(6.3, 1.2, 6.6), 0.4);
        let original = octree.capsule_intersect(&capsule);
        assert!(original.is_some());
        assert_eq!(original, decoded.capsule_intersect(&capsule));
    }
}
