//! Ray, sphere and capsule queries against a built octree
//!
//! Each query prunes subtrees by cell, gathers the distinct triangles of the
//! surviving nodes in traversal order, then runs the narrow-phase test on
//! each candidate.
//!
//! Sphere and capsule queries resolve as they go: every overlapping triangle
//! pushes a working copy of the shape out before the next candidate is
//! tested, and the result is the net displacement. This is not the same as
//! resolving against the single deepest triangle, and the outcome at
//! multi-triangle corners depends on candidate order.

use std::cell::RefCell;

use super::aabb::AABB;
use super::octree::{Octree, OctreeNode, TriangleId};
use crate::foundation::math::Vec3;
use crate::physics::collision::{
    triangle_capsule_intersect, triangle_sphere_intersect, Capsule, Ray, Sphere, Triangle,
    CONTACT_EPSILON,
};

/// Closest ray hit against the mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Distance from the ray origin to the hit point
    pub distance: f32,
    /// The triangle that was hit
    pub triangle: Triangle,
    /// The point of intersection in world space
    pub position: Vec3,
}

/// Net push-out for a sphere or capsule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collision {
    /// Unit direction of the push
    pub normal: Vec3,
    /// Length of the push
    pub depth: f32,
}

impl Collision {
    /// Translation that separates the shape from the mesh
    pub fn correction(&self) -> Vec3 {
        self.normal * self.depth
    }
}

/// Reusable per-thread candidate buffer
///
/// `marks[id]` equals `stamp` when the triangle was already collected by the
/// current query, so deduplication keeps first-seen order without clearing
/// the whole mark array between queries.
#[derive(Default)]
struct QueryScratch {
    candidates: Vec<TriangleId>,
    marks: Vec<u32>,
    stamp: u32,
}

impl QueryScratch {
    fn begin(&mut self, triangle_count: usize) {
        self.candidates.clear();
        if self.marks.len() < triangle_count {
            self.marks.resize(triangle_count, 0);
        }
        self.stamp = self.stamp.wrapping_add(1);
        if self.stamp == 0 {
            self.marks.fill(0);
            self.stamp = 1;
        }
    }

    fn collect(&mut self, node: &OctreeNode) {
        for &id in &node.triangles {
            let mark = &mut self.marks[id.0];
            if *mark != self.stamp {
                *mark = self.stamp;
                self.candidates.push(id);
            }
        }
    }
}

thread_local! {
    static SCRATCH: RefCell<QueryScratch> = RefCell::new(QueryScratch::default());
}

impl Octree {
    /// Run `f` over the distinct triangles of every node whose cell passes
    /// `overlaps`
    fn with_candidates<R>(
        &self,
        overlaps: &dyn Fn(&AABB) -> bool,
        f: impl FnOnce(&[TriangleId]) -> R,
    ) -> R {
        SCRATCH.with(|scratch| {
            let mut scratch = scratch.borrow_mut();
            scratch.begin(self.triangle_count());
            self.visit_overlapping(self.root(), overlaps, &mut |node| scratch.collect(node));
            f(&scratch.candidates)
        })
    }

    /// Distinct triangles in cells the ray passes through
    pub fn ray_triangles(&self, ray: &Ray) -> Vec<TriangleId> {
        self.with_candidates(&|aabb| aabb.intersect_ray(ray).is_some(), <[TriangleId]>::to_vec)
    }

    /// Distinct triangles in cells the sphere overlaps
    pub fn sphere_triangles(&self, sphere: &Sphere) -> Vec<TriangleId> {
        self.with_candidates(&|aabb| aabb.intersects_sphere(sphere), <[TriangleId]>::to_vec)
    }

    /// Distinct triangles in cells the capsule's bounds overlap
    pub fn capsule_triangles(&self, capsule: &Capsule) -> Vec<TriangleId> {
        self.with_candidates(&|aabb| aabb.intersects_capsule(capsule), <[TriangleId]>::to_vec)
    }

    /// First triangle hit by a ray
    ///
    /// Returns `None` for a zero direction or when nothing is hit. Distances
    /// are world-space lengths regardless of the direction's magnitude.
    pub fn ray_intersect(&self, ray: &Ray) -> Option<RayHit> {
        let ray = ray.normalized()?;
        let triangles = self.triangles();

        self.with_candidates(&|aabb| aabb.intersect_ray(&ray).is_some(), |candidates| {
            let mut best: Option<RayHit> = None;
            for &id in candidates {
                let triangle = triangles[id.0];
                let Some(t) = triangle.intersect_ray(&ray) else {
                    continue;
                };
                let position = ray.point_at(t);
                let distance = (position - ray.origin).magnitude();
                if best.map_or(true, |hit| distance < hit.distance) {
                    best = Some(RayHit {
                        distance,
                        triangle,
                        position,
                    });
                }
            }
            best
        })
    }

    /// Push a sphere out of the mesh
    ///
    /// Returns the net displacement of the sphere center as a unit normal
    /// and depth, or `None` if no triangle overlapped (or the pushes
    /// cancelled out).
    pub fn sphere_intersect(&self, sphere: &Sphere) -> Option<Collision> {
        let triangles = self.triangles();
        let mut working = *sphere;
        let mut hit = false;

        self.with_candidates(&|aabb| aabb.intersects_sphere(sphere), |candidates| {
            for &id in candidates {
                if let Some(contact) = triangle_sphere_intersect(&working, &triangles[id.0]) {
                    hit = true;
                    working.translate(&(contact.normal * contact.depth));
                }
            }
        });

        if !hit {
            return None;
        }
        displacement(&sphere.center, &working.center)
    }

    /// Push a capsule out of the mesh
    ///
    /// Same resolve-as-you-go scheme as [`Octree::sphere_intersect`], with
    /// the displacement measured at the capsule's center.
    pub fn capsule_intersect(&self, capsule: &Capsule) -> Option<Collision> {
        let triangles = self.triangles();
        let mut working = *capsule;
        let mut hit = false;

        self.with_candidates(&|aabb| aabb.intersects_capsule(capsule), |candidates| {
            for &id in candidates {
                if let Some(contact) = triangle_capsule_intersect(&working, &triangles[id.0]) {
                    hit = true;
                    working.translate(&(contact.normal * contact.depth));
                }
            }
        });

        if !hit {
            return None;
        }
        displacement(&capsule.center(), &working.center())
    }
}

fn displacement(from: &Vec3, to: &Vec3) -> Option<Collision> {
    let offset = to - from;
    let depth = offset.magnitude();
    if depth <= CONTACT_EPSILON {
        return None;
    }
    Some(Collision {
        normal: offset / depth,
        depth,
    })
}
