//! Narrow-phase intersection predicates
//!
//! Triangle/sphere and triangle/capsule overlap with push-out resolution,
//! and the segment/segment closest-point solve the capsule test relies on.

use super::primitives::{Capsule, LineSegment, Sphere, Triangle};
use super::CONTACT_EPSILON;
use crate::foundation::math::{utils, Vec3};

/// Determinant threshold below which two segments are treated as parallel
const PARALLEL_EPSILON: f32 = 1e-10;

/// Result of a narrow-phase overlap test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Direction the shape must move to separate (unit length)
    pub normal: Vec3,
    /// Contact point on the triangle
    pub point: Vec3,
    /// Distance the shape must move along `normal`
    pub depth: f32,
}

/// Parameters `(t1, t2)` in [0, 1] of the closest points between two segments
///
/// When the segments are parallel the system is singular; `t1` is then pinned
/// to whichever endpoint (0 or 1) yields a `t2` nearer the middle of the
/// second segment, and `t2` is solved from that fixed point.
pub fn closest_segment_parameters(first: &LineSegment, second: &LineSegment) -> (f32, f32) {
    let r = first.delta();
    let s = second.delta();
    let w = second.start - first.start;

    let a = r.dot(&s);
    let b = r.dot(&r);
    let c = s.dot(&s);
    let d = s.dot(&w);
    let e = r.dot(&w);

    // Degenerate segments collapse to point queries
    if b <= f32::EPSILON && c <= f32::EPSILON {
        return (0.0, 0.0);
    }
    if b <= f32::EPSILON {
        return (0.0, second.closest_parameter_to_point(&first.start));
    }
    if c <= f32::EPSILON {
        return (first.closest_parameter_to_point(&second.start), 0.0);
    }

    let divisor = b * c - a * a;
    if divisor.abs() <= PARALLEL_EPSILON * b * c {
        let from_start = -d / c;
        let from_end = (a - d) / c;
        let (t1, t2) = if (from_start - 0.5).abs() <= (from_end - 0.5).abs() {
            (0.0, from_start)
        } else {
            (1.0, from_end)
        };
        return (t1, utils::clamp(t2, 0.0, 1.0));
    }

    let t1 = utils::clamp((e * c - a * d) / divisor, 0.0, 1.0);
    let t2 = utils::clamp((t1 * a - d) / c, 0.0, 1.0);
    // Re-solve t1 against the clamped t2 so both ends of the pair are optimal
    let t1 = utils::clamp((t2 * a + e) / b, 0.0, 1.0);
    (t1, t2)
}

/// Closest points between two segments, one on each
pub fn closest_segment_points(first: &LineSegment, second: &LineSegment) -> (Vec3, Vec3) {
    let (t1, t2) = closest_segment_parameters(first, second);
    (first.at(t1), second.at(t2))
}

/// Overlap of a sphere with a triangle
///
/// The sphere must cross the triangle plane. If its center projects inside
/// the triangle the push is along the plane normal; otherwise the nearest
/// point on the three edges decides.
pub fn triangle_sphere_intersect(sphere: &Sphere, triangle: &Triangle) -> Option<Contact> {
    let plane = triangle.plane();
    if plane.normal == Vec3::zeros() {
        return None;
    }

    let distance = plane.distance_to_point(&sphere.center);
    if distance.abs() > sphere.radius - CONTACT_EPSILON {
        return None;
    }

    if triangle.contains_point(&sphere.center) {
        return Some(Contact {
            normal: plane.normal,
            point: plane.project_point(&sphere.center),
            depth: (distance - sphere.radius).abs(),
        });
    }

    let (closest, distance_sq) = triangle
        .edges()
        .iter()
        .map(|edge| {
            let point = edge.closest_point_to_point(&sphere.center);
            (point, (point - sphere.center).magnitude_squared())
        })
        .fold((Vec3::zeros(), f32::INFINITY), |best, candidate| {
            if candidate.1 < best.1 { candidate } else { best }
        });

    let distance = distance_sq.sqrt();
    if distance >= sphere.radius - CONTACT_EPSILON {
        return None;
    }

    Some(Contact {
        normal: (sphere.center - closest)
            .try_normalize(f32::EPSILON)
            .unwrap_or(plane.normal),
        point: closest,
        depth: sphere.radius - distance,
    })
}

/// Overlap of a capsule with a triangle
///
/// Both axis endpoints are measured against the triangle plane. If the axis
/// crosses the plane inside the triangle the push is along the plane normal
/// by the deeper endpoint's penetration; otherwise each triangle edge is
/// tested against the axis with [`closest_segment_points`].
pub fn triangle_capsule_intersect(capsule: &Capsule, triangle: &Triangle) -> Option<Contact> {
    let plane = triangle.plane();
    if plane.normal == Vec3::zeros() {
        return None;
    }

    let d1 = plane.distance_to_point(&capsule.start) - capsule.radius;
    let d2 = plane.distance_to_point(&capsule.end) - capsule.radius;

    let clear_in_front = d1 >= -CONTACT_EPSILON && d2 >= -CONTACT_EPSILON;
    let fully_behind = d1 < -capsule.radius && d2 < -capsule.radius;
    if clear_in_front || fully_behind {
        return None;
    }

    let span = d1.abs() + d2.abs();
    let delta = if span > f32::EPSILON { d1.abs() / span } else { 0.0 };
    let crossing = capsule.axis().at(delta);

    if triangle.contains_point(&crossing) {
        return Some(Contact {
            normal: plane.normal,
            point: crossing,
            depth: d1.min(d2).abs(),
        });
    }

    let axis = capsule.axis();
    let (on_axis, on_edge, distance_sq) = triangle
        .edges()
        .iter()
        .map(|edge| {
            let (on_axis, on_edge) = closest_segment_points(&axis, edge);
            (on_axis, on_edge, (on_axis - on_edge).magnitude_squared())
        })
        .fold((Vec3::zeros(), Vec3::zeros(), f32::INFINITY), |best, candidate| {
            if candidate.2 < best.2 { candidate } else { best }
        });

    let distance = distance_sq.sqrt();
    if distance >= capsule.radius - CONTACT_EPSILON {
        return None;
    }

    Some(Contact {
        normal: (on_axis - on_edge)
            .try_normalize(f32::EPSILON)
            .unwrap_or(plane.normal),
        point: on_edge,
        depth: capsule.radius - distance,
    })
}
