//! Unit-sphere helpers over glam's f64 vectors: normalization, great-circle
//! motion, sampling

use glam::{DQuat, DVec3};
use rand::Rng;

/// Lengths and angles at or below this are treated as zero
pub const EPSILON: f64 = 1e-8;

/// `v / |v|`, or `+Z` when `v` is too short to carry a direction
pub fn normalize(v: DVec3) -> DVec3 {
    if v.length() <= EPSILON {
        return DVec3::Z;
    }
    v.normalize_or(DVec3::Z)
}

/// Component of `v` lying in the tangent plane at `position` (not normalized)
pub fn tangent_projection(v: DVec3, position: DVec3) -> DVec3 {
    v - position * v.dot(position)
}

/// Any unit vector tangent to the sphere at `position`
pub fn fallback_tangent(position: DVec3) -> DVec3 {
    normalize(position).any_orthonormal_vector()
}

/// Orthonormal tangent basis `(e1, e2)` at `position`, with `e1 × e2 = position`
pub fn tangent_basis(position: DVec3) -> (DVec3, DVec3) {
    let e1 = fallback_tangent(position);
    let e2 = normalize(position.cross(e1));
    (e1, e2)
}

/// Great-circle angle between two unit vectors
pub fn angular_distance(a: DVec3, b: DVec3) -> f64 {
    a.dot(b).clamp(-1.0, 1.0).acos()
}

/// Rotation that moves `position` by `angle` radians towards `direction`.
///
/// `direction` is reprojected onto the tangent plane first. When that projection
/// is degenerate a tangent orthogonal to `position` is used instead. Returns
/// `None` when `angle` is effectively zero.
pub fn great_circle_rotation(position: DVec3, direction: DVec3, angle: f64) -> Option<DQuat> {
    if angle.abs() <= EPSILON {
        return None;
    }
    let tangent = tangent_or_fallback(direction, position);
    let axis = normalize(position.cross(tangent));
    Some(DQuat::from_axis_angle(axis, angle).normalize())
}

/// Advance a point along its great circle.
///
/// Returns the new position and the transported heading, both unit length and
/// mutually orthogonal. Inputs come back unchanged for a zero angle.
pub fn move_on_sphere(position: DVec3, direction: DVec3, angle: f64) -> (DVec3, DVec3) {
    match great_circle_rotation(position, direction, angle) {
        Some(rotation) => {
            let tangent = tangent_or_fallback(direction, position);
            let next_position = normalize(rotation.mul_vec3(position));
            let next_direction = tangent_or_fallback(rotation.mul_vec3(tangent), next_position);
            (next_position, next_direction)
        }
        None => (position, direction),
    }
}

fn tangent_or_fallback(v: DVec3, position: DVec3) -> DVec3 {
    let projected = tangent_projection(v, position);
    if projected.length() <= EPSILON {
        fallback_tangent(position)
    } else {
        normalize(projected)
    }
}

/// Uniformly distributed point on the unit sphere
pub fn random_point_on_sphere<R: Rng + ?Sized>(rng: &mut R) -> DVec3 {
    let z: f64 = rng.gen_range(-1.0..=1.0);
    let theta: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
    let r = (1.0 - z * z).max(0.0).sqrt();
    normalize(DVec3::new(r * theta.cos(), r * theta.sin(), z))
}

/// Uniformly distributed unit tangent at `position`
pub fn random_tangent_direction<R: Rng + ?Sized>(position: DVec3, rng: &mut R) -> DVec3 {
    let (e1, e2) = tangent_basis(position);
    let theta: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
    normalize(e1 * theta.cos() + e2 * theta.sin())
}
