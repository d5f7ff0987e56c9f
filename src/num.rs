//! Utilities for numerics.

use std::f32::consts::{PI, TAU};

/// Normalizes an angle in radians into the range `(-π, π]`.
///
/// Values that are already in range are returned unchanged (up to rounding), so this function is
/// idempotent.
pub fn normalize_radians(angle: f32) -> f32 {
    let norm = angle - TAU * ((angle + PI) / TAU).floor();
    // `floor` maps the lower bound onto itself, but that bound is excluded.
    if norm <= -PI {
        norm + TAU
    } else {
        norm
    }
}

/// Returns the angle at `b` (in degrees) formed by the segments `b->a` and `b->c`.
///
/// Returns `0.0` if either segment has zero length.
pub fn angle_degrees(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> f32 {
    let ba = nalgebra::Vector3::from(a) - nalgebra::Vector3::from(b);
    let bc = nalgebra::Vector3::from(c) - nalgebra::Vector3::from(b);
    let denom = ba.norm() * bc.norm();
    if denom == 0.0 {
        return 0.0;
    }

    // Clamping guards against `acos` returning NaN for slightly out-of-range values.
    (ba.dot(&bc) / denom).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Euclidean distance between two 3D points.
pub fn distance(a: [f32; 3], b: [f32; 3]) -> f32 {
    (nalgebra::Vector3::from(a) - nalgebra::Vector3::from(b)).norm()
}
