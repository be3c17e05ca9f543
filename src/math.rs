//! Angle and vector helpers.
//!
//! All angles in this crate are in degrees, measured counter-clockwise from
//! world +X. Surface angles describe the tangent of the terrain; a flat floor
//! is `0`, a wall the character runs up on its right side is `90`, a ceiling
//! is `180` and a left wall is `270`.

use bevy::math::Vec2;

/// Wrap an angle into `[0, 360)`.
#[inline]
pub fn normalize_angle(degrees: f32) -> f32 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can return exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Signed shortest arc from `from` to `to`, in `(-180, 180]`.
#[inline]
pub fn angle_delta(from: f32, to: f32) -> f32 {
    let delta = normalize_angle(to - from);
    if delta > 180.0 {
        delta - 360.0
    } else {
        delta
    }
}

/// Check whether `angle` lies on the counter-clockwise arc from `start` to `end`.
///
/// Both bounds are inclusive. The arc may wrap through 0, so
/// `angle_in_range(350.0, 315.0, 45.0)` is true.
pub fn angle_in_range(angle: f32, start: f32, end: f32) -> bool {
    let angle = normalize_angle(angle);
    let start = normalize_angle(start);
    let end = normalize_angle(end);
    if start <= end {
        angle >= start && angle <= end
    } else {
        angle >= start || angle <= end
    }
}

/// Check whether `angle` is within `tolerance` degrees of `center`.
#[inline]
pub fn angle_near(angle: f32, center: f32, tolerance: f32) -> bool {
    angle_delta(center, angle).abs() <= tolerance
}

/// Unit vector pointing along `degrees`.
#[inline]
pub fn direction(degrees: f32) -> Vec2 {
    let radians = degrees.to_radians();
    Vec2::new(radians.cos(), radians.sin())
}

/// Angle of a vector in `[0, 360)`.
///
/// A zero vector has no direction; callers must not pass one.
#[inline]
pub fn vector_angle(v: Vec2) -> f32 {
    debug_assert!(v != Vec2::ZERO, "vector_angle of a zero vector");
    normalize_angle(v.y.atan2(v.x).to_degrees())
}

/// Rotate a vector counter-clockwise by `degrees`.
#[inline]
pub fn rotate_by(v: Vec2, degrees: f32) -> Vec2 {
    Vec2::from_angle(degrees.to_radians()).rotate(v)
}

/// Rotate a vector so that it points along `degrees`, keeping its length.
#[inline]
pub fn rotate_to(v: Vec2, degrees: f32) -> Vec2 {
    direction(degrees) * v.length()
}

/// Project `v` onto the infinite line through the origin at `degrees`.
///
/// Returns the signed length along the line together with the projected vector.
#[inline]
pub fn project_onto_angle(v: Vec2, degrees: f32) -> (f32, Vec2) {
    let axis = direction(degrees);
    let length = v.dot(axis);
    (length, axis * length)
}

/// Move `value` toward zero by `amount` without crossing it.
#[inline]
pub fn approach_zero(value: f32, amount: f32) -> f32 {
    if value > 0.0 {
        (value - amount).max(0.0)
    } else {
        (value + amount).min(0.0)
    }
}

/// 2D cross product (z component of the 3D cross product).
#[inline]
pub fn cross(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}
