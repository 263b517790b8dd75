use super::{Vec2, Vec3};
use crate::constants::SMALL_NUMBER;

/// World up (+Y).
#[inline]
pub fn up() -> Vec3 {
    Vec3::y()
}

/// Remove the component of `v` along the unit normal `n`.
#[inline]
pub fn plane_project(v: Vec3, n: Vec3) -> Vec3 {
    v - n * v.dot(&n)
}

/// Component of `v` along the unit normal `n`.
#[inline]
pub fn project_onto_normal(v: Vec3, n: Vec3) -> Vec3 {
    n * v.dot(&n)
}

/// Normalized `v`, or zero when `v` is too short to normalize.
#[inline]
pub fn safe_normal(v: Vec3) -> Vec3 {
    let len_sq = v.norm_squared();
    if len_sq > SMALL_NUMBER {
        v / len_sq.sqrt()
    } else {
        Vec3::zeros()
    }
}

/// 2D counterpart of [`safe_normal`].
#[inline]
pub fn safe_normal_2d(v: Vec2) -> Vec2 {
    let len_sq = v.norm_squared();
    if len_sq > SMALL_NUMBER {
        v / len_sq.sqrt()
    } else {
        Vec2::zeros()
    }
}

/// Scale `v` down so its length does not exceed `max`.
#[inline]
pub fn clamp_to_max_size(v: Vec3, max: f32) -> Vec3 {
    if max < SMALL_NUMBER {
        return Vec3::zeros();
    }
    let len_sq = v.norm_squared();
    if len_sq > max * max {
        v * (max / len_sq.sqrt())
    } else {
        v
    }
}

/// Planar (XZ) part of `v`.
#[inline]
pub fn planar(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// True when every component of `v` is within `tolerance` of zero.
#[inline]
pub fn is_nearly_zero(v: Vec3, tolerance: f32) -> bool {
    v.x.abs() <= tolerance && v.y.abs() <= tolerance && v.z.abs() <= tolerance
}

/// Angle between two unit vectors in degrees.
#[inline]
pub fn angle_between_deg(a: Vec3, b: Vec3) -> f32 {
    a.dot(&b).clamp(-1.0, 1.0).acos().to_degrees()
}

/// 2D counterpart of [`angle_between_deg`]; both inputs are normalized first.
#[inline]
pub fn angle_between_deg_2d(a: Vec2, b: Vec2) -> f32 {
    safe_normal_2d(a)
        .dot(&safe_normal_2d(b))
        .clamp(-1.0, 1.0)
        .acos()
        .to_degrees()
}

#[inline]
pub fn lerp_vec(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    a + (b - a) * t
}
