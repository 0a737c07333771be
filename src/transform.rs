//! Homogeneous-transform primitives used to assemble kinematic chains.
//!
//! All functions work on plain `Matrix4<f64>` values. The `d_*` variants are
//! the elementwise derivatives of the corresponding transform with respect to
//! its scalar parameter; chaining one of them in place of the original
//! transform yields a column of the Jacobian.

use nalgebra::{Matrix4, Vector3};

/// Translation by the vector `v`.
pub fn translation(v: Vector3<f64>) -> Matrix4<f64> {
    Matrix4::new(
        1.0, 0.0, 0.0, v.x,
        0.0, 1.0, 0.0, v.y,
        0.0, 0.0, 1.0, v.z,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Rotation of `angle` radians around the x axis.
pub fn rot_x(angle: f64) -> Matrix4<f64> {
    let (s, c) = angle.sin_cos();
    Matrix4::new(
        1.0, 0.0, 0.0, 0.0,
        0.0, c, -s, 0.0,
        0.0, s, c, 0.0,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Rotation of `angle` radians around the z axis.
pub fn rot_z(angle: f64) -> Matrix4<f64> {
    let (s, c) = angle.sin_cos();
    Matrix4::new(
        c, -s, 0.0, 0.0,
        s, c, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Derivative of [`rot_x`] with respect to the angle.
pub fn d_rot_x(angle: f64) -> Matrix4<f64> {
    let (s, c) = angle.sin_cos();
    Matrix4::new(
        0.0, 0.0, 0.0, 0.0,
        0.0, -s, -c, 0.0,
        0.0, c, -s, 0.0,
        0.0, 0.0, 0.0, 0.0,
    )
}

/// Derivative of [`rot_z`] with respect to the angle.
pub fn d_rot_z(angle: f64) -> Matrix4<f64> {
    let (s, c) = angle.sin_cos();
    Matrix4::new(
        -s, -c, 0.0, 0.0,
        c, -s, 0.0, 0.0,
        0.0, 0.0, 0.0, 0.0,
        0.0, 0.0, 0.0, 0.0,
    )
}

/// Derivative of a translation along `axis` with respect to its magnitude:
/// the translation block holds the axis, everything else is zero.
pub fn d_translation(axis: Vector3<f64>) -> Matrix4<f64> {
    let mut m = Matrix4::zeros();
    m[(0, 3)] = axis.x;
    m[(1, 3)] = axis.y;
    m[(2, 3)] = axis.z;
    m
}

/// Inverse of a rigid transform, computed as (Rᵀ, −Rᵀ·p) instead of a
/// general matrix inversion.
pub fn invert(t: &Matrix4<f64>) -> Matrix4<f64> {
    let r = t.fixed_view::<3, 3>(0, 0).transpose();
    let p = t.fixed_view::<3, 1>(0, 3).clone_owned();
    let ip = -(&r * p);
    let mut out = Matrix4::identity();
    out.fixed_view_mut::<3, 3>(0, 0).copy_from(&r);
    out.fixed_view_mut::<3, 1>(0, 3).copy_from(&ip);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn zero_angle_rotations_are_identity() {
        assert_relative_eq!(rot_x(0.0), Matrix4::identity(), epsilon = 1e-12);
        assert_relative_eq!(rot_z(0.0), Matrix4::identity(), epsilon = 1e-12);
    }

    #[test]
    fn rot_z_quarter_turn() {
        let m = rot_z(FRAC_PI_2);
        let p = m * nalgebra::Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn invert_round_trip() {
        let t = translation(Vector3::new(0.3, -0.2, 1.0)) * rot_z(0.7) * rot_x(-1.1);
        assert_relative_eq!(t * invert(&t), Matrix4::identity(), epsilon = 1e-12);
        assert_relative_eq!(invert(&t) * t, Matrix4::identity(), epsilon = 1e-12);
    }

    #[test]
    fn rotation_derivatives_match_finite_differences() {
        let h = 1e-7;
        for angle in [-2.0, -0.4, 0.0, 0.9, PI] {
            let num_z = (rot_z(angle + h) - rot_z(angle - h)) / (2.0 * h);
            assert_relative_eq!(d_rot_z(angle), num_z, epsilon = 1e-6);
            let num_x = (rot_x(angle + h) - rot_x(angle - h)) / (2.0 * h);
            assert_relative_eq!(d_rot_x(angle), num_x, epsilon = 1e-6);
        }
    }
}
