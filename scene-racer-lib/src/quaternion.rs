//
// quaternion.rs: Rotations as quaternions, with conversion to and
// from rotation matrices and spherical interpolation.
//

use serde::{Deserialize, Serialize};

use crate::error::SceneError;
use crate::matrix::Mat4;
use crate::vec4::*;

// Below this, sin(angle between endpoints) is too small to divide
// by, and slerp falls back to a normalised lerp.
const SLERP_EPSILON: f64 = 1.0e-6;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quat {
    fn default() -> Self {
        Quat::IDENTITY
    }
}

impl Quat {
    pub const IDENTITY: Quat = Quat {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Quat {
        Quat { x, y, z, w }
    }

    // Rotation of `angle` radians around `axis`.
    pub fn from_axis_angle(axis: Dir4, angle: f64) -> Result<Quat, SceneError> {
        let axis = axis
            .xyz()
            .try_norm()
            .map_err(|_| SceneError::InvalidAxis)?;
        Ok(Quat::from_unit_axis(axis, angle))
    }

    // As `from_axis_angle`, for an axis already known to be unit
    // length.
    pub(crate) fn from_unit_axis(axis: Dir4, angle: f64) -> Quat {
        let (s, c) = (angle * 0.5).sin_cos();
        Quat {
            x: axis.x * s,
            y: axis.y * s,
            z: axis.z * s,
            w: c,
        }
    }

    pub fn conjugate(&self) -> Quat {
        Quat {
            x: -self.x,
            y: -self.y,
            z: -self.z,
            w: self.w,
        }
    }

    pub fn dot(&self, other: &Quat) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    pub fn norm_squared(&self) -> f64 {
        self.dot(self)
    }

    fn scale(&self, m: f64) -> Quat {
        Quat {
            x: self.x * m,
            y: self.y * m,
            z: self.z * m,
            w: self.w * m,
        }
    }

    fn add(&self, other: &Quat) -> Quat {
        Quat {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
            w: self.w + other.w,
        }
    }

    pub fn inverse(&self) -> Result<Quat, SceneError> {
        let n2 = self.norm_squared();
        if n2 == 0.0 || !n2.is_finite() {
            return Err(SceneError::ZeroLength);
        }
        Ok(self.conjugate().scale(n2.recip()))
    }

    pub fn normalize(&self) -> Result<Quat, SceneError> {
        let n2 = self.norm_squared();
        if n2 == 0.0 || !n2.is_finite() {
            return Err(SceneError::ZeroLength);
        }
        Ok(self.scale(n2.sqrt().recip()))
    }

    // Hamilton product: applying the result rotates by `other` first,
    // then by `self`.
    pub fn mul(&self, other: &Quat) -> Quat {
        let (a, b) = (self, other);
        Quat {
            x: a.w * b.x + a.x * b.w + a.y * b.z - a.z * b.y,
            y: a.w * b.y - a.x * b.z + a.y * b.w + a.z * b.x,
            z: a.w * b.z + a.x * b.y - a.y * b.x + a.z * b.w,
            w: a.w * b.w - a.x * b.x - a.y * b.y - a.z * b.z,
        }
    }

    // Interpolate along the great arc from `self` (t = 0) to `other`
    // (t = 1). Endpoints are not sign-flipped onto the same
    // hemisphere, so t = 1 gives back `other` exactly as passed.
    pub fn slerp(&self, other: &Quat, t: f64) -> Quat {
        let cos_phi = self.dot(other).clamp(-1.0, 1.0);
        let phi = cos_phi.acos();
        let sin_phi = phi.sin();

        if sin_phi.abs() < SLERP_EPSILON {
            if cos_phi < 0.0 {
                // Opposite quaternions are the same orientation, but
                // the arc between them is undefined.
                return if t < 0.5 { *self } else { *other };
            }
            let lerp = self.scale(1.0 - t).add(&other.scale(t));
            return lerp.normalize().unwrap_or(*self);
        }

        let a = (phi * (1.0 - t)).sin() / sin_phi;
        let b = (phi * t).sin() / sin_phi;
        self.scale(a).add(&other.scale(b))
    }

    // Rotation matrix for this quaternion. Non-unit quaternions are
    // normalised on the fly; the zero quaternion maps to identity.
    pub fn to_matrix(&self) -> Mat4 {
        let n2 = self.norm_squared();
        if n2 == 0.0 {
            return Mat4::identity();
        }
        let s = 2.0 / n2;
        let (x, y, z, w) = (self.x, self.y, self.z, self.w);
        Mat4::from_rows([
            1.0 - s * (y * y + z * z),
            s * (x * y - w * z),
            s * (x * z + w * y),
            0.0,
            s * (x * y + w * z),
            1.0 - s * (x * x + z * z),
            s * (y * z - w * x),
            0.0,
            s * (x * z - w * y),
            s * (y * z + w * x),
            1.0 - s * (x * x + y * y),
            0.0,
            0.0,
            0.0,
            0.0,
            1.0,
        ])
    }

    // Extract the rotation from the upper 3x3 block, which must be
    // orthonormal with determinant 1.
    pub fn from_rotation_matrix(m: &Mat4) -> Quat {
        let r = |row, col| m.get(row, col);
        let trace = r(0, 0) + r(1, 1) + r(2, 2);
        if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0;
            Quat {
                w: 0.25 * s,
                x: (r(2, 1) - r(1, 2)) / s,
                y: (r(0, 2) - r(2, 0)) / s,
                z: (r(1, 0) - r(0, 1)) / s,
            }
        } else if r(0, 0) > r(1, 1) && r(0, 0) > r(2, 2) {
            let s = (1.0 + r(0, 0) - r(1, 1) - r(2, 2)).sqrt() * 2.0;
            Quat {
                w: (r(2, 1) - r(1, 2)) / s,
                x: 0.25 * s,
                y: (r(0, 1) + r(1, 0)) / s,
                z: (r(0, 2) + r(2, 0)) / s,
            }
        } else if r(1, 1) > r(2, 2) {
            let s = (1.0 + r(1, 1) - r(0, 0) - r(2, 2)).sqrt() * 2.0;
            Quat {
                w: (r(0, 2) - r(2, 0)) / s,
                x: (r(0, 1) + r(1, 0)) / s,
                y: 0.25 * s,
                z: (r(1, 2) + r(2, 1)) / s,
            }
        } else {
            let s = (1.0 + r(2, 2) - r(0, 0) - r(1, 1)).sqrt() * 2.0;
            Quat {
                w: (r(1, 0) - r(0, 1)) / s,
                x: (r(0, 2) + r(2, 0)) / s,
                y: (r(1, 2) + r(2, 1)) / s,
                z: 0.25 * s,
            }
        }
    }

    pub fn rotate(&self, v: Dir4) -> Dir4 {
        self.to_matrix().mul_vec(v)
    }

    pub fn approx_eq(&self, other: &Quat, eps: f64) -> bool {
        (self.x - other.x).abs() <= eps
            && (self.y - other.y).abs() <= eps
            && (self.z - other.z).abs() <= eps
            && (self.w - other.w).abs() <= eps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    const EPS: f64 = 1e-9;

    fn quarter_turn_y() -> Quat {
        Quat::from_axis_angle(Vec4::dir(0.0, 1.0, 0.0), FRAC_PI_2).unwrap()
    }

    #[test]
    fn axis_angle_uses_half_angle() {
        let q = Quat::from_axis_angle(Vec4::dir(0.0, 0.0, 2.0), PI).unwrap();
        assert!(q.approx_eq(&Quat::new(0.0, 0.0, 1.0, 0.0), EPS));
    }

    #[test]
    fn zero_axis_is_rejected() {
        let err = Quat::from_axis_angle(Vec4::dir(0.0, 0.0, 0.0), 1.0);
        assert!(matches!(err, Err(SceneError::InvalidAxis)));
    }

    #[test]
    fn matrix_agrees_with_axis_rotation() {
        let q = quarter_turn_y();
        let m = Mat4::rotation(Vec4::dir(0.0, 1.0, 0.0), FRAC_PI_2);
        assert!(q.to_matrix().approx_eq(&m, EPS));
    }

    #[test]
    fn inverse_is_conjugate_over_squared_norm() {
        let q = Quat::new(1.0, 2.0, 3.0, 4.0);
        let product = q.mul(&q.inverse().unwrap());
        assert!(product.approx_eq(&Quat::IDENTITY, EPS));
        assert!(Quat::new(0.0, 0.0, 0.0, 0.0).inverse().is_err());
    }

    #[test]
    fn product_composes_rotations() {
        let q = quarter_turn_y();
        let half = q.mul(&q);
        let v = half.rotate(Vec4::dir(1.0, 0.0, 0.0));
        assert!(v.approx_eq(Vec4::dir(-1.0, 0.0, 0.0), EPS));
    }

    #[test]
    fn slerp_hits_endpoints() {
        let q0 = Quat::IDENTITY;
        let q1 = quarter_turn_y();
        assert!(q0.slerp(&q1, 0.0).approx_eq(&q0, EPS));
        assert!(q0.slerp(&q1, 1.0).approx_eq(&q1, EPS));
    }

    #[test]
    fn slerp_midpoint_is_half_rotation() {
        let q1 = quarter_turn_y();
        let mid = Quat::IDENTITY.slerp(&q1, 0.5);
        let expected = Quat::from_axis_angle(Vec4::dir(0.0, 1.0, 0.0), FRAC_PI_2 / 2.0).unwrap();
        assert!(mid.approx_eq(&expected, EPS));
        assert_relative_eq!(mid.norm_squared(), 1.0, epsilon = EPS);
    }

    #[test]
    fn slerp_of_equal_endpoints_is_constant() {
        let q = Quat::from_axis_angle(Vec4::dir(1.0, 2.0, 3.0), 0.8).unwrap();
        for i in 0..=10 {
            let t = i as f64 / 10.0;
            assert!(q.slerp(&q, t).approx_eq(&q, EPS));
        }
    }

    #[test]
    fn round_trip_through_matrix() {
        for angle in [0.3, 2.0, PI - 0.01, 3.0] {
            let q = Quat::from_axis_angle(Vec4::dir(-1.0, 0.5, 2.0), angle).unwrap();
            let back = Quat::from_rotation_matrix(&q.to_matrix());
            // q and -q are the same rotation.
            let same = back.approx_eq(&q, 1e-9) || back.approx_eq(&q.scale(-1.0), 1e-9);
            assert!(same, "{:?} != {:?}", back, q);
        }
    }
}
