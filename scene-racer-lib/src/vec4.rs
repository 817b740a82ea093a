//
// vec4.rs: Homogeneous 4-component vectors, used for both points
// and directions in the scene.
//

use serde::{Deserialize, Serialize};

use crate::error::SceneError;

// Lengths below this are treated as zero when normalising.
const MIN_LEN: f64 = 1.0e-12;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vec4 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    // Homogeneous coordinate: 1 for points, 0 for directions.
    pub w: f64,
}

// Provide a couple of type synonyms to distinguish between the usage
// as a point as and as a direction.
pub type Point4 = Vec4;
pub type Dir4 = Vec4;

impl Vec4 {
    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Vec4 {
        Vec4 { x, y, z, w }
    }

    pub const fn point(x: f64, y: f64, z: f64) -> Point4 {
        Vec4 { x, y, z, w: 1.0 }
    }

    pub const fn dir(x: f64, y: f64, z: f64) -> Dir4 {
        Vec4 { x, y, z, w: 0.0 }
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.x, self.y, self.z, self.w]
    }

    pub fn scale(&self, m: f64) -> Vec4 {
        Vec4 {
            x: self.x * m,
            y: self.y * m,
            z: self.z * m,
            w: self.w * m,
        }
    }

    pub fn add(&self, rhs: Vec4) -> Vec4 {
        Vec4 {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
            w: self.w + rhs.w,
        }
    }

    pub fn sub(&self, rhs: Vec4) -> Vec4 {
        Vec4 {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
            w: self.w - rhs.w,
        }
    }

    pub fn dot(&self, rhs: Vec4) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z + self.w * rhs.w
    }

    // 3D cross product; the result is always a direction.
    pub fn cross(&self, rhs: Vec4) -> Dir4 {
        Vec4 {
            x: self.y * rhs.z - self.z * rhs.y,
            y: self.z * rhs.x - self.x * rhs.z,
            z: self.x * rhs.y - self.y * rhs.x,
            w: 0.0,
        }
    }

    pub fn len(&self) -> f64 {
        self.dot(*self).sqrt()
    }

    // Zero-length vectors are returned unchanged rather than turned
    // into NaNs. Use `try_norm` where a zero vector is a caller error.
    pub fn norm(&self) -> Vec4 {
        let len = self.len();
        if len < MIN_LEN {
            *self
        } else {
            self.scale(len.recip())
        }
    }

    pub fn try_norm(&self) -> Result<Vec4, SceneError> {
        let len = self.len();
        if len < MIN_LEN || !len.is_finite() {
            return Err(SceneError::ZeroLength);
        }
        Ok(self.scale(len.recip()))
    }

    // Drop the homogeneous part, for 3D-only calculations on points.
    pub fn xyz(&self) -> Dir4 {
        Vec4 { w: 0.0, ..*self }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }

    pub fn approx_eq(&self, rhs: Vec4, eps: f64) -> bool {
        (self.x - rhs.x).abs() <= eps
            && (self.y - rhs.y).abs() <= eps
            && (self.z - rhs.z).abs() <= eps
            && (self.w - rhs.w).abs() <= eps
    }
}
