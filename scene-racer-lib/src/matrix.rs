//
// matrix.rs: 4x4 matrices for homogeneous transforms.
//
// Constructors take values in row-major order (the way they're
// written down on paper), while storage is column-major, matching
// what shader uniform upload expects.
//

use crate::vec4::*;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mat4 {
    data: [f64; 16],
}

impl Default for Mat4 {
    fn default() -> Self {
        Mat4::identity()
    }
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4 {
        data: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    pub fn from_rows(rows: [f64; 16]) -> Mat4 {
        let mut data = [0.0; 16];
        for row in 0..4 {
            for col in 0..4 {
                data[col * 4 + row] = rows[row * 4 + col];
            }
        }
        Mat4 { data }
    }

    pub fn to_rows(&self) -> [f64; 16] {
        let mut rows = [0.0; 16];
        for row in 0..4 {
            for col in 0..4 {
                rows[row * 4 + col] = self.get(row, col);
            }
        }
        rows
    }

    // Raw column-major storage.
    pub fn as_columns(&self) -> &[f64; 16] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[col * 4 + row]
    }

    pub fn set(&mut self, row: usize, col: usize, val: f64) {
        self.data[col * 4 + row] = val;
    }

    pub fn identity() -> Mat4 {
        Mat4::IDENTITY
    }

    pub fn translation(t: Vec4) -> Mat4 {
        let mut m = Mat4::identity();
        m.set(0, 3, t.x);
        m.set(1, 3, t.y);
        m.set(2, 3, t.z);
        m
    }

    pub fn scaling(s: Vec4) -> Mat4 {
        let mut m = Mat4::identity();
        m.set(0, 0, s.x);
        m.set(1, 1, s.y);
        m.set(2, 2, s.z);
        m
    }

    // Rotation by `angle` radians (right-handed) around `axis`. Axes
    // along x, y or z use the plain 2x2 block; anything else goes
    // through Rodrigues' formula. A zero axis yields the identity.
    pub fn rotation(axis: Dir4, angle: f64) -> Mat4 {
        let a = axis.xyz().norm();
        let (s, c) = angle.sin_cos();
        let mut m = Mat4::identity();

        let cardinal = |p: f64, q: f64, r: f64| p.abs() == 1.0 && q == 0.0 && r == 0.0;
        if cardinal(a.x, a.y, a.z) {
            let s = s * a.x.signum();
            m.set(1, 1, c);
            m.set(1, 2, -s);
            m.set(2, 1, s);
            m.set(2, 2, c);
        } else if cardinal(a.y, a.x, a.z) {
            let s = s * a.y.signum();
            m.set(0, 0, c);
            m.set(0, 2, s);
            m.set(2, 0, -s);
            m.set(2, 2, c);
        } else if cardinal(a.z, a.x, a.y) {
            let s = s * a.z.signum();
            m.set(0, 0, c);
            m.set(0, 1, -s);
            m.set(1, 0, s);
            m.set(1, 1, c);
        } else if a.len() > 0.0 {
            let t = 1.0 - c;
            let (x, y, z) = (a.x, a.y, a.z);
            m = Mat4::from_rows([
                t * x * x + c,
                t * x * y - s * z,
                t * x * z + s * y,
                0.0,
                t * x * y + s * z,
                t * y * y + c,
                t * y * z - s * x,
                0.0,
                t * x * z - s * y,
                t * y * z + s * x,
                t * z * z + c,
                0.0,
                0.0,
                0.0,
                0.0,
                1.0,
            ]);
        }
        m
    }

    // View matrix: rotate the world into the camera basis after
    // moving the eye to the origin.
    pub fn look_at(eye: Point4, center: Point4, up: Dir4) -> Mat4 {
        let f = center.sub(eye).xyz().norm();
        let s = f.cross(up).norm();
        let u = s.cross(f).norm();

        let rotate = Mat4::from_rows([
            s.x, s.y, s.z, 0.0, //
            u.x, u.y, u.z, 0.0, //
            -f.x, -f.y, -f.z, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]);
        rotate.mul(&Mat4::translation(eye.xyz().scale(-1.0)))
    }

    pub fn frustum(left: f64, right: f64, bottom: f64, top: f64, near: f64, far: f64) -> Mat4 {
        let a = (right + left) / (right - left);
        let b = (top + bottom) / (top - bottom);
        let c = -((far + near) / (far - near));
        let d = -((2.0 * far * near) / (far - near));
        let i = 2.0 * near / (right - left);
        let j = 2.0 * near / (top - bottom);
        Mat4::from_rows([
            i, 0.0, a, 0.0, //
            0.0, j, b, 0.0, //
            0.0, 0.0, c, d, //
            0.0, 0.0, -1.0, 0.0,
        ])
    }

    // `fovy` is in degrees, as cameras are configured that way.
    pub fn perspective(fovy: f64, aspect: f64, near: f64, far: f64) -> Mat4 {
        let top = near * (fovy.to_radians() * 0.5).tan();
        let right = top * aspect;
        Mat4::frustum(-right, right, -top, top, near, far)
    }

    pub fn mul(&self, other: &Mat4) -> Mat4 {
        let mut out = Mat4 { data: [0.0; 16] };
        for row in 0..4 {
            for col in 0..4 {
                let v = (0..4).map(|k| self.get(row, k) * other.get(k, col)).sum();
                out.set(row, col, v);
            }
        }
        out
    }

    pub fn mul_vec(&self, v: Vec4) -> Vec4 {
        let v = v.to_array();
        let row = |r: usize| (0..4).map(|k| self.get(r, k) * v[k]).sum::<f64>();
        Vec4::new(row(0), row(1), row(2), row(3))
    }

    pub fn transpose(&self) -> Mat4 {
        let mut out = *self;
        for row in 0..4 {
            for col in 0..4 {
                out.set(row, col, self.get(col, row));
            }
        }
        out
    }

    // Given the inverse of a model matrix, build the matrix that
    // carries normals to world space: the inverse-transpose, with the
    // translation part cleared.
    pub fn normal_from_inverse(&self) -> Mat4 {
        let mut n = self.transpose();
        for col in 0..3 {
            n.set(3, col, 0.0);
            n.set(col, 3, 0.0);
        }
        n.set(3, 3, 1.0);
        n
    }

    pub fn column(&self, col: usize) -> Vec4 {
        Vec4::new(
            self.get(0, col),
            self.get(1, col),
            self.get(2, col),
            self.get(3, col),
        )
    }

    // The point the matrix maps the origin to.
    pub fn position(&self) -> Point4 {
        Vec4::point(self.get(0, 3), self.get(1, 3), self.get(2, 3))
    }

    pub fn determinant3(&self) -> f64 {
        let m = |r, c| self.get(r, c);
        m(0, 0) * (m(1, 1) * m(2, 2) - m(1, 2) * m(2, 1))
            - m(0, 1) * (m(1, 0) * m(2, 2) - m(1, 2) * m(2, 0))
            + m(0, 2) * (m(1, 0) * m(2, 1) - m(1, 1) * m(2, 0))
    }

    pub fn approx_eq(&self, other: &Mat4, eps: f64) -> bool {
        self.data
            .iter()
            .zip(other.data.iter())
            .all(|(a, b)| (a - b).abs() <= eps)
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}
