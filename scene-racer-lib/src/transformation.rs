//
// transformation.rs: The transform carried by each group node.
//
// A transformation is described by its parameters (`TransformKind`)
// and caches the matrix and its inverse. Both are rebuilt together,
// in closed form, every time a parameter changes, so there is no
// general matrix inversion anywhere.
//

use serde::{Deserialize, Serialize};

use crate::error::SceneError;
use crate::matrix::Mat4;
use crate::quaternion::Quat;
use crate::vec4::*;

// How far matrix * inverse may stray from identity before a stored
// pair is rejected.
pub const PAIR_TOLERANCE: f64 = 1.0e-5;

// Scale factors with a smaller magnitude have no usable inverse.
const MIN_SCALE: f64 = 1.0e-12;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformKind {
    Translation {
        offset: Vec4,
    },
    Rotation {
        axis: Dir4,
        angle: f64,
    },
    Scaling {
        factors: Vec4,
    },
    Sqt {
        scale: Vec4,
        rotation: Quat,
        translation: Vec4,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TransformKind", into = "TransformKind")]
pub struct Transformation {
    kind: TransformKind,
    matrix: Mat4,
    inverse: Mat4,
}

impl TryFrom<TransformKind> for Transformation {
    type Error = SceneError;

    fn try_from(kind: TransformKind) -> Result<Self, Self::Error> {
        Transformation::new(kind)
    }
}

impl From<Transformation> for TransformKind {
    fn from(t: Transformation) -> Self {
        t.kind
    }
}

impl Default for Transformation {
    fn default() -> Self {
        Transformation::translation(Vec4::dir(0.0, 0.0, 0.0))
    }
}

fn check_scale(s: Vec4) -> Result<(), SceneError> {
    for f in [s.x, s.y, s.z] {
        if f.abs() < MIN_SCALE || !f.is_finite() {
            return Err(SceneError::DegenerateScale(f));
        }
    }
    Ok(())
}

fn inverse_scale(s: Vec4) -> Vec4 {
    Vec4::dir(s.x.recip(), s.y.recip(), s.z.recip())
}

// Validate parameters, normalising the rotation axis and quaternion
// so that the kind stored is exactly what the matrices describe.
fn validate(kind: TransformKind) -> Result<TransformKind, SceneError> {
    Ok(match kind {
        TransformKind::Translation { offset } => TransformKind::Translation {
            offset: offset.xyz(),
        },
        TransformKind::Rotation { axis, angle } => TransformKind::Rotation {
            axis: axis.xyz().try_norm().map_err(|_| SceneError::InvalidAxis)?,
            angle,
        },
        TransformKind::Scaling { factors } => {
            check_scale(factors)?;
            TransformKind::Scaling {
                factors: factors.xyz(),
            }
        }
        TransformKind::Sqt {
            scale,
            rotation,
            translation,
        } => {
            check_scale(scale)?;
            TransformKind::Sqt {
                scale: scale.xyz(),
                rotation: rotation.normalize()?,
                translation: translation.xyz(),
            }
        }
    })
}

// Closed-form matrix and inverse for already-validated parameters.
fn matrices(kind: &TransformKind) -> (Mat4, Mat4) {
    match *kind {
        TransformKind::Translation { offset } => (
            Mat4::translation(offset),
            Mat4::translation(offset.scale(-1.0)),
        ),
        TransformKind::Rotation { axis, angle } => {
            let m = Mat4::rotation(axis, angle);
            (m, m.transpose())
        }
        TransformKind::Scaling { factors } => (
            Mat4::scaling(factors),
            Mat4::scaling(inverse_scale(factors)),
        ),
        TransformKind::Sqt {
            scale,
            rotation,
            translation,
        } => {
            let r = rotation.to_matrix();
            let m = Mat4::translation(translation)
                .mul(&r)
                .mul(&Mat4::scaling(scale));
            let inv = Mat4::scaling(inverse_scale(scale))
                .mul(&r.transpose())
                .mul(&Mat4::translation(translation.scale(-1.0)));
            (m, inv)
        }
    }
}

impl Transformation {
    pub fn new(kind: TransformKind) -> Result<Transformation, SceneError> {
        let kind = validate(kind)?;
        let (matrix, inverse) = matrices(&kind);
        Ok(Transformation {
            kind,
            matrix,
            inverse,
        })
    }

    pub fn translation(offset: Vec4) -> Transformation {
        let kind = TransformKind::Translation {
            offset: offset.xyz(),
        };
        let (matrix, inverse) = matrices(&kind);
        Transformation {
            kind,
            matrix,
            inverse,
        }
    }

    pub fn rotation(axis: Dir4, angle: f64) -> Result<Transformation, SceneError> {
        Transformation::new(TransformKind::Rotation { axis, angle })
    }

    pub fn scaling(factors: Vec4) -> Result<Transformation, SceneError> {
        Transformation::new(TransformKind::Scaling { factors })
    }

    pub fn sqt(scale: Vec4, rotation: Quat, translation: Vec4) -> Result<Transformation, SceneError> {
        Transformation::new(TransformKind::Sqt {
            scale,
            rotation,
            translation,
        })
    }

    // Rebuild from a saved matrix/inverse pair. The pair has to be a
    // real inverse pair and the matrix has to decompose into scale,
    // rotation and translation; the result is the equivalent SQT.
    pub fn from_matrices(matrix: &Mat4, inverse: &Mat4) -> Result<Transformation, SceneError> {
        let inconsistent = |what: &str| SceneError::InconsistentTransform(what.to_string());

        if !matrix.is_finite() || !inverse.is_finite() {
            return Err(inconsistent("non-finite entries"));
        }
        if !matrix.mul(inverse).approx_eq(&Mat4::identity(), PAIR_TOLERANCE) {
            return Err(inconsistent("matrix * inverse is not identity"));
        }
        let bottom = [matrix.get(3, 0), matrix.get(3, 1), matrix.get(3, 2), matrix.get(3, 3)];
        if bottom != [0.0, 0.0, 0.0, 1.0] {
            return Err(inconsistent("projective bottom row"));
        }

        let mut scale = Vec4::dir(
            matrix.column(0).len(),
            matrix.column(1).len(),
            matrix.column(2).len(),
        );
        if matrix.determinant3() < 0.0 {
            scale.x = -scale.x;
        }
        check_scale(scale).map_err(|_| inconsistent("degenerate scale"))?;

        let mut rot = Mat4::identity();
        let factors = [scale.x, scale.y, scale.z];
        for (col, f) in factors.iter().enumerate() {
            for row in 0..3 {
                rot.set(row, col, matrix.get(row, col) / f);
            }
        }
        if !rot.transpose().mul(&rot).approx_eq(&Mat4::identity(), PAIR_TOLERANCE) {
            return Err(inconsistent("matrix contains shear"));
        }

        let rebuilt = Transformation::sqt(
            scale,
            Quat::from_rotation_matrix(&rot),
            matrix.position().xyz(),
        )?;
        if !rebuilt.matrix.approx_eq(matrix, PAIR_TOLERANCE)
            || !rebuilt.inverse.approx_eq(inverse, PAIR_TOLERANCE)
        {
            return Err(inconsistent("decomposition does not reproduce the pair"));
        }
        Ok(rebuilt)
    }

    pub fn kind(&self) -> &TransformKind {
        &self.kind
    }

    pub fn matrix(&self) -> &Mat4 {
        &self.matrix
    }

    pub fn inverse_matrix(&self) -> &Mat4 {
        &self.inverse
    }

    // Replace the parameters wholesale. On error, the transformation
    // is left as it was.
    pub fn set_kind(&mut self, kind: TransformKind) -> Result<(), SceneError> {
        *self = Transformation::new(kind)?;
        Ok(())
    }

    // The same transform, expressed as scale, rotation and
    // translation.
    pub fn sqt_parts(&self) -> (Vec4, Quat, Vec4) {
        let one = Vec4::dir(1.0, 1.0, 1.0);
        let zero = Vec4::dir(0.0, 0.0, 0.0);
        match self.kind {
            TransformKind::Translation { offset } => (one, Quat::IDENTITY, offset),
            TransformKind::Rotation { axis, angle } => {
                (one, Quat::from_unit_axis(axis, angle), zero)
            }
            TransformKind::Scaling { factors } => (factors, Quat::IDENTITY, zero),
            TransformKind::Sqt {
                scale,
                rotation,
                translation,
            } => (scale, rotation, translation),
        }
    }

    // Switch to the SQT representation, so that the parts can be
    // updated independently.
    pub fn to_sqt(&mut self) {
        if matches!(self.kind, TransformKind::Sqt { .. }) {
            return;
        }
        let (scale, rotation, translation) = self.sqt_parts();
        self.kind = TransformKind::Sqt {
            scale,
            rotation,
            translation,
        };
        (self.matrix, self.inverse) = matrices(&self.kind);
    }

    pub fn translation_part(&self) -> Vec4 {
        self.sqt_parts().2
    }

    pub fn set_translation(&mut self, translation: Vec4) {
        if let TransformKind::Translation { .. } = self.kind {
            *self = Transformation::translation(translation);
            return;
        }
        self.to_sqt();
        if let TransformKind::Sqt { translation: t, .. } = &mut self.kind {
            *t = translation.xyz();
        }
        (self.matrix, self.inverse) = matrices(&self.kind);
    }

    pub fn set_rotation(&mut self, rotation: Quat) -> Result<(), SceneError> {
        let rotation = rotation.normalize()?;
        self.to_sqt();
        if let TransformKind::Sqt { rotation: r, .. } = &mut self.kind {
            *r = rotation;
        }
        (self.matrix, self.inverse) = matrices(&self.kind);
        Ok(())
    }

    pub fn set_scale(&mut self, scale: Vec4) -> Result<(), SceneError> {
        check_scale(scale)?;
        self.to_sqt();
        if let TransformKind::Sqt { scale: s, .. } = &mut self.kind {
            *s = scale.xyz();
        }
        (self.matrix, self.inverse) = matrices(&self.kind);
        Ok(())
    }
}
