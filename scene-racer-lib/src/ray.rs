//
// ray.rs: Rays and the result of intersecting them with geometry.
//

use crate::matrix::Mat4;
use crate::vec4::*;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point4,
    // Always unit length, unless constructed from a zero vector.
    pub direction: Dir4,
}

impl Ray {
    pub fn new(origin: Point4, direction: Dir4) -> Ray {
        Ray {
            origin,
            direction: direction.xyz().norm(),
        }
    }

    pub fn at(&self, t: f64) -> Point4 {
        self.origin.add(self.direction.scale(t))
    }

    // Carry the ray into another frame. The direction is
    // renormalised, so `t` values are not preserved under scaling.
    pub fn transform(&self, m: &Mat4) -> Ray {
        Ray::new(m.mul_vec(self.origin), m.mul_vec(self.direction))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intersection {
    // Ray parameter of the hit.
    pub t: f64,
    pub point: Point4,
    // Unit normal at the hit.
    pub normal: Dir4,
}

impl Intersection {
    // A hit that can be shown: in front of the ray origin and not
    // the product of a degenerate calculation.
    pub fn is_forward(&self) -> bool {
        self.t >= 0.0 && self.t.is_finite()
    }

    pub fn closer_than(&self, other: &Intersection) -> bool {
        self.t < other.t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_renormalises_direction() {
        let ray = Ray::new(Vec4::point(0.0, 0.0, 5.0), Vec4::dir(0.0, 0.0, -1.0));
        let half = Mat4::scaling(Vec4::dir(0.5, 0.5, 0.5));
        let local = ray.transform(&half);
        assert_eq!(local.origin, Vec4::point(0.0, 0.0, 2.5));
        assert_eq!(local.direction, Vec4::dir(0.0, 0.0, -1.0));
    }

    #[test]
    fn negative_t_is_not_forward() {
        let hit = Intersection {
            t: -0.5,
            point: Vec4::point(0.0, 0.0, 0.0),
            normal: Vec4::dir(0.0, 1.0, 0.0),
        };
        assert!(!hit.is_forward());
    }
}
