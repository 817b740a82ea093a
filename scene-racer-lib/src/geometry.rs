//
// geometry.rs: Ray intersection with the primitive shapes.
//
// Both routines return `None` for a miss. A returned hit is not
// necessarily in front of the ray origin; see `SphereRoots`.
//

use crate::ray::{Intersection, Ray};
use crate::vec4::*;

// Which of the two roots of the sphere equation is reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SphereRoots {
    // The algebraically smaller root, even if it is behind the ray
    // origin. A ray starting inside the sphere then reports a hit
    // behind itself, which the nearest-hit test throws away.
    #[default]
    Smaller,
    // The smallest root that is not behind the ray origin.
    NearestForward,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sphere {
    pub center: Point4,
    pub radius: f64,
}

pub const UNIT_SPHERE: Sphere = Sphere {
    center: Vec4::point(0.0, 0.0, 0.0),
    radius: 1.0,
};

impl Sphere {
    // Expects a unit-length ray direction, which turns the quadratic
    // into t^2 + 2(D.L)t + (L.L - r^2) = 0.
    pub fn intersect(&self, ray: &Ray, roots: SphereRoots) -> Option<Intersection> {
        let l = ray.origin.sub(self.center).xyz();
        let half_b = ray.direction.dot(l);
        let c = l.dot(l) - self.radius * self.radius;
        let disc = half_b * half_b - c;
        if disc < 0.0 {
            return None;
        }

        let root = disc.sqrt();
        let (near, far) = (-half_b - root, -half_b + root);
        let t = match roots {
            SphereRoots::Smaller => near,
            SphereRoots::NearestForward if near >= 0.0 => near,
            SphereRoots::NearestForward if far >= 0.0 => far,
            SphereRoots::NearestForward => return None,
        };

        let point = ray.at(t);
        Some(Intersection {
            t,
            point,
            normal: point.sub(self.center).xyz().norm(),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AABox {
    pub min: Point4,
    pub max: Point4,
}

pub const UNIT_AABOX: AABox = AABox {
    min: Vec4::point(-0.5, -0.5, -0.5),
    max: Vec4::point(0.5, 0.5, 0.5),
};

impl AABox {
    // Slab method. The reported hit is where the ray enters the box,
    // or where it leaves if it starts inside. The normal points out
    // of the face that was crossed.
    pub fn intersect(&self, ray: &Ray) -> Option<Intersection> {
        let o = ray.origin.to_array();
        let d = ray.direction.to_array();
        let lo = self.min.to_array();
        let hi = self.max.to_array();

        let mut t_near = f64::NEG_INFINITY;
        let mut t_far = f64::INFINITY;
        let mut near_axis = None;
        let mut far_axis = None;

        for axis in 0..3 {
            if d[axis] == 0.0 {
                // Parallel to this slab: either always inside it or
                // never.
                if o[axis] < lo[axis] || o[axis] > hi[axis] {
                    return None;
                }
                continue;
            }
            let inv = d[axis].recip();
            let mut t0 = (lo[axis] - o[axis]) * inv;
            let mut t1 = (hi[axis] - o[axis]) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            if t0 > t_near {
                t_near = t0;
                near_axis = Some(axis);
            }
            if t1 < t_far {
                t_far = t1;
                far_axis = Some(axis);
            }
        }

        if t_near > t_far || t_far < 0.0 {
            return None;
        }

        let (t, axis, outward) = if t_near >= 0.0 {
            (t_near, near_axis?, -d[near_axis?].signum())
        } else {
            (t_far, far_axis?, d[far_axis?].signum())
        };
        let mut normal = [0.0; 3];
        normal[axis] = outward;

        Some(Intersection {
            t,
            point: ray.at(t),
            normal: Vec4::dir(normal[0], normal[1], normal[2]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ray(origin: Point4, direction: Dir4) -> Ray {
        Ray::new(origin, direction)
    }

    #[test]
    fn ray_through_sphere_center_from_either_side() {
        for z in [5.0, -5.0] {
            let r = ray(Vec4::point(0.0, 0.0, z), Vec4::dir(0.0, 0.0, -z));
            let hit = UNIT_SPHERE.intersect(&r, SphereRoots::Smaller).unwrap();
            assert_relative_eq!(hit.t, 4.0, epsilon = 1e-12);
            assert!(hit.normal.approx_eq(Vec4::dir(0.0, 0.0, z.signum()), 1e-12));
        }
    }

    #[test]
    fn offset_ray_misses_sphere() {
        let r = ray(Vec4::point(0.0, 1.5, 5.0), Vec4::dir(0.0, 0.0, -1.0));
        assert_eq!(UNIT_SPHERE.intersect(&r, SphereRoots::Smaller), None);
        assert_eq!(UNIT_SPHERE.intersect(&r, SphereRoots::NearestForward), None);
    }

    #[test]
    fn grazing_ray_touches_sphere() {
        let r = ray(Vec4::point(0.0, 1.0, 5.0), Vec4::dir(0.0, 0.0, -1.0));
        let hit = UNIT_SPHERE.intersect(&r, SphereRoots::Smaller).unwrap();
        assert_relative_eq!(hit.t, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn origin_inside_sphere() {
        let r = ray(Vec4::point(0.0, 0.0, 0.0), Vec4::dir(0.0, 0.0, 1.0));
        let smaller = UNIT_SPHERE.intersect(&r, SphereRoots::Smaller).unwrap();
        assert_relative_eq!(smaller.t, -1.0, epsilon = 1e-12);
        assert!(!smaller.is_forward());

        let forward = UNIT_SPHERE.intersect(&r, SphereRoots::NearestForward).unwrap();
        assert_relative_eq!(forward.t, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn sphere_behind_ray() {
        let r = ray(Vec4::point(0.0, 0.0, 5.0), Vec4::dir(0.0, 0.0, 1.0));
        let smaller = UNIT_SPHERE.intersect(&r, SphereRoots::Smaller).unwrap();
        assert_relative_eq!(smaller.t, -6.0, epsilon = 1e-12);
        assert_eq!(UNIT_SPHERE.intersect(&r, SphereRoots::NearestForward), None);
    }

    #[test]
    fn offset_sphere() {
        let sphere = Sphere {
            center: Vec4::point(2.0, 0.0, 0.0),
            radius: 0.5,
        };
        let r = ray(Vec4::point(0.0, 0.0, 0.0), Vec4::dir(1.0, 0.0, 0.0));
        let hit = sphere.intersect(&r, SphereRoots::Smaller).unwrap();
        assert_relative_eq!(hit.t, 1.5, epsilon = 1e-12);
        assert!(hit.normal.approx_eq(Vec4::dir(-1.0, 0.0, 0.0), 1e-12));
    }

    #[test]
    fn box_hit_along_minus_z() {
        let r = ray(Vec4::point(0.0, 0.0, 5.0), Vec4::dir(0.0, 0.0, -1.0));
        let hit = UNIT_AABOX.intersect(&r).unwrap();
        assert_relative_eq!(hit.t, 4.5, epsilon = 1e-12);
        assert_eq!(hit.normal, Vec4::dir(0.0, 0.0, 1.0));
        assert!(hit.point.approx_eq(Vec4::point(0.0, 0.0, 0.5), 1e-12));
    }

    #[test]
    fn box_hit_on_side_face() {
        let r = ray(Vec4::point(-3.0, 0.2, 0.1), Vec4::dir(1.0, 0.0, 0.0));
        let hit = UNIT_AABOX.intersect(&r).unwrap();
        assert_relative_eq!(hit.t, 2.5, epsilon = 1e-12);
        assert_eq!(hit.normal, Vec4::dir(-1.0, 0.0, 0.0));
    }

    #[test]
    fn box_miss_and_behind() {
        let miss = ray(Vec4::point(0.0, 1.0, 5.0), Vec4::dir(0.0, 0.0, -1.0));
        assert_eq!(UNIT_AABOX.intersect(&miss), None);

        let behind = ray(Vec4::point(0.0, 0.0, 5.0), Vec4::dir(0.0, 0.0, 1.0));
        assert_eq!(UNIT_AABOX.intersect(&behind), None);

        let diagonal_miss = ray(Vec4::point(2.0, 0.0, 5.0), Vec4::dir(0.0, 1.0, -1.0));
        assert_eq!(UNIT_AABOX.intersect(&diagonal_miss), None);
    }

    #[test]
    fn box_from_inside_reports_exit() {
        let r = ray(Vec4::point(0.0, 0.0, 0.0), Vec4::dir(0.0, 1.0, 0.0));
        let hit = UNIT_AABOX.intersect(&r).unwrap();
        assert_relative_eq!(hit.t, 0.5, epsilon = 1e-12);
        assert_eq!(hit.normal, Vec4::dir(0.0, 1.0, 0.0));
    }
}
