//
// camera.rs: The two camera descriptions. The rasteriser wants a
// look-at/perspective pair, while the ray tracer wants an image plane
// to shoot rays through.
//

use serde::{Deserialize, Serialize};

use crate::matrix::Mat4;
use crate::ray::Ray;
use crate::vec4::*;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RasterCamera {
    pub eye: Point4,
    pub center: Point4,
    pub up: Dir4,
    // Vertical field of view, in degrees.
    pub fovy: f64,
    // Width / height.
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
}

impl RasterCamera {
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.eye, self.center, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective(self.fovy, self.aspect, self.near, self.far)
    }

    // Put the camera where a group node's world matrix puts its
    // origin, looking down the group's local -z.
    pub fn follow(&mut self, world: &Mat4) {
        self.eye = world.position();
        self.center = self.eye.add(world.mul_vec(Vec4::dir(0.0, 0.0, -1.0)).norm());
        self.up = world.mul_vec(Vec4::dir(0.0, 1.0, 0.0)).norm();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RayCamera {
    pub origin: Point4,
    // Image size in pixels.
    pub width: usize,
    pub height: usize,
    // Horizontal field of view, in radians.
    pub alpha: f64,
}

impl RayCamera {
    // Ray through the centre of pixel (x, y), with y growing
    // downwards. The camera looks along -z with y up.
    pub fn make_ray(&self, x: usize, y: usize) -> Ray {
        let (w, h) = (self.width as f64, self.height as f64);
        let direction = Vec4::dir(
            x as f64 - (w - 1.0) / 2.0,
            (h - 1.0) / 2.0 - y as f64,
            -((w / 2.0) / (self.alpha / 2.0).tan()),
        );
        Ray::new(self.origin, direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn centre_pixel_looks_down_minus_z() {
        let camera = RayCamera {
            origin: Vec4::point(0.0, 0.0, 0.0),
            width: 101,
            height: 51,
            alpha: FRAC_PI_2,
        };
        let ray = camera.make_ray(50, 25);
        assert!(ray.direction.approx_eq(Vec4::dir(0.0, 0.0, -1.0), 1e-12));
    }

    #[test]
    fn edge_pixel_matches_field_of_view() {
        let camera = RayCamera {
            origin: Vec4::point(0.0, 0.0, 0.0),
            width: 3,
            height: 1,
            alpha: FRAC_PI_2,
        };
        // With a 90 degree fov the plane is at distance w/2 = 1.5,
        // and the last pixel centre is 1 unit to the right.
        let ray = camera.make_ray(2, 0);
        let expected = Vec4::dir(1.0, 0.0, -1.5).norm();
        assert!(ray.direction.approx_eq(expected, 1e-12));
    }

    #[test]
    fn follow_uses_group_pose() {
        let mut camera = RasterCamera {
            eye: Vec4::point(0.0, 0.0, 0.0),
            center: Vec4::point(0.0, 0.0, -1.0),
            up: Vec4::dir(0.0, 1.0, 0.0),
            fovy: 60.0,
            aspect: 1.0,
            near: 0.1,
            far: 100.0,
        };
        let world = Mat4::translation(Vec4::dir(1.0, 2.0, 3.0))
            .mul(&Mat4::rotation(Vec4::dir(0.0, 1.0, 0.0), FRAC_PI_2));
        camera.follow(&world);
        assert_eq!(camera.eye, Vec4::point(1.0, 2.0, 3.0));
        // Local -z turned a quarter around y is world -x.
        assert!(camera.center.approx_eq(Vec4::point(0.0, 2.0, 3.0), 1e-12));
        assert!(camera.up.approx_eq(Vec4::dir(0.0, 1.0, 0.0), 1e-12));
    }
}
