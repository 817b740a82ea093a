//
// shading.rs: Colours and the Phong lighting model used by the ray
// tracer.
//

use serde::{Deserialize, Serialize};

use crate::ray::Intersection;
use crate::vec4::*;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Colour {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Colour {
    pub const BLACK: Colour = Colour::new(0.0, 0.0, 0.0);

    pub const fn new(r: f64, g: f64, b: f64) -> Colour {
        Colour { r, g, b }
    }

    pub fn scale(&self, m: f64) -> Colour {
        Colour::new(self.r * m, self.g * m, self.b * m)
    }

    pub fn add(&self, rhs: Colour) -> Colour {
        Colour::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b)
    }

    pub fn clamp(&self) -> Colour {
        Colour::new(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
        )
    }

    pub fn to_rgba8(&self) -> [u8; 4] {
        let c = self.clamp();
        let byte = |v: f64| (v * 255.0).round() as u8;
        [byte(c.r), byte(c.g), byte(c.b), 255]
    }
}

// Weights of the three Phong terms.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhongFactors {
    pub ambient: f64,
    pub diffuse: f64,
    pub specular: f64,
    pub shininess: f64,
}

// Colour of a surface of `colour` at `hit`, lit by white point lights
// at `lights` and seen from `eye`.
pub fn phong(
    colour: Colour,
    hit: &Intersection,
    lights: &[Point4],
    eye: Point4,
    factors: &PhongFactors,
) -> Colour {
    let n = hit.normal;
    let view = eye.sub(hit.point).xyz().norm();

    let mut diffuse = 0.0;
    let mut specular = 0.0;
    for light in lights {
        let l = light.sub(hit.point).xyz().norm();
        let n_dot_l = n.dot(l);
        diffuse += n_dot_l.max(0.0);
        if n_dot_l > 0.0 {
            let r = n.scale(2.0 * n_dot_l).sub(l);
            specular += r.dot(view).max(0.0).powf(factors.shininess);
        }
    }

    colour
        .scale(factors.ambient)
        .add(colour.scale(factors.diffuse * diffuse))
        .add(colour.scale(factors.specular * specular))
        .clamp()
}
