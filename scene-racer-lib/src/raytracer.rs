//
// raytracer.rs: Software ray tracer over the scene graph.
//
// One primary ray per pixel, no shadows or reflections. Each ray walks
// the whole graph; spheres and boxes are intersected in object space
// against the unit primitives, and the nearest forward hit is shaded
// with Phong lighting.
//

use image::RgbaImage;
use rayon::prelude::*;

use crate::camera::RayCamera;
use crate::error::SceneError;
use crate::geometry::*;
use crate::ray::{Intersection, Ray};
use crate::scene::*;
use crate::shading::{phong, Colour, PhongFactors};
use crate::vec4::*;
use crate::visitor::{traverse, TransformStack, Visitor};

// Default Phong exponent.
pub const SHININESS: f64 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TracerConfig {
    pub sphere_roots: SphereRoots,
    pub shininess: f64,
}

impl Default for TracerConfig {
    fn default() -> Self {
        TracerConfig {
            sphere_roots: SphereRoots::default(),
            shininess: SHININESS,
        }
    }
}

////////////////////////////////////////////////////////////////////////
// Per-ray visitor
//

enum Primitive {
    Sphere,
    AABox,
}

struct RayVisitor<'a> {
    config: &'a TracerConfig,
    // World-space ray being traced.
    ray: Ray,
    // Nearest forward hit so far, with the colour of what was hit.
    best: Option<(Intersection, Colour)>,
}

impl<'a> RayVisitor<'a> {
    fn new(config: &'a TracerConfig, ray: Ray) -> RayVisitor<'a> {
        RayVisitor {
            config,
            ray,
            best: None,
        }
    }

    fn reset(&mut self, ray: Ray) {
        self.ray = ray;
        self.best = None;
    }

    fn hit_unit(&mut self, primitive: Primitive, colour: Colour, stack: &TransformStack) {
        let local = self.ray.transform(stack.from_world());
        let hit = match primitive {
            Primitive::Sphere => UNIT_SPHERE.intersect(&local, self.config.sphere_roots),
            Primitive::AABox => UNIT_AABOX.intersect(&local),
        };
        let Some(hit) = hit else {
            return;
        };

        let point = stack.to_world().mul_vec(hit.point);
        let normal = stack
            .from_world()
            .normal_from_inverse()
            .mul_vec(hit.normal)
            .xyz()
            .norm();
        // Object-space t is scaled along with the geometry.
        let t = point.sub(self.ray.origin).dot(self.ray.direction);
        let hit = Intersection { t, point, normal };

        let closer = match &self.best {
            Some((best, _)) => hit.closer_than(best),
            None => true,
        };
        if hit.is_forward() && closer {
            self.best = Some((hit, colour));
        }
    }
}

impl Visitor for RayVisitor<'_> {
    fn visit_sphere(&mut self, _: NodeId, node: &SphereNode, stack: &TransformStack) -> Result<(), SceneError> {
        self.hit_unit(Primitive::Sphere, node.colour, stack);
        Ok(())
    }

    fn visit_aabox(&mut self, _: NodeId, node: &AABoxNode, stack: &TransformStack) -> Result<(), SceneError> {
        self.hit_unit(Primitive::AABox, node.colour, stack);
        Ok(())
    }

    // Textured boxes, pyramids and meshes are only drawn by the
    // rasteriser.
    fn visit_texture_box(&mut self, _: NodeId, _: &TextureBoxNode, _: &TransformStack) -> Result<(), SceneError> {
        Ok(())
    }

    fn visit_pyramid(&mut self, _: NodeId, _: &PyramidNode, _: &TransformStack) -> Result<(), SceneError> {
        Ok(())
    }

    fn visit_obj(&mut self, _: NodeId, _: &ObjNode, _: &TransformStack) -> Result<(), SceneError> {
        Ok(())
    }

    fn visit_light(&mut self, _: NodeId, _: &LightNode, _: &TransformStack) -> Result<(), SceneError> {
        Ok(())
    }

    fn visit_camera(&mut self, _: NodeId, _: &CameraNode, _: &TransformStack) -> Result<(), SceneError> {
        Ok(())
    }
}

// Whether the tracer draws a node. `None` for nodes that have no
// geometry at all.
pub fn is_ray_traced(node: &Node) -> Option<bool> {
    match node {
        Node::Sphere(_) | Node::AABox(_) => Some(true),
        Node::TextureBox(_) | Node::Pyramid(_) | Node::Obj(_) => Some(false),
        Node::Group(_) | Node::Light(_) | Node::Camera(_) => None,
    }
}

////////////////////////////////////////////////////////////////////////
// Renderer
//

#[derive(Clone, Copy, Debug, Default)]
pub struct RayTracer {
    pub config: TracerConfig,
}

impl RayTracer {
    pub fn new(config: TracerConfig) -> RayTracer {
        RayTracer { config }
    }

    // Nearest forward hit along `ray`, and the colour of the surface
    // hit.
    pub fn trace(&self, scene: &Scene, ray: Ray) -> Result<Option<(Intersection, Colour)>, SceneError> {
        let mut visitor = RayVisitor::new(&self.config, ray);
        traverse(scene, scene.root(), &mut TransformStack::new(), &mut visitor)?;
        Ok(visitor.best)
    }

    // Render the whole image. Rows are traced in parallel; the scene
    // is only read.
    pub fn render(
        &self,
        scene: &Scene,
        camera: &RayCamera,
        lights: &[Point4],
        ambient: f64,
        diffuse: f64,
        specular: f64,
    ) -> Result<RgbaImage, SceneError> {
        let too_large = || SceneError::ImageTooLarge {
            width: camera.width,
            height: camera.height,
        };
        let width = u32::try_from(camera.width).map_err(|_| too_large())?;
        let height = u32::try_from(camera.height).map_err(|_| too_large())?;
        camera
            .width
            .checked_mul(camera.height)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(too_large)?;

        let unsupported = scene
            .iter()
            .filter(|(_, node)| is_ray_traced(node) == Some(false))
            .count();
        if unsupported > 0 {
            log::debug!("{} leaves are not supported by the ray tracer", unsupported);
        }
        log::debug!(
            "tracing {}x{} image with {} lights",
            camera.width,
            camera.height,
            lights.len()
        );

        let factors = PhongFactors {
            ambient,
            diffuse,
            specular,
            shininess: self.config.shininess,
        };

        let render_row = |y: usize| -> Result<Vec<u8>, SceneError> {
            let mut v = Vec::with_capacity(camera.width * 4);
            let mut stack = TransformStack::new();
            let mut visitor = RayVisitor::new(&self.config, camera.make_ray(0, y));
            for x in 0..camera.width {
                visitor.reset(camera.make_ray(x, y));
                traverse(scene, scene.root(), &mut stack, &mut visitor)?;
                v.extend(match &visitor.best {
                    Some((hit, colour)) => phong(*colour, hit, lights, camera.origin, &factors).to_rgba8(),
                    None => [0, 0, 0, 0],
                });
            }
            Ok(v)
        };

        let rows = (0..camera.height)
            .into_par_iter()
            .map(render_row)
            .collect::<Result<Vec<Vec<u8>>, SceneError>>()?;

        let mut image = RgbaImage::new(width, height);
        image.copy_from_slice(&rows.concat());
        Ok(image)
    }
}
