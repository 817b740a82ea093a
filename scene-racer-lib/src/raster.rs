//
// raster.rs: Rasteriser-side traversal.
//
// The GPU work itself lives behind the `Shader`, `Renderable` and
// `RenderableFactory` traits: a setup pass asks the factory for one
// renderable per drawable leaf, and each frame the raster visitor
// uploads the per-leaf uniforms and asks that renderable to draw.
//

use std::collections::HashMap;

use crate::camera::RasterCamera;
use crate::error::SceneError;
use crate::matrix::Mat4;
use crate::scene::*;
use crate::vec4::*;
use crate::visitor::{traverse, TransformStack, Visitor};

// Uniform names shared with the shader sources.
pub const MODEL: &str = "M";
pub const VIEW: &str = "V";
pub const PROJECTION: &str = "P";
pub const NORMAL: &str = "N";
pub const LIGHT_POSITIONS: &str = "lightPositions";
pub const AMBIENT_FACTOR: &str = "ambientFactor";
pub const DIFFUSE_FACTOR: &str = "diffuseFactor";
pub const SPECULAR_FACTOR: &str = "specularFactor";

pub trait Shader {
    // Make this the active program.
    fn bind(&mut self);
    fn set_matrix(&mut self, name: &str, m: &Mat4);
    fn set_float(&mut self, name: &str, v: f64);
    fn set_vec4_array(&mut self, name: &str, v: &[Vec4]);
}

pub trait Renderable {
    // Issue the draw calls, with `shader` bound and its uniforms set.
    fn render(&self, shader: &mut dyn Shader);
}

pub trait RenderableFactory {
    fn sphere(&mut self, node: &SphereNode) -> Box<dyn Renderable>;
    fn aabox(&mut self, node: &AABoxNode) -> Box<dyn Renderable>;
    fn texture_box(&mut self, node: &TextureBoxNode) -> Box<dyn Renderable>;
    fn pyramid(&mut self, node: &PyramidNode) -> Box<dyn Renderable>;
    fn obj(&mut self, node: &ObjNode) -> Box<dyn Renderable>;
}

pub type Renderables = HashMap<NodeId, Box<dyn Renderable>>;

////////////////////////////////////////////////////////////////////////
// Setup pass
//

pub struct RasterSetupVisitor<'a> {
    factory: &'a mut dyn RenderableFactory,
    renderables: Renderables,
}

impl<'a> RasterSetupVisitor<'a> {
    // Create the renderables for every drawable leaf reachable from
    // the root.
    pub fn setup(scene: &Scene, factory: &'a mut dyn RenderableFactory) -> Result<Renderables, SceneError> {
        let mut visitor = RasterSetupVisitor {
            factory,
            renderables: HashMap::new(),
        };
        traverse(scene, scene.root(), &mut TransformStack::new(), &mut visitor)?;
        log::debug!("set up {} renderables", visitor.renderables.len());
        Ok(visitor.renderables)
    }

    fn insert(&mut self, id: NodeId, renderable: Box<dyn Renderable>) {
        log::trace!("renderable for {}", id);
        self.renderables.insert(id, renderable);
    }
}

impl Visitor for RasterSetupVisitor<'_> {
    fn visit_sphere(&mut self, id: NodeId, node: &SphereNode, _: &TransformStack) -> Result<(), SceneError> {
        let r = self.factory.sphere(node);
        self.insert(id, r);
        Ok(())
    }

    fn visit_aabox(&mut self, id: NodeId, node: &AABoxNode, _: &TransformStack) -> Result<(), SceneError> {
        let r = self.factory.aabox(node);
        self.insert(id, r);
        Ok(())
    }

    fn visit_texture_box(&mut self, id: NodeId, node: &TextureBoxNode, _: &TransformStack) -> Result<(), SceneError> {
        let r = self.factory.texture_box(node);
        self.insert(id, r);
        Ok(())
    }

    fn visit_pyramid(&mut self, id: NodeId, node: &PyramidNode, _: &TransformStack) -> Result<(), SceneError> {
        let r = self.factory.pyramid(node);
        self.insert(id, r);
        Ok(())
    }

    fn visit_obj(&mut self, id: NodeId, node: &ObjNode, _: &TransformStack) -> Result<(), SceneError> {
        let r = self.factory.obj(node);
        self.insert(id, r);
        Ok(())
    }

    fn visit_light(&mut self, _: NodeId, _: &LightNode, _: &TransformStack) -> Result<(), SceneError> {
        Ok(())
    }

    fn visit_camera(&mut self, _: NodeId, _: &CameraNode, _: &TransformStack) -> Result<(), SceneError> {
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////
// Per-frame draw pass
//

// Per-frame values, the same for every leaf.
struct FrameUniforms<'a> {
    view: Mat4,
    projection: Mat4,
    lights: &'a [Point4],
    ambient: f64,
    diffuse: f64,
    specular: f64,
}

pub struct RasterVisitor<'a> {
    phong_shader: &'a mut dyn Shader,
    texture_shader: &'a mut dyn Shader,
    renderables: &'a Renderables,
}

// Drawing with one shader or the other.
enum Program {
    Phong,
    Texture,
}

impl<'a> RasterVisitor<'a> {
    pub fn new(
        phong_shader: &'a mut dyn Shader,
        texture_shader: &'a mut dyn Shader,
        renderables: &'a Renderables,
    ) -> RasterVisitor<'a> {
        RasterVisitor {
            phong_shader,
            texture_shader,
            renderables,
        }
    }

    pub fn render(
        &mut self,
        scene: &Scene,
        camera: &RasterCamera,
        lights: &[Point4],
        ambient: f64,
        diffuse: f64,
        specular: f64,
    ) -> Result<(), SceneError> {
        let mut frame = FrameVisitor {
            raster: self,
            uniforms: FrameUniforms {
                view: camera.view_matrix(),
                projection: camera.projection_matrix(),
                lights,
                ambient,
                diffuse,
                specular,
            },
        };
        traverse(scene, scene.root(), &mut TransformStack::new(), &mut frame)
    }
}

// The raster visitor plus the uniforms of the frame being drawn.
struct FrameVisitor<'r, 'a, 'l> {
    raster: &'r mut RasterVisitor<'a>,
    uniforms: FrameUniforms<'l>,
}

impl FrameVisitor<'_, '_, '_> {
    fn draw(&mut self, id: NodeId, program: Program, stack: &TransformStack) -> Result<(), SceneError> {
        let renderable = self
            .raster
            .renderables
            .get(&id)
            .ok_or(SceneError::MissingRenderable(id))?;
        let shader: &mut dyn Shader = match program {
            Program::Phong => &mut *self.raster.phong_shader,
            Program::Texture => &mut *self.raster.texture_shader,
        };
        let u = &self.uniforms;

        shader.bind();
        shader.set_matrix(MODEL, stack.to_world());
        shader.set_matrix(VIEW, &u.view);
        shader.set_matrix(PROJECTION, &u.projection);
        shader.set_matrix(NORMAL, &stack.from_world().normal_from_inverse());
        shader.set_vec4_array(LIGHT_POSITIONS, u.lights);
        shader.set_float(AMBIENT_FACTOR, u.ambient);
        shader.set_float(DIFFUSE_FACTOR, u.diffuse);
        shader.set_float(SPECULAR_FACTOR, u.specular);
        renderable.render(shader);
        Ok(())
    }
}

impl Visitor for FrameVisitor<'_, '_, '_> {
    fn visit_sphere(&mut self, id: NodeId, _: &SphereNode, stack: &TransformStack) -> Result<(), SceneError> {
        self.draw(id, Program::Phong, stack)
    }

    fn visit_aabox(&mut self, id: NodeId, _: &AABoxNode, stack: &TransformStack) -> Result<(), SceneError> {
        self.draw(id, Program::Phong, stack)
    }

    fn visit_texture_box(&mut self, id: NodeId, _: &TextureBoxNode, stack: &TransformStack) -> Result<(), SceneError> {
        self.draw(id, Program::Texture, stack)
    }

    fn visit_pyramid(&mut self, id: NodeId, _: &PyramidNode, stack: &TransformStack) -> Result<(), SceneError> {
        self.draw(id, Program::Phong, stack)
    }

    fn visit_obj(&mut self, id: NodeId, _: &ObjNode, stack: &TransformStack) -> Result<(), SceneError> {
        self.draw(id, Program::Phong, stack)
    }

    fn visit_light(&mut self, _: NodeId, _: &LightNode, _: &TransformStack) -> Result<(), SceneError> {
        Ok(())
    }

    fn visit_camera(&mut self, _: NodeId, _: &CameraNode, _: &TransformStack) -> Result<(), SceneError> {
        Ok(())
    }
}
