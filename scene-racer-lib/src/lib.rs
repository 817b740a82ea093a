//
// lib.rs: Scene graph rendering, both through a rasteriser front-end
// and a software ray tracer.
//

pub mod animation;
pub mod camera;
pub mod error;
pub mod geometry;
pub mod matrix;
pub mod obj;
pub mod quaternion;
pub mod raster;
pub mod ray;
pub mod raytracer;
pub mod scene;
pub mod scene_file;
pub mod shading;
pub mod transformation;
pub mod vec4;
pub mod visitor;

pub use animation::{AnimationNode, Behaviour, Drive, Jump, Rotate, SlerpRotation};
pub use camera::{RasterCamera, RayCamera};
pub use error::SceneError;
pub use geometry::SphereRoots;
pub use matrix::Mat4;
pub use quaternion::Quat;
pub use raster::{RasterSetupVisitor, RasterVisitor, Renderable, RenderableFactory, Shader};
pub use raytracer::{RayTracer, TracerConfig};
pub use scene::{Node, NodeId, Scene, MAX_DEPTH};
pub use scene_file::{load_scene, save_scene, MatrixSnapshot, SceneDescription};
pub use shading::Colour;
pub use transformation::{TransformKind, Transformation};
pub use visitor::{light_positions, traverse, TransformStack, Visitor};
