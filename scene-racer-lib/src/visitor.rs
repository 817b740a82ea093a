//
// visitor.rs: Scene graph traversal shared by every renderer.
//
// Traversal keeps two parallel stacks: the accumulated object-to-world
// matrix, and its inverse. Entering a group pushes
//
//   world'   = world * local
//   inverse' = local_inverse * inverse
//
// (note the reversed order for the inverse), and leaving it pops both.
// Leaves only ever read the tops of the stacks.
//

use std::ops::{Deref, DerefMut};

use crate::error::SceneError;
use crate::matrix::Mat4;
use crate::scene::*;
use crate::transformation::Transformation;
use crate::vec4::*;

pub struct TransformStack {
    forward: Vec<Mat4>,
    inverse: Vec<Mat4>,
}

impl Default for TransformStack {
    fn default() -> Self {
        TransformStack::new()
    }
}

impl TransformStack {
    // Starts out with the identity on both stacks.
    pub fn new() -> TransformStack {
        TransformStack {
            forward: vec![Mat4::IDENTITY],
            inverse: vec![Mat4::IDENTITY],
        }
    }

    pub fn depth(&self) -> usize {
        self.forward.len()
    }

    // Object-to-world matrix for the current frame.
    pub fn to_world(&self) -> &Mat4 {
        self.forward.last().unwrap_or(&Mat4::IDENTITY)
    }

    // World-to-object matrix for the current frame.
    pub fn from_world(&self) -> &Mat4 {
        self.inverse.last().unwrap_or(&Mat4::IDENTITY)
    }

    // Enter a group's frame. The frame is left again when the
    // returned guard is dropped, whether that's through normal flow,
    // an early error return or a panic.
    pub fn push(&mut self, local: &Transformation) -> Pushed<'_> {
        let world = self.to_world().mul(local.matrix());
        let inverse = local.inverse_matrix().mul(self.from_world());
        self.forward.push(world);
        self.inverse.push(inverse);
        Pushed { stack: self }
    }
}

pub struct Pushed<'a> {
    stack: &'a mut TransformStack,
}

impl Deref for Pushed<'_> {
    type Target = TransformStack;

    fn deref(&self) -> &TransformStack {
        self.stack
    }
}

impl DerefMut for Pushed<'_> {
    fn deref_mut(&mut self) -> &mut TransformStack {
        self.stack
    }
}

impl Drop for Pushed<'_> {
    fn drop(&mut self) {
        self.stack.forward.pop();
        self.stack.inverse.pop();
    }
}

////////////////////////////////////////////////////////////////////////
// Visitor dispatch
//

// One method per leaf kind, and no defaults: adding a node kind means
// every renderer has to decide what to do with it.
pub trait Visitor {
    fn visit_sphere(&mut self, id: NodeId, node: &SphereNode, stack: &TransformStack) -> Result<(), SceneError>;
    fn visit_aabox(&mut self, id: NodeId, node: &AABoxNode, stack: &TransformStack) -> Result<(), SceneError>;
    fn visit_texture_box(&mut self, id: NodeId, node: &TextureBoxNode, stack: &TransformStack) -> Result<(), SceneError>;
    fn visit_pyramid(&mut self, id: NodeId, node: &PyramidNode, stack: &TransformStack) -> Result<(), SceneError>;
    fn visit_obj(&mut self, id: NodeId, node: &ObjNode, stack: &TransformStack) -> Result<(), SceneError>;
    fn visit_light(&mut self, id: NodeId, node: &LightNode, stack: &TransformStack) -> Result<(), SceneError>;
    fn visit_camera(&mut self, id: NodeId, node: &CameraNode, stack: &TransformStack) -> Result<(), SceneError>;
}

// Visit the subtree rooted at `id`, children in insertion order. On
// return, successful or not, `stack` is as it was on entry. Groups
// nested more than `MAX_DEPTH` deep are an error.
pub fn traverse<V: Visitor + ?Sized>(
    scene: &Scene,
    id: NodeId,
    stack: &mut TransformStack,
    visitor: &mut V,
) -> Result<(), SceneError> {
    match scene.node(id)? {
        Node::Group(group) => {
            // The stack holds the identity plus one frame per group.
            if stack.depth() > MAX_DEPTH {
                return Err(SceneError::TooDeep(MAX_DEPTH));
            }
            let mut frame = stack.push(&group.transform);
            for &child in group.children() {
                traverse(scene, child, &mut frame, visitor)?;
            }
            Ok(())
        }
        Node::Sphere(n) => visitor.visit_sphere(id, n, stack),
        Node::AABox(n) => visitor.visit_aabox(id, n, stack),
        Node::TextureBox(n) => visitor.visit_texture_box(id, n, stack),
        Node::Pyramid(n) => visitor.visit_pyramid(id, n, stack),
        Node::Obj(n) => visitor.visit_obj(id, n, stack),
        Node::Light(n) => visitor.visit_light(id, n, stack),
        Node::Camera(n) => visitor.visit_camera(id, n, stack),
    }
}

////////////////////////////////////////////////////////////////////////
// Light collection
//

// Gathers the world position of every light, in traversal order.
#[derive(Default)]
pub struct LightCollector {
    pub positions: Vec<Point4>,
}

impl Visitor for LightCollector {
    fn visit_sphere(&mut self, _: NodeId, _: &SphereNode, _: &TransformStack) -> Result<(), SceneError> {
        Ok(())
    }

    fn visit_aabox(&mut self, _: NodeId, _: &AABoxNode, _: &TransformStack) -> Result<(), SceneError> {
        Ok(())
    }

    fn visit_texture_box(&mut self, _: NodeId, _: &TextureBoxNode, _: &TransformStack) -> Result<(), SceneError> {
        Ok(())
    }

    fn visit_pyramid(&mut self, _: NodeId, _: &PyramidNode, _: &TransformStack) -> Result<(), SceneError> {
        Ok(())
    }

    fn visit_obj(&mut self, _: NodeId, _: &ObjNode, _: &TransformStack) -> Result<(), SceneError> {
        Ok(())
    }

    fn visit_light(&mut self, _: NodeId, _: &LightNode, stack: &TransformStack) -> Result<(), SceneError> {
        self.positions.push(stack.to_world().position());
        Ok(())
    }

    fn visit_camera(&mut self, _: NodeId, _: &CameraNode, _: &TransformStack) -> Result<(), SceneError> {
        Ok(())
    }
}

pub fn light_positions(scene: &Scene) -> Result<Vec<Point4>, SceneError> {
    let mut collector = LightCollector::default();
    traverse(scene, scene.root(), &mut TransformStack::new(), &mut collector)?;
    Ok(collector.positions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shading::Colour;
    use crate::transformation::PAIR_TOLERANCE;

    const WHITE: Colour = Colour::new(1.0, 1.0, 1.0);

    // Records the frame each leaf sees, and fails on a chosen node.
    #[derive(Default)]
    struct Recorder {
        seen: Vec<(NodeId, Mat4, Mat4, usize)>,
        fail_on: Option<NodeId>,
    }

    impl Recorder {
        fn leaf(&mut self, id: NodeId, stack: &TransformStack) -> Result<(), SceneError> {
            self.seen
                .push((id, *stack.to_world(), *stack.from_world(), stack.depth()));
            match self.fail_on {
                Some(f) if f == id => Err(SceneError::MissingRenderable(id)),
                _ => Ok(()),
            }
        }
    }

    impl Visitor for Recorder {
        fn visit_sphere(&mut self, id: NodeId, _: &SphereNode, s: &TransformStack) -> Result<(), SceneError> {
            self.leaf(id, s)
        }
        fn visit_aabox(&mut self, id: NodeId, _: &AABoxNode, s: &TransformStack) -> Result<(), SceneError> {
            self.leaf(id, s)
        }
        fn visit_texture_box(&mut self, id: NodeId, _: &TextureBoxNode, s: &TransformStack) -> Result<(), SceneError> {
            self.leaf(id, s)
        }
        fn visit_pyramid(&mut self, id: NodeId, _: &PyramidNode, s: &TransformStack) -> Result<(), SceneError> {
            self.leaf(id, s)
        }
        fn visit_obj(&mut self, id: NodeId, _: &ObjNode, s: &TransformStack) -> Result<(), SceneError> {
            self.leaf(id, s)
        }
        fn visit_light(&mut self, id: NodeId, _: &LightNode, s: &TransformStack) -> Result<(), SceneError> {
            self.leaf(id, s)
        }
        fn visit_camera(&mut self, id: NodeId, _: &CameraNode, s: &TransformStack) -> Result<(), SceneError> {
            self.leaf(id, s)
        }
    }

    // root: T(0,0,-5)
    //   g1: R(y, 0.5)
    //     g2: S(2,1,0.5)
    //       sphere
    //     box
    //   light
    fn nested_scene() -> (Scene, NodeId, NodeId, NodeId, NodeId) {
        let mut scene = Scene::new(Transformation::translation(Vec4::dir(0.0, 0.0, -5.0)));
        let root = scene.root();
        let g1 = scene
            .add_group(root, Transformation::rotation(Vec4::dir(0.0, 1.0, 0.0), 0.5).unwrap())
            .unwrap();
        let g2 = scene
            .add_group(g1, Transformation::scaling(Vec4::dir(2.0, 1.0, 0.5)).unwrap())
            .unwrap();
        let sphere = scene.add(g2, SphereNode { colour: WHITE }).unwrap();
        let aabox = scene.add(g1, AABoxNode { colour: WHITE }).unwrap();
        let light = scene.add(root, LightNode { colour: WHITE }).unwrap();
        (scene, g1, sphere, aabox, light)
    }

    #[test]
    fn leaves_see_composed_frames() {
        let (scene, _, sphere, aabox, light) = nested_scene();
        let mut recorder = Recorder::default();
        traverse(&scene, scene.root(), &mut TransformStack::new(), &mut recorder).unwrap();

        let order: Vec<NodeId> = recorder.seen.iter().map(|s| s.0).collect();
        assert_eq!(order, vec![sphere, aabox, light]);

        let expected_sphere = Mat4::translation(Vec4::dir(0.0, 0.0, -5.0))
            .mul(&Mat4::rotation(Vec4::dir(0.0, 1.0, 0.0), 0.5))
            .mul(&Mat4::scaling(Vec4::dir(2.0, 1.0, 0.5)));
        assert!(recorder.seen[0].1.approx_eq(&expected_sphere, 1e-12));
        assert_eq!(recorder.seen[0].3, 4);
        assert_eq!(recorder.seen[2].3, 2);

        for (_, world, inverse, _) in &recorder.seen {
            assert!(world.mul(inverse).approx_eq(&Mat4::identity(), PAIR_TOLERANCE));
            assert!(inverse.mul(world).approx_eq(&Mat4::identity(), PAIR_TOLERANCE));
        }
    }

    #[test]
    fn subtree_visit_restores_stack() {
        let (scene, g1, _, _, _) = nested_scene();
        let mut stack = TransformStack::new();
        let outer = Transformation::translation(Vec4::dir(1.0, 2.0, 3.0));
        let mut frame = stack.push(&outer);
        let (depth, world, inverse) = (frame.depth(), *frame.to_world(), *frame.from_world());

        traverse(&scene, g1, &mut frame, &mut Recorder::default()).unwrap();

        assert_eq!(frame.depth(), depth);
        assert_eq!(*frame.to_world(), world);
        assert_eq!(*frame.from_world(), inverse);
        drop(frame);
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn failing_leaf_still_unwinds_stack() {
        let (scene, _, sphere, _, _) = nested_scene();
        let mut stack = TransformStack::new();
        let mut recorder = Recorder {
            fail_on: Some(sphere),
            ..Recorder::default()
        };

        let result = traverse(&scene, scene.root(), &mut stack, &mut recorder);

        assert!(matches!(result, Err(SceneError::MissingRenderable(id)) if id == sphere));
        assert_eq!(stack.depth(), 1);
        assert_eq!(*stack.to_world(), Mat4::identity());
        assert_eq!(*stack.from_world(), Mat4::identity());
        // Traversal stopped at the failure.
        assert_eq!(recorder.seen.len(), 1);
    }

    #[test]
    fn lights_are_placed_in_world_space() {
        let (scene, _, _, _, _) = nested_scene();
        let lights = light_positions(&scene).unwrap();
        assert_eq!(lights, vec![Vec4::point(0.0, 0.0, -5.0)]);
    }

    #[test]
    fn over_deep_groups_are_an_error() {
        let mut scene = Scene::new(Transformation::default());
        let mut last = scene.root();
        for _ in 0..MAX_DEPTH {
            last = scene.add_group(last, Transformation::default()).unwrap();
        }
        scene.add(last, LightNode { colour: WHITE }).unwrap();

        let mut stack = TransformStack::new();
        let mut collector = LightCollector::default();
        let result = traverse(&scene, scene.root(), &mut stack, &mut collector);
        assert!(matches!(result, Err(SceneError::TooDeep(MAX_DEPTH))));
        assert_eq!(stack.depth(), 1);
    }
}
