//
// scene.rs: The scene graph.
//
// Nodes live in an arena owned by `Scene` and refer to their children
// by `NodeId`. Only group nodes have children and a transform; leaves
// describe geometry, lights or cameras in their own object space.
// Nodes are only ever added under an existing group, so every node
// but the root has exactly one parent.
//

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::camera::RasterCamera;
use crate::error::SceneError;
use crate::obj::ObjMesh;
use crate::shading::Colour;
use crate::transformation::Transformation;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

////////////////////////////////////////////////////////////////////////
// Node payloads
//

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupNode {
    pub transform: Transformation,
    children: Vec<NodeId>,
}

impl GroupNode {
    pub fn new(transform: Transformation) -> GroupNode {
        GroupNode {
            transform,
            children: Vec::new(),
        }
    }

    // In insertion order, which is also traversal order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

// Sphere of radius 1 around the origin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SphereNode {
    pub colour: Colour,
}

// Box spanning [-0.5, 0.5] on every axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AABoxNode {
    pub colour: Colour,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextureBoxNode {
    pub texture: String,
    pub normal_map: String,
    // Texture repeat factor.
    pub scale: f64,
}

// Square-based pyramid with its base on y = -0.5.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PyramidNode {
    pub colour: Colour,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjNode {
    pub mesh: ObjMesh,
    pub scale: f64,
}

// Point light at the origin of its frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LightNode {
    pub colour: Colour,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraNode {
    pub camera: RasterCamera,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Group(GroupNode),
    Sphere(SphereNode),
    AABox(AABoxNode),
    TextureBox(TextureBoxNode),
    Pyramid(PyramidNode),
    Obj(ObjNode),
    Light(LightNode),
    Camera(CameraNode),
}

impl Node {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Group(_) => "group",
            Node::Sphere(_) => "sphere",
            Node::AABox(_) => "aabox",
            Node::TextureBox(_) => "texture box",
            Node::Pyramid(_) => "pyramid",
            Node::Obj(_) => "obj",
            Node::Light(_) => "light",
            Node::Camera(_) => "camera",
        }
    }
}

macro_rules! impl_into_node {
    ($($payload:ident => $variant:ident),* $(,)?) => {
        $(impl From<$payload> for Node {
            fn from(n: $payload) -> Node {
                Node::$variant(n)
            }
        })*
    };
}

impl_into_node! {
    GroupNode => Group,
    SphereNode => Sphere,
    AABoxNode => AABox,
    TextureBoxNode => TextureBox,
    PyramidNode => Pyramid,
    ObjNode => Obj,
    LightNode => Light,
    CameraNode => Camera,
}

////////////////////////////////////////////////////////////////////////
// Scene arena
//

// Deepest nesting of groups a scene may have, counting the root as
// level 1. Traversal recurses once per level.
pub const MAX_DEPTH: usize = 256;

#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Scene {
    pub fn new(root_transform: Transformation) -> Scene {
        Scene {
            nodes: vec![Node::Group(GroupNode::new(root_transform))],
            root: NodeId(0),
        }
    }

    // Assemble from parts that have already been checked to form a
    // tree rooted at a group.
    pub(crate) fn from_checked_parts(nodes: Vec<Node>, root: NodeId) -> Scene {
        Scene { nodes, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // All nodes, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.nodes.get(id.0).ok_or(SceneError::UnknownNode(id))
    }

    pub fn group(&self, id: NodeId) -> Result<&GroupNode, SceneError> {
        match self.node(id)? {
            Node::Group(g) => Ok(g),
            _ => Err(SceneError::NotAGroup(id)),
        }
    }

    pub fn group_mut(&mut self, id: NodeId) -> Result<&mut GroupNode, SceneError> {
        match self.nodes.get_mut(id.0) {
            Some(Node::Group(g)) => Ok(g),
            Some(_) => Err(SceneError::NotAGroup(id)),
            None => Err(SceneError::UnknownNode(id)),
        }
    }

    pub fn transform(&self, id: NodeId) -> Result<&Transformation, SceneError> {
        Ok(&self.group(id)?.transform)
    }

    pub fn transform_mut(&mut self, id: NodeId) -> Result<&mut Transformation, SceneError> {
        Ok(&mut self.group_mut(id)?.transform)
    }

    // Create `node` as the last child of the group `parent`.
    pub fn add(&mut self, parent: NodeId, node: impl Into<Node>) -> Result<NodeId, SceneError> {
        self.group(parent)?;
        let id = NodeId(self.nodes.len());
        self.nodes.push(node.into());
        self.group_mut(parent)?.children.push(id);
        log::trace!("added {} {} under {}", self.nodes[id.0].kind_name(), id, parent);
        Ok(id)
    }

    pub fn add_group(
        &mut self,
        parent: NodeId,
        transform: Transformation,
    ) -> Result<NodeId, SceneError> {
        self.add(parent, GroupNode::new(transform))
    }
}
