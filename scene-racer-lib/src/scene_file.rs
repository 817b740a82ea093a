//
// scene_file.rs: Saving and loading scenes.
//
// Two formats:
//
// * Matrix snapshots, which record only the matrix pair of every group
//   node, nested the way the groups are. Restoring one needs a live
//   scene of exactly the same shape.
//
// * Scene descriptions, which record the whole arena: every node with
//   its id, transform parameters and leaf data. Loading one builds a
//   new scene.
//

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::SceneError;
use crate::matrix::Mat4;
use crate::scene::*;
use crate::transformation::Transformation;

////////////////////////////////////////////////////////////////////////
// Matrix snapshots
//

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatrixSnapshot {
    // Row-major.
    pub matrix: [f64; 16],
    pub inverse: [f64; 16],
    // Child groups only, in child order.
    pub children: Vec<MatrixSnapshot>,
}

// Group children of a group, in order. Leaves have no transform and
// take no part in the snapshot.
fn child_groups(scene: &Scene, id: NodeId) -> Result<Vec<NodeId>, SceneError> {
    let mut groups = Vec::new();
    for &child in scene.group(id)?.children() {
        if let Node::Group(_) = scene.node(child)? {
            groups.push(child);
        }
    }
    Ok(groups)
}

// Deepest bracket nesting in a JSON text, found without recursing.
fn nesting_depth(text: &str) -> usize {
    let (mut depth, mut deepest) = (0usize, 0usize);
    let (mut in_string, mut escaped) = (false, false);
    for b in text.bytes() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' | b'{' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            b']' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}

impl MatrixSnapshot {
    // Scenes nested deeper than `MAX_DEPTH` can't be captured, so
    // every saved snapshot can be read back.
    pub fn capture(scene: &Scene) -> Result<MatrixSnapshot, SceneError> {
        MatrixSnapshot::capture_group(scene, scene.root(), 1)
    }

    fn capture_group(scene: &Scene, id: NodeId, depth: usize) -> Result<MatrixSnapshot, SceneError> {
        if depth > MAX_DEPTH {
            return Err(SceneError::TooDeep(MAX_DEPTH));
        }
        let transform = scene.transform(id)?;
        let children = child_groups(scene, id)?
            .into_iter()
            .map(|child| MatrixSnapshot::capture_group(scene, child, depth + 1))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MatrixSnapshot {
            matrix: transform.matrix().to_rows(),
            inverse: transform.inverse_matrix().to_rows(),
            children,
        })
    }

    // Overwrite the group transforms of `scene` with the snapshot.
    // Everything is checked before anything is written, so on error
    // the scene is untouched.
    pub fn restore(&self, scene: &mut Scene) -> Result<(), SceneError> {
        let mut updates = Vec::new();
        self.plan(scene, scene.root(), "root".to_string(), &mut updates)?;
        log::debug!("restoring {} group transforms", updates.len());
        for (id, transform) in updates {
            *scene.transform_mut(id)? = transform;
        }
        Ok(())
    }

    fn plan(
        &self,
        scene: &Scene,
        id: NodeId,
        path: String,
        updates: &mut Vec<(NodeId, Transformation)>,
    ) -> Result<(), SceneError> {
        let mismatch = |reason: String| SceneError::StructureMismatch {
            path: path.clone(),
            reason,
        };

        let groups = child_groups(scene, id)?;
        if groups.len() != self.children.len() {
            return Err(mismatch(format!(
                "scene has {} child groups, snapshot has {}",
                groups.len(),
                self.children.len()
            )));
        }

        let matrix = Mat4::from_rows(self.matrix);
        let inverse = Mat4::from_rows(self.inverse);
        let current = scene.transform(id)?;
        // Keep the parameters of transforms the snapshot doesn't change.
        if *current.matrix() != matrix || *current.inverse_matrix() != inverse {
            let transform =
                Transformation::from_matrices(&matrix, &inverse).map_err(|e| mismatch(e.to_string()))?;
            updates.push((id, transform));
        }

        for (i, (child, snapshot)) in groups.into_iter().zip(&self.children).enumerate() {
            snapshot.plan(scene, child, format!("{}/{}", path, i), updates)?;
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, SceneError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    // Each group level is an object plus its `children` array, which
    // can go past serde_json's default limit. The nesting is checked
    // up front instead, against what `capture` can produce.
    pub fn from_json(text: &str) -> Result<MatrixSnapshot, SceneError> {
        if nesting_depth(text) > 2 * MAX_DEPTH {
            return Err(SceneError::TooDeep(MAX_DEPTH));
        }
        let mut de = serde_json::Deserializer::from_str(text);
        de.disable_recursion_limit();
        let snapshot = MatrixSnapshot::deserialize(&mut de)?;
        de.end()?;
        Ok(snapshot)
    }

    pub fn load(path: &Path) -> Result<MatrixSnapshot> {
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        MatrixSnapshot::from_json(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?).with_context(|| format!("writing {}", path.display()))
    }
}

////////////////////////////////////////////////////////////////////////
// Scene descriptions
//

pub const DESCRIPTION_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    #[serde(flatten)]
    pub node: Node,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    pub version: u32,
    pub root: NodeId,
    // In id order.
    pub nodes: Vec<NodeRecord>,
}

// Enough of a description to check the version before trying to make
// sense of the rest.
#[derive(Deserialize)]
struct Header {
    version: u32,
}

impl SceneDescription {
    pub fn from_scene(scene: &Scene) -> SceneDescription {
        SceneDescription {
            version: DESCRIPTION_VERSION,
            root: scene.root(),
            nodes: scene
                .iter()
                .map(|(id, node)| NodeRecord {
                    id,
                    node: node.clone(),
                })
                .collect(),
        }
    }

    // Check that the records form a single tree rooted at a group,
    // and build the scene.
    pub fn into_scene(self) -> Result<Scene, SceneError> {
        let result = self.build();
        if let Err(e) = &result {
            log::warn!("rejected scene description: {}", e);
        }
        result
    }

    fn build(self) -> Result<Scene, SceneError> {
        let invalid = |msg: String| Err(SceneError::InvalidDescription(msg));

        if self.version != DESCRIPTION_VERSION {
            return Err(SceneError::UnsupportedVersion(self.version));
        }

        let n = self.nodes.len();
        let mut slots: Vec<Option<Node>> = vec![None; n];
        for record in self.nodes {
            let i = record.id.index();
            if i >= n {
                return invalid(format!("node id {} out of range for {} nodes", record.id, n));
            }
            if slots[i].is_some() {
                return invalid(format!("node id {} used twice", record.id));
            }
            slots[i] = Some(record.node);
        }
        // n records, no duplicates, all in range: every slot is full.
        let nodes: Vec<Node> = slots.into_iter().flatten().collect();

        match nodes.get(self.root.index()) {
            Some(Node::Group(_)) => {}
            Some(_) => return Err(SceneError::NotAGroup(self.root)),
            None => return Err(SceneError::UnknownNode(self.root)),
        }

        let mut parent: Vec<Option<NodeId>> = vec![None; n];
        for (i, node) in nodes.iter().enumerate() {
            let Node::Group(group) = node else {
                continue;
            };
            for &child in group.children() {
                if child.index() >= n {
                    return invalid(format!("node #{} has dangling child {}", i, child));
                }
                if child == self.root {
                    return invalid(format!("root {} is a child of node #{}", child, i));
                }
                if let Some(other) = parent[child.index()] {
                    return invalid(format!("node {} is shared by {} and #{}", child, other, i));
                }
                parent[child.index()] = Some(NodeId(i));
            }
        }

        // With at most one parent each and a parentless root, anything
        // not reachable from the root is either an orphan or on a
        // cycle. The root is at depth 1.
        let mut reached = vec![false; n];
        let mut pending = vec![(self.root, 1)];
        while let Some((id, depth)) = pending.pop() {
            reached[id.index()] = true;
            if let Node::Group(group) = &nodes[id.index()] {
                if depth > MAX_DEPTH {
                    return invalid(format!(
                        "group #{} is nested deeper than {} levels",
                        id.index(),
                        MAX_DEPTH
                    ));
                }
                pending.extend(group.children().iter().map(|&child| (child, depth + 1)));
            }
        }
        if let Some(i) = reached.iter().position(|r| !r) {
            return invalid(format!("node #{} is not reachable from the root", i));
        }

        for (i, node) in nodes.iter().enumerate() {
            if let Node::Obj(obj) = node {
                let count = obj.mesh.vertices.len();
                if obj.mesh.indices.iter().any(|&v| v as usize >= count) {
                    return invalid(format!("mesh of node #{} indexes past its {} vertices", i, count));
                }
            }
        }

        log::debug!("loaded scene of {} nodes", n);
        Ok(Scene::from_checked_parts(nodes, self.root))
    }

    pub fn to_json(&self) -> Result<String, SceneError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<SceneDescription, SceneError> {
        let header: Header = serde_json::from_str(text)?;
        if header.version != DESCRIPTION_VERSION {
            log::warn!("rejected scene description version {}", header.version);
            return Err(SceneError::UnsupportedVersion(header.version));
        }
        Ok(serde_json::from_str(text)?)
    }
}

pub fn load_scene(path: &Path) -> Result<Scene> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let scene = SceneDescription::from_json(&text)
        .and_then(SceneDescription::into_scene)
        .with_context(|| format!("loading scene {}", path.display()))?;
    Ok(scene)
}

pub fn save_scene(scene: &Scene, path: &Path) -> Result<()> {
    let text = SceneDescription::from_scene(scene).to_json()?;
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quaternion::Quat;
    use crate::shading::Colour;
    use crate::transformation::PAIR_TOLERANCE;
    use crate::vec4::Vec4;

    const WHITE: Colour = Colour::new(1.0, 1.0, 1.0);

    // root
    //   a: T(1,2,3)
    //     sphere
    //     b: R(z, 0.4)
    //   light
    //   c: S(1,2,3)
    fn scene() -> (Scene, [NodeId; 3]) {
        let mut scene = Scene::new(Transformation::default());
        let root = scene.root();
        let a = scene
            .add_group(root, Transformation::translation(Vec4::dir(1.0, 2.0, 3.0)))
            .unwrap();
        scene.add(a, SphereNode { colour: WHITE }).unwrap();
        let b = scene
            .add_group(a, Transformation::rotation(Vec4::dir(0.0, 0.0, 1.0), 0.4).unwrap())
            .unwrap();
        scene.add(root, LightNode { colour: WHITE }).unwrap();
        let c = scene
            .add_group(root, Transformation::scaling(Vec4::dir(1.0, 2.0, 3.0)).unwrap())
            .unwrap();
        (scene, [a, b, c])
    }

    fn assert_same_matrices(a: &Scene, b: &Scene) {
        assert_eq!(a.len(), b.len());
        for ((_, x), (_, y)) in a.iter().zip(b.iter()) {
            match (x, y) {
                (Node::Group(x), Node::Group(y)) => {
                    assert_eq!(x.children(), y.children());
                    assert!(x.transform.matrix().approx_eq(y.transform.matrix(), PAIR_TOLERANCE));
                    assert!(x
                        .transform
                        .inverse_matrix()
                        .approx_eq(y.transform.inverse_matrix(), PAIR_TOLERANCE));
                }
                _ => assert_eq!(x, y),
            }
        }
    }

    #[test]
    fn snapshot_mirrors_groups_only() {
        let (scene, _) = scene();
        let snap = MatrixSnapshot::capture(&scene).unwrap();
        assert_eq!(snap.children.len(), 2);
        assert_eq!(snap.children[0].children.len(), 1);
        assert_eq!(snap.children[1].children.len(), 0);
        assert_eq!(snap.children[0].matrix[3], 1.0);
        assert_eq!(snap.children[0].inverse[7], -2.0);
    }

    #[test]
    fn snapshot_restores_animated_scene() {
        let (original, [a, b, c]) = scene();
        let snap = MatrixSnapshot::capture(&original).unwrap();

        let mut scene = original.clone();
        scene.transform_mut(a).unwrap().set_translation(Vec4::dir(9.0, 9.0, 9.0));
        scene
            .transform_mut(b)
            .unwrap()
            .set_rotation(Quat::from_axis_angle(Vec4::dir(1.0, 0.0, 0.0), 1.0).unwrap())
            .unwrap();
        scene.transform_mut(c).unwrap().set_scale(Vec4::dir(5.0, 5.0, 5.0)).unwrap();

        let json = snap.to_json().unwrap();
        MatrixSnapshot::from_json(&json).unwrap().restore(&mut scene).unwrap();

        assert_same_matrices(&scene, &original);
    }

    #[test]
    fn untouched_groups_keep_their_parameters() {
        let (original, [a, _, _]) = scene();
        let snap = MatrixSnapshot::capture(&original).unwrap();
        let mut scene = original.clone();
        snap.restore(&mut scene).unwrap();
        assert_eq!(scene, original);
        assert!(matches!(
            scene.transform(a).unwrap().kind(),
            crate::transformation::TransformKind::Translation { .. }
        ));
    }

    #[test]
    fn shape_mismatch_is_reported_with_path() {
        let (original, [a, _, _]) = scene();
        let snap = MatrixSnapshot::capture(&original).unwrap();
        let mut scene = original.clone();
        scene.add_group(a, Transformation::default()).unwrap();

        match snap.restore(&mut scene) {
            Err(SceneError::StructureMismatch { path, .. }) => assert_eq!(path, "root/0"),
            other => panic!("expected mismatch, got {:?}", other),
        }
    }

    #[test]
    fn bad_pair_rejects_whole_restore() {
        let (original, _) = scene();
        let mut snap = MatrixSnapshot::capture(&original).unwrap();
        // A valid change early in the walk, and a broken inverse later.
        snap.children[0].matrix[3] = 7.0;
        snap.children[0].inverse[3] = -7.0;
        snap.children[1].inverse[0] = 0.25;

        let mut scene = original.clone();
        let err = snap.restore(&mut scene).unwrap_err();
        assert!(matches!(err, SceneError::StructureMismatch { ref path, .. } if path == "root/1"));
        assert_eq!(scene, original);
    }

    // A single chain of `depth` groups, each one unit further along x.
    fn chain(depth: usize) -> (Scene, NodeId) {
        let mut scene = Scene::new(Transformation::default());
        let mut last = scene.root();
        for _ in 1..depth {
            last = scene
                .add_group(last, Transformation::translation(Vec4::dir(1.0, 0.0, 0.0)))
                .unwrap();
        }
        (scene, last)
    }

    #[test]
    fn deep_chain_snapshot_round_trips() {
        let (original, last) = chain(100);
        let json = MatrixSnapshot::capture(&original).unwrap().to_json().unwrap();

        let mut scene = original.clone();
        scene.transform_mut(last).unwrap().set_translation(Vec4::dir(0.0, 5.0, 0.0));
        MatrixSnapshot::from_json(&json).unwrap().restore(&mut scene).unwrap();

        assert_same_matrices(&scene, &original);
    }

    #[test]
    fn snapshot_depth_is_bounded() {
        let (scene, _) = chain(MAX_DEPTH + 1);
        assert!(matches!(MatrixSnapshot::capture(&scene), Err(SceneError::TooDeep(MAX_DEPTH))));

        let deep = format!("{}{}", "[".repeat(100_000), "]".repeat(100_000));
        assert!(matches!(MatrixSnapshot::from_json(&deep), Err(SceneError::TooDeep(_))));
    }

    #[test]
    fn nesting_depth_ignores_brackets_in_strings() {
        assert_eq!(nesting_depth(r#"{"a": [1, {"b": "[[[\"{"}]}"#), 3);
        assert_eq!(nesting_depth("12"), 0);
    }

    #[test]
    fn description_round_trip() {
        let (original, _) = scene();
        let json = SceneDescription::from_scene(&original).to_json().unwrap();
        let loaded = SceneDescription::from_json(&json).unwrap().into_scene().unwrap();
        assert_same_matrices(&loaded, &original);
    }

    #[test]
    fn description_rejects_other_versions() {
        let text = r#"{"version": 7, "whatever": true}"#;
        assert!(matches!(
            SceneDescription::from_json(text),
            Err(SceneError::UnsupportedVersion(7))
        ));
    }

    fn description(nodes: &str) -> String {
        format!(r#"{{"version": 1, "root": 0, "nodes": [{}]}}"#, nodes)
    }

    const IDENTITY: &str = r#"{"type": "translation", "offset": {"x": 0, "y": 0, "z": 0, "w": 0}}"#;

    fn group(id: usize, children: &[usize]) -> String {
        format!(
            r#"{{"id": {}, "node": "group", "transform": {}, "children": {:?}}}"#,
            id, IDENTITY, children
        )
    }

    fn light(id: usize) -> String {
        format!(
            r#"{{"id": {}, "node": "light", "colour": {{"r": 1, "g": 1, "b": 1}}}}"#,
            id
        )
    }

    fn load(nodes: &[String]) -> Result<Scene, SceneError> {
        SceneDescription::from_json(&description(&nodes.join(",")))?.into_scene()
    }

    #[test]
    fn description_parses_hand_written_json() {
        let scene = load(&[group(0, &[2, 1]), light(1), group(2, &[])]).unwrap();
        assert_eq!(scene.group(scene.root()).unwrap().children(), &[NodeId(2), NodeId(1)]);
    }

    #[test]
    fn description_rejects_broken_graphs() {
        let invalid = |r: Result<Scene, SceneError>| matches!(r, Err(SceneError::InvalidDescription(_)));

        // Dangling child.
        assert!(invalid(load(&[group(0, &[5])])));
        // Shared child.
        assert!(invalid(load(&[group(0, &[1, 2]), light(1), group(2, &[1])])));
        // Cycle away from the root.
        assert!(invalid(load(&[group(0, &[]), group(1, &[2]), group(2, &[1])])));
        // Root as a child.
        assert!(invalid(load(&[group(0, &[1]), group(1, &[0])])));
        // Duplicate id.
        assert!(invalid(load(&[group(0, &[]), light(0)])));
        // Root not a group.
        assert!(matches!(load(&[light(0)]), Err(SceneError::NotAGroup(_))));
    }

    // Groups 0..depth, each the only child of the one before.
    fn chained_groups(depth: usize) -> Vec<String> {
        (0..depth)
            .map(|i| if i + 1 < depth { group(i, &[i + 1]) } else { group(i, &[]) })
            .collect()
    }

    #[test]
    fn description_accepts_groups_up_to_max_depth() {
        let mut nodes = chained_groups(MAX_DEPTH);
        // A leaf under the deepest group is fine.
        nodes[MAX_DEPTH - 1] = group(MAX_DEPTH - 1, &[MAX_DEPTH]);
        nodes.push(light(MAX_DEPTH));

        let scene = load(&nodes).unwrap();
        let lights = crate::visitor::light_positions(&scene).unwrap();
        assert_eq!(lights.len(), 1);
    }

    #[test]
    fn description_rejects_groups_nested_too_deep() {
        let nodes = chained_groups(MAX_DEPTH + 1);
        assert!(matches!(load(&nodes), Err(SceneError::InvalidDescription(_))));
    }

    #[test]
    fn description_rejects_degenerate_transform() {
        let text = description(
            r#"{"id": 0, "node": "group", "children": [],
                "transform": {"type": "scaling", "factors": {"x": 1, "y": 0, "z": 1, "w": 0}}}"#,
        );
        assert!(matches!(SceneDescription::from_json(&text), Err(SceneError::Json(_))));
    }
}
