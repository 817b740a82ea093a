//
// obj.rs: Minimal Wavefront OBJ reader, producing the vertex data an
// OBJ leaf carries.
//
// Only positions (`v`), normals (`vn`) and faces (`f`) are read.
// Faces with more than three corners are split into a fan.
//

use serde::{Deserialize, Serialize};

use crate::error::SceneError;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjMesh {
    pub vertices: Vec<[f64; 3]>,
    pub normals: Vec<[f64; 3]>,
    // Zero-based, three per triangle.
    pub indices: Vec<u32>,
}

impl ObjMesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn parse(text: &str) -> Result<ObjMesh, SceneError> {
        let mut mesh = ObjMesh::default();

        for (line_no, line) in text.lines().enumerate() {
            let line_no = line_no + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let err = |message: String| SceneError::ObjParse {
                line: line_no,
                message,
            };

            let mut parts = line.split_whitespace();
            match parts.next() {
                Some("v") => mesh.vertices.push(parse_triple(parts).map_err(err)?),
                Some("vn") => mesh.normals.push(parse_triple(parts).map_err(err)?),
                Some("f") => {
                    let corners = parts
                        .map(|p| resolve_index(p, mesh.vertices.len()))
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(err)?;
                    if corners.len() < 3 {
                        return Err(SceneError::ObjParse {
                            line: line_no,
                            message: format!("face has {} corners", corners.len()),
                        });
                    }
                    for j in 1..corners.len() - 1 {
                        mesh.indices
                            .extend([corners[0], corners[j], corners[j + 1]]);
                    }
                }
                // Texture coordinates, groups, materials etc. are
                // not needed.
                _ => {}
            }
        }

        Ok(mesh)
    }
}

fn parse_triple<'a>(parts: impl Iterator<Item = &'a str>) -> Result<[f64; 3], String> {
    let values = parts
        .take(3)
        .map(|p| p.parse::<f64>().map_err(|e| format!("bad number {:?}: {}", p, e)))
        .collect::<Result<Vec<_>, _>>()?;
    match values[..] {
        [x, y, z] => Ok([x, y, z]),
        _ => Err(format!("expected 3 coordinates, found {}", values.len())),
    }
}

// Face corners look like `v`, `v/vt`, `v//vn` or `v/vt/vn`; only the
// position index is used. Negative indices count back from the most
// recent vertex.
fn resolve_index(corner: &str, vertex_count: usize) -> Result<u32, String> {
    let raw = corner.split('/').next().unwrap_or("");
    let index: i64 = raw
        .parse()
        .map_err(|e| format!("bad face index {:?}: {}", corner, e))?;
    let resolved = match index {
        0 => return Err("face index 0 is not valid".to_string()),
        i if i > 0 => i - 1,
        i => vertex_count as i64 + i,
    };
    if resolved < 0 || resolved >= vertex_count as i64 {
        return Err(format!(
            "face index {} out of range for {} vertices",
            index, vertex_count
        ));
    }
    Ok(resolved as u32)
}
