//
// error.rs: Errors raised while building, animating, rendering or
// loading a scene.
//

use thiserror::Error;

use crate::scene::NodeId;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("rotation axis has zero length")]
    InvalidAxis,

    #[error("cannot normalise a zero-length vector")]
    ZeroLength,

    #[error("scale factor {0} has no inverse")]
    DegenerateScale(f64),

    #[error("matrix pair is not a scale-rotation-translation and its inverse: {0}")]
    InconsistentTransform(String),

    #[error("no node with id {0}")]
    UnknownNode(NodeId),

    #[error("node {0} is not a group node")]
    NotAGroup(NodeId),

    #[error("no renderable was set up for node {0}")]
    MissingRenderable(NodeId),

    #[error("saved scene does not match the live graph at {path}: {reason}")]
    StructureMismatch { path: String, reason: String },

    #[error("unsupported scene description version {0}")]
    UnsupportedVersion(u32),

    #[error("invalid scene description: {0}")]
    InvalidDescription(String),

    #[error("{width}x{height} image is too large to render")]
    ImageTooLarge { width: usize, height: usize },

    #[error("scene graph nests groups deeper than {0} levels")]
    TooDeep(usize),

    #[error("OBJ line {line}: {message}")]
    ObjParse { line: usize, message: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
