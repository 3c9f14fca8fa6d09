/// Error types shared by every stage of the sketch-to-STL pipeline
use thiserror::Error;

/// Errors surfaced by sketch capture, normalization, extrusion, STL
/// decoding and the viewport.
///
/// None of these are fatal; callers report them and let the user retry.
#[derive(Debug, Error)]
pub enum Error {
    /// A polygon needs at least three vertices before it can be closed or exported
    #[error("need at least 3 vertices, found {found}")]
    InsufficientVertices { found: usize },

    /// The sketch has to be closed before it can be exported
    #[error("sketch is not closed, close the loop before exporting")]
    NotClosed,

    /// The profile cannot be extruded into a solid
    #[error("degenerate profile: {reason}")]
    DegenerateProfile { reason: String },

    /// Extrusion depth must be finite and non-zero
    #[error("invalid extrusion depth: {depth}")]
    InvalidDepth { depth: f32 },

    /// The STL bytes could not be decoded, or the mesh is not loadable
    #[error("malformed mesh: {reason}")]
    MalformedMesh { reason: String },

    /// There is no active solid in the viewport
    #[error("nothing loaded yet")]
    NothingLoaded,

    /// Only `.stl` and sketch `.json` files can be opened
    #[error("unsupported file type: {name} (expected an .stl or a sketch .json file)")]
    UnsupportedFileType { name: String },

    /// The sketch JSON is not an array of `{x, y}` points
    #[error("invalid sketch JSON: {0}")]
    SketchJson(#[from] serde_json::Error),
}

impl Error {
    pub fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateProfile {
            reason: reason.into(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedMesh {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
