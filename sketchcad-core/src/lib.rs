/// SketchCAD Core Library - sketch to solid pipeline
///
/// This library provides the platform-independent part of the modeler:
/// polygon capture and normalization, extrusion into triangle meshes, the
/// STL codec, and the viewport that owns the displayed solid.
/// Front ends supply a [`RenderBackend`] and forward their input events.

pub mod config;
pub mod error;
pub mod extrude;
pub mod geometry;
pub mod history;
pub mod normalize;
pub mod polygon;
pub mod projection;
pub mod scene;
pub mod sketch;
pub mod stl;
pub mod transform;
pub mod workbench;

// Re-export commonly used types
pub use error::{Error, Result};
pub use extrude::extrude;
pub use geometry::{Aabb, Mesh, MeshReport, Triangle};
pub use history::{Feature, FeatureHistory};
pub use normalize::{normalize, Profile};
pub use polygon::{Point2D, Polygon};
pub use projection::{Camera, ProjectionMode};
pub use scene::{BufferBackend, BufferId, MeshBuffers, RenderBackend, Viewport};
pub use sketch::{PointerEvent, Preview, SketchCapture, Tool};
pub use stl::StlFormat;
pub use transform::{RotationState, Transform};
pub use workbench::{FileKind, Workbench};
