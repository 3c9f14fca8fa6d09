/// Tunable constants for the sketch, extrusion, STL and viewport stages
///
/// Front ends expose a few of these as runtime options (snap unit, depth);
/// everything else is fixed here so all crates agree on the same values.

// =============================================================================
// SKETCH
// =============================================================================

/// Grid snap unit used when the caller does not set one.
pub const DEFAULT_SNAP: f64 = 1.0;

/// Smallest accepted snap unit. Smaller or non-finite values clamp to this.
pub const MIN_SNAP: f64 = 1.0;

/// File name offered for the exported sketch.
pub const SKETCH_FILE_NAME: &str = "sketch.json";

// =============================================================================
// GEOMETRY
// =============================================================================

/// Tolerance for 2D area and orientation tests.
///
/// ```rust
/// use sketchcad_core::config::GEOMETRY_EPSILON;
///
/// let cross = 1e-12_f64;
/// assert!(cross.abs() < GEOMETRY_EPSILON);
/// ```
pub const GEOMETRY_EPSILON: f64 = 1e-9;

/// Triangles with an area below this are reported as degenerate.
pub const DEGENERATE_AREA: f32 = 1e-12;

/// Extrusion depth applied when a sketch is imported without one.
pub const DEFAULT_EXTRUDE_DEPTH: f32 = 20.0;

// =============================================================================
// STL LAYOUT
// =============================================================================

/// Size of the free-form binary STL header.
pub const STL_HEADER_LEN: usize = 80;

/// Header plus the little-endian `u32` triangle count.
pub const STL_PREAMBLE_LEN: usize = STL_HEADER_LEN + 4;

/// One binary record: normal and three vertices as `f32`, then a `u16` attribute.
///
/// ```rust
/// use sketchcad_core::config::STL_RECORD_LEN;
///
/// assert_eq!(STL_RECORD_LEN, 12 * 4 + 2);
/// ```
pub const STL_RECORD_LEN: usize = 50;

/// Text written at the start of exported binary headers.
pub const STL_HEADER_TEXT: &[u8] = b"binary STL exported by sketchcad";

/// Solid name used by the ASCII writer when none is given.
pub const STL_SOLID_NAME: &str = "sketchcad";

/// File name offered for exported solids.
pub const EXPORT_FILE_NAME: &str = "model.stl";

// =============================================================================
// VIEWPORT
// =============================================================================

/// Camera distance as a multiple of the largest bounding-box dimension.
pub const FRAMING_DISTANCE_FACTOR: f32 = 2.2;

/// Near plane is `dim / CLIP_RANGE_FACTOR`, far plane `dim * CLIP_RANGE_FACTOR`.
pub const CLIP_RANGE_FACTOR: f32 = 100.0;

/// Vertical field of view in radians (45 degrees).
pub const DEFAULT_FOV: f32 = std::f32::consts::FRAC_PI_4;

/// Keeps orbiting away from the poles, where the up vector degenerates.
pub const POLAR_LIMIT: f32 = 0.01;

/// Camera never zooms closer than this to its target.
pub const MIN_CAMERA_DISTANCE: f32 = 1e-3;
