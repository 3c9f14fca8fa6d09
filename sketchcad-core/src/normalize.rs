/// Validation gate between captured sketches and the extrusion engine
///
/// A `Profile` can only be built by `normalize`, so anything holding one has
/// at least three vertices, is explicitly closed and is centered on the
/// origin of its bounding box.

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::polygon::{Point2D, Polygon};

/// A closed, centered polygon ready to be exported or extruded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Profile {
    polygon: Polygon,
}

impl Profile {
    /// Parse a sketch export (a JSON array of `{x, y}` objects) and pass it
    /// through [`normalize`].
    pub fn from_json(json: &str) -> Result<Self> {
        let points: Vec<Point2D> = serde_json::from_str(json)?;
        normalize(&Polygon::from_points(points))
    }

    /// Same as [`Profile::from_json`], for raw file contents.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let points: Vec<Point2D> = serde_json::from_slice(bytes)?;
        normalize(&Polygon::from_points(points))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// All points, including the closing duplicate.
    pub fn points(&self) -> &[Point2D] {
        self.polygon.points()
    }

    /// Distinct ring vertices, without the closing duplicate.
    pub fn vertices(&self) -> &[Point2D] {
        self.polygon.vertices()
    }

    pub fn vertex_count(&self) -> usize {
        self.polygon.vertex_count()
    }

    pub fn signed_area(&self) -> f64 {
        self.polygon.signed_area()
    }

    pub fn as_polygon(&self) -> &Polygon {
        &self.polygon
    }
}

/// Close `polygon` if needed and translate it so its bounding box is
/// centered at the origin. Vertex count and order are preserved.
pub fn normalize(polygon: &Polygon) -> Result<Profile> {
    let found = polygon.vertex_count();
    if found < 3 {
        return Err(Error::InsufficientVertices { found });
    }

    let mut polygon = polygon.clone();
    polygon.close()?;

    if let Some((min, max)) = polygon.bounds() {
        let cx = (min.x + max.x) / 2.0;
        let cy = (min.y + max.y) / 2.0;
        polygon.translate(-cx, -cy);
        debug!(vertices = found, cx, cy, "normalized polygon");
    }

    Ok(Profile { polygon })
}
