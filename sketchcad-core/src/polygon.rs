/// 2D points and polygons in sketch grid units
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A point in sketch-local grid units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Ordered polygon vertices. Insertion order defines the edges.
///
/// A polygon is closed once its last point repeats the first; the closing
/// duplicate is kept in `points` but not counted as a vertex.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon {
    points: Vec<Point2D>,
}

impl Polygon {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn from_points(points: Vec<Point2D>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point2D] {
        &self.points
    }

    pub fn push(&mut self, point: Point2D) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&Point2D> {
        self.points.last()
    }

    pub fn is_closed(&self) -> bool {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => self.points.len() > 1 && first == last,
            _ => false,
        }
    }

    /// Vertices without the closing duplicate.
    pub fn vertices(&self) -> &[Point2D] {
        if self.is_closed() {
            &self.points[..self.points.len() - 1]
        } else {
            &self.points
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices().len()
    }

    /// Append a copy of the first vertex unless the loop is already closed.
    pub fn close(&mut self) -> Result<()> {
        let found = self.vertex_count();
        if found < 3 {
            return Err(Error::InsufficientVertices { found });
        }
        if !self.is_closed() {
            self.points.push(self.points[0]);
        }
        Ok(())
    }

    /// Smallest and largest corner of the axis-aligned bounding box.
    pub fn bounds(&self) -> Option<(Point2D, Point2D)> {
        let first = *self.points.first()?;
        Some(self.points.iter().fold((first, first), |(min, max), p| {
            (
                Point2D::new(min.x.min(p.x), min.y.min(p.y)),
                Point2D::new(max.x.max(p.x), max.y.max(p.y)),
            )
        }))
    }

    /// Shoelace area; positive for counter-clockwise vertices in a Y-up frame.
    pub fn signed_area(&self) -> f64 {
        signed_area(self.vertices())
    }

    pub(crate) fn translate(&mut self, dx: f64, dy: f64) {
        for p in &mut self.points {
            p.x += dx;
            p.y += dy;
        }
    }
}

pub(crate) fn signed_area(ring: &[Point2D]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let a = ring[i];
            let b = ring[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum();
    twice * 0.5
}
