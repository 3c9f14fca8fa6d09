/// Geometry primitives for triangulated solids
use nalgebra::{Point3, Vector3};

use crate::config::DEGENERATE_AREA;
use crate::error::{Error, Result};

/// A triangle face: three positions plus a face normal.
///
/// STL has no shared-vertex topology, so every triangle owns its corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub normal: Vector3<f32>,
    pub vertices: [Point3<f32>; 3],
}

impl Triangle {
    /// Build a triangle whose normal follows the counter-clockwise winding
    /// of `v0, v1, v2`. Degenerate triangles get a zero normal.
    pub fn new(v0: Point3<f32>, v1: Point3<f32>, v2: Point3<f32>) -> Self {
        let mut triangle = Self {
            normal: Vector3::zeros(),
            vertices: [v0, v1, v2],
        };
        triangle.normal = triangle.calculate_normal();
        triangle
    }

    /// Build a triangle with a normal supplied by the caller (STL import).
    pub fn with_normal(normal: Vector3<f32>, vertices: [Point3<f32>; 3]) -> Self {
        Self { normal, vertices }
    }

    /// Calculate the face normal from the triangle's vertices
    pub fn calculate_normal(&self) -> Vector3<f32> {
        let [v0, v1, v2] = self.vertices;
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        edge1
            .cross(&edge2)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::zeros)
    }

    pub fn area(&self) -> f32 {
        let [v0, v1, v2] = self.vertices;
        (v1 - v0).cross(&(v2 - v0)).norm() * 0.5
    }

    pub fn is_degenerate(&self) -> bool {
        self.area() <= DEGENERATE_AREA
    }

    /// Same triangle seen from the other side.
    pub fn flipped(&self) -> Self {
        let [v0, v1, v2] = self.vertices;
        Self {
            normal: -self.normal,
            vertices: [v0, v2, v1],
        }
    }

    fn is_finite(&self) -> bool {
        self.normal.iter().all(|c| c.is_finite())
            && self
                .vertices
                .iter()
                .all(|v| v.coords.iter().all(|c| c.is_finite()))
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f32>>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = *points.next()?;
        Some(points.fold(Self { min: first, max: first }, |bounds, p| Self {
            min: bounds.min.inf(p),
            max: bounds.max.sup(p),
        }))
    }

    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn max_dimension(&self) -> f32 {
        self.size().max()
    }
}

/// Result of [`Mesh::validate`]
#[derive(Debug, Clone, PartialEq)]
pub struct MeshReport {
    pub triangle_count: usize,
    /// Indices of zero-area triangles. They are kept, only flagged.
    pub degenerate: Vec<usize>,
}

/// A 3D mesh composed of triangles
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            triangles: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.triangles.iter().flat_map(|t| t.vertices.iter()))
    }

    /// Check that the mesh can be displayed and exported: at least one
    /// triangle and only finite coordinates. Degenerate triangles pass and
    /// are listed in the report.
    pub fn validate(&self) -> Result<MeshReport> {
        if self.triangles.is_empty() {
            return Err(Error::malformed("mesh has no triangles"));
        }
        if let Some(index) = self.triangles.iter().position(|t| !t.is_finite()) {
            return Err(Error::malformed(format!(
                "triangle {index} has non-finite coordinates"
            )));
        }

        let degenerate = self
            .triangles
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_degenerate())
            .map(|(i, _)| i)
            .collect();

        Ok(MeshReport {
            triangle_count: self.triangles.len(),
            degenerate,
        })
    }

    /// Axis-aligned cube spanning `0..size` on every axis, outward normals.
    pub fn cube(size: f32) -> Self {
        let corner = |x: u8, y: u8, z: u8| {
            Point3::new(f32::from(x) * size, f32::from(y) * size, f32::from(z) * size)
        };
        // Each face as a counter-clockwise quad seen from outside.
        let faces = [
            [(0, 0, 1), (1, 0, 1), (1, 1, 1), (0, 1, 1)], // front (+z)
            [(1, 0, 0), (0, 0, 0), (0, 1, 0), (1, 1, 0)], // back (-z)
            [(0, 1, 1), (1, 1, 1), (1, 1, 0), (0, 1, 0)], // top (+y)
            [(0, 0, 0), (1, 0, 0), (1, 0, 1), (0, 0, 1)], // bottom (-y)
            [(1, 0, 1), (1, 0, 0), (1, 1, 0), (1, 1, 1)], // right (+x)
            [(0, 0, 0), (0, 0, 1), (0, 1, 1), (0, 1, 0)], // left (-x)
        ];

        let mut mesh = Self::with_capacity(12);
        for quad in faces {
            let [a, b, c, d] = quad.map(|(x, y, z)| corner(x, y, z));
            mesh.add_triangle(Triangle::new(a, b, c));
            mesh.add_triangle(Triangle::new(a, c, d));
        }
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normal_follows_winding() {
        let t = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        assert_relative_eq!(t.normal, Vector3::<f32>::z());
        assert_relative_eq!(t.flipped().normal, -Vector3::<f32>::z());
        assert_relative_eq!(t.area(), 0.5);
    }

    #[test]
    fn test_degenerate_triangle_has_zero_normal() {
        let p = Point3::new(1.0, 2.0, 3.0);
        let t = Triangle::new(p, p, Point3::new(2.0, 4.0, 6.0));
        assert!(t.is_degenerate());
        assert_eq!(t.normal, Vector3::zeros());
    }

    #[test]
    fn test_cube_normals_point_outward() {
        let mesh = Mesh::cube(2.0);
        assert_eq!(mesh.len(), 12);

        let center = Point3::new(1.0, 1.0, 1.0);
        for t in &mesh.triangles {
            let face_center = nalgebra::center(&t.vertices[0], &t.vertices[2]);
            assert!(t.normal.dot(&(face_center - center)) > 0.0);
        }
    }

    #[test]
    fn test_bounds() {
        let bounds = Mesh::cube(4.0).bounds().unwrap();
        assert_eq!(bounds.min, Point3::origin());
        assert_eq!(bounds.max, Point3::new(4.0, 4.0, 4.0));
        assert_eq!(bounds.center(), Point3::new(2.0, 2.0, 2.0));
        assert_eq!(bounds.max_dimension(), 4.0);
        assert!(Mesh::new().bounds().is_none());
    }

    #[test]
    fn test_validate_flags_degenerate_and_rejects_empty() {
        assert!(matches!(Mesh::new().validate(), Err(Error::MalformedMesh { .. })));

        let mut mesh = Mesh::cube(1.0);
        let p = Point3::origin();
        mesh.add_triangle(Triangle::new(p, p, p));
        let report = mesh.validate().unwrap();
        assert_eq!(report.triangle_count, 13);
        assert_eq!(report.degenerate, vec![12]);

        mesh.add_triangle(Triangle::new(Point3::new(f32::NAN, 0.0, 0.0), p, p));
        assert!(matches!(mesh.validate(), Err(Error::MalformedMesh { .. })));
    }
}
