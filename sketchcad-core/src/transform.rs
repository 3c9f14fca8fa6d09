/// Rotations applied to generated solids and the render matrix chain
use nalgebra::{Matrix4, Vector3};

use crate::geometry::{Mesh, Triangle};

/// Rotation around the three axes (in radians), applied Z, Y, X.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationState {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl RotationState {
    /// Maps the sketch sweep axis (+Z) onto the Y-up viewer convention.
    pub const SWEEP_TO_Y_UP: Self = Self::new(-std::f32::consts::FRAC_PI_2, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl Default for RotationState {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

/// Transform builder for 3D transformations
pub struct Transform;

impl Transform {
    /// Create a rotation matrix from a rotation state
    pub fn rotation_matrix(rotation: &RotationState) -> Matrix4<f32> {
        let rx = Matrix4::new_rotation(Vector3::new(rotation.x, 0.0, 0.0));
        let ry = Matrix4::new_rotation(Vector3::new(0.0, rotation.y, 0.0));
        let rz = Matrix4::new_rotation(Vector3::new(0.0, 0.0, rotation.z));

        rz * ry * rx
    }

    /// Apply `matrix` to every vertex and recompute normals from the winding.
    ///
    /// Only orientation-preserving matrices keep normals outward.
    pub fn apply(mesh: &Mesh, matrix: &Matrix4<f32>) -> Mesh {
        let triangles = mesh
            .triangles
            .iter()
            .map(|t| {
                let [v0, v1, v2] = t.vertices.map(|v| matrix.transform_point(&v));
                Triangle::new(v0, v1, v2)
            })
            .collect();
        Mesh { triangles }
    }

    /// Create a model-view-projection matrix
    pub fn mvp_matrix(
        model: &Matrix4<f32>,
        view: &Matrix4<f32>,
        projection: &Matrix4<f32>,
    ) -> Matrix4<f32> {
        projection * view * model
    }
}
