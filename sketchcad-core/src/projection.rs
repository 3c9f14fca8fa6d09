/// Camera, projection and orbit-style interaction
use nalgebra::{Matrix4, Point3, Vector3};

use crate::config::{
    CLIP_RANGE_FACTOR, DEFAULT_FOV, FRAMING_DISTANCE_FACTOR, MIN_CAMERA_DISTANCE, POLAR_LIMIT,
};
use crate::geometry::Aabb;
use crate::transform::Transform;

/// Projection mode for rendering
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionMode {
    Orthographic,
    Perspective,
}

/// Camera configuration for 3D rendering
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub mode: ProjectionMode,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            position: Point3::new(120.0, 120.0, 120.0),
            target: Point3::origin(),
            up: Vector3::y(),
            fov: DEFAULT_FOV,
            aspect: width as f32 / height.max(1) as f32,
            near: 0.1,
            far: 2000.0,
            mode: ProjectionMode::Perspective,
        }
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    /// Look at the center of `bounds` from along the (1, 1, 1) diagonal,
    /// far enough to see the whole box, with clip planes scaled to it.
    pub fn frame(&mut self, bounds: &Aabb) {
        let max_dim = bounds.max_dimension();
        let max_dim = if max_dim > f32::EPSILON { max_dim } else { 1.0 };
        let center = bounds.center();
        let direction = Vector3::new(1.0, 1.0, 1.0).normalize();

        self.target = center;
        self.position = center + direction * (max_dim * FRAMING_DISTANCE_FACTOR);
        self.near = max_dim / CLIP_RANGE_FACTOR;
        self.far = max_dim * CLIP_RANGE_FACTOR;
    }

    pub fn distance(&self) -> f32 {
        (self.position - self.target).norm()
    }

    /// Rotate the camera around its target. `d_azimuth` spins around the up
    /// axis, `d_polar` tilts towards or away from it; both in radians.
    pub fn orbit(&mut self, d_azimuth: f32, d_polar: f32) {
        let offset = self.position - self.target;
        let radius = offset.norm();
        if radius <= f32::EPSILON {
            return;
        }
        let azimuth = offset.x.atan2(offset.z) + d_azimuth;
        let polar = ((offset.y / radius).clamp(-1.0, 1.0).acos() + d_polar)
            .clamp(POLAR_LIMIT, std::f32::consts::PI - POLAR_LIMIT);

        self.position = self.target
            + Vector3::new(
                radius * polar.sin() * azimuth.sin(),
                radius * polar.cos(),
                radius * polar.sin() * azimuth.cos(),
            );
    }

    /// Slide camera and target together in the view plane. Offsets are
    /// fractions of the current distance so panning feels the same at any zoom.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let forward = (self.target - self.position).normalize();
        let right = forward.cross(&self.up).normalize();
        let up = right.cross(&forward);
        let offset = (right * dx + up * dy) * self.distance();

        self.position += offset;
        self.target += offset;
    }

    /// Move towards (`factor < 1`) or away from (`factor > 1`) the target.
    pub fn zoom(&mut self, factor: f32) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        let offset = self.position - self.target;
        let distance = (offset.norm() * factor).max(MIN_CAMERA_DISTANCE);
        self.position = self.target + offset.normalize() * distance;
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Create the projection matrix
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        match self.mode {
            ProjectionMode::Perspective => {
                Matrix4::new_perspective(self.aspect, self.fov, self.near, self.far)
            }
            ProjectionMode::Orthographic => {
                let height = self.distance();
                let width = height * self.aspect;
                Matrix4::new_orthographic(
                    -width / 2.0,
                    width / 2.0,
                    -height / 2.0,
                    height / 2.0,
                    self.near,
                    self.far,
                )
            }
        }
    }

    /// Project a 3D point to 2D screen space, with its NDC depth.
    pub fn project_to_screen(
        &self,
        point: &Point3<f32>,
        model_matrix: &Matrix4<f32>,
        width: u32,
        height: u32,
    ) -> Option<(f32, f32, f32)> {
        let mvp =
            Transform::mvp_matrix(model_matrix, &self.view_matrix(), &self.projection_matrix());
        let clip = mvp * point.to_homogeneous();

        // Behind the camera
        if clip.w <= 1e-6 {
            return None;
        }

        let ndc_x = clip.x / clip.w;
        let ndc_y = clip.y / clip.w;
        let depth = clip.z / clip.w;

        if !(-1.0..=1.0).contains(&depth) {
            return None;
        }

        let screen_x = (ndc_x + 1.0) * 0.5 * width as f32;
        let screen_y = (1.0 - ndc_y) * 0.5 * height as f32;

        Some((screen_x, screen_y, depth))
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cube_bounds(size: f32) -> Aabb {
        Aabb {
            min: Point3::origin(),
            max: Point3::new(size, size, size),
        }
    }

    #[test]
    fn test_camera_creation() {
        let camera = Camera::new(800, 600);
        assert_eq!(camera.mode, ProjectionMode::Perspective);
        assert!((camera.aspect - 800.0 / 600.0).abs() < 1e-6);
    }

    #[test]
    fn test_frame_scales_with_bounds() {
        let mut camera = Camera::default();
        camera.frame(&cube_bounds(10.0));

        assert_eq!(camera.target, Point3::new(5.0, 5.0, 5.0));
        assert_relative_eq!(camera.distance(), 22.0, epsilon = 1e-4);
        let dir = (camera.position - camera.target).normalize();
        assert_relative_eq!(dir.x, dir.y, epsilon = 1e-6);
        assert_relative_eq!(dir.y, dir.z, epsilon = 1e-6);
        assert_relative_eq!(camera.near, 0.1);
        assert_relative_eq!(camera.far, 1000.0);
    }

    #[test]
    fn test_frame_of_a_point_uses_unit_size() {
        let mut camera = Camera::default();
        let p = Point3::new(3.0, 3.0, 3.0);
        camera.frame(&Aabb { min: p, max: p });
        assert_relative_eq!(camera.distance(), 2.2, epsilon = 1e-5);
        assert!(camera.near > 0.0);
    }

    #[test]
    fn test_orbit_keeps_distance_and_target() {
        let mut camera = Camera::default();
        camera.frame(&cube_bounds(4.0));
        let (target, distance) = (camera.target, camera.distance());

        camera.orbit(0.7, -0.3);
        assert_eq!(camera.target, target);
        assert_relative_eq!(camera.distance(), distance, epsilon = 1e-4);

        // Tilting far past the pole stops just short of it.
        camera.orbit(0.0, -10.0);
        let dir = (camera.position - camera.target).normalize();
        assert!(dir.y < 1.0 && dir.y > 0.99);
    }

    #[test]
    fn test_zoom_and_pan() {
        let mut camera = Camera::default();
        camera.frame(&cube_bounds(10.0));
        camera.zoom(0.5);
        assert_relative_eq!(camera.distance(), 11.0, epsilon = 1e-4);
        camera.zoom(0.0);
        assert_relative_eq!(camera.distance(), 11.0, epsilon = 1e-4);

        let before = camera.position - camera.target;
        camera.pan(0.1, 0.0);
        assert_relative_eq!(camera.position - camera.target, before, epsilon = 1e-4);
        assert!(camera.target != Point3::new(5.0, 5.0, 5.0));
    }

    #[test]
    fn test_target_projects_to_screen_center() {
        let mut camera = Camera::new(80, 40);
        camera.frame(&cube_bounds(2.0));
        let (x, y, depth) = camera
            .project_to_screen(&camera.target, &Matrix4::identity(), 80, 40)
            .unwrap();
        assert_relative_eq!(x, 40.0, epsilon = 1e-3);
        assert_relative_eq!(y, 20.0, epsilon = 1e-3);
        assert!(depth > -1.0 && depth < 1.0);

        let behind = camera.position + (camera.position - camera.target);
        assert!(camera
            .project_to_screen(&behind, &Matrix4::identity(), 80, 40)
            .is_none());
    }
}
