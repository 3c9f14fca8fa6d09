/// Viewport: the single active solid, its render resources and the camera
///
/// The viewport is the only owner of the displayed solid. Front ends plug in
/// a `RenderBackend` that turns meshes into whatever they draw with (GPU
/// buffers, flat arrays for WebGL, an ASCII rasterizer) and the viewport makes
/// sure every uploaded resource is released exactly once.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::config::STL_SOLID_NAME;
use crate::error::{Error, Result};
use crate::geometry::Mesh;
use crate::projection::{Camera, ProjectionMode};
use crate::stl;

/// Renderer side of the viewport
pub trait RenderBackend {
    /// Handle to the uploaded copy of a mesh
    type Resource;

    fn upload(&mut self, mesh: &Mesh) -> Self::Resource;

    /// Free everything `upload` allocated for `resource`.
    fn release(&mut self, resource: Self::Resource);

    fn draw(&mut self, resource: &Self::Resource, camera: &Camera);
}

struct ActiveSolid<R> {
    mesh: Mesh,
    label: String,
    resource: R,
}

/// Owns the active solid, the backend and the camera.
pub struct Viewport<B: RenderBackend> {
    backend: B,
    camera: Camera,
    active: Option<ActiveSolid<B::Resource>>,
}

impl<B: RenderBackend> Viewport<B> {
    pub fn new(backend: B, camera: Camera) -> Self {
        Self {
            backend,
            camera,
            active: None,
        }
    }

    /// Replace the active solid with `mesh` and frame the camera on it.
    ///
    /// The mesh is validated first; on failure the current solid stays.
    pub fn load(&mut self, mesh: Mesh, label: impl Into<String>) -> Result<()> {
        let label = label.into();
        let report = mesh.validate()?;
        let Some(bounds) = mesh.bounds() else {
            return Err(Error::malformed("mesh has no vertices"));
        };

        self.dispose();
        let resource = self.backend.upload(&mesh);
        self.camera.frame(&bounds);

        info!(
            %label,
            triangles = report.triangle_count,
            degenerate = report.degenerate.len(),
            "loaded solid"
        );
        self.active = Some(ActiveSolid {
            mesh,
            label,
            resource,
        });
        Ok(())
    }

    /// Release the active solid's resources, leaving the viewport empty.
    pub fn dispose(&mut self) {
        if let Some(previous) = self.active.take() {
            debug!(label = %previous.label, "disposing solid");
            self.backend.release(previous.resource);
        }
    }

    /// Binary STL bytes of the active solid.
    pub fn export_active(&self) -> Result<Vec<u8>> {
        let mesh = self.active_mesh().ok_or(Error::NothingLoaded)?;
        info!(triangles = mesh.len(), "exporting binary STL");
        Ok(stl::encode(mesh))
    }

    /// ASCII STL text of the active solid.
    pub fn export_active_ascii(&self) -> Result<String> {
        let mesh = self.active_mesh().ok_or(Error::NothingLoaded)?;
        info!(triangles = mesh.len(), "exporting ASCII STL");
        Ok(stl::encode_ascii(mesh, STL_SOLID_NAME))
    }

    /// Per-frame tick: draw the active solid from the current camera.
    pub fn render(&mut self) {
        if let Some(active) = &self.active {
            self.backend.draw(&active.resource, &self.camera);
        }
    }

    pub fn orbit(&mut self, d_azimuth: f32, d_polar: f32) {
        self.camera.orbit(d_azimuth, d_polar);
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.camera.pan(dx, dy);
    }

    pub fn zoom(&mut self, factor: f32) {
        self.camera.zoom(factor);
    }

    pub fn set_projection(&mut self, mode: ProjectionMode) {
        self.camera.mode = mode;
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_viewport(width, height);
    }

    pub fn is_loaded(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_mesh(&self) -> Option<&Mesh> {
        self.active.as_ref().map(|a| &a.mesh)
    }

    pub fn active_label(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.label.as_str())
    }

    pub fn active_resource(&self) -> Option<&B::Resource> {
        self.active.as_ref().map(|a| &a.resource)
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: RenderBackend> Drop for Viewport<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Identifier of a buffer set held by [`BufferBackend`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(u64);

/// Flat, non-indexed vertex data, three entries per vertex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBuffers {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
}

impl MeshBuffers {
    pub fn from_mesh(mesh: &Mesh) -> Self {
        let mut buffers = Self {
            positions: Vec::with_capacity(mesh.len() * 9),
            normals: Vec::with_capacity(mesh.len() * 9),
        };
        for triangle in &mesh.triangles {
            for vertex in &triangle.vertices {
                buffers.positions.extend_from_slice(&[vertex.x, vertex.y, vertex.z]);
                buffers.normals.extend_from_slice(triangle.normal.as_slice());
            }
        }
        buffers
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }
}

/// Headless backend that keeps flat buffers for an external renderer
/// (WebGL on the JS side) and tracks which of them are still alive.
#[derive(Debug, Default)]
pub struct BufferBackend {
    next_id: u64,
    live: HashMap<BufferId, MeshBuffers>,
    frames: u64,
}

impl BufferBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffers(&self, id: BufferId) -> Option<&MeshBuffers> {
        self.live.get(&id)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames
    }
}

impl RenderBackend for BufferBackend {
    type Resource = BufferId;

    fn upload(&mut self, mesh: &Mesh) -> BufferId {
        let id = BufferId(self.next_id);
        self.next_id += 1;
        self.live.insert(id, MeshBuffers::from_mesh(mesh));
        id
    }

    fn release(&mut self, resource: BufferId) {
        self.live.remove(&resource);
    }

    fn draw(&mut self, _resource: &BufferId, _camera: &Camera) {
        self.frames += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn viewport() -> Viewport<BufferBackend> {
        Viewport::new(BufferBackend::new(), Camera::default())
    }

    #[test]
    fn test_second_load_replaces_and_releases_first() {
        let mut viewport = viewport();
        viewport.load(Mesh::cube(1.0), "first").unwrap();
        let first = *viewport.active_resource().unwrap();

        viewport.load(Mesh::cube(8.0), "second").unwrap();
        assert_eq!(viewport.active_label(), Some("second"));
        assert_eq!(viewport.backend().live_count(), 1);
        assert!(viewport.backend().buffers(first).is_none());
        assert_eq!(viewport.camera().target, Point3::new(4.0, 4.0, 4.0));
    }

    #[test]
    fn test_failed_load_keeps_previous_solid() {
        let mut viewport = viewport();
        viewport.load(Mesh::cube(2.0), "cube").unwrap();
        let camera = viewport.camera().clone();

        assert!(matches!(
            viewport.load(Mesh::new(), "empty"),
            Err(Error::MalformedMesh { .. })
        ));
        assert_eq!(viewport.active_label(), Some("cube"));
        assert_eq!(viewport.backend().live_count(), 1);
        assert_eq!(viewport.camera(), &camera);
    }

    #[test]
    fn test_export_requires_active_solid() {
        let mut viewport = viewport();
        assert!(matches!(viewport.export_active(), Err(Error::NothingLoaded)));
        assert!(matches!(
            viewport.export_active_ascii(),
            Err(Error::NothingLoaded)
        ));

        viewport.load(Mesh::cube(1.0), "cube").unwrap();
        let bytes = viewport.export_active().unwrap();
        assert_eq!(stl::decode(&bytes).unwrap().len(), 12);
        assert!(viewport.export_active_ascii().unwrap().starts_with("solid "));
    }

    #[test]
    fn test_dispose_releases_resources() {
        let mut viewport = viewport();
        viewport.load(Mesh::cube(1.0), "cube").unwrap();
        viewport.dispose();
        assert!(!viewport.is_loaded());
        assert_eq!(viewport.backend().live_count(), 0);
        assert!(matches!(viewport.export_active(), Err(Error::NothingLoaded)));
    }

    #[test]
    fn test_render_draws_only_when_loaded() {
        let mut viewport = viewport();
        viewport.render();
        assert_eq!(viewport.backend().frames_drawn(), 0);

        viewport.load(Mesh::cube(1.0), "cube").unwrap();
        let camera = viewport.camera().clone();
        viewport.render();
        viewport.render();
        assert_eq!(viewport.backend().frames_drawn(), 2);
        assert_eq!(viewport.camera(), &camera);
    }

    #[test]
    fn test_orthographic_projection_keeps_framing() {
        let mut viewport = viewport();
        viewport.load(Mesh::cube(4.0), "cube").unwrap();
        viewport.set_projection(ProjectionMode::Orthographic);

        let camera = viewport.camera();
        let (x, y, _) = camera
            .project_to_screen(&camera.target, &nalgebra::Matrix4::identity(), 800, 600)
            .unwrap();
        assert!((x - 400.0).abs() < 1e-2 && (y - 300.0).abs() < 1e-2);
    }

    #[test]
    fn test_buffers_are_flat_per_vertex() {
        let buffers = MeshBuffers::from_mesh(&Mesh::cube(1.0));
        assert_eq!(buffers.vertex_count(), 36);
        assert_eq!(buffers.normals.len(), buffers.positions.len());
    }
}
