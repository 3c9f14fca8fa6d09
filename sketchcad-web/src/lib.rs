/// SketchCAD Web - WASM bindings for the sketcher and the solid viewer
///
/// The page owns the canvas, the WebGL context and the DOM events; this crate
/// keeps all modeling state. `WebSketcher` receives pointer events in canvas
/// pixels, `WebViewer` turns files into flat vertex buffers for the renderer.

use sketchcad_core::{
    config::DEFAULT_EXTRUDE_DEPTH, BufferBackend, Camera, Error, MeshBuffers, Point2D,
    PointerEvent, Preview, ProjectionMode, SketchCapture, Tool, Workbench,
};
use wasm_bindgen::prelude::*;

/// Shown when a drop is neither an STL nor a sketch export.
const DROP_HINT: &str = "Drop an .stl or a Sketch .json file.";

/// Initialize WASM module with panic hook and logging
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
    tracing::info!("SketchCAD WASM initialized");
}

fn js_error(e: Error) -> JsError {
    JsError::new(&e.to_string())
}

fn parse_tool(name: &str) -> Option<Tool> {
    match name.to_ascii_lowercase().as_str() {
        "line" => Some(Tool::Line),
        "rect" | "rectangle" => Some(Tool::Rect),
        _ => None,
    }
}

/// Alert text for a file the viewer could not open.
fn drop_message(e: &Error) -> String {
    match e {
        Error::UnsupportedFileType { .. } => DROP_HINT.to_string(),
        other => other.to_string(),
    }
}

/// Flatten a preview into the `[x0, y0, x1, y1, ...]` polyline the page
/// strokes dashed.
fn preview_polyline(preview: Option<Preview>) -> Vec<f64> {
    match preview {
        None => Vec::new(),
        Some(Preview::Segment { from, to }) => vec![from.x, from.y, to.x, to.y],
        Some(Preview::Rect { start, end }) => vec![
            start.x, start.y, end.x, start.y, end.x, end.y, start.x, end.y, start.x, start.y,
        ],
    }
}

/// Polygon capture on a snapped grid
#[wasm_bindgen]
pub struct WebSketcher {
    capture: SketchCapture,
}

#[wasm_bindgen]
impl WebSketcher {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            capture: SketchCapture::new(),
        }
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) -> Vec<f64> {
        preview_polyline(self.capture.handle(PointerEvent::Down(Point2D::new(x, y))))
    }

    /// Returns the dashed preview to draw, empty when there is none.
    pub fn pointer_move(&mut self, x: f64, y: f64) -> Vec<f64> {
        preview_polyline(self.capture.handle(PointerEvent::Move(Point2D::new(x, y))))
    }

    pub fn pointer_up(&mut self, x: f64, y: f64) {
        self.capture.handle(PointerEvent::Up(Point2D::new(x, y)));
    }

    /// `"line"` or `"rect"`.
    pub fn set_tool(&mut self, name: &str) -> Result<(), JsError> {
        let tool = parse_tool(name).ok_or_else(|| JsError::new(&format!("Unknown tool '{name}'")))?;
        self.capture.set_tool(tool);
        Ok(())
    }

    pub fn set_snap(&mut self, snap: f64) {
        self.capture.set_snap(snap);
    }

    #[wasm_bindgen(getter)]
    pub fn snap(&self) -> f64 {
        self.capture.snap()
    }

    pub fn close(&mut self) -> Result<(), JsError> {
        self.capture.close().map_err(js_error)
    }

    pub fn clear(&mut self) {
        self.capture.clear();
    }

    #[wasm_bindgen(getter)]
    pub fn closed(&self) -> bool {
        self.capture.is_closed()
    }

    /// Committed vertices as `[x0, y0, x1, y1, ...]`.
    pub fn points(&self) -> Vec<f64> {
        self.capture
            .polygon()
            .points()
            .iter()
            .flat_map(|p| [p.x, p.y])
            .collect()
    }

    /// Contents of `sketch.json`.
    pub fn export_json(&self) -> Result<String, JsError> {
        self.capture.export_json().map_err(js_error)
    }
}

impl Default for WebSketcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Solid viewer state: active mesh, camera and feature history
#[wasm_bindgen]
pub struct WebViewer {
    workbench: Workbench<BufferBackend>,
}

#[wasm_bindgen]
impl WebViewer {
    #[wasm_bindgen(constructor)]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            workbench: Workbench::new(BufferBackend::new(), Camera::new(width, height)),
        }
    }

    pub fn load_sample(&mut self) -> Result<(), JsError> {
        self.workbench.load_sample().map_err(js_error)
    }

    /// Open a `.stl` or sketch `.json`; `depth` applies to sketches.
    pub fn open_file(&mut self, name: &str, bytes: &[u8], depth: f32) -> Result<(), JsError> {
        self.workbench.open_file(name, bytes, depth).map_err(js_error)
    }

    /// Drop handler: like `open_file` with the default depth, but reports
    /// failures with a blocking alert. Returns whether the file loaded.
    pub fn drop_file(&mut self, name: &str, bytes: &[u8]) -> bool {
        let Err(e) = self.workbench.open_file(name, bytes, DEFAULT_EXTRUDE_DEPTH) else {
            return true;
        };
        let message = drop_message(&e);
        tracing::warn!(%name, "drop rejected: {message}");
        if let Some(window) = web_sys::window() {
            if let Err(e) = window.alert_with_message(&message) {
                tracing::warn!(error = ?e, "could not show drop alert");
            }
        }
        false
    }

    /// Binary STL of the active solid, for `model.stl`.
    pub fn export_stl(&self) -> Result<Vec<u8>, JsError> {
        self.workbench.export_stl().map_err(js_error)
    }

    pub fn export_stl_ascii(&self) -> Result<String, JsError> {
        self.workbench.export_stl_ascii().map_err(js_error)
    }

    #[wasm_bindgen(getter)]
    pub fn loaded(&self) -> bool {
        self.workbench.viewport().is_loaded()
    }

    #[wasm_bindgen(getter)]
    pub fn label(&self) -> Option<String> {
        self.workbench.viewport().active_label().map(str::to_string)
    }

    /// Non-indexed vertex positions, three floats per vertex.
    pub fn positions(&self) -> Vec<f32> {
        self.buffers().map(|b| b.positions.clone()).unwrap_or_default()
    }

    pub fn normals(&self) -> Vec<f32> {
        self.buffers().map(|b| b.normals.clone()).unwrap_or_default()
    }

    pub fn camera_position(&self) -> Vec<f32> {
        let p = self.workbench.viewport().camera().position;
        vec![p.x, p.y, p.z]
    }

    pub fn camera_target(&self) -> Vec<f32> {
        let t = self.workbench.viewport().camera().target;
        vec![t.x, t.y, t.z]
    }

    /// Column-major projection × view matrix.
    pub fn view_projection(&self) -> Vec<f32> {
        let camera = self.workbench.viewport().camera();
        (camera.projection_matrix() * camera.view_matrix())
            .as_slice()
            .to_vec()
    }

    pub fn orbit(&mut self, d_azimuth: f32, d_polar: f32) {
        self.workbench.viewport_mut().orbit(d_azimuth, d_polar);
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.workbench.viewport_mut().pan(dx, dy);
    }

    pub fn zoom(&mut self, factor: f32) {
        self.workbench.viewport_mut().zoom(factor);
    }

    pub fn set_orthographic(&mut self, orthographic: bool) {
        let mode = if orthographic {
            ProjectionMode::Orthographic
        } else {
            ProjectionMode::Perspective
        };
        self.workbench.viewport_mut().set_projection(mode);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.workbench.viewport_mut().resize(width, height);
    }

    /// Per-frame tick from `requestAnimationFrame`.
    pub fn render(&mut self) {
        self.workbench.viewport_mut().render();
    }

    pub fn history_json(&self) -> Result<String, JsError> {
        self.workbench.history().to_json().map_err(js_error)
    }

    /// One-line summary for the history panel.
    pub fn history_summary(&self) -> String {
        self.workbench.history().to_string()
    }
}

impl WebViewer {
    fn buffers(&self) -> Option<&MeshBuffers> {
        let viewport = self.workbench.viewport();
        let id = viewport.active_resource()?;
        viewport.backend().buffers(*id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tool() {
        assert_eq!(parse_tool("Rect"), Some(Tool::Rect));
        assert_eq!(parse_tool("line"), Some(Tool::Line));
        assert_eq!(parse_tool("circle"), None);
    }

    #[test]
    fn test_drop_message() {
        let unsupported = Error::UnsupportedFileType {
            name: "notes.txt".into(),
        };
        assert_eq!(drop_message(&unsupported), DROP_HINT);
        assert_eq!(drop_message(&Error::NothingLoaded), Error::NothingLoaded.to_string());
    }

    #[test]
    fn test_rect_preview_is_a_closed_polyline() {
        let mut sketcher = WebSketcher::new();
        sketcher.set_tool("rect").unwrap();
        sketcher.pointer_down(10.0, 10.0);
        let preview = sketcher.pointer_move(50.0, 30.0);
        assert_eq!(preview.len(), 10);
        assert_eq!(&preview[..2], &preview[8..]);

        sketcher.pointer_up(50.0, 30.0);
        assert_eq!(sketcher.points(), vec![10.0, 10.0, 50.0, 10.0, 50.0, 30.0, 10.0, 30.0]);
        sketcher.close().unwrap();
        assert!(sketcher.closed());
    }

    #[test]
    fn test_viewer_buffers_follow_active_solid() {
        let mut viewer = WebViewer::new(640, 480);
        assert!(viewer.positions().is_empty());

        viewer.load_sample().unwrap();
        assert_eq!(viewer.positions().len(), 12 * 9);
        assert_eq!(viewer.normals().len(), 12 * 9);
        assert_eq!(viewer.view_projection().len(), 16);

        let mut sketcher = WebSketcher::new();
        sketcher.set_tool("rect").unwrap();
        sketcher.pointer_down(0.0, 0.0);
        sketcher.pointer_up(30.0, 20.0);
        sketcher.close().unwrap();
        let json = sketcher.export_json().unwrap();

        assert!(viewer.drop_file("sketch.json", json.as_bytes()));
        assert_eq!(viewer.label().as_deref(), Some("Extrude(20mm)"));
        assert!(viewer.history_json().unwrap().contains("\"extrude\""));
        assert!(viewer.history_summary().starts_with("Features: load-sample"));
    }
}
