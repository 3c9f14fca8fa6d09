/// ASCII rasterizer for terminal rendering
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use nalgebra::{Matrix4, Point2, Point3, Vector3};
use sketchcad_core::{Camera, Mesh, RenderBackend, Triangle};
use std::io::Write;
use tracing::debug;

/// Character luminosity ramp for depth/shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Renderer-side copy of a solid
#[derive(Debug)]
pub struct ScreenMesh {
    triangles: Vec<Triangle>,
}

impl ScreenMesh {
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

/// ASCII renderer that converts 3D meshes to terminal characters
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    char_buffer: Vec<char>,
    live: usize,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            char_buffer: vec![' '; size],
            live: 0,
        }
    }

    /// Number of uploaded meshes not yet released.
    pub fn live_count(&self) -> usize {
        self.live
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.depth_buffer = vec![f32::INFINITY; width * height];
        self.char_buffer = vec![' '; width * height];
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.char_buffer.fill(' ');
    }

    pub fn char_at(&self, x: usize, y: usize) -> Option<char> {
        (x < self.width && y < self.height).then(|| self.char_buffer[y * self.width + x])
    }

    /// Put a character on top of whatever was rasterized.
    pub fn plot(&mut self, x: i32, y: i32, character: char) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let idx = y as usize * self.width + x as usize;
        self.char_buffer[idx] = character;
        self.depth_buffer[idx] = f32::NEG_INFINITY;
    }

    /// Bresenham line between two cells. With `dashed` every other cell is skipped.
    pub fn draw_line(&mut self, from: (i32, i32), to: (i32, i32), character: char, dashed: bool) {
        let (mut x, mut y) = from;
        let dx = (to.0 - x).abs();
        let dy = -(to.1 - y).abs();
        let sx = if x < to.0 { 1 } else { -1 };
        let sy = if y < to.1 { 1 } else { -1 };
        let mut err = dx + dy;
        let mut step = 0usize;

        loop {
            if !dashed || step % 2 == 0 {
                self.plot(x, y, character);
            }
            if (x, y) == to {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
            step += 1;
        }
    }

    fn render_triangle(&mut self, triangle: &Triangle, model_matrix: &Matrix4<f32>, camera: &Camera) {
        // Project vertices to screen space
        let mut corners = [Point3::origin(); 3];
        for (slot, vertex) in corners.iter_mut().zip(&triangle.vertices) {
            match camera.project_to_screen(vertex, model_matrix, self.width as u32, self.height as u32)
            {
                Some((x, y, depth)) => *slot = Point3::new(x, y, depth),
                None => return, // Triangle is clipped
            }
        }

        // Headlight: faces turned towards the camera are brightest
        let light_dir = (camera.position - camera.target).normalize();
        let brightness = triangle.normal.dot(&light_dir).max(0.0);

        // Map brightness to character, keeping lit faces visible
        let char_index = 1 + (brightness * (LUMINOSITY_RAMP.len() - 2) as f32) as usize;
        let char_index = char_index.min(LUMINOSITY_RAMP.len() - 1);
        let character = LUMINOSITY_RAMP[char_index];

        self.rasterize_triangle(&corners, character);
    }

    /// Fill the cells whose centers fall inside `corners` (x, y in cells, z
    /// as depth), keeping the nearest fragment per cell.
    fn rasterize_triangle(&mut self, corners: &[Point3<f32>; 3], character: char) {
        let [a, b, c] = corners.map(|p| p.xy());
        let area = edge(&a, &b, &c);
        if area.abs() < 1e-6 {
            return;
        }
        let depths = Vector3::new(corners[0].z, corners[1].z, corners[2].z);

        let lo = a.inf(&b).inf(&c);
        let hi = a.sup(&b).sup(&c);
        let (x0, x1) = ((lo.x.floor() as i32).max(0), (hi.x.ceil() as i32).min(self.width as i32 - 1));
        let (y0, y1) = ((lo.y.floor() as i32).max(0), (hi.y.ceil() as i32).min(self.height as i32 - 1));

        for y in y0..=y1 {
            for x in x0..=x1 {
                let p = Point2::new(x as f32 + 0.5, y as f32 + 0.5);
                let weights = Vector3::new(edge(&b, &c, &p), edge(&c, &a, &p), edge(&a, &b, &p)) / area;
                if weights.min() < 0.0 {
                    continue;
                }

                let depth = weights.dot(&depths);
                let idx = y as usize * self.width + x as usize;
                if depth < self.depth_buffer[idx] {
                    self.depth_buffer[idx] = depth;
                    self.char_buffer[idx] = character;
                }
            }
        }
    }

    /// Write the character buffer, one terminal row per buffer row.
    pub fn present<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for (y, row) in self.char_buffer.chunks(self.width.max(1)).enumerate() {
            writer.queue(crossterm::cursor::MoveTo(0, y as u16))?;
            for &c in row {
                // Color based on character intensity
                let color = match c {
                    ' ' | '.' | ':' => Color::DarkGrey,
                    '-' | '=' => Color::Grey,
                    '+' | '*' => Color::White,
                    '#' | '%' | '@' => Color::Cyan,
                    _ => Color::Yellow,
                };

                writer.queue(SetForegroundColor(color))?;
                writer.queue(Print(c))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

impl RenderBackend for AsciiRenderer {
    type Resource = ScreenMesh;

    fn upload(&mut self, mesh: &Mesh) -> ScreenMesh {
        self.live += 1;
        ScreenMesh {
            triangles: mesh.triangles.clone(),
        }
    }

    fn release(&mut self, resource: ScreenMesh) {
        debug!(triangles = resource.len(), "releasing screen mesh");
        self.live -= 1;
    }

    fn draw(&mut self, resource: &ScreenMesh, camera: &Camera) {
        let model = Matrix4::identity();
        for triangle in &resource.triangles {
            self.render_triangle(triangle, &model, camera);
        }
    }
}

/// Twice the signed area of `a, b, p`; the edge function of `p` against `a -> b`.
fn edge(a: &Point2<f32>, b: &Point2<f32>, p: &Point2<f32>) -> f32 {
    (b - a).perp(&(p - a))
}
