/// Terminal front end: a cell-grid sketcher and an ASCII solid viewer
use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use sketchcad_core::{
    config::{EXPORT_FILE_NAME, SKETCH_FILE_NAME},
    Camera, Point2D, PointerEvent, Preview, ProjectionMode, SketchCapture, Tool, Workbench,
};
use std::fs;
use std::io::{self, stdout, Write};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::info;

pub mod renderer;

pub use renderer::AsciiRenderer;

/// Rows reserved for the status overlay
const STATUS_ROWS: u16 = 2;
const ORBIT_STEP: f32 = 0.1;
const PAN_STEP: f32 = 0.05;
const ZOOM_STEP: f32 = 1.1;

/// Which half of the app has the keyboard and mouse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Sketch,
    View,
}

/// Main application struct for the terminal front end
pub struct TerminalApp {
    workbench: Workbench<AsciiRenderer>,
    capture: SketchCapture,
    preview: Option<Preview>,
    mode: Mode,
    depth: f32,
    ascii_export: bool,
    message: String,
    running: bool,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(depth: f32) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        let height = height.saturating_sub(STATUS_ROWS);

        Ok(Self {
            workbench: Workbench::new(
                AsciiRenderer::new(width as usize, height as usize),
                Camera::new(width as u32, height as u32),
            ),
            capture: SketchCapture::new(),
            preview: None,
            mode: Mode::Sketch,
            depth,
            ascii_export: false,
            message: String::from("Draw a closed outline, then press E to extrude"),
            running: true,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        })
    }

    /// Write exports as ASCII STL instead of binary.
    pub fn set_ascii_export(&mut self, ascii: bool) {
        self.ascii_export = ascii;
    }

    /// Load an `.stl` or sketch `.json` from disk and switch to the viewer.
    pub fn open(&mut self, path: &Path) -> io::Result<()> {
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.workbench
            .open_file(&name, &bytes, self.depth)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.mode = Mode::View;
        self.message = format!("Opened {name}");
        Ok(())
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            stdout(),
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide
        )?;

        let result = self.main_loop();

        // Cleanup
        execute!(
            stdout(),
            DisableMouseCapture,
            terminal::LeaveAlternateScreen,
            cursor::Show
        )?;
        terminal::disable_raw_mode()?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target

        while self.running {
            let frame_start = Instant::now();

            // Handle input
            while event::poll(Duration::from_millis(0))? {
                self.handle_event(event::read()?)?;
            }

            // Render
            self.render()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) -> io::Result<()> {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.handle_key(key),
            Event::Mouse(mouse) if self.mode == Mode::Sketch => self.handle_mouse(mouse),
            Event::Resize(width, height) => {
                let height = height.saturating_sub(STATUS_ROWS);
                let viewport = self.workbench.viewport_mut();
                viewport.resize(u32::from(width), u32::from(height));
                viewport
                    .backend_mut()
                    .resize(usize::from(width), usize::from(height));
                execute!(stdout(), terminal::Clear(ClearType::All))?;
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        // One terminal cell is one sketch unit.
        let at = Point2D::new(f64::from(mouse.column), f64::from(mouse.row));
        let event = match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => PointerEvent::Down(at),
            MouseEventKind::Drag(MouseButton::Left) => PointerEvent::Move(at),
            MouseEventKind::Up(MouseButton::Left) => PointerEvent::Up(at),
            _ => return,
        };
        self.preview = self.capture.handle(event);
    }

    fn handle_key(&mut self, KeyEvent { code, .. }: KeyEvent) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Tab => {
                self.mode = match self.mode {
                    Mode::Sketch => Mode::View,
                    Mode::View => Mode::Sketch,
                };
                self.preview = None;
            }
            _ => match self.mode {
                Mode::Sketch => self.handle_sketch_key(code),
                Mode::View => self.handle_view_key(code),
            },
        }
    }

    fn handle_sketch_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('l') => self.capture.set_tool(Tool::Line),
            KeyCode::Char('r') => self.capture.set_tool(Tool::Rect),
            KeyCode::Char('c') => {
                self.message = match self.capture.close() {
                    Ok(()) => String::from("Outline closed"),
                    Err(e) => e.to_string(),
                };
            }
            KeyCode::Char('n') => {
                self.capture.clear();
                self.preview = None;
                self.message = String::from("Sketch cleared");
            }
            KeyCode::Char('[') => self.capture.set_snap(self.capture.snap() - 1.0),
            KeyCode::Char(']') => self.capture.set_snap(self.capture.snap() + 1.0),
            KeyCode::Char('j') => {
                self.message = match self.capture.export_json() {
                    Ok(json) => write_file(SKETCH_FILE_NAME, json.as_bytes()),
                    Err(e) => e.to_string(),
                };
            }
            KeyCode::Char('e') => self.extrude_sketch(),
            _ => {}
        }
    }

    fn handle_view_key(&mut self, code: KeyCode) {
        let viewport = self.workbench.viewport_mut();
        match code {
            KeyCode::Left => viewport.orbit(-ORBIT_STEP, 0.0),
            KeyCode::Right => viewport.orbit(ORBIT_STEP, 0.0),
            KeyCode::Up => viewport.orbit(0.0, -ORBIT_STEP),
            KeyCode::Down => viewport.orbit(0.0, ORBIT_STEP),
            KeyCode::Char('+') | KeyCode::Char('=') => viewport.zoom(1.0 / ZOOM_STEP),
            KeyCode::Char('-') => viewport.zoom(ZOOM_STEP),
            KeyCode::Char('h') => viewport.pan(-PAN_STEP, 0.0),
            KeyCode::Char('l') => viewport.pan(PAN_STEP, 0.0),
            KeyCode::Char('k') => viewport.pan(0.0, PAN_STEP),
            KeyCode::Char('j') => viewport.pan(0.0, -PAN_STEP),
            KeyCode::Char('o') => {
                self.message = match self.workbench.load_sample() {
                    Ok(()) => String::from("Loaded sample cube"),
                    Err(e) => e.to_string(),
                };
            }
            KeyCode::Char('p') => {
                let mode = match viewport.camera().mode {
                    ProjectionMode::Perspective => ProjectionMode::Orthographic,
                    ProjectionMode::Orthographic => ProjectionMode::Perspective,
                };
                viewport.set_projection(mode);
            }
            KeyCode::Char('x') => self.message = self.export_model(),
            _ => {}
        }
    }

    fn extrude_sketch(&mut self) {
        let result = self
            .capture
            .export_json()
            .and_then(|json| self.workbench.import_sketch(&json, self.depth));
        match result {
            Ok(()) => {
                self.mode = Mode::View;
                self.preview = None;
                self.message = format!("Extruded {}mm", self.depth);
            }
            Err(e) => self.message = e.to_string(),
        }
    }

    fn export_model(&self) -> String {
        let bytes = if self.ascii_export {
            self.workbench.export_stl_ascii().map(String::into_bytes)
        } else {
            self.workbench.export_stl()
        };
        match bytes {
            Ok(bytes) => write_file(EXPORT_FILE_NAME, &bytes),
            Err(e) => e.to_string(),
        }
    }

    fn render(&mut self) -> io::Result<()> {
        {
            let viewport = self.workbench.viewport_mut();
            viewport.backend_mut().clear();
            if self.mode == Mode::View {
                viewport.render();
            }
        }
        if self.mode == Mode::Sketch {
            self.draw_sketch();
        }

        let mut stdout = stdout();
        self.workbench.viewport().backend().present(&mut stdout)?;
        self.draw_status(&mut stdout)?;
        stdout.flush()?;
        Ok(())
    }

    fn draw_sketch(&mut self) {
        let renderer = self.workbench.viewport_mut().backend_mut();
        let cell = |p: &Point2D| (p.x.round() as i32, p.y.round() as i32);

        let points = self.capture.polygon().points();
        for pair in points.windows(2) {
            renderer.draw_line(cell(&pair[0]), cell(&pair[1]), '#', false);
        }
        match self.preview {
            Some(Preview::Segment { from, to }) => {
                renderer.draw_line(cell(&from), cell(&to), '.', true);
            }
            Some(Preview::Rect { start, end }) => {
                let (a, b) = (cell(&start), cell(&end));
                for (from, to) in [
                    (a, (b.0, a.1)),
                    ((b.0, a.1), b),
                    (b, (a.0, b.1)),
                    ((a.0, b.1), a),
                ] {
                    renderer.draw_line(from, to, '.', true);
                }
            }
            None => {}
        }
        for p in points {
            let (x, y) = cell(p);
            renderer.plot(x, y, 'o');
        }
    }

    fn draw_status(&self, stdout: &mut io::Stdout) -> io::Result<()> {
        let (width, height) = terminal::size()?;
        let info = match self.mode {
            Mode::Sketch => format!(
                "SKETCH | tool: {:?} | snap: {} | closed: {} | {}",
                self.capture.tool(),
                self.capture.snap(),
                self.capture.is_closed(),
                self.message
            ),
            Mode::View => format!(
                "VIEW | {} | FPS: {:.1} | {}",
                self.workbench.viewport().active_label().unwrap_or("empty"),
                self.fps,
                self.message
            ),
        };
        let help = match self.mode {
            Mode::Sketch => "L=Line R=Rect C=Close N=Clear [/]=Snap J=Save JSON E=Extrude Tab=View Q=Quit",
            Mode::View => "Arrows=Orbit +/-=Zoom HJKL=Pan P=Projection O=Sample X=Export STL Tab=Sketch Q=Quit",
        };
        let fit = |s: &str| -> String {
            let s: String = s.chars().take(usize::from(width)).collect();
            format!("{s:<w$}", w = usize::from(width))
        };

        queue!(
            stdout,
            cursor::MoveTo(0, height.saturating_sub(STATUS_ROWS)),
            SetForegroundColor(Color::Yellow),
            Print(fit(&info)),
            cursor::MoveTo(0, height.saturating_sub(1)),
            SetForegroundColor(Color::DarkGrey),
            Print(fit(help)),
            ResetColor
        )?;
        Ok(())
    }
}

fn write_file(name: &str, bytes: &[u8]) -> String {
    match fs::write(name, bytes) {
        Ok(()) => {
            info!(file = name, bytes = bytes.len(), "wrote file");
            format!("Wrote {name}")
        }
        Err(e) => format!("Could not write {name}: {e}"),
    }
}
