/// Pointer-driven polygon capture
///
/// Front ends translate their mouse/pointer callbacks into `PointerEvent`s
/// and feed them to `SketchCapture::handle`. Drawing the grid, the polyline
/// and the dashed previews is left to the front end; this module only keeps
/// the data and reports what should be previewed.

use tracing::{debug, warn};

use crate::config::{DEFAULT_SNAP, MIN_SNAP};
use crate::error::{Error, Result};
use crate::normalize::{normalize, Profile};
use crate::polygon::{Point2D, Polygon};

/// Drawing tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Each click adds one vertex
    #[default]
    Line,
    /// Drag out an axis-aligned rectangle, added as four vertices
    Rect,
}

/// Raw pointer input, in the sketch's pixel space
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Point2D),
    Move(Point2D),
    Up(Point2D),
}

/// Transient geometry the front end should draw dashed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Preview {
    /// From the last committed vertex to the cursor
    Segment { from: Point2D, to: Point2D },
    /// The rectangle being dragged
    Rect { start: Point2D, end: Point2D },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct RectDraft {
    start: Point2D,
    end: Point2D,
}

/// Working state of the sketcher
#[derive(Debug, Clone)]
pub struct SketchCapture {
    tool: Tool,
    snap: f64,
    polygon: Polygon,
    draft: Option<RectDraft>,
    pointer_down: bool,
}

impl SketchCapture {
    pub fn new() -> Self {
        Self {
            tool: Tool::Line,
            snap: DEFAULT_SNAP,
            polygon: Polygon::new(),
            draft: None,
            pointer_down: false,
        }
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Switch tools. Any rectangle being dragged is dropped.
    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
        self.draft = None;
    }

    pub fn snap(&self) -> f64 {
        self.snap
    }

    /// Set the grid unit; values below 1 (or not finite) clamp to 1.
    pub fn set_snap(&mut self, snap: f64) {
        self.snap = if snap.is_finite() { snap.max(MIN_SNAP) } else { MIN_SNAP };
    }

    /// Round a raw position to the nearest multiple of the snap unit.
    pub fn snap_point(&self, raw: Point2D) -> Point2D {
        Point2D::new(
            (raw.x / self.snap).round() * self.snap,
            (raw.y / self.snap).round() * self.snap,
        )
    }

    pub fn polygon(&self) -> &Polygon {
        &self.polygon
    }

    pub fn is_closed(&self) -> bool {
        self.polygon.is_closed()
    }

    /// Rectangle being dragged, if any.
    pub fn draft(&self) -> Option<Preview> {
        self.draft.map(|d| Preview::Rect {
            start: d.start,
            end: d.end,
        })
    }

    /// Dispatch one pointer event. Returns what to draw as a preview.
    pub fn handle(&mut self, event: PointerEvent) -> Option<Preview> {
        match event {
            PointerEvent::Down(raw) => {
                self.pointer_down(raw);
                self.draft()
            }
            PointerEvent::Move(raw) => self.pointer_move(raw),
            PointerEvent::Up(raw) => {
                self.pointer_up(raw);
                None
            }
        }
    }

    pub fn pointer_down(&mut self, raw: Point2D) {
        self.pointer_down = true;
        let p = self.snap_point(raw);
        match self.tool {
            Tool::Line => self.polygon.push(p),
            Tool::Rect => self.draft = Some(RectDraft { start: p, end: p }),
        }
    }

    /// Moves only matter while the button is held. The line tool never
    /// mutates state here; it just reports the preview segment.
    pub fn pointer_move(&mut self, raw: Point2D) -> Option<Preview> {
        if !self.pointer_down {
            return None;
        }
        let p = self.snap_point(raw);
        match self.tool {
            Tool::Line => self.polygon.last().map(|&from| Preview::Segment { from, to: p }),
            Tool::Rect => {
                let draft = self.draft.as_mut()?;
                draft.end = p;
                self.draft()
            }
        }
    }

    pub fn pointer_up(&mut self, raw: Point2D) {
        self.pointer_down = false;
        if self.tool != Tool::Rect {
            return;
        }
        let Some(mut draft) = self.draft.take() else {
            return;
        };
        draft.end = self.snap_point(raw);

        let (start, end) = (draft.start, draft.end);
        if start.x == end.x || start.y == end.y {
            debug!(?start, ?end, "discarding zero-area rectangle");
            return;
        }
        for p in [
            Point2D::new(start.x, start.y),
            Point2D::new(end.x, start.y),
            Point2D::new(end.x, end.y),
            Point2D::new(start.x, end.y),
        ] {
            self.polygon.push(p);
        }
    }

    /// Close the loop by repeating the first vertex. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        let result = self.polygon.close();
        if let Err(e) = &result {
            warn!("cannot close sketch: {e}");
        }
        result
    }

    /// Drop the working polygon and any rectangle draft.
    pub fn clear(&mut self) {
        self.polygon = Polygon::new();
        self.draft = None;
        self.pointer_down = false;
    }

    /// Validate and center the closed sketch.
    ///
    /// Fails with [`Error::NotClosed`] until [`close`](Self::close) has run.
    pub fn export(&self) -> Result<Profile> {
        let found = self.polygon.vertex_count();
        if found < 3 {
            return Err(Error::InsufficientVertices { found });
        }
        if !self.polygon.is_closed() {
            return Err(Error::NotClosed);
        }
        normalize(&self.polygon)
    }

    /// The downloadable sketch artifact: pretty-printed `[{x, y}, ...]`.
    pub fn export_json(&self) -> Result<String> {
        self.export()?.to_json()
    }
}

impl Default for SketchCapture {
    fn default() -> Self {
        Self::new()
    }
}
