//! View geometry for the pixel grid: the grid↔screen transform, zoom/pan,
//! the tap-vs-drag pointer gesture, and overlay shapes for the renderer.
//!
//! Nothing here touches an egui `Painter`; the binary's canvas feeds pointer
//! input in and draws what comes out.

use egui::{Pos2, Rect, Vec2, pos2, vec2};

use crate::grid::Cell;

/// Wheel zoom factors.
pub const ZOOM_IN_FACTOR: f32 = 1.25;
pub const ZOOM_OUT_FACTOR: f32 = 0.8;

/// Usability clamp only.
pub const MIN_SCALE: f32 = 1.0 / 64.0;
pub const MAX_SCALE: f32 = 512.0;

/// Grid lines are drawn only when a cell is larger than this many screen px.
pub const GRID_LINE_MIN_SCALE: f32 = 4.0;

/// Inset of the mark "X" as a fraction of a cell.
pub const MARK_MARGIN: f32 = 0.2;

/// Seconds a primary press must be held still before it turns into a pan.
pub const PAN_ARM_DELAY: f64 = 0.22;

/// Screen px the pointer may wander during a tap.
pub const TAP_SLOP: f32 = 2.0;

/// `screen = (grid + translation) * scale`
///
/// Translation is kept in grid units, so a pan of `d` screen px adds
/// `d / scale` to it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    scale: f32,
    translation: Vec2,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translation: Vec2::ZERO,
        }
    }
}

impl ViewTransform {
    pub fn new(scale: f32, translation: Vec2) -> Self {
        Self {
            scale: scale.clamp(MIN_SCALE, MAX_SCALE),
            translation,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn translation(&self) -> Vec2 {
        self.translation
    }

    pub fn grid_to_screen(&self, p: Pos2) -> Pos2 {
        ((p.to_vec2() + self.translation) * self.scale).to_pos2()
    }

    pub fn screen_to_grid_f(&self, p: Pos2) -> Pos2 {
        (p.to_vec2() / self.scale - self.translation).to_pos2()
    }

    /// The cell under screen point `p`, or `None` outside `[0,w) × [0,h)`.
    pub fn screen_to_grid(&self, p: Pos2, grid_size: (u32, u32)) -> Option<Cell> {
        let g = self.screen_to_grid_f(p);
        let (x, y) = (g.x.floor(), g.y.floor());
        if x < 0.0 || y < 0.0 || x >= grid_size.0 as f32 || y >= grid_size.1 as f32 {
            return None;
        }
        Some(Cell::new(x as u32, y as u32))
    }

    /// Screen rectangle covered by `cell`.
    pub fn cell_rect(&self, cell: Cell) -> Rect {
        let min = pos2(cell.x as f32, cell.y as f32);
        Rect::from_min_max(
            self.grid_to_screen(min),
            self.grid_to_screen(min + vec2(1.0, 1.0)),
        )
    }

    pub fn cell_center(&self, cell: Cell) -> Pos2 {
        self.grid_to_screen(pos2(cell.x as f32 + 0.5, cell.y as f32 + 0.5))
    }

    /// Screen rectangle covered by a `w × h` grid.
    pub fn grid_rect(&self, grid_size: (u32, u32)) -> Rect {
        Rect::from_min_max(
            self.grid_to_screen(Pos2::ZERO),
            self.grid_to_screen(pos2(grid_size.0 as f32, grid_size.1 as f32)),
        )
    }

    /// Scale by `factor` keeping the grid point under `anchor` fixed.
    pub fn zoom_at(&mut self, anchor: Pos2, factor: f32) {
        let fixed = self.screen_to_grid_f(anchor);
        self.scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        // solve anchor / scale' - t' = fixed
        self.translation = anchor.to_vec2() / self.scale - fixed.to_vec2();
    }

    /// Zoom by one wheel notch; positive `wheel_y` zooms in.
    pub fn zoom_wheel(&mut self, anchor: Pos2, wheel_y: f32) {
        if wheel_y > 0.0 {
            self.zoom_at(anchor, ZOOM_IN_FACTOR);
        } else if wheel_y < 0.0 {
            self.zoom_at(anchor, ZOOM_OUT_FACTOR);
        }
    }

    pub fn pan_by(&mut self, screen_delta: Vec2) {
        self.translation += screen_delta / self.scale;
    }

    /// Show the whole grid centred in `viewport`, preserving aspect ratio.
    pub fn fit_to_view(&mut self, viewport: Rect, grid_size: (u32, u32)) {
        let (w, h) = (grid_size.0.max(1) as f32, grid_size.1.max(1) as f32);
        if viewport.width() <= 0.0 || viewport.height() <= 0.0 {
            return;
        }
        let scale = (viewport.width() / w).min(viewport.height() / h);
        self.scale = scale.clamp(MIN_SCALE, MAX_SCALE);
        self.translation = viewport.center().to_vec2() / self.scale - vec2(w / 2.0, h / 2.0);
    }

    /// Whether grid lines should be drawn at the current zoom.
    pub fn shows_grid_lines(&self) -> bool {
        self.scale > GRID_LINE_MIN_SCALE
    }

    /// Cell index range `[x0, x1) × [y0, y1)` visible in `viewport`.
    pub fn visible_cells(&self, viewport: Rect, grid_size: (u32, u32)) -> (u32, u32, u32, u32) {
        let a = self.screen_to_grid_f(viewport.min);
        let b = self.screen_to_grid_f(viewport.max);
        let clamp = |v: f32, max: u32| v.clamp(0.0, max as f32) as u32;
        (
            clamp(a.x.floor(), grid_size.0),
            clamp(a.y.floor(), grid_size.1),
            clamp(b.x.ceil(), grid_size.0),
            clamp(b.y.ceil(), grid_size.1),
        )
    }

    /// The two strokes of the mark glyph for `cell`, in screen space.
    pub fn mark_segments(&self, cell: Cell) -> [[Pos2; 2]; 2] {
        let (x, y) = (cell.x as f32, cell.y as f32);
        let lo = MARK_MARGIN;
        let hi = 1.0 - MARK_MARGIN;
        let s = |dx: f32, dy: f32| self.grid_to_screen(pos2(x + dx, y + dy));
        [[s(lo, lo), s(hi, hi)], [s(hi, lo), s(lo, hi)]]
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum GestureState {
    Idle,
    /// Primary held, timer running.
    Armed { press_pos: Pos2, deadline: f64 },
    Panning { last_pos: Pos2 },
}

/// What a button release resolved to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GestureOutcome {
    /// A quick, still press: select whatever is under this point.
    Select(Pos2),
    PanEnded,
    /// Release without a matching press.
    None,
}

/// Distinguishes "tap to select" from "hold/drag to pan".
///
/// The caller supplies timestamps (seconds) and polls the timer every
/// frame; the timer is cancelled by release or by the gesture turning into
/// a pan first.
#[derive(Clone, Copy, Debug)]
pub struct PointerGesture {
    state: GestureState,
}

impl Default for PointerGesture {
    fn default() -> Self {
        Self {
            state: GestureState::Idle,
        }
    }
}

impl PointerGesture {
    pub fn is_panning(&self) -> bool {
        matches!(self.state, GestureState::Panning { .. })
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, GestureState::Armed { .. })
    }

    /// When the pending pan timer fires, if one is running.
    pub fn deadline(&self) -> Option<f64> {
        match self.state {
            GestureState::Armed { deadline, .. } => Some(deadline),
            _ => None,
        }
    }

    pub fn press_primary(&mut self, pos: Pos2, now: f64) {
        self.state = GestureState::Armed {
            press_pos: pos,
            deadline: now + PAN_ARM_DELAY,
        };
    }

    /// Dedicated pan button: pan starts immediately.
    pub fn press_pan(&mut self, pos: Pos2) {
        self.state = GestureState::Panning { last_pos: pos };
    }

    /// Fire the timer if its deadline has passed. Returns `true` when the
    /// gesture just became a pan.
    pub fn poll(&mut self, now: f64) -> bool {
        if let GestureState::Armed {
            press_pos,
            deadline,
        } = self.state
            && now >= deadline
        {
            self.state = GestureState::Panning {
                last_pos: press_pos,
            };
            return true;
        }
        false
    }

    /// Feed a pointer move. Returns the screen delta to pan by, if any.
    pub fn pointer_moved(&mut self, pos: Pos2) -> Option<Vec2> {
        match self.state {
            GestureState::Idle => None,
            GestureState::Armed { press_pos, .. } => {
                if press_pos.distance(pos) > TAP_SLOP {
                    self.state = GestureState::Panning { last_pos: pos };
                    Some(pos - press_pos)
                } else {
                    None
                }
            }
            GestureState::Panning { last_pos } => {
                self.state = GestureState::Panning { last_pos: pos };
                let delta = pos - last_pos;
                (delta != Vec2::ZERO).then_some(delta)
            }
        }
    }

    /// Resolve the gesture on release.
    pub fn release(&mut self, pos: Pos2) -> GestureOutcome {
        let outcome = match self.state {
            GestureState::Idle => GestureOutcome::None,
            GestureState::Armed { .. } => GestureOutcome::Select(pos),
            GestureState::Panning { .. } => GestureOutcome::PanEnded,
        };
        self.state = GestureState::Idle;
        outcome
    }

    pub fn cancel(&mut self) {
        self.state = GestureState::Idle;
    }
}
