//! The pixelized grid plus the user's marks, selection and hover cell.

use std::collections::HashSet;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::palette::{Rgb8, hex_string};

/// Largest accepted grid dimension, per axis.
pub const MAX_GRID_DIM: u32 = 4096;

/// Integer cell coordinate. Serialized as `[x, y]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct Cell {
    pub x: u32,
    pub y: u32,
}

impl Cell {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl From<[u32; 2]> for Cell {
    fn from([x, y]: [u32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Cell> for [u32; 2] {
    fn from(c: Cell) -> Self {
        [c.x, c.y]
    }
}

/// A cell together with its resolved colour, as delivered to observers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellInfo {
    pub cell: Cell,
    pub hex: String,
}

/// Queued notification. `None` payloads mean "cleared".
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GridEvent {
    SelectionChanged(Option<CellInfo>),
    HoverChanged(Option<CellInfo>),
    MarksChanged,
}

/// Receives model notifications, see [`PixelGridModel::dispatch_events`].
pub trait GridObserver {
    fn on_selection_changed(&mut self, info: Option<&CellInfo>);
    fn on_hover_changed(&mut self, info: Option<&CellInfo>);
    fn on_marks_changed(&mut self);
}

#[derive(Default)]
pub struct PixelGridModel {
    grid: Option<RgbaImage>,
    marks: HashSet<Cell>,
    selection: Option<Cell>,
    hover: Option<Cell>,
    events: Vec<GridEvent>,
    /// Set by user toggles only; grid replacement and restores clear it.
    marks_edited: bool,
    /// Bumped whenever the grid bitmap is replaced so renderers know to
    /// re-upload their texture.
    generation: u64,
}

impl PixelGridModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grid(&self) -> Option<&RgbaImage> {
        self.grid.as_ref()
    }

    pub fn has_grid(&self) -> bool {
        self.grid.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// `(width, height)`, or `(0, 0)` without a grid.
    pub fn dimensions(&self) -> (u32, u32) {
        self.grid.as_ref().map_or((0, 0), |g| g.dimensions())
    }

    pub fn contains(&self, cell: Cell) -> bool {
        let (w, h) = self.dimensions();
        cell.x < w && cell.y < h
    }

    pub fn marks(&self) -> &HashSet<Cell> {
        &self.marks
    }

    pub fn is_marked(&self, cell: Cell) -> bool {
        self.marks.contains(&cell)
    }

    pub fn selection(&self) -> Option<Cell> {
        self.selection
    }

    pub fn hover(&self) -> Option<Cell> {
        self.hover
    }

    /// Replace the grid. Marks, selection and hover are always cleared since
    /// old coordinates may no longer mean anything.
    pub fn set_grid(&mut self, grid: RgbaImage) {
        self.grid = Some(grid);
        self.generation += 1;
        self.reset_overlays();
    }

    /// Drop the grid entirely (a new source image was opened).
    pub fn clear_grid(&mut self) {
        if self.grid.take().is_some() {
            self.generation += 1;
        }
        self.reset_overlays();
    }

    fn reset_overlays(&mut self) {
        self.marks.clear();
        self.marks_edited = false;
        self.events.push(GridEvent::MarksChanged);
        if self.selection.take().is_some() {
            self.events.push(GridEvent::SelectionChanged(None));
        }
        if self.hover.take().is_some() {
            self.events.push(GridEvent::HoverChanged(None));
        }
    }

    /// Toggle the mark on `cell`. Out-of-bounds cells and a missing grid are
    /// silently ignored. Returns whether the marked set changed.
    pub fn toggle_mark(&mut self, cell: Cell) -> bool {
        if !self.contains(cell) {
            return false;
        }
        if !self.marks.remove(&cell) {
            self.marks.insert(cell);
        }
        self.marks_edited = true;
        self.events.push(GridEvent::MarksChanged);
        true
    }

    /// True once after each user toggle since the last call.
    pub fn take_marks_edited(&mut self) -> bool {
        std::mem::take(&mut self.marks_edited)
    }

    /// Restore a previously saved marked set. Cells outside the current grid
    /// are discarded; the number discarded is returned.
    pub fn restore_marks(&mut self, cells: impl IntoIterator<Item = Cell>) -> usize {
        self.marks.clear();
        let mut discarded = 0;
        for cell in cells {
            if self.contains(cell) {
                self.marks.insert(cell);
            } else {
                discarded += 1;
            }
        }
        self.marks_edited = false;
        self.events.push(GridEvent::MarksChanged);
        discarded
    }

    /// Set or clear the selection. A cell outside the grid clears it.
    pub fn set_selection(&mut self, cell: Option<Cell>) {
        let cell = cell.filter(|c| self.contains(*c));
        self.selection = cell;
        let info = cell.and_then(|c| self.cell_info(c));
        self.events.push(GridEvent::SelectionChanged(info));
    }

    /// Update the hover cell. Notifies only on change; returns whether it
    /// changed.
    pub fn set_hover(&mut self, cell: Option<Cell>) -> bool {
        let cell = cell.filter(|c| self.contains(*c));
        if cell == self.hover {
            return false;
        }
        self.hover = cell;
        let info = cell.and_then(|c| self.cell_info(c));
        self.events.push(GridEvent::HoverChanged(info));
        true
    }

    pub fn color_at(&self, cell: Cell) -> Result<Rgb8> {
        match &self.grid {
            Some(grid) if cell.x < grid.width() && cell.y < grid.height() => {
                let p = grid.get_pixel(cell.x, cell.y);
                Ok([p[0], p[1], p[2]])
            }
            _ => Err(Error::OutOfBounds {
                x: cell.x,
                y: cell.y,
            }),
        }
    }

    pub fn hex_at(&self, cell: Cell) -> Result<String> {
        self.color_at(cell).map(hex_string)
    }

    fn cell_info(&self, cell: Cell) -> Option<CellInfo> {
        self.hex_at(cell).ok().map(|hex| CellInfo { cell, hex })
    }

    /// Marks in row-major order.
    pub fn sorted_marks(&self) -> Vec<Cell> {
        let mut marks: Vec<Cell> = self.marks.iter().copied().collect();
        marks.sort_by_key(|c| (c.y, c.x));
        marks
    }

    /// Drain queued notifications into `observer`, oldest first.
    pub fn dispatch_events(&mut self, observer: &mut dyn GridObserver) {
        for event in self.events.drain(..) {
            match &event {
                GridEvent::SelectionChanged(info) => observer.on_selection_changed(info.as_ref()),
                GridEvent::HoverChanged(info) => observer.on_hover_changed(info.as_ref()),
                GridEvent::MarksChanged => observer.on_marks_changed(),
            }
        }
    }

    /// Take queued notifications without an observer.
    pub fn take_events(&mut self) -> Vec<GridEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn checker(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        })
    }

    #[derive(Default)]
    struct Recorder {
        selection: Vec<Option<CellInfo>>,
        hover: Vec<Option<CellInfo>>,
        marks: usize,
    }

    impl GridObserver for Recorder {
        fn on_selection_changed(&mut self, info: Option<&CellInfo>) {
            self.selection.push(info.cloned());
        }
        fn on_hover_changed(&mut self, info: Option<&CellInfo>) {
            self.hover.push(info.cloned());
        }
        fn on_marks_changed(&mut self) {
            self.marks += 1;
        }
    }

    #[test]
    fn toggle_twice_restores_state() {
        let mut m = PixelGridModel::new();
        m.set_grid(checker(4, 4));
        m.toggle_mark(Cell::new(1, 1));
        let before = m.marks().clone();

        assert!(m.toggle_mark(Cell::new(2, 3)));
        assert!(m.is_marked(Cell::new(2, 3)));
        assert!(m.toggle_mark(Cell::new(2, 3)));
        assert_eq!(m.marks(), &before);
    }

    #[test]
    fn toggle_out_of_bounds_or_without_grid_is_noop() {
        let mut m = PixelGridModel::new();
        assert!(!m.toggle_mark(Cell::new(0, 0)));
        m.set_grid(checker(2, 2));
        m.take_events();
        assert!(!m.toggle_mark(Cell::new(2, 0)));
        assert!(!m.toggle_mark(Cell::new(0, 5)));
        assert!(m.marks().is_empty());
        assert!(m.take_events().is_empty());
    }

    #[test]
    fn set_grid_clears_everything() {
        let mut m = PixelGridModel::new();
        m.set_grid(checker(4, 4));
        m.toggle_mark(Cell::new(0, 0));
        m.set_selection(Some(Cell::new(1, 1)));
        m.set_hover(Some(Cell::new(2, 2)));

        m.set_grid(checker(4, 4));
        assert!(m.marks().is_empty());
        assert_eq!(m.selection(), None);
        assert_eq!(m.hover(), None);
    }

    #[test]
    fn selection_reports_colour_and_clear() {
        let mut m = PixelGridModel::new();
        m.set_grid(checker(2, 2));
        m.take_events();

        let mut rec = Recorder::default();
        m.set_selection(Some(Cell::new(1, 0)));
        m.set_selection(None);
        m.dispatch_events(&mut rec);

        assert_eq!(
            rec.selection,
            vec![
                Some(CellInfo {
                    cell: Cell::new(1, 0),
                    hex: "#0000FF".to_string()
                }),
                None
            ]
        );
    }

    #[test]
    fn hover_only_notifies_on_change() {
        let mut m = PixelGridModel::new();
        m.set_grid(checker(3, 3));
        m.take_events();

        assert!(m.set_hover(Some(Cell::new(0, 0))));
        assert!(!m.set_hover(Some(Cell::new(0, 0))));
        assert!(m.set_hover(Some(Cell::new(9, 9))));
        assert_eq!(m.hover(), None);

        let mut rec = Recorder::default();
        m.dispatch_events(&mut rec);
        assert_eq!(rec.hover.len(), 2);
        assert_eq!(rec.hover[0].as_ref().map(|i| i.hex.as_str()), Some("#FF0000"));
        assert_eq!(rec.hover[1], None);
    }

    #[test]
    fn color_at_bounds() {
        let mut m = PixelGridModel::new();
        assert!(matches!(
            m.color_at(Cell::new(0, 0)),
            Err(Error::OutOfBounds { x: 0, y: 0 })
        ));
        m.set_grid(checker(2, 2));
        assert_eq!(m.color_at(Cell::new(0, 0)).unwrap(), [255, 0, 0]);
        assert!(m.color_at(Cell::new(2, 1)).is_err());
    }

    #[test]
    fn restore_marks_discards_out_of_range() {
        let mut m = PixelGridModel::new();
        m.set_grid(checker(4, 4));
        let discarded = m.restore_marks([Cell::new(0, 0), Cell::new(3, 3), Cell::new(4, 0)]);
        assert_eq!(discarded, 1);
        assert_eq!(m.sorted_marks(), vec![Cell::new(0, 0), Cell::new(3, 3)]);
    }

    #[test]
    fn cell_serializes_as_pair() {
        let json = serde_json::to_string(&Cell::new(3, 7)).unwrap();
        assert_eq!(json, "[3,7]");
        let back: Cell = serde_json::from_str("[5,6]").unwrap();
        assert_eq!(back, Cell::new(5, 6));
    }
}
