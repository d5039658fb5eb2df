use std::time::Duration;

use eframe::egui;
use egui::{Color32, CursorIcon, PointerButton, Pos2, Rect, Sense, Stroke, TextureHandle, TextureOptions, pos2};

use wplacehelper::grid::PixelGridModel;
use wplacehelper::io::MARK_COLOR;
use wplacehelper::view::{GestureOutcome, PointerGesture, ViewTransform};

const GRID_LINE_COLOR: Color32 = Color32::from_rgba_premultiplied(0, 0, 0, 40);
const HOVER_COLOR: Color32 = Color32::from_rgba_premultiplied(180, 0, 0, 180);
const SELECTION_COLOR: Color32 = Color32::from_rgb(255, 215, 0);

/// Interactive view of the pixel grid: pan, zoom, hover, select, mark.
pub struct PixelCanvas {
    transform: ViewTransform,
    gesture: PointerGesture,
    texture: Option<TextureHandle>,
    /// Model generation the texture was uploaded from.
    texture_generation: u64,
    needs_fit: bool,
    pub last_canvas_rect: Option<Rect>,
}

impl Default for PixelCanvas {
    fn default() -> Self {
        Self {
            transform: ViewTransform::default(),
            gesture: PointerGesture::default(),
            texture: None,
            texture_generation: 0,
            needs_fit: true,
            last_canvas_rect: None,
        }
    }
}

impl PixelCanvas {
    pub fn fit_to_view(&mut self) {
        self.needs_fit = true;
    }

    /// Zoom around the centre of the canvas (toolbar / keyboard).
    pub fn zoom_step(&mut self, zoom_in: bool) {
        if let Some(rect) = self.last_canvas_rect {
            self.transform
                .zoom_wheel(rect.center(), if zoom_in { 1.0 } else { -1.0 });
        }
    }

    pub fn scale(&self) -> f32 {
        self.transform.scale()
    }

    /// Draw the grid and handle input. `placeholder` is shown when there is no grid.
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        model: &mut PixelGridModel,
        show_grid: bool,
        placeholder: &str,
    ) {
        let sense = Sense::click_and_drag().union(Sense::hover());
        let (response, painter) = ui.allocate_painter(ui.available_size(), sense);
        let canvas_rect = response.rect;
        let painter = painter.with_clip_rect(canvas_rect);
        self.last_canvas_rect = Some(canvas_rect);
        painter.rect_filled(canvas_rect, 0.0, ui.visuals().extreme_bg_color);

        let Some(grid) = model.grid() else {
            self.texture = None;
            self.gesture.cancel();
            painter.text(
                canvas_rect.center(),
                egui::Align2::CENTER_CENTER,
                placeholder,
                egui::FontId::proportional(16.0),
                ui.visuals().weak_text_color(),
            );
            return;
        };
        let dims = grid.dimensions();

        // ---- Texture upload (once per grid) ----
        if self.texture.is_none() || self.texture_generation != model.generation() {
            let image = egui::ColorImage::from_rgba_unmultiplied(
                [dims.0 as usize, dims.1 as usize],
                grid.as_raw(),
            );
            // NEAREST keeps cells crisp at any zoom
            match &mut self.texture {
                Some(tex) => tex.set(image, TextureOptions::NEAREST),
                None => {
                    self.texture = Some(ui.ctx().load_texture("pixel_grid", image, TextureOptions::NEAREST));
                }
            }
            self.texture_generation = model.generation();
            self.needs_fit = true;
        }
        if self.needs_fit && canvas_rect.width() > 0.0 && canvas_rect.height() > 0.0 {
            self.transform.fit_to_view(canvas_rect, dims);
            self.needs_fit = false;
        }

        if ui.is_enabled() {
            self.handle_input(ui, &response, model, dims);
        } else {
            self.gesture.cancel();
        }
        self.paint(&painter, canvas_rect, model, show_grid, dims);
    }

    fn handle_input(
        &mut self,
        ui: &egui::Ui,
        response: &egui::Response,
        model: &mut PixelGridModel,
        dims: (u32, u32),
    ) {
        let (now, pos, scroll_y, primary_down, primary_up, middle_down, middle_up, secondary_down) =
            ui.input(|i| {
                (
                    i.time,
                    i.pointer.latest_pos(),
                    i.scroll_delta.y,
                    i.pointer.button_pressed(PointerButton::Primary),
                    i.pointer.button_released(PointerButton::Primary),
                    i.pointer.button_pressed(PointerButton::Middle),
                    i.pointer.button_released(PointerButton::Middle),
                    i.pointer.button_pressed(PointerButton::Secondary),
                )
            });
        let hovered = response.hovered();

        if let Some(pos) = pos {
            if hovered && scroll_y != 0.0 {
                self.transform.zoom_wheel(pos, scroll_y);
            }

            if hovered && middle_down {
                self.gesture.press_pan(pos);
            } else if hovered && primary_down {
                self.gesture.press_primary(pos, now);
            }
        }

        self.gesture.poll(now);

        if let Some(pos) = pos {
            if let Some(delta) = self.gesture.pointer_moved(pos) {
                self.transform.pan_by(delta);
            }

            if !self.gesture.is_panning() {
                let cell = if hovered {
                    self.transform.screen_to_grid(pos, dims)
                } else {
                    None
                };
                model.set_hover(cell);
            }

            if hovered
                && secondary_down
                && let Some(cell) = self.transform.screen_to_grid(pos, dims)
            {
                model.toggle_mark(cell);
            }

            if primary_up || middle_up {
                if let GestureOutcome::Select(at) = self.gesture.release(pos)
                    && let Some(cell) = self.transform.screen_to_grid(at, dims)
                {
                    model.set_selection(Some(cell));
                }
            }
        } else if primary_up || middle_up {
            self.gesture.cancel();
        }

        if self.gesture.is_panning() {
            ui.ctx().output_mut(|o| o.cursor_icon = CursorIcon::Grabbing);
        } else if hovered {
            ui.ctx().output_mut(|o| o.cursor_icon = CursorIcon::Crosshair);
        }

        // wake up when the pan timer is due even if the pointer holds still
        if let Some(deadline) = self.gesture.deadline() {
            let wait = (deadline - now).max(0.0);
            ui.ctx().request_repaint_after(Duration::from_secs_f64(wait));
        }
    }

    fn paint(
        &self,
        painter: &egui::Painter,
        canvas_rect: Rect,
        model: &PixelGridModel,
        show_grid: bool,
        dims: (u32, u32),
    ) {
        let t = &self.transform;

        // 1. grid bitmap
        if let Some(tex) = &self.texture {
            painter.image(
                tex.id(),
                t.grid_rect(dims),
                Rect::from_min_max(Pos2::ZERO, pos2(1.0, 1.0)),
                Color32::WHITE,
            );
        }

        let (x0, y0, x1, y1) = t.visible_cells(canvas_rect, dims);

        // 2. grid lines, only once cells are big enough to tell apart
        if show_grid && t.shows_grid_lines() {
            let stroke = Stroke::new(1.0, GRID_LINE_COLOR);
            let top = t.grid_to_screen(pos2(x0 as f32, y0 as f32));
            let bottom = t.grid_to_screen(pos2(x1 as f32, y1 as f32));
            for x in x0..=x1 {
                let sx = t.grid_to_screen(pos2(x as f32, 0.0)).x;
                painter.line_segment([pos2(sx, top.y), pos2(sx, bottom.y)], stroke);
            }
            for y in y0..=y1 {
                let sy = t.grid_to_screen(pos2(0.0, y as f32)).y;
                painter.line_segment([pos2(top.x, sy), pos2(bottom.x, sy)], stroke);
            }
        }

        // 3. marks
        let mark_color = Color32::from_rgba_unmultiplied(MARK_COLOR[0], MARK_COLOR[1], MARK_COLOR[2], MARK_COLOR[3]);
        let mark_stroke = Stroke::new((t.scale() * 0.15).clamp(1.0, 3.0), mark_color);
        for cell in model.marks() {
            if cell.x < x0 || cell.x >= x1 || cell.y < y0 || cell.y >= y1 {
                continue;
            }
            for segment in t.mark_segments(*cell) {
                painter.line_segment(segment, mark_stroke);
            }
        }

        // 4. hover, unless it is the selected cell
        if let Some(hover) = model.hover()
            && model.selection() != Some(hover)
        {
            painter.rect_stroke(t.cell_rect(hover), 0.0, Stroke::new(1.5, HOVER_COLOR));
        }

        // 5. selection on top of everything
        if let Some(sel) = model.selection() {
            painter.rect_stroke(t.cell_rect(sel), 0.0, Stroke::new(2.0, SELECTION_COLOR));
        }
    }
}
