use eframe::egui;
use egui::{Color32, Sense, Vec2};

use wplacehelper::grid::{CellInfo, GridObserver};
use wplacehelper::palette::Rgb8;
use wplacehelper::t;

/// Bottom bar: selected / hovered cell, mark count, zoom.
///
/// Fed through [`GridObserver`] so it only changes when the model says so.
#[derive(Default)]
pub struct StatusBar {
    selected: Option<CellInfo>,
    hovered: Option<CellInfo>,
    /// Transient message ("Saved …", "Copied …").
    notice: Option<(String, f64)>,
}

impl GridObserver for StatusBar {
    fn on_selection_changed(&mut self, info: Option<&CellInfo>) {
        self.selected = info.cloned();
    }

    fn on_hover_changed(&mut self, info: Option<&CellInfo>) {
        self.hovered = info.cloned();
    }

    // The mark count is read from the model every frame.
    fn on_marks_changed(&mut self) {}
}

/// Everything the bar shows besides the observed cells.
pub struct StatusInfo {
    pub grid_size: Option<(u32, u32)>,
    pub mark_count: usize,
    pub zoom: f32,
    pub palette_label: String,
}

const NOTICE_SECONDS: f64 = 3.0;

impl StatusBar {
    pub fn selected(&self) -> Option<&CellInfo> {
        self.selected.as_ref()
    }

    pub fn notify(&mut self, text: String, now: f64) {
        self.notice = Some((text, now + NOTICE_SECONDS));
    }

    /// Returns true when the "copy hex" button was clicked.
    pub fn show(&mut self, ui: &mut egui::Ui, info: &StatusInfo) -> bool {
        let mut copy_clicked = false;
        let now = ui.input(|i| i.time);
        if let Some((_, until)) = &self.notice
            && now > *until
        {
            self.notice = None;
        }

        ui.horizontal(|ui| {
            match &self.selected {
                Some(sel) => {
                    swatch(ui, &sel.hex);
                    ui.label(t!(
                        "status.selected",
                        x = sel.cell.x,
                        y = sel.cell.y,
                        hex = sel.hex
                    ));
                    if ui
                        .small_button("\u{1F4CB}")
                        .on_hover_text(t!("status.copy_hex"))
                        .clicked()
                    {
                        copy_clicked = true;
                    }
                }
                None => {
                    ui.label(t!("status.no_selection"));
                }
            }

            if let Some(hover) = &self.hovered {
                ui.separator();
                swatch(ui, &hover.hex);
                ui.label(t!(
                    "status.hover",
                    x = hover.cell.x,
                    y = hover.cell.y,
                    hex = hover.hex
                ));
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if let Some((w, h)) = info.grid_size {
                    ui.label(format!("{:.0}%", info.zoom * 100.0));
                    ui.separator();
                    ui.label(t!("status.marks", n = info.mark_count));
                    ui.separator();
                    ui.label(format!("{w}×{h}"));
                    ui.separator();
                }
                ui.label(&info.palette_label);
                if let Some((text, _)) = &self.notice {
                    ui.separator();
                    ui.label(egui::RichText::new(text).weak());
                }
            });
        });

        if self.notice.is_some() {
            ui.ctx().request_repaint_after(std::time::Duration::from_millis(500));
        }
        copy_clicked
    }
}

fn swatch(ui: &mut egui::Ui, hex: &str) {
    let (rect, _) = ui.allocate_exact_size(Vec2::splat(12.0), Sense::hover());
    let color = parse_hex(hex).map_or(Color32::TRANSPARENT, |c| Color32::from_rgb(c[0], c[1], c[2]));
    ui.painter().rect_filled(rect, 2.0, color);
    ui.painter()
        .rect_stroke(rect, 2.0, ui.visuals().widgets.noninteractive.bg_stroke);
}

fn parse_hex(hex: &str) -> Option<Rgb8> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use wplacehelper::grid::Cell;

    #[test]
    fn observer_tracks_latest_cells() {
        let mut bar = StatusBar::default();
        let info = CellInfo {
            cell: Cell::new(2, 5),
            hex: "#0A0B0C".to_string(),
        };
        bar.on_selection_changed(Some(&info));
        bar.on_marks_changed();
        assert_eq!(bar.selected(), Some(&info));

        bar.on_selection_changed(None);
        assert!(bar.selected().is_none());
    }

    #[test]
    fn swatch_hex_parsing() {
        assert_eq!(parse_hex("#0A0B0C"), Some([10, 11, 12]));
        assert_eq!(parse_hex("0A0B0C"), None);
        assert_eq!(parse_hex("#12345"), None);
    }
}
