use eframe::egui;
use egui::{Color32, Pos2, Rect, Rounding, Sense, Vec2};
use std::path::{Path, PathBuf};

use wplacehelper::palette::{Palette, PaletteSource};
use wplacehelper::project::ProjectFile;
use wplacehelper::t;

/// What a modal dialog reports back after a frame.
#[derive(Clone, Debug, PartialEq)]
pub enum DialogResult<T> {
    /// Still open (or closed without a decision this frame).
    None,
    Ok(T),
    Cancel,
}

// ============================================================================
// SHARED DIALOG STYLING
// ============================================================================

/// Colours pulled from the current egui visuals.
pub struct DialogColors {
    pub accent: Color32,
    pub accent_faint: Color32,
    pub text_muted: Color32,
    pub error: Color32,
}

impl DialogColors {
    pub fn from_ctx(ctx: &egui::Context) -> Self {
        let v = ctx.style().visuals.clone();
        let accent = v.selection.stroke.color;
        let alpha = if v.dark_mode { 35 } else { 25 };
        let text_muted = if v.dark_mode {
            Color32::from_gray(160)
        } else {
            v.weak_text_color()
        };
        Self {
            accent,
            accent_faint: Color32::from_rgba_unmultiplied(accent.r(), accent.g(), accent.b(), alpha),
            text_muted,
            error: v.error_fg_color,
        }
    }
}

/// Accent header bar with icon + title.
pub fn paint_dialog_header(ui: &mut egui::Ui, colors: &DialogColors, icon: &str, title: &str) {
    let header_height = 32.0;
    let (rect, _) = ui.allocate_exact_size(Vec2::new(ui.available_width(), header_height), Sense::hover());
    let painter = ui.painter();
    painter.rect_filled(rect, Rounding::ZERO, colors.accent_faint);
    painter.rect_filled(
        Rect::from_min_size(rect.min, Vec2::new(3.0, header_height)),
        Rounding::ZERO,
        colors.accent,
    );
    painter.text(
        Pos2::new(rect.min.x + 12.0, rect.center().y),
        egui::Align2::LEFT_CENTER,
        format!("{icon} {title}"),
        egui::FontId::proportional(14.0),
        colors.accent,
    );
}

fn accent_separator(ui: &mut egui::Ui, colors: &DialogColors) {
    let (rect, _) = ui.allocate_exact_size(Vec2::new(ui.available_width(), 1.0), Sense::hover());
    ui.painter().rect_filled(rect, 0.0, colors.accent_faint);
}

/// Right-aligned OK / Cancel row. Returns (ok, cancel).
fn dialog_footer(ui: &mut egui::Ui, colors: &DialogColors, ok_label: &str) -> (bool, bool) {
    let mut ok = false;
    let mut cancel = false;
    ui.add_space(4.0);
    accent_separator(ui, colors);
    ui.add_space(6.0);
    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
        if ui.button(t!("common.cancel")).clicked() {
            cancel = true;
        }
        let ok_btn = egui::Button::new(
            egui::RichText::new(format!("  {ok_label}  ")).color(Color32::WHITE).strong(),
        )
        .fill(colors.accent);
        if ui.add(ok_btn).clicked() {
            ok = true;
        }
    });
    (ok, cancel)
}

/// Enter / Escape for the topmost dialog. Returns (enter, escape).
fn consume_dialog_keys(ctx: &egui::Context) -> (bool, bool) {
    let enter = ctx.input_mut(|i| i.consume_key(egui::Modifiers::NONE, egui::Key::Enter));
    let esc = ctx.input_mut(|i| i.consume_key(egui::Modifiers::NONE, egui::Key::Escape));
    (enter, esc)
}

fn modal_window(id: &str) -> egui::Window<'static> {
    egui::Window::new(id.to_owned())
        .title_bar(false)
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
}

// ============================================================================
// CUSTOM PALETTE DIALOG
// ============================================================================

/// Free-text `#RRGGBB` entry for a custom palette.
#[derive(Default)]
pub struct CustomPaletteDialog {
    pub open: bool,
    text: String,
    error: Option<String>,
}

impl CustomPaletteDialog {
    /// Open, pre-filled with the current custom colours if there are any.
    pub fn open_with(&mut self, current: &PaletteSource) {
        if let PaletteSource::Custom(p) = current {
            self.text = p.to_hex_list();
        }
        self.error = None;
        self.open = true;
    }

    /// Re-open with an error after the entered text was rejected.
    pub fn reject(&mut self, message: String) {
        self.error = Some(message);
        self.open = true;
    }

    /// Returns the entered text on OK.
    pub fn show(&mut self, ctx: &egui::Context) -> DialogResult<String> {
        if !self.open {
            return DialogResult::None;
        }
        let mut result = DialogResult::None;
        // Enter inserts newlines in the text box, so only Escape is bound.
        let esc = ctx.input_mut(|i| i.consume_key(egui::Modifiers::NONE, egui::Key::Escape));
        if esc {
            result = DialogResult::Cancel;
        }

        modal_window("custom_palette_dialog").show(ctx, |ui| {
            ui.set_min_width(380.0);
            let colors = DialogColors::from_ctx(ctx);
            paint_dialog_header(ui, &colors, "\u{1F3A8}", &t!("dialog.custom_palette"));
            ui.add_space(6.0);
            ui.label(egui::RichText::new(t!("dialog.custom_palette.hint")).color(colors.text_muted));
            ui.add_space(4.0);
            ui.add(
                egui::TextEdit::multiline(&mut self.text)
                    .desired_rows(5)
                    .desired_width(f32::INFINITY)
                    .hint_text("#FF0000, #00FF00 #0000FF"),
            );

            // live preview of what will be accepted
            let preview = Palette::parse_custom(&self.text).ok();
            ui.add_space(4.0);
            match &preview {
                Some(p) => {
                    ui.horizontal_wrapped(|ui| {
                        ui.spacing_mut().item_spacing = Vec2::splat(2.0);
                        for c in p.usable() {
                            let (rect, _) = ui.allocate_exact_size(Vec2::splat(14.0), Sense::hover());
                            ui.painter().rect_filled(rect, 2.0, Color32::from_rgb(c[0], c[1], c[2]));
                        }
                    });
                    ui.label(
                        egui::RichText::new(t!("dialog.custom_palette.count", n = p.len()))
                            .size(11.0)
                            .color(colors.text_muted),
                    );
                }
                None => {
                    ui.label(
                        egui::RichText::new(t!("dialog.custom_palette.none"))
                            .size(11.0)
                            .color(colors.text_muted),
                    );
                }
            }
            if let Some(err) = &self.error {
                ui.colored_label(colors.error, err);
            }

            let (ok, cancel) = dialog_footer(ui, &colors, &t!("common.ok"));
            if ok {
                result = DialogResult::Ok(self.text.clone());
            } else if cancel {
                result = DialogResult::Cancel;
            }
        });

        if result != DialogResult::None {
            self.open = false;
            self.error = None;
        }
        result
    }
}

// ============================================================================
// EXPORT DIALOG
// ============================================================================

/// Export options shown before the native save picker.
pub struct ExportDialog {
    pub open: bool,
    pub with_marks: bool,
    grid_size: (u32, u32),
}

impl Default for ExportDialog {
    fn default() -> Self {
        Self {
            open: false,
            with_marks: true,
            grid_size: (0, 0),
        }
    }
}

impl ExportDialog {
    pub fn open_for(&mut self, grid_size: (u32, u32)) {
        self.grid_size = grid_size;
        self.open = true;
    }

    /// Returns `with_marks` on OK.
    pub fn show(&mut self, ctx: &egui::Context) -> DialogResult<bool> {
        if !self.open {
            return DialogResult::None;
        }
        let mut result = DialogResult::None;
        let (enter, esc) = consume_dialog_keys(ctx);
        if enter {
            result = DialogResult::Ok(self.with_marks);
        } else if esc {
            result = DialogResult::Cancel;
        }

        modal_window("export_dialog").show(ctx, |ui| {
            ui.set_min_width(320.0);
            let colors = DialogColors::from_ctx(ctx);
            paint_dialog_header(ui, &colors, "\u{1F4BE}", &t!("dialog.export"));
            ui.add_space(6.0);
            ui.label(
                egui::RichText::new(t!("dialog.export.size", w = self.grid_size.0, h = self.grid_size.1))
                    .color(colors.text_muted),
            );
            ui.add_space(4.0);
            ui.checkbox(&mut self.with_marks, t!("dialog.export.with_marks"));

            let (ok, cancel) = dialog_footer(ui, &colors, &t!("dialog.export.choose"));
            if ok {
                result = DialogResult::Ok(self.with_marks);
            } else if cancel {
                result = DialogResult::Cancel;
            }
        });

        if result != DialogResult::None {
            self.open = false;
        }
        result
    }
}

// ============================================================================
// MESSAGE DIALOG
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Error,
}

struct Message {
    kind: MessageKind,
    title: String,
    body: String,
}

/// Modal info / error box. Messages queue up and show one at a time.
#[derive(Default)]
pub struct MessageDialog {
    queue: Vec<Message>,
}

impl MessageDialog {
    pub fn error(&mut self, title: impl Into<String>, body: impl Into<String>) {
        self.push(MessageKind::Error, title.into(), body.into());
    }

    pub fn info(&mut self, title: impl Into<String>, body: impl Into<String>) {
        self.push(MessageKind::Info, title.into(), body.into());
    }

    fn push(&mut self, kind: MessageKind, title: String, body: String) {
        self.queue.push(Message { kind, title, body });
    }

    pub fn is_open(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn show(&mut self, ctx: &egui::Context) {
        let Some(msg) = self.queue.first() else { return };
        let (enter, esc) = consume_dialog_keys(ctx);
        let mut close = enter || esc;

        modal_window("message_dialog").show(ctx, |ui| {
            ui.set_min_width(320.0);
            ui.set_max_width(480.0);
            let colors = DialogColors::from_ctx(ctx);
            let icon = match msg.kind {
                MessageKind::Info => "\u{2139}",
                MessageKind::Error => "\u{26A0}",
            };
            paint_dialog_header(ui, &colors, icon, &msg.title);
            ui.add_space(8.0);
            ui.label(&msg.body);
            ui.add_space(8.0);
            accent_separator(ui, &colors);
            ui.add_space(6.0);
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button(format!("  {}  ", t!("common.ok"))).clicked() {
                    close = true;
                }
            });
        });

        if close {
            self.queue.remove(0);
        }
    }
}

// ============================================================================
// MISSING SOURCE IMAGE
// ============================================================================

/// A project whose source image could not be found, waiting for the user to
/// locate a replacement.
pub struct PendingProject {
    pub project_path: PathBuf,
    pub project: Box<ProjectFile>,
}

/// Asks whether to locate the missing source image of a project.
#[derive(Default)]
pub struct MissingSourceDialog {
    pending: Option<PendingProject>,
}

impl MissingSourceDialog {
    pub fn open_for(&mut self, project_path: &Path, project: Box<ProjectFile>) {
        self.pending = Some(PendingProject {
            project_path: project_path.to_path_buf(),
            project,
        });
    }

    pub fn is_open(&self) -> bool {
        self.pending.is_some()
    }

    /// Returns the pending project when the user chooses to locate the image.
    pub fn show(&mut self, ctx: &egui::Context) -> DialogResult<PendingProject> {
        let Some(pending) = &self.pending else {
            return DialogResult::None;
        };
        let (enter, esc) = consume_dialog_keys(ctx);
        let (mut locate, mut cancel) = (enter, esc);

        modal_window("missing_source_dialog").show(ctx, |ui| {
            ui.set_min_width(360.0);
            ui.set_max_width(520.0);
            let colors = DialogColors::from_ctx(ctx);
            paint_dialog_header(ui, &colors, "\u{26A0}", &t!("dialog.missing_source"));
            ui.add_space(8.0);
            ui.label(t!(
                "dialog.missing_source.body",
                path = pending.project.source_image_path.display()
            ));
            let (ok, c) = dialog_footer(ui, &colors, &t!("dialog.missing_source.locate"));
            locate |= ok;
            cancel |= c;
        });

        if locate {
            self.pending.take().map_or(DialogResult::None, DialogResult::Ok)
        } else if cancel {
            self.pending = None;
            DialogResult::Cancel
        } else {
            DialogResult::None
        }
    }
}
