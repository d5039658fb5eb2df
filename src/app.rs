use eframe::egui;
use std::path::Path;

use wplacehelper::Error;
use wplacehelper::i18n::{self, LANGUAGES};
use wplacehelper::io::FileHandler;
use wplacehelper::palette::PaletteSource;
use wplacehelper::pixelate::Algorithm;
use wplacehelper::settings::AppSettings;
use wplacehelper::state::{ApplicationState, LoadReport};
use wplacehelper::t;

use crate::canvas::PixelCanvas;
use crate::components::dialogs::PendingProject;
use crate::components::{
    CustomPaletteDialog, DialogResult, ExportDialog, MessageDialog, MissingSourceDialog, StatusBar,
    StatusInfo,
};

pub struct WplaceHelperApp {
    state: ApplicationState,
    settings: AppSettings,
    canvas: PixelCanvas,
    files: FileHandler,
    status: StatusBar,
    palette_dialog: CustomPaletteDialog,
    export_dialog: ExportDialog,
    messages: MessageDialog,
    missing_source: MissingSourceDialog,
    /// Lazily opened; `None` if the system clipboard is unavailable.
    clipboard: Option<arboard::Clipboard>,
}

/// Look for a system font that covers Simplified Chinese.
fn discover_system_cjk_font() -> Option<Vec<u8>> {
    let candidates: &[&str] = &[
        #[cfg(target_os = "windows")]
        "C:\\Windows\\Fonts\\msyh.ttc",
        #[cfg(target_os = "windows")]
        "C:\\Windows\\Fonts\\simsun.ttc",
        #[cfg(target_os = "linux")]
        "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
        #[cfg(target_os = "linux")]
        "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
        #[cfg(target_os = "linux")]
        "/usr/share/fonts/google-noto-cjk/NotoSansCJK-Regular.ttc",
        #[cfg(target_os = "linux")]
        "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
        #[cfg(target_os = "linux")]
        "/usr/share/fonts/truetype/droid/DroidSansFallbackFull.ttf",
        #[cfg(target_os = "macos")]
        "/System/Library/Fonts/PingFang.ttc",
        #[cfg(target_os = "macos")]
        "/System/Library/Fonts/STHeiti Light.ttc",
        #[cfg(target_os = "macos")]
        "/Library/Fonts/Arial Unicode.ttf",
    ];
    candidates
        .iter()
        .filter_map(|path| std::fs::read(path).ok())
        .find(|data| data.len() > 100)
}

impl WplaceHelperApp {
    pub fn new(cc: &eframe::CreationContext<'_>, settings: AppSettings) -> Self {
        // egui's default fonts have no CJK glyphs
        if let Some(data) = discover_system_cjk_font() {
            let mut fonts = egui::FontDefinitions::default();
            fonts
                .font_data
                .insert("system_cjk".to_owned(), egui::FontData::from_owned(data));
            fonts
                .families
                .entry(egui::FontFamily::Proportional)
                .or_default()
                .push("system_cjk".to_owned());
            cc.egui_ctx.set_fonts(fonts);
        } else {
            log::warn!("No CJK system font found; Chinese text may not render");
        }

        let state = ApplicationState::from_settings(&settings);
        let files = FileHandler::new(settings.last_image_dir.clone(), settings.last_project_dir.clone());
        Self {
            state,
            settings,
            canvas: PixelCanvas::default(),
            files,
            status: StatusBar::default(),
            palette_dialog: CustomPaletteDialog::default(),
            export_dialog: ExportDialog::default(),
            messages: MessageDialog::default(),
            missing_source: MissingSourceDialog::default(),
            clipboard: None,
        }
    }

    fn any_dialog_open(&self) -> bool {
        self.palette_dialog.open
            || self.export_dialog.open
            || self.messages.is_open()
            || self.missing_source.is_open()
    }

    fn persist_settings(&mut self) {
        self.state.store_settings(&mut self.settings);
        self.settings.last_image_dir = self.files.last_image_dir.clone();
        self.settings.last_project_dir = self.files.last_project_dir.clone();
        self.settings.language = i18n::current_language().to_string();
        self.settings.save();
    }

    fn report_error(&mut self, title: String, err: &Error) {
        log::error!("{title}: {err}");
        self.messages.error(title, err.to_string());
    }

    // ---- Commands ------------------------------------------------------

    fn handle_open_image(&mut self) {
        let Some(path) = self.files.pick_source_image() else { return };
        if let Err(e) = self.state.open_image(&path) {
            self.report_error(t!("message.open_failed"), &e);
        }
    }

    fn handle_apply(&mut self, now: f64) {
        match self.state.apply_pixelization() {
            Ok(()) => {
                self.canvas.fit_to_view();
                self.status.notify(t!("status.pixelized"), now);
                self.persist_settings();
            }
            Err(Error::NoData) => {
                self.messages.info(t!("message.hint"), t!("message.open_image_first"));
            }
            Err(e) => self.report_error(t!("message.pixelize_failed"), &e),
        }
    }

    fn handle_save(&mut self, now: f64) {
        match self.state.project_path.clone() {
            Some(path) => self.save_to(&path, now),
            None => self.handle_save_as(now),
        }
    }

    fn handle_save_as(&mut self, now: f64) {
        if !self.state.has_grid() {
            self.messages.info(t!("message.hint"), t!("message.nothing_to_save"));
            return;
        }
        if let Some(path) = self.files.pick_project_to_save() {
            self.save_to(&path, now);
        }
    }

    fn save_to(&mut self, path: &Path, now: f64) {
        match self.state.save_project(path) {
            Ok(()) => {
                let name = file_name(path);
                self.status.notify(t!("status.saved", name = name), now);
            }
            Err(Error::NoData) => {
                self.messages.info(t!("message.hint"), t!("message.nothing_to_save"));
            }
            Err(e) => self.report_error(t!("message.save_failed"), &e),
        }
    }

    fn handle_load_project(&mut self, now: f64) {
        let Some(path) = self.files.pick_project_to_open() else { return };
        match self.state.load_project(&path) {
            Ok(report) => self.after_project_loaded(&path, report, now),
            Err(Error::SourceImageMissing { path: missing, project }) => {
                log::warn!("Source image of {} is missing: {}", path.display(), missing.display());
                self.missing_source.open_for(&path, project);
            }
            Err(e) => self.report_error(t!("message.load_failed"), &e),
        }
    }

    /// Second half of a load whose source image had to be located by hand.
    fn resume_project(&mut self, pending: PendingProject, now: f64) {
        let Some(image_path) = self.files.pick_source_image() else { return };
        match self.state.apply_project(&pending.project, &image_path) {
            Ok(report) => {
                self.state.project_path = Some(pending.project_path.clone());
                // the source path changed, so the file on disk is stale
                self.state.is_dirty = true;
                self.after_project_loaded(&pending.project_path, report, now);
            }
            Err(e) => self.report_error(t!("message.load_failed"), &e),
        }
    }

    fn after_project_loaded(&mut self, path: &Path, report: LoadReport, now: f64) {
        self.canvas.fit_to_view();
        self.status.notify(t!("status.loaded", name = file_name(path)), now);
        if report.discarded_marks > 0 {
            self.messages.info(
                t!("message.hint"),
                t!("message.marks_discarded", n = report.discarded_marks),
            );
        }
    }

    fn handle_export(&mut self) {
        if !self.state.has_grid() {
            self.messages.info(t!("message.hint"), t!("message.nothing_to_export"));
            return;
        }
        self.export_dialog.open_for(self.state.model.dimensions());
    }

    fn finish_export(&mut self, with_marks: bool) {
        let Some(path) = self.files.pick_export_path() else { return };
        match self.state.export_image(&path, with_marks) {
            Ok(()) => self.messages.info(
                t!("message.done"),
                t!("message.exported", path = path.display()),
            ),
            Err(e) => self.report_error(t!("message.export_failed"), &e),
        }
    }

    fn copy_selected_hex(&mut self, now: f64) {
        let Some(hex) = self.status.selected().map(|s| s.hex.clone()) else { return };
        if self.clipboard.is_none() {
            match arboard::Clipboard::new() {
                Ok(cb) => self.clipboard = Some(cb),
                Err(e) => {
                    log::warn!("Clipboard unavailable: {e}");
                    return;
                }
            }
        }
        if let Some(cb) = &mut self.clipboard {
            match cb.set_text(hex.clone()) {
                Ok(()) => self.status.notify(t!("status.copied", hex = hex), now),
                Err(e) => log::warn!("Could not copy {hex}: {e}"),
            }
        }
    }

    // ---- Panels --------------------------------------------------------

    fn handle_shortcuts(&mut self, ctx: &egui::Context, now: f64) {
        if self.any_dialog_open() {
            return;
        }
        use egui::{Key, Modifiers};
        let ctrl_shift = Modifiers::COMMAND | Modifiers::SHIFT;
        // Shift variant first so Ctrl+S does not swallow Ctrl+Shift+S
        if ctx.input_mut(|i| i.consume_key(ctrl_shift, Key::S)) {
            self.handle_save_as(now);
        } else if ctx.input_mut(|i| i.consume_key(Modifiers::COMMAND, Key::S)) {
            self.handle_save(now);
        }
        if ctx.input_mut(|i| i.consume_key(ctrl_shift, Key::O)) {
            self.handle_load_project(now);
        } else if ctx.input_mut(|i| i.consume_key(Modifiers::COMMAND, Key::O)) {
            self.handle_open_image();
        }
        if ctx.input_mut(|i| i.consume_key(Modifiers::COMMAND, Key::E)) {
            self.handle_export();
        }
        if ctx.input_mut(|i| i.consume_key(Modifiers::COMMAND, Key::Enter)) {
            self.handle_apply(now);
        }
        if ctx.input_mut(|i| i.consume_key(Modifiers::COMMAND, Key::Num0)) {
            self.canvas.fit_to_view();
        }
        if ctx.input_mut(|i| i.consume_key(Modifiers::COMMAND, Key::PlusEquals)) {
            self.canvas.zoom_step(true);
        }
        if ctx.input_mut(|i| i.consume_key(Modifiers::COMMAND, Key::Minus)) {
            self.canvas.zoom_step(false);
        }
    }

    fn show_menu_bar(&mut self, ctx: &egui::Context, now: f64) {
        let has_grid = self.state.has_grid();
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button(t!("menu.file"), |ui| {
                    if ui
                        .add(egui::Button::new(t!("menu.file.open_image")).shortcut_text("Ctrl+O"))
                        .clicked()
                    {
                        ui.close_menu();
                        self.handle_open_image();
                    }
                    if ui
                        .add(egui::Button::new(t!("menu.file.load_project")).shortcut_text("Ctrl+Shift+O"))
                        .clicked()
                    {
                        ui.close_menu();
                        self.handle_load_project(now);
                    }
                    ui.separator();
                    if ui
                        .add_enabled(
                            has_grid,
                            egui::Button::new(t!("menu.file.save")).shortcut_text("Ctrl+S"),
                        )
                        .clicked()
                    {
                        ui.close_menu();
                        self.handle_save(now);
                    }
                    if ui
                        .add_enabled(
                            has_grid,
                            egui::Button::new(t!("menu.file.save_as")).shortcut_text("Ctrl+Shift+S"),
                        )
                        .clicked()
                    {
                        ui.close_menu();
                        self.handle_save_as(now);
                    }
                    ui.separator();
                    if ui
                        .add_enabled(
                            has_grid,
                            egui::Button::new(t!("menu.file.export")).shortcut_text("Ctrl+E"),
                        )
                        .clicked()
                    {
                        ui.close_menu();
                        self.handle_export();
                    }
                    ui.separator();
                    if ui.button(t!("menu.file.quit")).clicked() {
                        ui.close_menu();
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                ui.menu_button(t!("menu.view"), |ui| {
                    if ui.checkbox(&mut self.state.show_grid, t!("menu.view.grid")).clicked() {
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui
                        .add(egui::Button::new(t!("menu.view.fit")).shortcut_text("Ctrl+0"))
                        .clicked()
                    {
                        self.canvas.fit_to_view();
                        ui.close_menu();
                    }
                    if ui
                        .add(egui::Button::new(t!("menu.view.zoom_in")).shortcut_text("Ctrl++"))
                        .clicked()
                    {
                        self.canvas.zoom_step(true);
                        ui.close_menu();
                    }
                    if ui
                        .add(egui::Button::new(t!("menu.view.zoom_out")).shortcut_text("Ctrl+-"))
                        .clicked()
                    {
                        self.canvas.zoom_step(false);
                        ui.close_menu();
                    }
                });

                ui.menu_button(t!("menu.language"), |ui| {
                    let current = i18n::current_language();
                    for (code, native) in LANGUAGES {
                        if ui.radio(current == *code, *native).clicked() {
                            i18n::set_language(code);
                            self.settings.language = code.to_string();
                            self.settings.save();
                            ui.close_menu();
                        }
                    }
                });

                ui.menu_button(t!("menu.help"), |ui| {
                    ui.label(t!("help.controls"));
                    if let Some(path) = wplacehelper::logger::log_path() {
                        ui.separator();
                        ui.label(egui::RichText::new(t!("help.log_file", path = path.display())).small());
                    }
                });
            });
        });
    }

    fn show_toolbar(&mut self, ctx: &egui::Context, now: f64) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.add_space(2.0);
            ui.horizontal_wrapped(|ui| {
                ui.label(t!("toolbar.width"));
                let mut width = self.state.target_width;
                if ui
                    .add(egui::DragValue::new(&mut width).speed(1.0).clamp_range(1..=wplacehelper::grid::MAX_GRID_DIM))
                    .changed()
                {
                    self.state.set_target_width(width);
                }

                ui.label(t!("toolbar.height"));
                ui.add_enabled(
                    !self.state.lock_aspect,
                    egui::DragValue::new(&mut self.state.target_height)
                        .speed(1.0)
                        .clamp_range(1..=wplacehelper::grid::MAX_GRID_DIM),
                );

                let mut locked = self.state.lock_aspect;
                if ui.checkbox(&mut locked, t!("toolbar.lock_aspect")).changed() {
                    self.state.set_lock_aspect(locked);
                }

                if ui
                    .add_enabled(self.state.source.is_some(), egui::Button::new(t!("toolbar.apply")))
                    .on_hover_text("Ctrl+Enter")
                    .clicked()
                {
                    self.handle_apply(now);
                }
                ui.separator();

                ui.label(t!("toolbar.algorithm"));
                egui::ComboBox::from_id_source("algorithm_combo")
                    .selected_text(self.state.algorithm.label())
                    .show_ui(ui, |ui| {
                        for alg in Algorithm::all() {
                            ui.selectable_value(&mut self.state.algorithm, *alg, alg.label());
                        }
                    });

                ui.label(t!("toolbar.palette"));
                let mut open_custom = false;
                egui::ComboBox::from_id_source("palette_combo")
                    .width(150.0)
                    .selected_text(self.state.palette.label())
                    .show_ui(ui, |ui| {
                        for preset in PaletteSource::presets() {
                            let selected = self.state.palette == preset;
                            if ui.selectable_label(selected, preset.label()).clicked() && !selected {
                                log::info!("Palette: {}", preset.name());
                                self.state.palette = preset;
                            }
                        }
                        ui.separator();
                        if ui
                            .selectable_label(self.state.palette.is_custom(), t!("palette.custom_entry"))
                            .clicked()
                        {
                            open_custom = true;
                        }
                    });
                if open_custom {
                    self.palette_dialog.open_with(&self.state.palette);
                }
                ui.separator();

                ui.checkbox(&mut self.state.show_grid, t!("toolbar.grid"));
                if ui.button(t!("toolbar.fit")).clicked() {
                    self.canvas.fit_to_view();
                }
            });
            ui.add_space(2.0);
        });
    }

    fn show_status_bar(&mut self, ctx: &egui::Context, now: f64) {
        let info = StatusInfo {
            grid_size: self.state.has_grid().then(|| self.state.model.dimensions()),
            mark_count: self.state.model.marks().len(),
            zoom: self.canvas.scale(),
            palette_label: self.state.palette.label(),
        };
        let mut copy = false;
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            copy = self.status.show(ui, &info);
        });
        if copy {
            self.copy_selected_hex(now);
        }
    }

    fn show_dialogs(&mut self, ctx: &egui::Context, now: f64) {
        if let DialogResult::Ok(text) = self.palette_dialog.show(ctx)
            && let Err(e) = self.state.set_custom_palette(&text)
        {
            log::warn!("Custom palette rejected: {e}");
            self.palette_dialog.reject(t!("message.palette_rejected"));
        }

        if let DialogResult::Ok(with_marks) = self.export_dialog.show(ctx) {
            self.finish_export(with_marks);
        }

        if let DialogResult::Ok(pending) = self.missing_source.show(ctx) {
            self.resume_project(pending, now);
        }

        self.messages.show(ctx);
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

impl eframe::App for WplaceHelperApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let title = match self.state.display_name() {
            Some(name) => format!("WplaceHelper - {name}"),
            None => "WplaceHelper".to_string(),
        };
        ctx.send_viewport_cmd(egui::ViewportCommand::Title(title));

        if ctx.input(|i| i.viewport().close_requested()) {
            self.persist_settings();
        }

        let now = ctx.input(|i| i.time);
        self.handle_shortcuts(ctx, now);
        self.show_menu_bar(ctx, now);
        self.show_toolbar(ctx, now);
        self.show_status_bar(ctx, now);

        let placeholder = if self.state.source.is_some() {
            t!("canvas.press_apply")
        } else {
            t!("canvas.empty")
        };
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let enabled = !self.any_dialog_open();
                ui.add_enabled_ui(enabled, |ui| {
                    self.canvas
                        .show(ui, &mut self.state.model, self.state.show_grid, &placeholder);
                });
            });

        self.state.model.dispatch_events(&mut self.status);
        self.state.sync_dirty();

        self.show_dialogs(ctx, now);
    }
}
