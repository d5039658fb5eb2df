//! Application state and the commands the shell issues against it.
//!
//! Every command either succeeds or leaves the previous state untouched, so
//! the shell can show the error and carry on.

use image::DynamicImage;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::grid::{MAX_GRID_DIM, PixelGridModel};
use crate::io::{export_grid, load_source_image};
use crate::palette::{Palette, PaletteSource};
use crate::pixelate::{Algorithm, pixelate};
use crate::project::{PixelizationSettings, ProjectFile, load_project, write_project};
use crate::settings::AppSettings;

/// The decoded source image and where it came from.
pub struct SourceImage {
    pub path: PathBuf,
    pub image: DynamicImage,
}

impl SourceImage {
    pub fn open(path: &Path) -> Result<Self> {
        let image = load_source_image(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            image,
        })
    }

    /// width / height
    pub fn aspect_ratio(&self) -> f64 {
        if self.image.height() == 0 {
            1.0
        } else {
            self.image.width() as f64 / self.image.height() as f64
        }
    }
}

/// The choices that produced the current grid. Toolbar edits after an
/// apply do not touch it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppliedRecipe {
    pub algorithm: Algorithm,
    pub palette: PaletteSource,
}

/// What happened to saved marks on project load.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadReport {
    pub restored_marks: usize,
    pub discarded_marks: usize,
}

pub struct ApplicationState {
    pub source: Option<SourceImage>,
    pub model: PixelGridModel,
    pub target_width: u32,
    pub target_height: u32,
    /// Derive the height from the width and the source aspect ratio.
    pub lock_aspect: bool,
    pub algorithm: Algorithm,
    pub palette: PaletteSource,
    pub show_grid: bool,
    /// Set alongside every grid install, cleared with the grid.
    applied: Option<AppliedRecipe>,
    /// Where the current project was last saved or loaded from.
    pub project_path: Option<PathBuf>,
    pub is_dirty: bool,
}

impl Default for ApplicationState {
    fn default() -> Self {
        Self::from_settings(&AppSettings::default())
    }
}

impl ApplicationState {
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self {
            source: None,
            model: PixelGridModel::new(),
            target_width: settings.width.clamp(1, MAX_GRID_DIM),
            target_height: settings.height.clamp(1, MAX_GRID_DIM),
            lock_aspect: settings.lock_aspect,
            algorithm: settings.algorithm,
            palette: settings.palette.clone(),
            show_grid: settings.show_grid,
            applied: None,
            project_path: None,
            is_dirty: false,
        }
    }

    /// Copy the user-facing choices back into `settings` for persistence.
    pub fn store_settings(&self, settings: &mut AppSettings) {
        settings.width = self.target_width;
        settings.height = self.target_height;
        settings.lock_aspect = self.lock_aspect;
        settings.algorithm = self.algorithm;
        settings.palette = self.palette.clone();
        settings.show_grid = self.show_grid;
    }

    pub fn has_grid(&self) -> bool {
        self.model.has_grid()
    }

    pub fn applied_recipe(&self) -> Option<&AppliedRecipe> {
        self.applied.as_ref()
    }

    /// Fold user mark edits since the last call into `is_dirty`.
    pub fn sync_dirty(&mut self) {
        if self.model.take_marks_edited() {
            self.is_dirty = true;
        }
    }

    /// Display name for the window title.
    pub fn display_name(&self) -> Option<String> {
        let path = self
            .project_path
            .as_deref()
            .or(self.source.as_ref().map(|s| s.path.as_path()))?;
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        Some(if self.is_dirty { format!("{name}*") } else { name })
    }

    /// Change the target width, recomputing the height when locked.
    pub fn set_target_width(&mut self, width: u32) {
        self.target_width = width.clamp(1, MAX_GRID_DIM);
        self.sync_locked_height();
    }

    pub fn set_lock_aspect(&mut self, locked: bool) {
        self.lock_aspect = locked;
        self.sync_locked_height();
    }

    fn sync_locked_height(&mut self) {
        if !self.lock_aspect {
            return;
        }
        if let Some(source) = &self.source {
            let h = (self.target_width as f64 / source.aspect_ratio()) as u32;
            self.target_height = h.clamp(1, MAX_GRID_DIM);
        }
    }

    /// Open a new source image. Drops the current grid and project.
    pub fn open_image(&mut self, path: &Path) -> Result<()> {
        let source = SourceImage::open(path)?;
        log::info!(
            "Opened {} ({}×{})",
            path.display(),
            source.image.width(),
            source.image.height()
        );
        self.source = Some(source);
        self.model.clear_grid();
        self.applied = None;
        self.project_path = None;
        self.is_dirty = false;
        self.sync_locked_height();
        Ok(())
    }

    /// Replace the palette with one parsed from free text. On rejection the
    /// current palette is kept.
    pub fn set_custom_palette(&mut self, text: &str) -> Result<()> {
        let palette = Palette::parse_custom(text)?;
        log::info!("Custom palette with {} colours", palette.len());
        self.palette = PaletteSource::Custom(palette);
        Ok(())
    }

    /// Colours the current palette source resolves to.
    pub fn resolved_palette(&self) -> Palette {
        let source_rgb = match (&self.palette, &self.source) {
            (PaletteSource::Adaptive(_), Some(s)) => Some(s.image.to_rgb8()),
            _ => None,
        };
        self.palette.resolve(source_rgb.as_ref())
    }

    /// Re-run pixelization with the current settings and install the grid.
    pub fn apply_pixelization(&mut self) -> Result<()> {
        let Some(source) = &self.source else {
            return Err(Error::NoData);
        };
        let palette = self.resolved_palette();
        let grid = pixelate(
            &source.image,
            self.target_width,
            self.target_height,
            self.algorithm,
            &palette,
        )?;
        log::info!(
            "Pixelized to {}×{} ({}, {} colours, {})",
            self.target_width,
            self.target_height,
            self.algorithm.name(),
            palette.len(),
            self.palette.name()
        );
        self.model.set_grid(grid);
        self.applied = Some(AppliedRecipe {
            algorithm: self.algorithm,
            palette: self.palette.clone(),
        });
        self.is_dirty = true;
        Ok(())
    }

    /// Build the project document for the displayed grid, from the recipe
    /// that produced it.
    pub fn to_project(&self) -> Result<ProjectFile> {
        let (Some(source), Some(recipe), true) = (&self.source, &self.applied, self.model.has_grid())
        else {
            return Err(Error::NoData);
        };
        let (width, height) = self.model.dimensions();
        let settings = PixelizationSettings::new(width, height, recipe.algorithm, &recipe.palette);
        ProjectFile::new(&source.path, settings, self.model.marks().iter().copied())
    }

    pub fn save_project(&mut self, path: &Path) -> Result<()> {
        let project = self.to_project()?;
        write_project(&project, path)?;
        log::info!(
            "Saved project {} ({} marks)",
            path.display(),
            project.marked_pixels.len()
        );
        self.project_path = Some(path.to_path_buf());
        self.model.take_marks_edited();
        self.is_dirty = false;
        Ok(())
    }

    /// Load a project. On [`Error::SourceImageMissing`] nothing changes and
    /// the caller may retry with [`ApplicationState::apply_project`] and a
    /// replacement image.
    pub fn load_project(&mut self, path: &Path) -> Result<LoadReport> {
        let project = load_project(path)?;
        let source_path = project.source_image_path.clone();
        let report = self.apply_project(&project, &source_path)?;
        self.project_path = Some(path.to_path_buf());
        self.is_dirty = false;
        Ok(report)
    }

    /// Rebuild the grid from a project recipe using `image_path` as source.
    /// All-or-nothing: on error the current state is kept.
    pub fn apply_project(&mut self, project: &ProjectFile, image_path: &Path) -> Result<LoadReport> {
        let settings = &project.pixelization_settings;
        let palette_source = settings.palette_source()?;
        let source = SourceImage::open(image_path)?;

        let source_rgb = match palette_source {
            PaletteSource::Adaptive(_) => Some(source.image.to_rgb8()),
            _ => None,
        };
        let palette = palette_source.resolve(source_rgb.as_ref());
        let grid = pixelate(
            &source.image,
            settings.width,
            settings.height,
            settings.algorithm,
            &palette,
        )?;

        self.source = Some(source);
        self.target_width = settings.width;
        self.target_height = settings.height;
        // saved dimensions win over the aspect lock
        self.lock_aspect = false;
        self.algorithm = settings.algorithm;
        self.palette = palette_source.clone();
        self.model.set_grid(grid);
        self.applied = Some(AppliedRecipe {
            algorithm: settings.algorithm,
            palette: palette_source,
        });
        let discarded = self
            .model
            .restore_marks(project.marked_pixels.iter().copied());
        if discarded > 0 {
            log::warn!("Discarded {discarded} marks outside the {}×{} grid", settings.width, settings.height);
        }
        self.is_dirty = true;
        Ok(LoadReport {
            restored_marks: self.model.marks().len(),
            discarded_marks: discarded,
        })
    }

    pub fn export_image(&self, path: &Path, with_marks: bool) -> Result<()> {
        let grid = self.model.grid().ok_or(Error::NoData)?;
        let marks = with_marks.then(|| self.model.marks());
        export_grid(grid, marks, path)?;
        log::info!("Exported {} (marks: {with_marks})", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Cell;
    use image::{Rgb, RgbImage};

    fn write_source(dir: &Path, w: u32, h: u32) -> PathBuf {
        let path = dir.join("source.png");
        RgbImage::from_fn(w, h, |x, y| Rgb([(x * 7) as u8, (y * 11) as u8, 200]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn operations_without_grid_report_no_data() {
        let mut state = ApplicationState::default();
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(state.apply_pixelization(), Err(Error::NoData)));
        assert!(matches!(
            state.save_project(&dir.path().join("p.wpp")),
            Err(Error::NoData)
        ));
        assert!(matches!(
            state.export_image(&dir.path().join("e.png"), false),
            Err(Error::NoData)
        ));
        assert!(!dir.path().join("p.wpp").exists());
    }

    #[test]
    fn aspect_lock_derives_height() {
        let dir = tempfile::tempdir().unwrap();
        let src = write_source(dir.path(), 40, 20);
        let mut state = ApplicationState::default();
        state.lock_aspect = true;
        state.open_image(&src).unwrap();
        state.set_target_width(64);
        assert_eq!(state.target_height, 32);

        state.set_lock_aspect(false);
        state.target_height = 5;
        state.set_target_width(10);
        assert_eq!(state.target_height, 5);
    }

    #[test]
    fn rejected_custom_palette_keeps_previous() {
        let mut state = ApplicationState::default();
        state.palette = PaletteSource::Generated(32);
        assert!(matches!(
            state.set_custom_palette("garbage"),
            Err(Error::InvalidPaletteInput)
        ));
        assert_eq!(state.palette, PaletteSource::Generated(32));

        state.set_custom_palette("#000000 #FFFFFF").unwrap();
        assert!(state.palette.is_custom());
    }

    #[test]
    fn failed_open_keeps_grid() {
        let dir = tempfile::tempdir().unwrap();
        let src = write_source(dir.path(), 8, 8);
        let mut state = ApplicationState::default();
        state.open_image(&src).unwrap();
        state.set_target_width(4);
        state.apply_pixelization().unwrap();
        state.model.toggle_mark(Cell::new(1, 1));

        assert!(state.open_image(&dir.path().join("nope.png")).is_err());
        assert!(state.has_grid());
        assert!(state.model.is_marked(Cell::new(1, 1)));
    }

    #[test]
    fn export_writes_one_pixel_per_cell() {
        let dir = tempfile::tempdir().unwrap();
        let src = write_source(dir.path(), 30, 30);
        let mut state = ApplicationState::default();
        state.open_image(&src).unwrap();
        state.lock_aspect = false;
        state.target_width = 6;
        state.target_height = 3;
        state.apply_pixelization().unwrap();

        let out = dir.path().join("out.png");
        state.export_image(&out, true).unwrap();
        let img = image::open(&out).unwrap();
        assert_eq!((img.width(), img.height()), (6, 3));
    }
}
