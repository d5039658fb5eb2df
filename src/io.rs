use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use rfd::FileDialog;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::grid::Cell;

/// Extensions offered when opening a source image.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp", "tga", "tif", "tiff", "ico"];

/// Project file extension.
pub const PROJECT_EXTENSION: &str = "wpp";

/// Overlay colour used for marks, both on screen and when baked into exports.
pub const MARK_COLOR: [u8; 4] = [220, 20, 60, 230];

/// Decode a source image from disk.
pub fn load_source_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|source| Error::ImageLoadFailed {
        path: path.to_path_buf(),
        source,
    })
}

/// Copy of `grid` with every marked cell blended with [`MARK_COLOR`].
pub fn bake_marks<'a>(grid: &RgbaImage, marks: impl IntoIterator<Item = &'a Cell>) -> RgbaImage {
    let mut out = grid.clone();
    let alpha = MARK_COLOR[3] as u32;
    for cell in marks {
        if cell.x >= out.width() || cell.y >= out.height() {
            continue;
        }
        let p = out.get_pixel_mut(cell.x, cell.y);
        let blend = |dst: u8, src: u8| ((src as u32 * alpha + dst as u32 * (255 - alpha) + 127) / 255) as u8;
        *p = Rgba([
            blend(p[0], MARK_COLOR[0]),
            blend(p[1], MARK_COLOR[1]),
            blend(p[2], MARK_COLOR[2]),
            255,
        ]);
    }
    out
}

/// Write the grid at one pixel per cell. The format follows the extension,
/// defaulting to PNG.
pub fn export_grid(grid: &RgbaImage, marks: Option<&HashSet<Cell>>, path: &Path) -> Result<()> {
    let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Png);
    let image = match marks {
        Some(marks) => bake_marks(grid, marks),
        None => grid.clone(),
    };
    // JPEG and friends have no alpha channel
    let result = match format {
        ImageFormat::Jpeg | ImageFormat::Bmp => {
            DynamicImage::ImageRgba8(image).to_rgb8().save_with_format(path, format)
        }
        _ => image.save_with_format(path, format),
    };
    result.map_err(|e| match e {
        image::ImageError::IoError(io) => Error::Io(io),
        other => Error::ExportFailed(other),
    })
}

/// Native file dialogs; remembers the last directories used.
#[derive(Clone, Debug, Default)]
pub struct FileHandler {
    pub last_image_dir: Option<PathBuf>,
    pub last_project_dir: Option<PathBuf>,
}

impl FileHandler {
    pub fn new(last_image_dir: Option<PathBuf>, last_project_dir: Option<PathBuf>) -> Self {
        Self {
            last_image_dir,
            last_project_dir,
        }
    }

    fn remember_image_dir(&mut self, path: &Path) {
        self.last_image_dir = path.parent().map(Path::to_path_buf);
    }

    fn remember_project_dir(&mut self, path: &Path) {
        self.last_project_dir = path.parent().map(Path::to_path_buf);
    }

    pub fn pick_source_image(&mut self) -> Option<PathBuf> {
        let mut dialog = FileDialog::new()
            .set_title(&t!("dialog.pick_image"))
            .add_filter(&t!("filter.images"), IMAGE_EXTENSIONS)
            .add_filter(&t!("filter.all"), &["*"]);
        if let Some(dir) = &self.last_image_dir {
            dialog = dialog.set_directory(dir);
        }
        let path = dialog.pick_file()?;
        self.remember_image_dir(&path);
        Some(path)
    }

    pub fn pick_project_to_open(&mut self) -> Option<PathBuf> {
        let mut dialog = FileDialog::new()
            .set_title(&t!("dialog.load_project"))
            .add_filter(&t!("filter.project"), &[PROJECT_EXTENSION]);
        if let Some(dir) = &self.last_project_dir {
            dialog = dialog.set_directory(dir);
        }
        let path = dialog.pick_file()?;
        self.remember_project_dir(&path);
        Some(path)
    }

    pub fn pick_project_to_save(&mut self) -> Option<PathBuf> {
        let mut dialog = FileDialog::new()
            .set_title(&t!("dialog.save_project_as"))
            .add_filter(&t!("filter.project"), &[PROJECT_EXTENSION])
            .set_file_name(format!("untitled.{PROJECT_EXTENSION}"));
        if let Some(dir) = &self.last_project_dir {
            dialog = dialog.set_directory(dir);
        }
        let mut path = dialog.save_file()?;
        if path.extension().is_none() {
            path.set_extension(PROJECT_EXTENSION);
        }
        self.remember_project_dir(&path);
        Some(path)
    }

    pub fn pick_export_path(&mut self) -> Option<PathBuf> {
        let mut dialog = FileDialog::new()
            .set_title(&t!("dialog.export"))
            .add_filter("PNG", &["png"])
            .add_filter("BMP", &["bmp"])
            .set_file_name("pixelized.png");
        if let Some(dir) = &self.last_image_dir {
            dialog = dialog.set_directory(dir);
        }
        let mut path = dialog.save_file()?;
        if path.extension().is_none() {
            path.set_extension("png");
        }
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baking_blends_only_marked_cells() {
        let grid = RgbaImage::from_pixel(3, 2, Rgba([255, 255, 255, 255]));
        let marks = [Cell::new(1, 1), Cell::new(9, 9)];
        let out = bake_marks(&grid, marks.iter());
        assert_eq!(out.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        let p = out.get_pixel(1, 1);
        assert_eq!(p[3], 255);
        assert!(p[0] > p[1] && p[0] > p[2]);
        assert_ne!(p, &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn missing_file_is_image_load_failure() {
        let err = load_source_image(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, Error::ImageLoadFailed { .. }));
    }
}
