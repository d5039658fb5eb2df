//! `.wpp` project files.
//!
//! A project stores the recipe for the grid (source image + pixelization
//! settings) and the marked cells, never the grid bitmap itself. Loading
//! re-runs pixelization.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::grid::{Cell, MAX_GRID_DIM};
use crate::palette::{CUSTOM_PALETTE_NAME, Palette, PaletteSource, Rgb8};
use crate::pixelate::Algorithm;

pub const PROJECT_VERSION: &str = "1.0";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PixelizationSettings {
    pub width: u32,
    pub height: u32,
    pub algorithm: Algorithm,
    pub palette_name: String,
    /// Present iff `palette_name == "custom"`.
    #[serde(default)]
    pub custom_palette: Option<Vec<Rgb8>>,
}

impl PixelizationSettings {
    pub fn new(width: u32, height: u32, algorithm: Algorithm, palette: &PaletteSource) -> Self {
        let custom_palette = match palette {
            PaletteSource::Custom(p) => Some(p.colors().to_vec()),
            _ => None,
        };
        Self {
            width,
            height,
            algorithm,
            palette_name: palette.name(),
            custom_palette,
        }
    }

    /// Resolve the stored palette name back to a [`PaletteSource`].
    pub fn palette_source(&self) -> Result<PaletteSource> {
        if self.palette_name == CUSTOM_PALETTE_NAME {
            return match &self.custom_palette {
                Some(colors) if !colors.is_empty() => {
                    Ok(PaletteSource::Custom(Palette::new(colors.clone())))
                }
                _ => Err(Error::Parse(
                    "palette_name is \"custom\" but custom_palette is missing or empty".to_string(),
                )),
            };
        }
        PaletteSource::from_preset_name(&self.palette_name)
            .ok_or_else(|| Error::Parse(format!("unknown palette \"{}\"", self.palette_name)))
    }

    fn validate(&self) -> Result<()> {
        for (what, v) in [("width", self.width), ("height", self.height)] {
            if !(1..=MAX_GRID_DIM).contains(&v) {
                return Err(Error::Parse(format!("{what} {v} is outside 1..={MAX_GRID_DIM}")));
            }
        }
        if self.palette_name != CUSTOM_PALETTE_NAME && self.custom_palette.is_some() {
            log::warn!(
                "Project has a custom_palette but palette_name is \"{}\"; ignoring it",
                self.palette_name
            );
        }
        self.palette_source().map(|_| ())
    }
}

/// On-disk project document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub version: String,
    pub source_image_path: PathBuf,
    pub pixelization_settings: PixelizationSettings,
    pub marked_pixels: Vec<Cell>,
}

impl ProjectFile {
    /// Build a document; `source_image_path` is made absolute.
    pub fn new(
        source_image_path: &Path,
        settings: PixelizationSettings,
        marks: impl IntoIterator<Item = Cell>,
    ) -> Result<Self> {
        let mut marked_pixels: Vec<Cell> = marks.into_iter().collect();
        marked_pixels.sort_by_key(|c| (c.y, c.x));
        Ok(Self {
            version: PROJECT_VERSION.to_string(),
            source_image_path: std::path::absolute(source_image_path)?,
            pixelization_settings: settings,
            marked_pixels,
        })
    }
}

/// Write `project` as pretty-printed JSON.
pub fn write_project(project: &ProjectFile, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, project)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Parse and validate a project file. Does not look at the source image.
pub fn read_project(path: &Path) -> Result<ProjectFile> {
    let file = File::open(path)?;
    let project: ProjectFile = serde_json::from_reader(BufReader::new(file))?;
    if project.version != PROJECT_VERSION {
        log::warn!(
            "Project {} has version {}, expected {}",
            path.display(),
            project.version,
            PROJECT_VERSION
        );
    }
    project.pixelization_settings.validate()?;
    Ok(project)
}

/// [`read_project`], plus the check that the source image still exists.
pub fn load_project(path: &Path) -> Result<ProjectFile> {
    let project = read_project(path)?;
    if !project.source_image_path.exists() {
        return Err(Error::SourceImageMissing {
            path: project.source_image_path.clone(),
            project: Box::new(project),
        });
    }
    Ok(project)
}
