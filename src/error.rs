use std::path::PathBuf;

use thiserror::Error;

use crate::project::ProjectFile;

/// Every failure the application can report to the user.
///
/// None of these are fatal: the shell shows the message and the
/// [`ApplicationState`](crate::state::ApplicationState) keeps its previous
/// grid, marks and palette.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not open image {}: {source}", path.display())]
    ImageLoadFailed {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("pixelization failed: {0}")]
    PixelizationFailed(String),

    #[error("there is no pixelized image yet")]
    NoData,

    #[error("cell ({x}, {y}) is outside the grid")]
    OutOfBounds { x: u32, y: u32 },

    #[error("invalid project file: {0}")]
    Parse(String),

    /// The project parsed fine but its source image is gone. The parsed
    /// document rides along so the caller can pick a replacement image and
    /// carry on with the same recipe.
    #[error("source image not found: {}", path.display())]
    SourceImageMissing {
        path: PathBuf,
        project: Box<ProjectFile>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no valid #RRGGBB colours found")]
    InvalidPaletteInput,

    #[error("could not export image: {0}")]
    ExportFailed(#[source] image::ImageError),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        // serde_json reports I/O problems through the same type
        if e.is_io() {
            Error::Io(std::io::Error::other(e))
        } else {
            Error::Parse(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
