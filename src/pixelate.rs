//! Palette quantization followed by nearest-neighbour downsampling.
//!
//! Full-resolution pixels are mapped onto the palette first (optionally with
//! Floyd–Steinberg error diffusion), and only then shrunk to the target
//! size. Nearest-neighbour sampling never averages, so every output pixel is
//! still a palette colour and cell borders stay hard.

use image::imageops::{self, ColorMap, FilterType};
use image::{DynamicImage, Rgb, RgbImage, RgbaImage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::grid::MAX_GRID_DIM;
use crate::palette::{MAX_PALETTE_COLORS, Palette};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Plain nearest-colour mapping.
    #[default]
    Nearest,
    /// Floyd–Steinberg error diffusion.
    Dithered,
}

impl Algorithm {
    pub fn all() -> &'static [Algorithm] {
        &[Algorithm::Nearest, Algorithm::Dithered]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Nearest => "nearest",
            Algorithm::Dithered => "dithered",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "nearest" => Some(Algorithm::Nearest),
            "dithered" => Some(Algorithm::Dithered),
            _ => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Algorithm::Nearest => t!("algorithm.nearest"),
            Algorithm::Dithered => t!("algorithm.dithered"),
        }
    }
}

/// Adapts a [`Palette`] to `image`'s dithering interface.
struct PaletteMap<'a> {
    palette: &'a Palette,
}

impl ColorMap for PaletteMap<'_> {
    type Color = Rgb<u8>;

    fn index_of(&self, color: &Self::Color) -> usize {
        self.palette.nearest_index(color.0)
    }

    fn map_color(&self, color: &mut Self::Color) {
        color.0 = self.palette.nearest(color.0);
    }
}

/// Reduce `source` to a `width × height` grid of palette colours.
pub fn pixelate(
    source: &DynamicImage,
    width: u32,
    height: u32,
    algorithm: Algorithm,
    palette: &Palette,
) -> Result<RgbaImage> {
    if !(1..=MAX_GRID_DIM).contains(&width) || !(1..=MAX_GRID_DIM).contains(&height) {
        return Err(Error::PixelizationFailed(format!(
            "target size {width}×{height} is outside 1..={MAX_GRID_DIM}"
        )));
    }
    if palette.is_empty() {
        return Err(Error::PixelizationFailed("palette is empty".to_string()));
    }
    if source.width() == 0 || source.height() == 0 {
        return Err(Error::PixelizationFailed("source image is empty".to_string()));
    }
    if palette.len() > MAX_PALETTE_COLORS {
        log::warn!(
            "Palette has {} colours; only the first {} are used",
            palette.len(),
            MAX_PALETTE_COLORS
        );
    }

    let mut rgb = source.to_rgb8();
    match algorithm {
        Algorithm::Nearest => map_to_palette(&mut rgb, palette),
        Algorithm::Dithered => {
            imageops::dither(&mut rgb, &PaletteMap { palette });
            // dither leaves diffused error on pixels it never revisits
            map_to_palette(&mut rgb, palette);
        }
    }

    let small = imageops::resize(&rgb, width, height, FilterType::Nearest);
    Ok(DynamicImage::ImageRgb8(small).into_rgba8())
}

/// Nearest-colour mapping, one row per rayon task.
fn map_to_palette(image: &mut RgbImage, palette: &Palette) {
    let row_len = image.width() as usize * 3;
    image.par_chunks_mut(row_len).for_each(|row| {
        for px in row.chunks_exact_mut(3) {
            let c = palette.nearest([px[0], px[1], px[2]]);
            px.copy_from_slice(&c);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn gradient(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x * 255 / w.max(1)) as u8, (y * 255 / h.max(1)) as u8, 128])
        }))
    }

    #[test]
    fn single_colour_palette_fills_grid() {
        let palette = Palette::new(vec![[12, 34, 56]]);
        for algorithm in Algorithm::all() {
            let out = pixelate(&gradient(50, 40), 7, 5, *algorithm, &palette).unwrap();
            assert_eq!(out.dimensions(), (7, 5));
            assert!(out.pixels().all(|p| p.0 == [12, 34, 56, 255]));
        }
    }

    #[test]
    fn dithered_output_only_uses_palette_colours() {
        let palette = Palette::new(crate::palette::PRESET_16.to_vec());
        let allowed: HashSet<[u8; 3]> = palette.colors().iter().copied().collect();
        let out = pixelate(&gradient(97, 61), 20, 13, Algorithm::Dithered, &palette).unwrap();
        assert_eq!(out.dimensions(), (20, 13));
        for p in out.pixels() {
            assert!(allowed.contains(&[p[0], p[1], p[2]]));
            assert_eq!(p[3], 255);
        }
    }

    #[test]
    fn upscaling_keeps_hard_edges() {
        let src = DynamicImage::ImageRgb8(RgbImage::from_fn(2, 1, |x, _| {
            if x == 0 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) }
        }));
        let palette = Palette::new(vec![[0, 0, 0], [255, 255, 255]]);
        let out = pixelate(&src, 8, 2, Algorithm::Nearest, &palette).unwrap();
        assert!(out.pixels().all(|p| p[0] == 0 || p[0] == 255));
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(7, 1)[0], 255);
    }

    #[test]
    fn invalid_requests_fail() {
        let palette = Palette::new(vec![[0, 0, 0]]);
        let src = gradient(4, 4);
        assert!(matches!(
            pixelate(&src, 0, 4, Algorithm::Nearest, &palette),
            Err(Error::PixelizationFailed(_))
        ));
        assert!(matches!(
            pixelate(&src, 4, MAX_GRID_DIM + 1, Algorithm::Nearest, &palette),
            Err(Error::PixelizationFailed(_))
        ));
        assert!(matches!(
            pixelate(&src, 4, 4, Algorithm::Nearest, &Palette::new(vec![])),
            Err(Error::PixelizationFailed(_))
        ));
        let empty = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        assert!(matches!(
            pixelate(&empty, 4, 4, Algorithm::Dithered, &palette),
            Err(Error::PixelizationFailed(_))
        ));
    }

    #[test]
    fn algorithm_names() {
        assert_eq!(serde_json::to_string(&Algorithm::Dithered).unwrap(), "\"dithered\"");
        for a in Algorithm::all() {
            assert_eq!(Algorithm::from_name(a.name()), Some(*a));
        }
    }
}
