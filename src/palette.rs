//! Colour palettes: the fixed wplace/16-colour presets, HSV-generated sweeps,
//! free-text custom palettes and adaptive palettes extracted from an image.

use image::RgbImage;

use crate::error::{Error, Result};

/// An opaque RGB colour as stored in palettes and project files.
pub type Rgb8 = [u8; 3];

/// Quantizer limit. Extra entries are ignored, not rejected.
pub const MAX_PALETTE_COLORS: usize = 256;

pub const WPLACE_PALETTE: [Rgb8; 31] = [
    [0x00, 0x00, 0x00],
    [0x3c, 0x3c, 0x3c],
    [0x78, 0x78, 0x78],
    [0xd2, 0xd2, 0xd2],
    [0xff, 0xff, 0xff],
    [0x60, 0x00, 0x18],
    [0xed, 0x1c, 0x24],
    [0xff, 0x7f, 0x27],
    [0xf6, 0xaa, 0x09],
    [0xf9, 0xdd, 0x3b],
    [0xff, 0xfa, 0xbc],
    [0x0e, 0xb9, 0x68],
    [0x13, 0xe6, 0x7b],
    [0x87, 0xff, 0x5e],
    [0x0c, 0x81, 0x6e],
    [0x10, 0xae, 0xa6],
    [0x13, 0xe1, 0xbe],
    [0x28, 0x50, 0x9e],
    [0x40, 0x93, 0xe4],
    [0x60, 0xf7, 0xf2],
    [0x6b, 0x50, 0xf6],
    [0x99, 0xb1, 0xfb],
    [0x78, 0x0c, 0x99],
    [0xaa, 0x38, 0xb9],
    [0xe0, 0x9f, 0xf9],
    [0xcb, 0x00, 0x7a],
    [0xec, 0x1f, 0x80],
    [0xf3, 0x8d, 0xa9],
    [0x68, 0x46, 0x34],
    [0x95, 0x68, 0x2a],
    [0xf8, 0xb2, 0x77],
];

pub const PRESET_16: [Rgb8; 16] = [
    [0, 0, 0],
    [255, 255, 255],
    [190, 38, 51],
    [224, 111, 139],
    [73, 60, 43],
    [164, 100, 34],
    [235, 137, 49],
    [247, 226, 107],
    [47, 72, 78],
    [68, 137, 26],
    [163, 206, 39],
    [27, 38, 50],
    [0, 87, 132],
    [49, 162, 242],
    [178, 220, 239],
    [58, 175, 169],
];

/// Ordered list of colours. Duplicates are allowed; order only matters for
/// tie-breaking (lowest index wins).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgb8>,
}

impl Palette {
    pub fn new(colors: Vec<Rgb8>) -> Self {
        Self { colors }
    }

    pub fn colors(&self) -> &[Rgb8] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// The entries the quantizer actually uses.
    pub fn usable(&self) -> &[Rgb8] {
        &self.colors[..self.colors.len().min(MAX_PALETTE_COLORS)]
    }

    /// Index of the closest colour by squared RGB distance.
    /// Returns 0 for an empty palette.
    pub fn nearest_index(&self, color: Rgb8) -> usize {
        let mut best = 0;
        let mut best_dist = u32::MAX;
        for (i, c) in self.usable().iter().enumerate() {
            let dr = color[0] as i32 - c[0] as i32;
            let dg = color[1] as i32 - c[1] as i32;
            let db = color[2] as i32 - c[2] as i32;
            let dist = (dr * dr + dg * dg + db * db) as u32;
            // strict `<` keeps the lowest index on ties
            if dist < best_dist {
                best_dist = dist;
                best = i;
                if dist == 0 {
                    break;
                }
            }
        }
        best
    }

    pub fn nearest(&self, color: Rgb8) -> Rgb8 {
        self.usable()
            .get(self.nearest_index(color))
            .copied()
            .unwrap_or([0, 0, 0])
    }

    /// Parse free-text `#RRGGBB` tokens separated by commas and/or spaces.
    /// Malformed tokens are dropped; an input with no valid token is an error.
    pub fn parse_custom(text: &str) -> Result<Self> {
        let colors: Vec<Rgb8> = text
            .replace(',', " ")
            .split_whitespace()
            .filter_map(parse_hex_token)
            .collect();
        if colors.is_empty() {
            return Err(Error::InvalidPaletteInput);
        }
        Ok(Self::new(colors))
    }

    /// `#RRGGBB` tokens joined by spaces; parses back with [`Palette::parse_custom`].
    pub fn to_hex_list(&self) -> String {
        self.colors
            .iter()
            .map(|c| hex_string(*c))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn parse_hex_token(token: &str) -> Option<Rgb8> {
    let s = token.trim().trim_start_matches('#');
    if s.len() != 6 || !s.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&s[0..2], 16).ok()?;
    let g = u8::from_str_radix(&s[2..4], 16).ok()?;
    let b = u8::from_str_radix(&s[4..6], 16).ok()?;
    Some([r, g, b])
}

/// `#RRGGBB`, upper case.
pub fn hex_string(c: Rgb8) -> String {
    format!("#{:02X}{:02X}{:02X}", c[0], c[1], c[2])
}

/// Evenly spaced hues. Up to 16 colours use a single brightness row,
/// larger palettes use two rows of distinct brightness.
pub fn even_hsv(n: usize) -> Vec<Rgb8> {
    if n == 0 {
        return vec![[0, 0, 0]];
    }
    let n = n.min(MAX_PALETTE_COLORS);
    let rows = if n > 16 { 2 } else { 1 };
    let per_row = n.div_ceil(rows);
    let mut out = Vec::with_capacity(n);
    for row in 0..rows {
        let v = 0.8 - row as f64 * 0.25;
        for i in 0..per_row {
            let h = i as f64 / per_row as f64;
            out.push(hsv_to_rgb(h, 0.75, v));
            if out.len() >= n {
                return out;
            }
        }
    }
    out
}

fn hsv_to_rgb(h: f64, s: f64, v: f64) -> Rgb8 {
    let sector = (h * 6.0).floor();
    let f = h * 6.0 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match (sector as i64).rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    [(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8]
}

/// Representative colours of `image`, via NeuQuant.
pub fn extract_adaptive(image: &RgbImage, n: usize) -> Vec<Rgb8> {
    let n = n.clamp(1, MAX_PALETTE_COLORS);
    let rgba: Vec<u8> = image
        .pixels()
        .flat_map(|p| [p[0], p[1], p[2], 255])
        .collect();
    if rgba.is_empty() {
        return vec![[0, 0, 0]];
    }
    let nq = color_quant::NeuQuant::new(10, n, &rgba);
    nq.color_map_rgb()
        .chunks_exact(3)
        .map(|c| [c[0], c[1], c[2]])
        .collect()
}

/// The two hand-picked presets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FixedPalette {
    Wplace,
    Preset16,
}

/// Where the active palette comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaletteSource {
    Fixed(FixedPalette),
    /// HSV sweep with `n` colours.
    Generated(usize),
    /// `n` colours extracted from the source image.
    Adaptive(usize),
    Custom(Palette),
}

impl Default for PaletteSource {
    fn default() -> Self {
        PaletteSource::Fixed(FixedPalette::Wplace)
    }
}

pub const CUSTOM_PALETTE_NAME: &str = "custom";

impl PaletteSource {
    /// Everything the palette picker offers, except `Custom`, whose colours
    /// come from the user.
    pub fn presets() -> [PaletteSource; 6] {
        [
            PaletteSource::Fixed(FixedPalette::Wplace),
            PaletteSource::Fixed(FixedPalette::Preset16),
            PaletteSource::Generated(32),
            PaletteSource::Generated(64),
            PaletteSource::Adaptive(16),
            PaletteSource::Adaptive(32),
        ]
    }

    /// Stable name used in project and settings files.
    pub fn name(&self) -> String {
        match self {
            PaletteSource::Fixed(FixedPalette::Wplace) => "wplace".to_string(),
            PaletteSource::Fixed(FixedPalette::Preset16) => "preset16".to_string(),
            PaletteSource::Generated(n) => format!("preset{n}"),
            PaletteSource::Adaptive(n) => format!("adaptive{n}"),
            PaletteSource::Custom(_) => CUSTOM_PALETTE_NAME.to_string(),
        }
    }

    /// Inverse of [`PaletteSource::name`] for everything but `custom`.
    pub fn from_preset_name(name: &str) -> Option<Self> {
        match name {
            "wplace" => Some(PaletteSource::Fixed(FixedPalette::Wplace)),
            "preset16" => Some(PaletteSource::Fixed(FixedPalette::Preset16)),
            _ => {
                if let Some(n) = name.strip_prefix("preset") {
                    n.parse()
                        .ok()
                        .filter(|&n| n > 0 && n <= MAX_PALETTE_COLORS)
                        .map(PaletteSource::Generated)
                } else if let Some(n) = name.strip_prefix("adaptive") {
                    n.parse()
                        .ok()
                        .filter(|&n| n > 0 && n <= MAX_PALETTE_COLORS)
                        .map(PaletteSource::Adaptive)
                } else {
                    None
                }
            }
        }
    }

    pub fn label(&self) -> String {
        match self {
            PaletteSource::Fixed(FixedPalette::Wplace) => t!("palette.wplace"),
            PaletteSource::Fixed(FixedPalette::Preset16) => t!("palette.preset", n = 16),
            PaletteSource::Generated(n) => t!("palette.preset", n = n),
            PaletteSource::Adaptive(n) => t!("palette.adaptive", n = n),
            PaletteSource::Custom(p) => t!("palette.custom_n", n = p.len()),
        }
    }

    /// Resolve to concrete colours. Adaptive palettes need the source image;
    /// without one they fall back to the wplace preset.
    pub fn resolve(&self, source: Option<&RgbImage>) -> Palette {
        match self {
            PaletteSource::Fixed(FixedPalette::Wplace) => Palette::new(WPLACE_PALETTE.to_vec()),
            PaletteSource::Fixed(FixedPalette::Preset16) => Palette::new(PRESET_16.to_vec()),
            PaletteSource::Generated(n) => Palette::new(even_hsv(*n)),
            PaletteSource::Adaptive(n) => match source {
                Some(img) => Palette::new(extract_adaptive(img, *n)),
                None => Palette::new(WPLACE_PALETTE.to_vec()),
            },
            PaletteSource::Custom(p) => p.clone(),
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, PaletteSource::Custom(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_separators_and_case() {
        let p = Palette::parse_custom("#FF0000, 00ff00 #0000FF").unwrap();
        assert_eq!(p.colors(), &[[255, 0, 0], [0, 255, 0], [0, 0, 255]]);
    }

    #[test]
    fn garbage_input_is_rejected() {
        assert!(matches!(
            Palette::parse_custom("garbage"),
            Err(Error::InvalidPaletteInput)
        ));
        assert!(matches!(
            Palette::parse_custom("   ,, "),
            Err(Error::InvalidPaletteInput)
        ));
    }

    #[test]
    fn malformed_tokens_are_dropped() {
        let p = Palette::parse_custom("#12345 #zzzzzz #123456 abcdef0 #ÿÿÿ").unwrap();
        assert_eq!(p.colors(), &[[0x12, 0x34, 0x56]]);
    }

    #[test]
    fn hex_list_parses_back() {
        let p = Palette::new(vec![[1, 2, 3], [250, 128, 0]]);
        assert_eq!(p.to_hex_list(), "#010203 #FA8000");
        assert_eq!(Palette::parse_custom(&p.to_hex_list()).unwrap(), p);
    }

    #[test]
    fn nearest_prefers_lowest_index_on_ties() {
        let p = Palette::new(vec![[10, 10, 10], [30, 30, 30], [10, 10, 10]]);
        assert_eq!(p.nearest_index([20, 20, 20]), 0);
        assert_eq!(p.nearest_index([29, 29, 29]), 1);
    }

    #[test]
    fn colours_past_256_are_ignored() {
        let mut colors = vec![[0, 0, 0]; MAX_PALETTE_COLORS];
        colors.push([255, 255, 255]);
        let p = Palette::new(colors);
        assert_eq!(p.usable().len(), MAX_PALETTE_COLORS);
        assert_eq!(p.nearest([255, 255, 255]), [0, 0, 0]);
    }

    #[test]
    fn hsv_sweep_sizes_and_rows() {
        assert_eq!(even_hsv(0), vec![[0, 0, 0]]);
        assert_eq!(even_hsv(16).len(), 16);
        assert_eq!(even_hsv(32).len(), 32);
        assert_eq!(even_hsv(64).len(), 64);

        // hue 0 at V=0.8, S=0.75
        assert_eq!(even_hsv(32)[0], [204, 51, 51]);
        // second row starts darker
        let sweep = even_hsv(32);
        assert_eq!(sweep[16], [140, 35, 35]);
    }

    #[test]
    fn preset_sizes() {
        assert_eq!(WPLACE_PALETTE.len(), 31);
        assert_eq!(PRESET_16.len(), 16);
    }

    #[test]
    fn source_names_round_trip() {
        for source in PaletteSource::presets() {
            assert_eq!(PaletteSource::from_preset_name(&source.name()), Some(source));
        }
        assert_eq!(PaletteSource::from_preset_name("custom"), None);
        assert_eq!(PaletteSource::from_preset_name("preset0"), None);
        assert_eq!(PaletteSource::from_preset_name("preset256"), Some(PaletteSource::Generated(256)));
        assert_eq!(PaletteSource::from_preset_name("preset257"), None);
        assert_eq!(PaletteSource::from_preset_name("preset18446744073709551615"), None);
        assert_eq!(PaletteSource::from_preset_name("rainbow"), None);
    }

    #[test]
    fn adaptive_palette_has_requested_size() {
        let img = RgbImage::from_fn(8, 8, |x, y| image::Rgb([(x * 30) as u8, (y * 30) as u8, 90]));
        assert_eq!(extract_adaptive(&img, 16).len(), 16);
    }
}
