use std::path::PathBuf;

use crate::grid::MAX_GRID_DIM;
use crate::palette::{Palette, PaletteSource};
use crate::pixelate::Algorithm;

/// Application settings that persist across sessions
#[derive(Clone, Debug, PartialEq)]
pub struct AppSettings {
    /// Target grid width
    pub width: u32,
    /// Target grid height (only used when the aspect lock is off)
    pub height: u32,
    pub lock_aspect: bool,
    pub algorithm: Algorithm,
    pub palette: PaletteSource,
    /// Draw grid lines when zoomed in
    pub show_grid: bool,
    /// Language code (e.g. "en", "zh-CN"). Empty string = auto-detect system language.
    pub language: String,
    pub last_image_dir: Option<PathBuf>,
    pub last_project_dir: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            lock_aspect: true,
            algorithm: Algorithm::Nearest,
            palette: PaletteSource::default(),
            show_grid: false,
            language: String::new(),
            last_image_dir: None,
            last_project_dir: None,
        }
    }
}

impl AppSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/wplacehelper/wplacehelper_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\WplaceHelper\wplacehelper_settings.cfg
    /// On macOS:   ~/Library/Application Support/WplaceHelper/wplacehelper_settings.cfg
    /// Fallback:   same directory as the executable.
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("wplacehelper");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("wplacehelper_settings.cfg"));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            let config_dir = PathBuf::from(appdata).join("WplaceHelper");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("wplacehelper_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            let config_dir = PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("WplaceHelper");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("wplacehelper_settings.cfg"));
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join("wplacehelper_settings.cfg")))
        }
    }

    /// Render as `key=value` lines.
    pub fn to_config_string(&self) -> String {
        let custom = match &self.palette {
            PaletteSource::Custom(p) => p.to_hex_list(),
            _ => String::new(),
        };
        let dir = |d: &Option<PathBuf>| d.as_ref().map(|p| p.display().to_string()).unwrap_or_default();
        format!(
            "width={}\n\
             height={}\n\
             lock_aspect={}\n\
             algorithm={}\n\
             palette={}\n\
             custom_palette={custom}\n\
             show_grid={}\n\
             language={}\n\
             last_image_dir={}\n\
             last_project_dir={}\n",
            self.width,
            self.height,
            self.lock_aspect,
            self.algorithm.name(),
            self.palette.name(),
            self.show_grid,
            self.language,
            dir(&self.last_image_dir),
            dir(&self.last_project_dir),
        )
    }

    /// Parse `key=value` lines. Unknown keys and bad values are ignored.
    pub fn from_config_str(content: &str) -> Self {
        let mut s = Self::default();
        let mut palette_name = None;
        let mut custom = None;
        for line in content.lines() {
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "width" => {
                    s.width = val.parse().unwrap_or(64u32).clamp(1, MAX_GRID_DIM);
                }
                "height" => {
                    s.height = val.parse().unwrap_or(64u32).clamp(1, MAX_GRID_DIM);
                }
                "lock_aspect" => {
                    s.lock_aspect = val == "true";
                }
                "algorithm" => {
                    s.algorithm = Algorithm::from_name(val).unwrap_or_default();
                }
                "palette" => {
                    palette_name = Some(val.to_string());
                }
                "custom_palette" => {
                    custom = Palette::parse_custom(val).ok();
                }
                "show_grid" => {
                    s.show_grid = val == "true";
                }
                "language" => {
                    s.language = val.to_string();
                }
                "last_image_dir" if !val.is_empty() => {
                    s.last_image_dir = Some(PathBuf::from(val));
                }
                "last_project_dir" if !val.is_empty() => {
                    s.last_project_dir = Some(PathBuf::from(val));
                }
                _ => {}
            }
        }

        s.palette = match (palette_name.as_deref(), custom) {
            (Some(crate::palette::CUSTOM_PALETTE_NAME), Some(p)) => PaletteSource::Custom(p),
            (Some(name), _) => PaletteSource::from_preset_name(name).unwrap_or_default(),
            (None, _) => PaletteSource::default(),
        };
        s
    }

    /// Save settings to disk
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        if let Err(e) = std::fs::write(&path, self.to_config_string()) {
            log::warn!("Could not write settings to {}: {e}", path.display());
        }
    }

    /// Load settings from disk (returns default if file missing or corrupt)
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        let Ok(content) = std::fs::read_to_string(&path) else { return Self::default() };
        Self::from_config_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_config_text() {
        let s = AppSettings {
            width: 120,
            height: 33,
            lock_aspect: false,
            algorithm: Algorithm::Dithered,
            palette: PaletteSource::Custom(Palette::new(vec![[1, 2, 3], [255, 0, 128]])),
            show_grid: true,
            language: "zh-CN".to_string(),
            last_image_dir: Some(PathBuf::from("/home/me/pics")),
            last_project_dir: None,
        };
        assert_eq!(AppSettings::from_config_str(&s.to_config_string()), s);
    }

    #[test]
    fn junk_falls_back_to_defaults() {
        let s = AppSettings::from_config_str(
            "width=abc\nalgorithm=sparkly\npalette=rainbow\nno equals sign\nshow_grid=yes\n",
        );
        assert_eq!(s, AppSettings::default());
    }

    #[test]
    fn custom_without_colours_falls_back() {
        let s = AppSettings::from_config_str("palette=custom\ncustom_palette=\n");
        assert_eq!(s.palette, PaletteSource::default());
    }

    #[test]
    fn oversized_preset_falls_back() {
        let s = AppSettings::from_config_str("palette=preset18446744073709551615
");
        assert_eq!(s.palette, PaletteSource::default());
    }

    #[test]
    fn dimensions_are_clamped() {
        let s = AppSettings::from_config_str("width=0\nheight=999999\n");
        assert_eq!((s.width, s.height), (1, MAX_GRID_DIM));
    }
}
