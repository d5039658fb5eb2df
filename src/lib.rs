//! Core of WplaceHelper: turn an image into a small palette-limited pixel
//! grid, track which cells have been painted, and save/export the result.
//!
//! The GUI shell and the headless CLI in `main.rs` are thin layers over
//! [`state::ApplicationState`].

#[macro_use]
pub mod i18n;
pub mod error;
pub mod grid;
pub mod io;
pub mod logger;
pub mod palette;
pub mod pixelate;
pub mod project;
pub mod settings;
pub mod state;
pub mod view;

pub use error::{Error, Result};
