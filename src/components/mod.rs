pub mod dialogs;
pub mod status_bar;

pub use dialogs::{
    CustomPaletteDialog, DialogResult, ExportDialog, MessageDialog, MissingSourceDialog,
};
pub use status_bar::{StatusBar, StatusInfo};
