//! Session logger: a `log` backend that writes to a single file in the OS
//! data directory.
//!
//! The file is **truncated (overwritten) at each launch**, so it only ever
//! contains output from the most-recent session.
//!
//! Log location:
//!   Windows:  `%APPDATA%\WplaceHelper\wplacehelper.log`
//!   Linux:    `~/.local/share/WplaceHelper/wplacehelper.log`
//!   macOS:    `~/Library/Application Support/WplaceHelper/wplacehelper.log`
//!
//! Use the regular `log::info!` / `log::warn!` / `log::error!` macros
//! anywhere in the crate.

use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

struct SessionLogger {
    file: Option<Mutex<File>>,
    /// Mirror records to stderr (CLI `--verbose`).
    echo_stderr: bool,
    level: LevelFilter,
}

impl Log for SessionLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("[{}] [{}] {}", timestamp(), record.level(), record.args());
        if let Some(mutex) = &self.file
            && let Ok(mut file) = mutex.lock()
        {
            let _ = writeln!(file, "{}", line);
        }
        if self.echo_stderr || (self.file.is_none() && record.level() <= Level::Warn) {
            eprintln!("{}", line);
        }
    }

    fn flush(&self) {
        if let Some(mutex) = &self.file
            && let Ok(mut file) = mutex.lock()
        {
            let _ = file.flush();
        }
    }
}

/// Returns the path to the current session log file.
pub fn log_path() -> Option<&'static PathBuf> {
    LOG_PATH.get()
}

/// Initialise the session logger for the GUI. Call once before any logging.
///
/// * Creates (or truncates) the log file.
/// * Installs a panic hook that writes the panic message to the log before
///   propagating to the default handler.
pub fn init() {
    let path = log_file_path();
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path);

    let file = match file {
        Ok(f) => {
            let _ = LOG_PATH.set(path.clone());
            Some(Mutex::new(f))
        }
        Err(e) => {
            // Without a log file, warnings still reach stderr.
            eprintln!("[logger] Failed to open log file {:?}: {}", path, e);
            None
        }
    };

    install(SessionLogger {
        file,
        echo_stderr: false,
        level: LevelFilter::Info,
    });

    log::info!(
        "=== WplaceHelper session started {} ===",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    log::info!("Log file: {}", path.display());

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        log::error!("PANIC: {}", info);
        log::logger().flush();
        prev(info);
    }));
}

/// Stderr-only logging for headless runs.
pub fn init_cli(verbose: bool) {
    install(SessionLogger {
        file: None,
        echo_stderr: verbose,
        level: if verbose { LevelFilter::Debug } else { LevelFilter::Warn },
    });
}

fn install(logger: SessionLogger) {
    let level = logger.level;
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(level);
    }
}

fn log_file_path() -> PathBuf {
    data_dir().join("WplaceHelper").join("wplacehelper.log")
}

/// Platform data directory (without the app sub-folder).
fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support");
        }
    }
    // Linux / fallback
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    // Last resort: current working directory
    PathBuf::from(".")
}

fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S%.3f").to_string()
}
