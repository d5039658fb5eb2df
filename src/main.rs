// GUI-subsystem binary: no console window is ever allocated by Windows.
// • GUI mode: nothing extra needed.
// • CLI mode (--input/-i or --project flag present): AttachConsole(ATTACH_PARENT_PROCESS)
//   attaches to the launching terminal, then we reopen CONOUT$ so Rust's
//   println!/eprintln! route through the correct handles.
#![windows_subsystem = "windows"]

mod app;
mod canvas;
mod cli;
mod components;

use app::WplaceHelperApp;
use eframe::egui;
use wplacehelper::palette::WPLACE_PALETTE;
use wplacehelper::settings::AppSettings;
use wplacehelper::{i18n, logger};

fn main() -> Result<(), eframe::Error> {
    // -- Windows console management ------------------------------------
    #[cfg(target_os = "windows")]
    if cli::CliArgs::is_cli_mode() {
        unsafe extern "system" {
            fn AttachConsole(dwProcessId: u32) -> i32;
            fn SetStdHandle(nStdHandle: u32, hHandle: isize) -> i32;
            fn CreateFileW(
                lpFileName: *const u16,
                dwDesiredAccess: u32,
                dwShareMode: u32,
                lpSecurityAttributes: *const std::ffi::c_void,
                dwCreationDisposition: u32,
                dwFlagsAndAttributes: u32,
                hTemplateFile: isize,
            ) -> isize;
        }
        const ATTACH_PARENT_PROCESS: u32 = 0xFFFF_FFFF;
        const GENERIC_WRITE: u32 = 0x4000_0000;
        const FILE_SHARE_READ_WRITE: u32 = 0x0000_0003;
        const OPEN_EXISTING: u32 = 3;
        const STD_OUTPUT_HANDLE: u32 = 0xFFFF_FFF5_u32; // -11
        const STD_ERROR_HANDLE: u32 = 0xFFFF_FFF4_u32; // -12
        const INVALID_HANDLE_VALUE: isize = -1;
        unsafe {
            AttachConsole(ATTACH_PARENT_PROCESS);
            let conout: Vec<u16> = "CONOUT$\0".encode_utf16().collect();
            let hout = CreateFileW(
                conout.as_ptr(),
                GENERIC_WRITE,
                FILE_SHARE_READ_WRITE,
                std::ptr::null(),
                OPEN_EXISTING,
                0,
                0,
            );
            if hout != INVALID_HANDLE_VALUE {
                SetStdHandle(STD_OUTPUT_HANDLE, hout);
                SetStdHandle(STD_ERROR_HANDLE, hout);
            }
        }
    }

    // -- CLI / headless mode ---------------------------------------------
    if cli::CliArgs::is_cli_mode() {
        use clap::Parser;
        let args = cli::CliArgs::parse();
        logger::init_cli(args.verbose);
        let code = cli::run(args);
        std::process::exit(if code == std::process::ExitCode::SUCCESS {
            0
        } else {
            1
        });
    }

    // -- GUI mode -----------------------------------------------------

    // Initialize session log (overwrites previous session log)
    logger::init();

    let settings = AppSettings::load();
    i18n::apply_language_setting(&settings.language);
    log::info!("UI language: {}", i18n::current_language());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 760.0])
            .with_min_inner_size([640.0, 420.0])
            .with_title("WplaceHelper")
            .with_icon(std::sync::Arc::new(app_icon())),
        ..Default::default()
    };

    eframe::run_native(
        "WplaceHelper",
        options,
        Box::new(move |cc| Box::new(WplaceHelperApp::new(cc, settings))),
    )
}

/// 4×4 blocks of wplace colours, drawn at startup instead of shipping a PNG.
fn app_icon() -> egui::viewport::IconData {
    const SIZE: u32 = 32;
    const BLOCK: u32 = 8;
    let mut rgba = Vec::with_capacity((SIZE * SIZE * 4) as usize);
    for y in 0..SIZE {
        for x in 0..SIZE {
            let i = ((y / BLOCK) * (SIZE / BLOCK) + x / BLOCK) as usize;
            let [r, g, b] = WPLACE_PALETTE[(i * 7 + 3) % WPLACE_PALETTE.len()];
            rgba.extend_from_slice(&[r, g, b, 255]);
        }
    }
    egui::viewport::IconData {
        rgba,
        width: SIZE,
        height: SIZE,
    }
}
