// ============================================================================
// WplaceHelper CLI: headless pixelization via command-line arguments
// ============================================================================
//
// Usage examples:
//   WplaceHelper --input photo.png --width 96 --output grid.png
//   WplaceHelper -i shots/*.jpg --palette preset32 --algorithm dithered --output-dir out/
//   WplaceHelper -i logo.png --colors "#000000 #FFFFFF #E46E2E" -o logo_grid.png
//   WplaceHelper --project mural.wpp --output mural.png --with-marks
//
// No window is opened in CLI mode. Each input runs through the same
// `ApplicationState` commands the GUI uses.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use wplacehelper::palette::PaletteSource;
use wplacehelper::pixelate::Algorithm;
use wplacehelper::project::load_project;
use wplacehelper::state::ApplicationState;
use wplacehelper::{Error, Result};

/// WplaceHelper headless pixelizer.
#[derive(Parser, Debug)]
#[command(
    name = "WplaceHelper",
    about = "Pixelize images to a wplace-style palette without opening the GUI",
    long_about = "Downsample images to a small pixel grid limited to a palette, or\n\
                  re-render a saved .wpp project, and write the result as an image\n\
                  with one pixel per grid cell.\n\n\
                  Example:\n  \
                  WplaceHelper --input photo.png --width 96 --output grid.png\n  \
                  WplaceHelper --project mural.wpp --output mural.png --with-marks"
)]
pub struct CliArgs {
    /// Input image(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, num_args = 1.., required_unless_present = "project", conflicts_with = "project")]
    pub input: Vec<String>,

    /// Re-render a saved project (.wpp) instead of pixelizing inputs.
    #[arg(short, long, value_name = "FILE.wpp")]
    pub project: Option<PathBuf>,

    /// Output grid width in cells.
    #[arg(short = 'W', long, default_value_t = 64, value_parser = clap::value_parser!(u32).range(1..=4096))]
    pub width: u32,

    /// Output grid height in cells. Derived from the image aspect ratio when omitted.
    #[arg(short = 'H', long, value_parser = clap::value_parser!(u32).range(1..=4096))]
    pub height: Option<u32>,

    /// Colour mapping: nearest or dithered.
    #[arg(short, long, default_value = "nearest", value_name = "ALGORITHM")]
    pub algorithm: String,

    /// Palette preset: wplace, preset16, preset32, preset64, adaptive16, adaptive32.
    #[arg(long, default_value = "wplace", value_name = "NAME")]
    pub palette: String,

    /// Custom palette as "#RRGGBB" tokens separated by spaces or commas.
    /// Overrides --palette.
    #[arg(short, long, value_name = "COLORS")]
    pub colors: Option<String>,

    /// Output file path. Only valid for a single input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing (files keep their stem, saved as PNG).
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Bake the marks of a project into the exported image.
    #[arg(long, requires = "project")]
    pub with_marks: bool,

    /// Log progress to stderr and print per-file timing.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when any CLI-mode flag is present in the real process arguments.
    /// Used by `main()` to route before creating an eframe window.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--input" || a == "-i" || a == "--project" || a == "-p")
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    if let Some(project) = &args.project {
        return run_project(project, &args);
    }

    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let algorithm = match Algorithm::from_name(&args.algorithm) {
        Some(a) => a,
        None => {
            eprintln!("error: unknown algorithm '{}' (expected nearest or dithered).", args.algorithm);
            return ExitCode::FAILURE;
        }
    };
    let palette = match parse_palette(&args.palette, args.colors.as_deref()) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
        return ExitCode::FAILURE;
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }
        let file_start = Instant::now();

        let Some(output_path) = build_output_path(input_path, args.output.as_deref(), args.output_dir.as_deref())
        else {
            eprintln!("  error: cannot determine output path for '{}'.", input_path.display());
            any_failure = true;
            continue;
        };

        let mut state = ApplicationState::default();
        state.algorithm = algorithm;
        state.palette = palette.clone();
        match pixelize_one(&mut state, input_path, &output_path, args.width, args.height) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                log::error!("{}: {e}", input_path.display());
                eprintln!("  error: {e}");
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file processing
// ============================================================================

fn pixelize_one(
    state: &mut ApplicationState,
    input: &Path,
    output: &Path,
    width: u32,
    height: Option<u32>,
) -> Result<()> {
    state.open_image(input)?;
    match height {
        Some(h) => {
            state.set_lock_aspect(false);
            state.set_target_width(width);
            state.target_height = h;
        }
        None => {
            state.set_lock_aspect(true);
            state.set_target_width(width);
        }
    }
    state.apply_pixelization()?;
    state.export_image(output, false)
}

fn run_project(project_path: &Path, args: &CliArgs) -> ExitCode {
    let Some(output) = &args.output else {
        eprintln!("error: --project requires --output <FILE>.");
        return ExitCode::FAILURE;
    };
    let start = Instant::now();
    match render_project(project_path, output, args.with_marks) {
        Ok(marks) => {
            if args.verbose {
                println!(
                    "{} → {} ({marks} marks, {:.0}ms)",
                    project_path.display(),
                    output.display(),
                    start.elapsed().as_secs_f64() * 1000.0
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}: {e}", project_path.display());
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Regenerate a project's grid and export it. Returns the number of marks kept.
fn render_project(project_path: &Path, output: &Path, with_marks: bool) -> Result<usize> {
    let project = load_project(project_path)?;
    let source = project.source_image_path.clone();
    let mut state = ApplicationState::default();
    let report = state.apply_project(&project, &source)?;
    state.export_image(output, with_marks)?;
    Ok(report.restored_marks)
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_palette(name: &str, colors: Option<&str>) -> Result<PaletteSource> {
    if let Some(text) = colors {
        let mut state = ApplicationState::default();
        state.set_custom_palette(text)?;
        return Ok(state.palette);
    }
    PaletteSource::from_preset_name(name)
        .ok_or_else(|| Error::Parse(format!("unknown palette '{name}'")))
}

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output`
/// 2. `--output-dir` joined with `<stem>.png`
/// 3. `<stem>_pixel.png` next to the input
fn build_output_path(input: &Path, output: Option<&Path>, output_dir: Option<&Path>) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }
    let stem = input.file_stem()?.to_string_lossy().into_owned();
    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{stem}.png")));
    }
    let parent = input.parent().unwrap_or(Path::new("."));
    Some(parent.join(format!("{stem}_pixel.png")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_priority() {
        let input = Path::new("shots/cat.jpg");
        assert_eq!(
            build_output_path(input, Some(Path::new("x.png")), Some(Path::new("out"))),
            Some(PathBuf::from("x.png"))
        );
        assert_eq!(
            build_output_path(input, None, Some(Path::new("out"))),
            Some(PathBuf::from("out/cat.png"))
        );
        assert_eq!(
            build_output_path(input, None, None),
            Some(PathBuf::from("shots/cat_pixel.png"))
        );
    }

    #[test]
    fn custom_colors_override_palette_name() {
        let p = parse_palette("wplace", Some("#000000, #FFFFFF")).unwrap();
        assert!(p.is_custom());
        assert!(matches!(parse_palette("rainbow", None), Err(Error::Parse(_))));
        assert!(matches!(
            parse_palette("wplace", Some("nothing here")),
            Err(Error::InvalidPaletteInput)
        ));
    }

    #[test]
    fn args_parse() {
        let args = CliArgs::try_parse_from([
            "WplaceHelper", "-i", "a.png", "b.png", "--width", "32", "--algorithm", "dithered",
        ])
        .unwrap();
        assert_eq!(args.input, vec!["a.png", "b.png"]);
        assert_eq!(args.width, 32);
        assert!(args.height.is_none());

        assert!(CliArgs::try_parse_from(["WplaceHelper", "--width", "32"]).is_err());
        assert!(CliArgs::try_parse_from(["WplaceHelper", "-i", "a.png", "--with-marks"]).is_err());
        assert!(CliArgs::try_parse_from(["WplaceHelper", "-i", "a.png", "--width", "0"]).is_err());
    }

    #[test]
    fn pixelizes_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        image::RgbImage::from_pixel(40, 20, image::Rgb([250, 250, 250]))
            .save(&input)
            .unwrap();
        let output = dir.path().join("out.png");
        let mut state = ApplicationState::default();
        pixelize_one(&mut state, &input, &output, 10, None).unwrap();
        let img = image::open(&output).unwrap();
        assert_eq!((img.width(), img.height()), (10, 5));
    }
}
