//! Save → load of `.wpp` projects through `ApplicationState`.

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use wplacehelper::Error;
use wplacehelper::grid::Cell;
use wplacehelper::palette::{PaletteSource, WPLACE_PALETTE};
use wplacehelper::pixelate::Algorithm;
use wplacehelper::project::{PROJECT_VERSION, read_project, write_project};
use wplacehelper::state::ApplicationState;

fn gradient_source(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_fn(w, h, |x, y| {
        Rgb([
            (x * 255 / w.max(1)) as u8,
            (y * 255 / h.max(1)) as u8,
            ((x + y) * 3 % 256) as u8,
        ])
    })
    .save(&path)
    .unwrap();
    path
}

fn pixelized(source: &Path, w: u32, h: u32) -> ApplicationState {
    let mut state = ApplicationState::default();
    state.open_image(source).unwrap();
    state.set_lock_aspect(false);
    state.target_width = w;
    state.target_height = h;
    state.algorithm = Algorithm::Dithered;
    state.palette = PaletteSource::default();
    state.apply_pixelization().unwrap();
    state
}

#[test]
fn marks_survive_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let src = gradient_source(dir.path(), "src.png", 80, 60);
    let mut state = pixelized(&src, 8, 6);
    state.model.toggle_mark(Cell::new(0, 0));
    state.model.toggle_mark(Cell::new(3, 3));
    let grid_before = state.model.grid().unwrap().clone();

    let project_path = dir.path().join("p.wpp");
    state.save_project(&project_path).unwrap();
    assert!(!state.is_dirty);

    let mut loaded = ApplicationState::default();
    let report = loaded.load_project(&project_path).unwrap();
    assert_eq!(report.restored_marks, 2);
    assert_eq!(report.discarded_marks, 0);
    assert_eq!(loaded.model.dimensions(), (8, 6));
    assert_eq!(loaded.algorithm, Algorithm::Dithered);
    assert!(loaded.model.is_marked(Cell::new(0, 0)));
    assert!(loaded.model.is_marked(Cell::new(3, 3)));
    // pixelization is deterministic
    assert_eq!(loaded.model.grid().unwrap(), &grid_before);
    assert_eq!(loaded.project_path.as_deref(), Some(project_path.as_path()));
}

#[test]
fn saved_document_has_expected_shape() {
    let dir = tempfile::tempdir().unwrap();
    let src = gradient_source(dir.path(), "src.png", 20, 20);
    let mut state = pixelized(&src, 4, 4);
    state.set_custom_palette("#000000, #FFFFFF").unwrap();
    state.apply_pixelization().unwrap();
    state.model.toggle_mark(Cell::new(2, 1));

    let project_path = dir.path().join("custom.wpp");
    state.save_project(&project_path).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&project_path).unwrap()).unwrap();
    assert_eq!(json["version"], PROJECT_VERSION);
    assert_eq!(json["pixelization_settings"]["algorithm"], "dithered");
    assert_eq!(json["pixelization_settings"]["palette_name"], "custom");
    assert_eq!(
        json["pixelization_settings"]["custom_palette"],
        serde_json::json!([[0, 0, 0], [255, 255, 255]])
    );
    assert_eq!(json["marked_pixels"], serde_json::json!([[2, 1]]));
    assert!(Path::new(json["source_image_path"].as_str().unwrap()).is_absolute());
}

#[test]
fn missing_source_reports_and_keeps_state() {
    let dir = tempfile::tempdir().unwrap();
    let src = gradient_source(dir.path(), "gone.png", 16, 16);
    let mut state = pixelized(&src, 4, 4);
    state.model.toggle_mark(Cell::new(1, 1));
    let project_path = dir.path().join("p.wpp");
    state.save_project(&project_path).unwrap();
    std::fs::remove_file(&src).unwrap();

    let other = gradient_source(dir.path(), "other.png", 10, 10);
    let mut current = pixelized(&other, 5, 5);
    current.model.toggle_mark(Cell::new(4, 4));

    match current.load_project(&project_path) {
        Err(Error::SourceImageMissing { path, project }) => {
            assert_eq!(path, project.source_image_path);
            assert_eq!(project.marked_pixels, vec![Cell::new(1, 1)]);

            // nothing changed yet
            assert_eq!(current.model.dimensions(), (5, 5));
            assert!(current.model.is_marked(Cell::new(4, 4)));

            // the user points at a replacement image
            let replacement = gradient_source(dir.path(), "replacement.png", 16, 16);
            let report = current.apply_project(&project, &replacement).unwrap();
            assert_eq!(report.restored_marks, 1);
            assert_eq!(current.model.dimensions(), (4, 4));
            assert!(current.model.is_marked(Cell::new(1, 1)));
            assert!(!current.model.is_marked(Cell::new(4, 4)));
        }
        other => panic!("expected SourceImageMissing, got {other:?}"),
    }
}

#[test]
fn out_of_range_marks_are_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let src = gradient_source(dir.path(), "src.png", 30, 30);
    let state = pixelized(&src, 6, 6);
    let mut project = state.to_project().unwrap();
    project.marked_pixels = vec![Cell::new(5, 5), Cell::new(6, 0), Cell::new(100, 100)];
    let project_path = dir.path().join("edited.wpp");
    write_project(&project, &project_path).unwrap();

    let mut loaded = ApplicationState::default();
    let report = loaded.load_project(&project_path).unwrap();
    assert_eq!(report.restored_marks, 1);
    assert_eq!(report.discarded_marks, 2);
    assert_eq!(loaded.model.sorted_marks(), vec![Cell::new(5, 5)]);
}

#[test]
fn malformed_projects_are_parse_errors() {
    let dir = tempfile::tempdir().unwrap();
    let src = gradient_source(dir.path(), "src.png", 8, 8);
    let src_json = serde_json::to_string(&src).unwrap();

    let cases = [
        "{ not json".to_string(),
        format!(
            r#"{{"version":"1.0","source_image_path":{src_json},
                "pixelization_settings":{{"width":4,"height":4,"algorithm":"nearest","palette_name":"custom"}},
                "marked_pixels":[]}}"#
        ),
        format!(
            r#"{{"version":"1.0","source_image_path":{src_json},
                "pixelization_settings":{{"width":4,"height":4,"algorithm":"nearest","palette_name":"rainbow"}},
                "marked_pixels":[]}}"#
        ),
        format!(
            r#"{{"version":"1.0","source_image_path":{src_json},
                "pixelization_settings":{{"width":4,"height":4,"algorithm":"nearest","palette_name":"preset257"}},
                "marked_pixels":[]}}"#
        ),
        format!(
            r#"{{"version":"1.0","source_image_path":{src_json},
                "pixelization_settings":{{"width":4,"height":4,"algorithm":"nearest","palette_name":"preset18446744073709551615"}},
                "marked_pixels":[]}}"#
        ),
        format!(
            r#"{{"version":"1.0","source_image_path":{src_json},
                "pixelization_settings":{{"width":0,"height":4,"algorithm":"nearest","palette_name":"wplace"}},
                "marked_pixels":[]}}"#
        ),
    ];
    for (i, text) in cases.iter().enumerate() {
        let path = dir.path().join(format!("bad{i}.wpp"));
        std::fs::write(&path, text).unwrap();
        assert!(
            matches!(read_project(&path), Err(Error::Parse(_))),
            "case {i} should be a parse error"
        );
    }

    // the same rejection reaches the state, which keeps its grid
    let mut state = pixelized(&src, 4, 4);
    let huge = dir.path().join("bad4.wpp");
    assert!(matches!(state.load_project(&huge), Err(Error::Parse(_))));
    assert_eq!(state.model.dimensions(), (4, 4));
}

#[test]
fn save_records_the_recipe_of_the_displayed_grid() {
    let dir = tempfile::tempdir().unwrap();
    let src = gradient_source(dir.path(), "src.png", 64, 64);
    let mut state = pixelized(&src, 8, 8);
    state.model.toggle_mark(Cell::new(1, 1));
    let shown = state.model.grid().unwrap().clone();

    // toolbar edits without re-applying
    state.algorithm = Algorithm::Nearest;
    state.palette = PaletteSource::Generated(32);
    let recipe = state.applied_recipe().unwrap();
    assert_eq!(recipe.algorithm, Algorithm::Dithered);
    assert_eq!(recipe.palette, PaletteSource::default());

    let project_path = dir.path().join("p.wpp");
    state.save_project(&project_path).unwrap();
    let project = read_project(&project_path).unwrap();
    assert_eq!(project.pixelization_settings.algorithm, Algorithm::Dithered);
    assert_eq!(project.pixelization_settings.palette_name, "wplace");

    let mut loaded = ApplicationState::default();
    loaded.load_project(&project_path).unwrap();
    assert_eq!(loaded.model.grid().unwrap(), &shown);
    assert!(loaded.model.is_marked(Cell::new(1, 1)));
}

#[test]
fn loading_leaves_the_document_clean() {
    let dir = tempfile::tempdir().unwrap();
    let src = gradient_source(dir.path(), "src.png", 32, 32);
    let mut state = pixelized(&src, 4, 4);
    state.model.toggle_mark(Cell::new(2, 2));
    state.sync_dirty();
    assert!(state.is_dirty);

    let project_path = dir.path().join("p.wpp");
    state.save_project(&project_path).unwrap();
    state.sync_dirty();
    assert!(!state.is_dirty);

    let mut loaded = ApplicationState::default();
    loaded.load_project(&project_path).unwrap();
    assert!(!loaded.model.take_events().is_empty());
    loaded.sync_dirty();
    assert!(!loaded.is_dirty);

    loaded.model.toggle_mark(Cell::new(0, 0));
    loaded.sync_dirty();
    assert!(loaded.is_dirty);
}

#[test]
fn export_with_marks_bakes_overlay() {
    let dir = tempfile::tempdir().unwrap();
    let src = gradient_source(dir.path(), "src.png", 40, 40);
    let mut state = pixelized(&src, 4, 4);
    state.model.toggle_mark(Cell::new(2, 2));

    let plain = dir.path().join("plain.png");
    let marked = dir.path().join("marked.png");
    state.export_image(&plain, false).unwrap();
    state.export_image(&marked, true).unwrap();

    let plain = image::open(&plain).unwrap().to_rgba8();
    let marked = image::open(&marked).unwrap().to_rgba8();
    assert_eq!(plain.dimensions(), (4, 4));
    assert_eq!(plain.get_pixel(0, 0), marked.get_pixel(0, 0));
    assert_ne!(plain.get_pixel(2, 2), marked.get_pixel(2, 2));

    // unmarked export is made of palette colours only
    for p in plain.pixels() {
        assert!(WPLACE_PALETTE.contains(&[p[0], p[1], p[2]]));
    }
}
