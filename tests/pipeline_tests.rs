//! End-to-end tests for a full icon set pass
//!
//! These tests build a small source set on disk, run the pipeline with the
//! in-process nearest-neighbour upscaler and check the output directory.

use std::fs;
use std::path::Path;

use icon2x::catalog::{CatalogError, VariantKind};
use icon2x::config::{DisplacementConfig, Icon2xConfig, IconSetConfig, UpscalerBackend};
use icon2x::pipeline::{run_sets, PipelineError};
use image::{Rgba, RgbaImage};
use tempfile::TempDir;

const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);
const RED: Rgba<u8> = Rgba([200, 40, 40, 255]);
const YELLOW: Rgba<u8> = Rgba([250, 220, 20, 255]);
const BADGE: Rgba<u8> = Rgba([20, 60, 230, 255]);

fn fill(image: &mut RgbaImage, x0: u32, y0: u32, w: u32, h: u32, color: Rgba<u8>) {
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            image.put_pixel(x, y, color);
        }
    }
}

/// 16x16 icon with an opaque square glyph in the middle.
fn glyph() -> RgbaImage {
    let mut image = RgbaImage::from_pixel(16, 16, CLEAR);
    fill(&mut image, 4, 4, 8, 8, RED);
    image
}

fn save(image: &RgbaImage, path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    image.save(path).unwrap();
}

fn write_badges(dir: &Path) {
    for kind in VariantKind::ALL {
        save(&RgbaImage::from_pixel(8, 8, BADGE), &dir.join(format!("{}.png", kind)));
    }
}

/// Source set: `alpha-icon` with no variants, `beta-icon` with a plus
/// variant whose badge sits in the top-right quadrant.
fn write_sources(dir: &Path) {
    save(&glyph(), &dir.join("alpha-icon.png"));
    save(&glyph(), &dir.join("beta-icon.png"));

    let mut plus = glyph();
    fill(&mut plus, 11, 0, 5, 5, YELLOW);
    save(&plus, &dir.join("beta-icon--plus.png"));
}

fn config(root: &Path) -> Icon2xConfig {
    let mut config = Icon2xConfig::default();
    config.work_dir = root.join("tmp");
    config.upscaler.backend = UpscalerBackend::Nearest;
    config.overlay.badge_dir = root.join("badges");

    let mut set = IconSetConfig::fugue("icons");
    set.source = root.join("fugue/icons");
    set.out = root.join("icons-2x");
    config.sets = vec![set];
    config
}

fn open(path: &Path) -> RgbaImage {
    image::open(path).unwrap_or_else(|e| panic!("cannot open {}: {}", path.display(), e)).to_rgba8()
}

fn output_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_two_icon_set_end_to_end() {
    let temp = TempDir::new().unwrap();
    write_sources(&temp.path().join("fugue/icons"));
    write_badges(&temp.path().join("badges"));

    let reports = run_sets(&config(temp.path()), None).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].base_icons, 2);
    assert_eq!(reports[0].variants_written, 1);
    assert_eq!(reports[0].variants_skipped, 0);

    let out = temp.path().join("icons-2x");
    assert_eq!(output_names(&out), vec!["alpha-icon.png", "beta-icon--plus.png", "beta-icon.png"]);

    for name in ["alpha-icon", "beta-icon"] {
        let base = open(&out.join(format!("{}.png", name)));
        assert_eq!(base.dimensions(), (32, 32));
        // Opaque glyph stays opaque with its color intact
        assert_eq!(*base.get_pixel(16, 16), RED);
        assert_eq!(*base.get_pixel(8, 8), RED);
        // Background became fully transparent
        assert_eq!(base.get_pixel(0, 0)[3], 0);
        assert_eq!(base.get_pixel(31, 31)[3], 0);
    }

    let variant = open(&out.join("beta-icon--plus.png"));
    assert_eq!(variant.dimensions(), (32, 32));
    assert_eq!(*variant.get_pixel(31, 0), BADGE);
    assert_eq!(*variant.get_pixel(24, 7), BADGE);
    assert_eq!(variant.get_pixel(0, 31)[3], 0);
    assert_eq!(variant.get_pixel(31, 31)[3], 0);
    assert_eq!(*variant.get_pixel(16, 16), RED);
}

#[test]
fn test_intermediates_are_kept() {
    let temp = TempDir::new().unwrap();
    write_sources(&temp.path().join("fugue/icons"));
    write_badges(&temp.path().join("badges"));

    run_sets(&config(temp.path()), None).unwrap();

    let work = temp.path().join("tmp");
    let green = open(&work.join("icons-montage-green.png"));
    let magenta = open(&work.join("icons-montage-magenta.png"));
    // Two icons in a 50-column grid: one full-width row of 20px tiles
    assert_eq!(green.dimensions(), (1000, 20));
    assert_eq!(magenta.dimensions(), (1000, 20));
    assert_eq!(open(&work.join("icons-2x.png")).dimensions(), (2000, 40));
}

#[test]
fn test_manifest_variant_without_source_is_skipped() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write_sources(&root.join("fugue/icons"));
    write_badges(&root.join("badges"));
    fs::write(
        root.join("icons.txt"),
        "beta-icon.png\nbeta-icon--plus.png\nalpha-icon.png\nalpha-icon--minus.png\n",
    )
    .unwrap();

    let mut config = config(root);
    config.sets[0].manifest = Some(root.join("icons.txt"));

    let reports = run_sets(&config, Some("icons")).unwrap();
    assert_eq!(reports[0].base_icons, 2);
    assert_eq!(reports[0].variants_written, 1);
    assert_eq!(reports[0].variants_skipped, 1);
    assert!(!root.join("icons-2x/alpha-icon--minus.png").exists());
}

#[test]
fn test_manifest_base_without_source_is_fatal() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write_sources(&root.join("fugue/icons"));
    write_badges(&root.join("badges"));
    fs::write(root.join("icons.txt"), "alpha-icon.png\nghost.png\n").unwrap();

    let mut config = config(root);
    config.sets[0].manifest = Some(root.join("icons.txt"));

    let result = run_sets(&config, None);
    assert!(matches!(
        result,
        Err(PipelineError::Catalog(CatalogError::MissingSource { ref name, .. })) if name == "ghost"
    ));
}

#[test]
fn test_configured_displacement_moves_badge() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let source = root.join("fugue/icons");
    write_badges(&root.join("badges"));

    // Base glyph at the left edge; the variant draws the same glyph shifted
    // right by 8 pixels plus a small badge at the bottom-left.
    let mut base = RgbaImage::from_pixel(16, 16, CLEAR);
    fill(&mut base, 2, 0, 3, 8, RED);
    let mut variant = RgbaImage::from_pixel(16, 16, CLEAR);
    fill(&mut variant, 10, 0, 3, 8, RED);
    fill(&mut variant, 0, 14, 2, 2, YELLOW);
    save(&base, &source.join("shifted.png"));
    save(&variant, &source.join("shifted--arrow.png"));

    let mut config = config(root);
    run_sets(&config, None).unwrap();
    let uncorrected = open(&root.join("icons-2x/shifted--arrow.png"));
    // Without correction the moved glyph ties both top cells, so the badge
    // lands top-left instead of next to the real badge
    assert_eq!(*uncorrected.get_pixel(0, 0), BADGE);
    assert_eq!(uncorrected.get_pixel(0, 31)[3], 0);

    config.displacements =
        vec![DisplacementConfig { icon: "shifted".to_string(), variant: VariantKind::Arrow, offset: 8 }];
    run_sets(&config, None).unwrap();
    let corrected = open(&root.join("icons-2x/shifted--arrow.png"));
    assert_eq!(*corrected.get_pixel(0, 31), BADGE);
    // The upscaled base glyph moved 16 pixels to the right
    assert_eq!(*corrected.get_pixel(21, 0), RED);
    assert_eq!(corrected.get_pixel(5, 0)[3], 0);
}

#[test]
fn test_one_failing_set_halts_the_run() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write_badges(&root.join("badges"));

    let mut config = config(root);
    let mut empty = IconSetConfig::fugue("empty");
    empty.source = root.join("fugue/empty");
    empty.out = root.join("empty-2x");
    fs::create_dir_all(&empty.source).unwrap();
    config.sets.push(empty);
    write_sources(&root.join("fugue/icons"));

    let result = run_sets(&config, None);
    assert!(matches!(result, Err(PipelineError::Catalog(CatalogError::Empty))));
    // Sets run in order, so the first one finished before the failure
    assert!(root.join("icons-2x/beta-icon.png").exists());
}
