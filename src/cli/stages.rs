//! Single-stage command implementations (montage, reconstruct, place)

use std::collections::HashMap;
use std::path::Path;
use std::process::ExitCode;

use image::RgbaImage;

use super::{EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::alpha::AlphaRecovery;
use crate::catalog::Catalog;
use crate::config::{load_config, merge_cli_overrides, CliOverrides, Icon2xConfig};
use crate::montage::MontageBuilder;
use crate::output::save_png;
use crate::overlay::{badge_corner, compose_variant};
use crate::pipeline::{reconstructor_for, PipelineError};

/// Load the project configuration, reporting failures on stderr.
fn project_config() -> Option<Icon2xConfig> {
    match load_config(None) {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("Error: {}", e);
            None
        }
    }
}

/// Open an image as RGBA, reporting failures on stderr.
fn open_image(path: &Path) -> Option<RgbaImage> {
    match image::open(path) {
        Ok(image) => Some(image.to_rgba8()),
        Err(e) => {
            eprintln!("Error: Cannot open '{}': {}", path.display(), e);
            None
        }
    }
}

/// Run the montage command
pub fn run_montage(source: &Path, green: &Path, magenta: &Path, manifest: Option<&Path>) -> ExitCode {
    if !source.is_dir() {
        eprintln!("Error: Source directory not found: {}", source.display());
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    let Some(config) = project_config() else {
        return ExitCode::from(EXIT_ERROR);
    };

    match build_montages(&config, source, green, magenta, manifest) {
        Ok(count) => {
            println!("Laid out {} icons: {}, {}", count, green.display(), magenta.display());
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn build_montages(
    config: &Icon2xConfig,
    source: &Path,
    green: &Path,
    magenta: &Path,
    manifest: Option<&Path>,
) -> Result<usize, PipelineError> {
    let corrections = config.corrections();
    let renames = renames_for(config, source);
    let catalog = match manifest {
        Some(path) => Catalog::load_manifest(path, &renames, &corrections)?,
        None => Catalog::from_directory(source, &renames, &corrections)?,
    };
    let sources = catalog.load_sources(source)?;

    let builder = MontageBuilder::new(config.montage.geometry(), config.montage.backgrounds()?);
    let montages = builder.build(&sources)?;
    save_png(&montages.green, green)?;
    save_png(&montages.magenta, magenta)?;
    Ok(catalog.len())
}

/// Rename table of the configured set reading from `source`, so a manifest
/// lays out the same tiles here as in a full run.
fn renames_for(config: &Icon2xConfig, source: &Path) -> HashMap<String, String> {
    let Ok(wanted) = source.canonicalize() else {
        return HashMap::new();
    };
    config
        .sets
        .iter()
        .find(|set| set.source.canonicalize().is_ok_and(|dir| dir == wanted))
        .map(|set| set.renames.clone())
        .unwrap_or_default()
}

/// Run the reconstruct command
pub fn run_reconstruct(green: &Path, magenta: &Path, output: &Path, cutoff: Option<f32>) -> ExitCode {
    if let Some(cutoff) = cutoff {
        if !(0.0..1.0).contains(&cutoff) {
            eprintln!("Error: --cutoff must be in [0, 1), got {}", cutoff);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    }

    let Some(mut config) = project_config() else {
        return ExitCode::from(EXIT_ERROR);
    };
    merge_cli_overrides(&mut config, &CliOverrides { cutoff, ..Default::default() });

    let (Some(green_image), Some(magenta_image)) = (open_image(green), open_image(magenta)) else {
        return ExitCode::from(EXIT_ERROR);
    };

    let result = reconstructor_for(&config)
        .map_err(PipelineError::from)
        .and_then(|recovery| Ok(recovery.reconstruct(&green_image, &magenta_image)?))
        .and_then(|grid| Ok(save_png(&grid, output)?));

    match result {
        Ok(()) => {
            println!("Reconstructed {}", output.display());
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Run the place command
pub fn run_place(
    upscaled_base: &Path,
    base: &Path,
    variant: &Path,
    badge: &Path,
    output: &Path,
    offset: i32,
) -> ExitCode {
    let Some(config) = project_config() else {
        return ExitCode::from(EXIT_ERROR);
    };

    let images = (open_image(upscaled_base), open_image(base), open_image(variant), open_image(badge));
    let (Some(upscaled_image), Some(base_image), Some(variant_image), Some(badge_image)) = images else {
        return ExitCode::from(EXIT_ERROR);
    };

    if base_image.dimensions() != variant_image.dimensions() {
        eprintln!(
            "Error: Base is {}x{} but variant is {}x{}",
            base_image.width(),
            base_image.height(),
            variant_image.width(),
            variant_image.height()
        );
        return ExitCode::from(EXIT_ERROR);
    }

    let corner = badge_corner(&base_image, &variant_image, offset);
    let placed = compose_variant(&upscaled_image, &badge_image, corner, offset, config.overlay.margin);

    if let Err(e) = save_png(&placed, output) {
        eprintln!("Error: {}", e);
        return ExitCode::from(EXIT_ERROR);
    }

    println!("{}", corner);
    ExitCode::from(EXIT_SUCCESS)
}
