//! Upscaler boundary
//!
//! The upscaler is an external program treated as an opaque, deterministic
//! function: one raster in, the same picture at exactly twice the linear size
//! out. Its output carries no meaningful transparency and is forced opaque
//! before any further arithmetic.

use crate::montage::MontagePair;
use image::imageops::FilterType;
use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// Linear scale factor of every upscaler.
pub const SCALE: u32 = 2;

/// Placeholder replaced by the input file path in upscaler arguments.
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// Placeholder replaced by the output file path in upscaler arguments.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Error from an upscaler invocation
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UpscaleError {
    /// The upscaler program could not be started
    #[error("Failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// The upscaler exited unsuccessfully
    #[error("'{program}' failed ({status}): {stderr}")]
    Failed { program: String, status: String, stderr: String },
    /// The upscaler produced an image of the wrong size
    #[error("Upscaled '{name}' is {}x{}, expected {}x{}", actual.0, actual.1, expected.0, expected.1)]
    BadOutput { name: String, expected: (u32, u32), actual: (u32, u32) },
    /// Intermediate file I/O failed
    #[error("Upscaler I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Intermediate image could not be encoded or decoded
    #[error("Upscaler image error on '{}': {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// A 2x raster upscaler.
///
/// `name` identifies the image for intermediates and diagnostics; it is
/// unique within a pass.
pub trait Upscaler: Sync {
    fn upscale(&self, name: &str, image: &RgbaImage) -> Result<RgbaImage, UpscaleError>;

    /// Whether the output keeps the input's transparency.
    ///
    /// Upscalers that do can skip the two-background reconstruction.
    fn preserves_alpha(&self) -> bool {
        false
    }
}

/// Runs an external upscaler program on files in a work directory.
///
/// The input is written to `<work_dir>/<name>.png` and the program is
/// expected to write `<work_dir>/<name>-2x.png`. Both files are left in
/// place for inspection.
#[derive(Debug, Clone)]
pub struct ExternalUpscaler {
    program: String,
    args: Vec<String>,
    work_dir: PathBuf,
}

impl ExternalUpscaler {
    /// Create an upscaler running `program` with an argument template.
    ///
    /// Every occurrence of `{input}` and `{output}` in `args` is replaced
    /// with the corresponding file path.
    pub fn new(program: impl Into<String>, args: Vec<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args, work_dir: work_dir.into() }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments with placeholders substituted.
    pub fn command_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.display().to_string();
        let output = output.display().to_string();
        self.args
            .iter()
            .map(|arg| arg.replace(INPUT_PLACEHOLDER, &input).replace(OUTPUT_PLACEHOLDER, &output))
            .collect()
    }

    fn run(&self, input: &Path, output: &Path) -> Result<(), UpscaleError> {
        let result = Command::new(&self.program)
            .args(self.command_args(input, output))
            .output()
            .map_err(|source| UpscaleError::Spawn { program: self.program.clone(), source })?;

        if !result.status.success() {
            return Err(UpscaleError::Failed {
                program: self.program.clone(),
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

impl Upscaler for ExternalUpscaler {
    fn upscale(&self, name: &str, image: &RgbaImage) -> Result<RgbaImage, UpscaleError> {
        std::fs::create_dir_all(&self.work_dir)
            .map_err(|source| UpscaleError::Io { path: self.work_dir.clone(), source })?;

        let input = self.work_dir.join(format!("{}.png", name));
        let output = self.work_dir.join(format!("{}-2x.png", name));
        image.save(&input).map_err(|source| UpscaleError::Image { path: input.clone(), source })?;

        log::info!("Upscaling {} with {}", input.display(), self.program);
        self.run(&input, &output)?;

        let upscaled = image::open(&output)
            .map_err(|source| UpscaleError::Image { path: output.clone(), source })?
            .to_rgba8();
        check_dimensions(name, image, &upscaled)?;
        Ok(upscaled)
    }
}

/// In-process nearest-neighbour 2x upscaler.
///
/// Deterministic and dependency-free; used for dry runs and tests where the
/// external program is unavailable. Like the external program it reports no
/// alpha support, so the full reconstruction path is exercised.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestUpscaler;

impl Upscaler for NearestUpscaler {
    fn upscale(&self, _name: &str, image: &RgbaImage) -> Result<RgbaImage, UpscaleError> {
        let (w, h) = image.dimensions();
        Ok(image::imageops::resize(image, w * SCALE, h * SCALE, FilterType::Nearest))
    }
}

/// Treat every pixel as fully opaque.
pub fn force_opaque(image: &mut RgbaImage) {
    for pixel in image.pixels_mut() {
        pixel[3] = 255;
    }
}

fn check_dimensions(name: &str, input: &RgbaImage, output: &RgbaImage) -> Result<(), UpscaleError> {
    let expected = (input.width() * SCALE, input.height() * SCALE);
    if output.dimensions() != expected {
        return Err(UpscaleError::BadOutput {
            name: name.to_string(),
            expected,
            actual: output.dimensions(),
        });
    }
    Ok(())
}

/// Upscale both montage grids concurrently.
///
/// The two invocations share no state. Outputs are checked for exact 2x
/// size and forced opaque. The first failure aborts the pair.
pub fn upscale_pair(
    upscaler: &dyn Upscaler,
    set: &str,
    pair: &MontagePair,
) -> Result<MontagePair, UpscaleError> {
    let green_name = format!("{}-montage-green", set);
    let magenta_name = format!("{}-montage-magenta", set);

    let (green, magenta) = rayon::join(
        || upscale_opaque(upscaler, &green_name, &pair.green),
        || upscale_opaque(upscaler, &magenta_name, &pair.magenta),
    );

    Ok(MontagePair { green: green?, magenta: magenta? })
}

/// Upscale a transparent montage with an upscaler that keeps alpha.
///
/// The output is checked for exact 2x size and used as is.
pub fn upscale_transparent(
    upscaler: &dyn Upscaler,
    set: &str,
    montage: &RgbaImage,
) -> Result<RgbaImage, UpscaleError> {
    let name = format!("{}-montage", set);
    let upscaled = upscaler.upscale(&name, montage)?;
    check_dimensions(&name, montage, &upscaled)?;
    Ok(upscaled)
}

fn upscale_opaque(
    upscaler: &dyn Upscaler,
    name: &str,
    image: &RgbaImage,
) -> Result<RgbaImage, UpscaleError> {
    let mut upscaled = upscaler.upscale(name, image)?;
    check_dimensions(name, image, &upscaled)?;
    force_opaque(&mut upscaled);
    Ok(upscaled)
}
