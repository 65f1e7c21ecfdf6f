//! PNG output and output file naming

use crate::catalog::{variant_name, VariantKind};
use image::RgbaImage;
use std::io;
use std::path::{Path, PathBuf};

/// Error type for output operations
#[derive(Debug)]
pub enum OutputError {
    /// IO error during file operations
    Io(io::Error),
    /// Image encoding error
    Image(image::ImageError),
}

impl std::fmt::Display for OutputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputError::Io(e) => write!(f, "IO error: {}", e),
            OutputError::Image(e) => write!(f, "Image error: {}", e),
        }
    }
}

impl std::error::Error for OutputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OutputError::Io(e) => Some(e),
            OutputError::Image(e) => Some(e),
        }
    }
}

impl From<io::Error> for OutputError {
    fn from(e: io::Error) -> Self {
        OutputError::Io(e)
    }
}

impl From<image::ImageError> for OutputError {
    fn from(e: image::ImageError) -> Self {
        OutputError::Image(e)
    }
}

/// Save an RGBA image to a PNG file, creating parent directories.
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    image.save(path)?;
    Ok(())
}

/// Output path of a base icon: `<dir>/<name>.png`.
pub fn base_output_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.png", name))
}

/// Output path of a variant icon: `<dir>/<base>--<variant>.png`.
pub fn variant_output_path(dir: &Path, base: &str, kind: VariantKind) -> PathBuf {
    dir.join(format!("{}.png", variant_name(base, kind)))
}

/// Path of the reconstructed grid kept for inspection: `<dir>/<set>-2x.png`.
pub fn grid_output_path(dir: &Path, set: &str) -> PathBuf {
    dir.join(format!("{}-2x.png", set))
}
