//! Configuration schema types for `icon2x.toml`
//!
//! Defines the structure and validation rules for an icon2x project.

use crate::alpha::DEFAULT_ALPHA_CUTOFF;
use crate::catalog::VariantKind;
use crate::color::{parse_color, ColorError};
use crate::corrections::Corrections;
use crate::montage::BackgroundPair;
use crate::tiling::{TileGeometry, DEFAULT_COLUMNS, DEFAULT_ICON_SIZE, DEFAULT_MARGIN};
use crate::upscale::{INPUT_PLACEHOLDER, OUTPUT_PLACEHOLDER};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// Which upscaler implementation runs the 2x step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UpscalerBackend {
    /// Run the configured external program
    #[default]
    External,
    /// In-process nearest-neighbour scaling (dry runs)
    Nearest,
}

/// External upscaler invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpscalerConfig {
    /// Implementation to use
    #[serde(default)]
    pub backend: UpscalerBackend,
    /// Program to run
    #[serde(default = "default_program")]
    pub program: String,
    /// Argument template; `{input}` and `{output}` are substituted
    #[serde(default = "default_args")]
    pub args: Vec<String>,
}

impl Default for UpscalerConfig {
    fn default() -> Self {
        Self { backend: UpscalerBackend::default(), program: default_program(), args: default_args() }
    }
}

fn default_program() -> String {
    "waifu2x-ncnn-vulkan".to_string()
}

fn default_args() -> Vec<String> {
    ["-i", INPUT_PLACEHOLDER, "-o", OUTPUT_PLACEHOLDER, "-n", "-1", "-x"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Montage layout and background colors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MontageConfig {
    /// Tiles per row
    #[serde(default = "default_columns")]
    pub columns: u32,
    /// Border around each icon inside its tile
    #[serde(default = "default_margin")]
    pub margin: u32,
    /// Edge length of the icon area
    #[serde(default = "default_icon_size")]
    pub icon_size: u32,
    /// First background (any CSS color)
    #[serde(default = "default_green")]
    pub green: String,
    /// Second background (any CSS color)
    #[serde(default = "default_magenta")]
    pub magenta: String,
}

impl Default for MontageConfig {
    fn default() -> Self {
        Self {
            columns: default_columns(),
            margin: default_margin(),
            icon_size: default_icon_size(),
            green: default_green(),
            magenta: default_magenta(),
        }
    }
}

impl MontageConfig {
    pub fn geometry(&self) -> TileGeometry {
        TileGeometry::new(self.icon_size, self.margin, self.columns)
    }

    pub fn backgrounds(&self) -> Result<BackgroundPair, ColorError> {
        Ok(BackgroundPair::new(parse_color(&self.green)?, parse_color(&self.magenta)?))
    }
}

fn default_columns() -> u32 {
    DEFAULT_COLUMNS
}

fn default_margin() -> u32 {
    DEFAULT_MARGIN
}

fn default_icon_size() -> u32 {
    DEFAULT_ICON_SIZE
}

fn default_green() -> String {
    "green".to_string()
}

fn default_magenta() -> String {
    "magenta".to_string()
}

/// Alpha reconstruction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlphaConfig {
    /// Alpha below this is forced fully transparent
    #[serde(default = "default_cutoff")]
    pub cutoff: f32,
    /// Sample each background from its render instead of the configured color
    #[serde(default)]
    pub sample_background: bool,
}

impl Default for AlphaConfig {
    fn default() -> Self {
        Self { cutoff: default_cutoff(), sample_background: false }
    }
}

fn default_cutoff() -> f32 {
    DEFAULT_ALPHA_CUTOFF
}

/// Variant badge settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Directory holding `<variant>.png` badge images
    #[serde(default = "default_badge_dir")]
    pub badge_dir: PathBuf,
    /// Inset of the badge from the corner edges
    #[serde(default)]
    pub margin: u32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self { badge_dir: default_badge_dir(), margin: 0 }
    }
}

fn default_badge_dir() -> PathBuf {
    PathBuf::from("fugue/icons-shadowless")
}

/// One icon set to process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IconSetConfig {
    /// Set name, used for intermediate file names
    pub name: String,
    /// Directory of low-resolution source icons
    pub source: PathBuf,
    /// Optional manifest listing icon files in order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<PathBuf>,
    /// Output directory
    pub out: PathBuf,
    /// Manifest entries to substitute before classification.
    ///
    /// There is no built-in table: the known mis-named entry of the
    /// shadowless set is supplied here, e.g.
    /// `renames = { "<listed name>" = "<file name>" }`.
    #[serde(default)]
    pub renames: HashMap<String, String>,
}

impl IconSetConfig {
    /// A set named `name` read from `fugue/<name>` and written to `<name>-2x`.
    pub fn fugue(name: &str) -> Self {
        Self {
            name: name.to_string(),
            source: PathBuf::from("fugue").join(name),
            manifest: None,
            out: PathBuf::from(format!("{}-2x", name)),
            renames: HashMap::new(),
        }
    }
}

fn default_sets() -> Vec<IconSetConfig> {
    vec![IconSetConfig::fugue("icons"), IconSetConfig::fugue("icons-shadowless")]
}

/// Displacement correction for one icon variant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplacementConfig {
    pub icon: String,
    pub variant: VariantKind,
    /// Horizontal offset in native pixels, positive to the right
    pub offset: i32,
}

/// Complete `icon2x.toml` configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Icon2xConfig {
    /// Directory for montages and upscaler intermediates
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    #[serde(default)]
    pub upscaler: UpscalerConfig,
    #[serde(default)]
    pub montage: MontageConfig,
    #[serde(default)]
    pub alpha: AlphaConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default = "default_sets")]
    pub sets: Vec<IconSetConfig>,
    #[serde(default)]
    pub displacements: Vec<DisplacementConfig>,
}

impl Default for Icon2xConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            upscaler: UpscalerConfig::default(),
            montage: MontageConfig::default(),
            alpha: AlphaConfig::default(),
            overlay: OverlayConfig::default(),
            sets: default_sets(),
            displacements: Vec::new(),
        }
    }
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("tmp")
}

/// Validation error for config
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "montage.columns")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "icon2x.toml: '{}' {}", self.field, self.message)
    }
}

impl ConfigValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

impl Icon2xConfig {
    /// Validate the configuration, returning all errors found
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.montage.columns == 0 {
            errors.push(ConfigValidationError::new("montage.columns", "must be a positive integer"));
        }
        if self.montage.icon_size == 0 {
            errors.push(ConfigValidationError::new("montage.icon_size", "must be a positive integer"));
        }

        match self.montage.backgrounds() {
            Ok(pair) if !pair.is_separable() => errors.push(ConfigValidationError::new(
                "montage",
                format!(
                    "green and magenta must differ by at least {} in some channel",
                    BackgroundPair::MIN_SEPARATION
                ),
            )),
            Ok(_) => {}
            Err(e) => errors.push(ConfigValidationError::new("montage", e.to_string())),
        }

        if !(0.0..1.0).contains(&self.alpha.cutoff) {
            errors.push(ConfigValidationError::new("alpha.cutoff", "must be in [0, 1)"));
        }
        // Sampling reads pixel (0, 0), which is only background when tiles
        // have a margin
        if self.alpha.sample_background && self.montage.margin == 0 {
            errors.push(ConfigValidationError::new(
                "alpha.sample_background",
                "requires montage.margin of at least 1",
            ));
        }

        if self.upscaler.backend == UpscalerBackend::External {
            if self.upscaler.program.trim().is_empty() {
                errors.push(ConfigValidationError::new("upscaler.program", "must be a non-empty string"));
            }
            for placeholder in [INPUT_PLACEHOLDER, OUTPUT_PLACEHOLDER] {
                if !self.upscaler.args.iter().any(|a| a.contains(placeholder)) {
                    errors.push(ConfigValidationError::new(
                        "upscaler.args",
                        format!("must contain {}", placeholder),
                    ));
                }
            }
        }

        let mut names = HashSet::new();
        for (i, set) in self.sets.iter().enumerate() {
            if set.name.trim().is_empty() {
                errors.push(ConfigValidationError::new(
                    format!("sets[{}].name", i),
                    "must be a non-empty string",
                ));
            } else if !names.insert(set.name.as_str()) {
                errors.push(ConfigValidationError::new(
                    format!("sets[{}].name", i),
                    format!("duplicate set name '{}'", set.name),
                ));
            }
        }

        for (i, entry) in self.displacements.iter().enumerate() {
            if entry.offset == 0 {
                errors.push(ConfigValidationError::new(
                    format!("displacements[{}].offset", i),
                    "must be non-zero",
                ));
            }
        }

        errors
    }

    /// Check if config is valid
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Built-in corrections plus the configured displacement entries
    pub fn corrections(&self) -> Corrections {
        let mut corrections = Corrections::builtin();
        for entry in &self.displacements {
            corrections.set_displacement(&entry.icon, entry.variant, entry.offset);
        }
        corrections
    }

    /// Look up a set by name
    pub fn set(&self, name: &str) -> Option<&IconSetConfig> {
        self.sets.iter().find(|s| s.name == name)
    }
}
