//! Configuration loading and discovery for `icon2x.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::{Icon2xConfig, UpscalerBackend};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name searched for when discovering a project configuration.
pub const CONFIG_FILE_NAME: &str = "icon2x.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse icon2x.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override work directory
    pub work_dir: Option<PathBuf>,
    /// Override upscaler backend
    pub upscaler: Option<UpscalerBackend>,
    /// Override alpha cutoff
    pub cutoff: Option<f32>,
}

/// Find icon2x.toml by walking up from the current working directory.
///
/// Search order:
/// 1. Walk up from current directory looking for icon2x.toml
/// 2. Check XDG_CONFIG_HOME/icon2x/icon2x.toml (or ~/.config/icon2x/icon2x.toml)
pub fn find_config() -> Option<PathBuf> {
    if let Ok(cwd) = env::current_dir() {
        if let Some(path) = find_config_from(cwd) {
            return Some(path);
        }
    }

    find_xdg_config()
}

/// Find icon2x.toml in the XDG config directory.
pub fn find_xdg_config() -> Option<PathBuf> {
    let xdg_config = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok()?;

    let config_path = xdg_config.join("icon2x").join(CONFIG_FILE_NAME);
    if config_path.exists() {
        Some(config_path)
    } else {
        None
    }
}

/// Find icon2x.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from an icon2x.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses
/// `find_config()` to locate one. If no config file is found, returns the
/// default configuration.
///
/// Relative paths in a loaded file are resolved against the directory that
/// contains it.
pub fn load_config(path: Option<&Path>) -> Result<Icon2xConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => {
            let mut config = load_config_file(&p)?;
            if let Some(root) = project_root(&p) {
                resolve_config_paths(&mut config, root);
            }
            log::debug!("Loaded configuration from {}", p.display());
            Ok(config)
        }
        None => Ok(default_config()),
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<Icon2xConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: Icon2xConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(config)
}

/// Configuration used when no icon2x.toml is found.
///
/// Processes the `icons` and `icons-shadowless` sets of an unpacked
/// `fugue/` source tree in the current directory.
pub fn default_config() -> Icon2xConfig {
    Icon2xConfig::default()
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut Icon2xConfig, overrides: &CliOverrides) {
    if let Some(ref work_dir) = overrides.work_dir {
        config.work_dir = work_dir.clone();
    }

    if let Some(backend) = overrides.upscaler {
        config.upscaler.backend = backend;
    }

    if let Some(cutoff) = overrides.cutoff {
        config.alpha.cutoff = cutoff;
    }
}

/// Get the project root directory from a config file path.
///
/// Returns the parent directory of the icon2x.toml file.
pub fn project_root(config_path: &Path) -> Option<&Path> {
    config_path.parent()
}

/// Resolve a path relative to the project root.
///
/// If the path is absolute, returns it unchanged.
/// If relative, joins it with the project root.
pub fn resolve_path(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

/// Resolve every path in `config` against `project_root`.
pub fn resolve_config_paths(config: &mut Icon2xConfig, project_root: &Path) {
    config.work_dir = resolve_path(project_root, &config.work_dir);
    config.overlay.badge_dir = resolve_path(project_root, &config.overlay.badge_dir);
    for set in &mut config.sets {
        set.source = resolve_path(project_root, &set.source);
        set.out = resolve_path(project_root, &set.out);
        if let Some(manifest) = set.manifest.take() {
            set.manifest = Some(resolve_path(project_root, &manifest));
        }
    }
}
