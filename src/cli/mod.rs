//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod run;
mod stages;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::config::UpscalerBackend;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// icon2x - Regenerate an icon set at double resolution
#[derive(Parser)]
#[command(name = "icon2x")]
#[command(about = "icon2x - Upscale an icon set 2x with reconstructed alpha and re-placed variant badges")]
#[command(version)]
pub struct Cli {
    /// Log more detail (repeat for trace output); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline for every configured icon set
    Run {
        /// Config file (default: nearest icon2x.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Only process the set with this name
        #[arg(short, long)]
        set: Option<String>,

        /// Output directory (requires --set)
        #[arg(short, long, requires = "set")]
        out: Option<PathBuf>,

        /// Directory for montages and upscaler intermediates
        #[arg(long)]
        work_dir: Option<PathBuf>,

        /// Upscaler implementation
        #[arg(long, value_enum)]
        upscaler: Option<UpscalerBackend>,

        /// Print pass reports as JSON
        #[arg(long)]
        json: bool,
    },
    /// Build the green and magenta montages of a source directory
    Montage {
        /// Directory of low-resolution source icons
        source: PathBuf,

        /// Output path of the green montage
        #[arg(long)]
        green: PathBuf,

        /// Output path of the magenta montage
        #[arg(long)]
        magenta: PathBuf,

        /// Manifest listing icon files in order (default: sorted directory listing)
        #[arg(short, long)]
        manifest: Option<PathBuf>,
    },
    /// Reconstruct alpha from upscaled green and magenta montages
    Reconstruct {
        /// Upscaled green montage
        green: PathBuf,

        /// Upscaled magenta montage
        magenta: PathBuf,

        /// Output path of the reconstructed grid
        #[arg(short, long)]
        output: PathBuf,

        /// Alpha below this becomes fully transparent (0.0-1.0)
        #[arg(long)]
        cutoff: Option<f32>,
    },
    /// Place one variant badge onto an upscaled base icon
    Place {
        /// Upscaled base icon
        upscaled_base: PathBuf,

        /// Low-resolution base icon
        base: PathBuf,

        /// Low-resolution variant icon
        variant: PathBuf,

        /// Badge image to composite
        #[arg(long)]
        badge: PathBuf,

        /// Output path of the variant icon
        #[arg(short, long)]
        output: PathBuf,

        /// Horizontal displacement of the base glyph in native pixels
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        offset: i32,
    },
}

/// Initialize logging: `info` by default, raised by each `-v`.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .try_init();
}

/// Main entry point for the CLI
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run { config, set, out, work_dir, upscaler, json } => run::run_pass(
            config.as_deref(),
            set.as_deref(),
            out.as_deref(),
            work_dir.as_deref(),
            upscaler,
            json,
        ),
        Commands::Montage { source, green, magenta, manifest } => {
            stages::run_montage(&source, &green, &magenta, manifest.as_deref())
        }
        Commands::Reconstruct { green, magenta, output, cutoff } => {
            stages::run_reconstruct(&green, &magenta, &output, cutoff)
        }
        Commands::Place { upscaled_base, base, variant, badge, output, offset } => {
            stages::run_place(&upscaled_base, &base, &variant, &badge, &output, offset)
        }
    }
}
