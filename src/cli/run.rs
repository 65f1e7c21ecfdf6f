//! Run command implementation

use std::path::Path;
use std::process::ExitCode;

use super::{EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::config::{find_config, load_config, merge_cli_overrides, CliOverrides, UpscalerBackend};
use crate::pipeline::{run_sets, PassReport, PipelineError};

/// Run the full pipeline
pub fn run_pass(
    config_path: Option<&Path>,
    set: Option<&str>,
    out: Option<&Path>,
    work_dir: Option<&Path>,
    upscaler: Option<UpscalerBackend>,
    json: bool,
) -> ExitCode {
    match config_path.map(Path::to_path_buf).or_else(find_config) {
        Some(path) => log::info!("Using config: {}", path.display()),
        None => log::info!("No icon2x.toml found, using defaults"),
    }

    let mut config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let overrides = CliOverrides {
        work_dir: work_dir.map(Path::to_path_buf),
        upscaler,
        ..Default::default()
    };
    merge_cli_overrides(&mut config, &overrides);

    if let (Some(name), Some(out)) = (set, out) {
        match config.sets.iter_mut().find(|s| s.name == name) {
            Some(entry) => entry.out = out.to_path_buf(),
            None => {
                eprintln!("Error: Unknown icon set '{}'", name);
                return ExitCode::from(EXIT_INVALID_ARGS);
            }
        }
    }

    match run_sets(&config, set) {
        Ok(reports) => {
            if json {
                match serde_json::to_string_pretty(&reports) {
                    Ok(text) => println!("{}", text),
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        return ExitCode::from(EXIT_ERROR);
                    }
                }
            } else {
                for report in &reports {
                    print_summary(report);
                }
            }
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(PipelineError::UnknownSet(name)) => {
            eprintln!("Error: Unknown icon set '{}'", name);
            ExitCode::from(EXIT_INVALID_ARGS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn print_summary(report: &PassReport) {
    println!(
        "{}: {} base icons, {} variants ({} skipped) in {:.2}s",
        report.set,
        report.base_icons,
        report.variants_written,
        report.variants_skipped,
        report.duration_ms as f64 / 1000.0
    );
}
