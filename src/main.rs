//! icon2x - Command-line tool for upscaling an icon set 2x

use std::process::ExitCode;

use icon2x::cli;

fn main() -> ExitCode {
    cli::run()
}
