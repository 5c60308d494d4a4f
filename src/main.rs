//! Application entry point.
//!
//! Parses command-line arguments and delegates execution to [`runner::run`].

use clap::{CommandFactory, Parser};
use clap::error::ErrorKind;
use gorun::{cli::Cli, runner};
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => return report_usage(&err),
    };
    let max_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    fmt()
        .with_writer(io::stderr)
        .with_max_level(max_level)
        .init();
    match runner::run(&cli) {
        Ok(status) => ExitCode::from(u8::try_from(status).unwrap_or(1)),
        Err(err) => {
            tracing::error!("{err:#}");
            if runner::is_usage_error(&err) {
                print_usage();
            }
            ExitCode::FAILURE
        }
    }
}

/// Follow a configuration error with the usage line.
fn print_usage() {
    let usage = Cli::command().render_usage();
    if let Err(err) = writeln!(io::stderr(), "{usage}") {
        tracing::warn!(error = %err, "could not print usage");
    }
}

/// Print clap's output. Help and version requests succeed; everything else is
/// a usage error.
fn report_usage(err: &clap::Error) -> ExitCode {
    let printed = err.print();
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion if printed.is_ok() => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}
