//! Command line interface definition using clap.
//!
//! Flags come first and may be bundled (`-cd`). The first positional word is
//! the entry file; every word after it is passed to the built program
//! untouched, even when it looks like a flag.

use crate::config::BuildFlags;
use clap::Parser;
use std::path::Path;

/// Compile a program and its local packages, then run it.
#[derive(Debug, Default, Parser)]
#[command(name = "gorun", author, version, about, long_about = None)]
#[expect(
    clippy::struct_excessive_bools,
    reason = "each field is an independent command-line switch"
)]
pub struct Cli {
    /// Keep objects in a cache directory instead of beside the sources.
    #[arg(short = 'c', long)]
    pub cache: bool,

    /// Debug build: disable optimisation, keep symbols, run under the debugger.
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Delete existing objects and artefacts, then rebuild.
    #[arg(short = 'r', long)]
    pub rebuild: bool,

    /// Delete existing objects and artefacts without building.
    #[arg(short = 'C', long)]
    pub clean: bool,

    /// Disable compiler optimisation.
    #[arg(short = 'N', long)]
    pub no_optimize: bool,

    /// Build but do not run the program.
    #[arg(short = 'R', long)]
    pub no_run: bool,

    /// Reject `unsafe` imports.
    #[arg(short = 'u', long)]
    pub disallow_unsafe: bool,

    /// Ask the linker to keep extra symbols.
    #[arg(short = 'E', long)]
    pub extra_symbols: bool,

    /// Run the existing binary without building.
    #[arg(short = 'x', long)]
    pub run_only: bool,

    /// Enable verbose logging output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Entry file followed by the arguments for the program.
    #[arg(
        value_name = "FILE [ARGS]",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

impl Cli {
    /// Entry source file.
    #[must_use]
    pub fn file(&self) -> Option<&Path> {
        self.command.first().map(Path::new)
    }

    /// Arguments forwarded to the built program.
    #[must_use]
    pub fn program_args(&self) -> &[String] {
        self.command.get(1..).unwrap_or_default()
    }

    /// Build switches selected on the command line.
    #[must_use]
    pub const fn flags(&self) -> BuildFlags {
        BuildFlags {
            cache: self.cache,
            debug: self.debug,
            rebuild: self.rebuild,
            clean_only: self.clean,
            no_optimize: self.no_optimize,
            disallow_unsafe: self.disallow_unsafe,
            extra_symbols: self.extra_symbols,
            no_run: self.no_run,
            run_only: self.run_only,
        }
    }
}
