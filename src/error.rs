//! Error types raised while resolving and building targets.
//!
//! Every failure the build engine can surface is a [`BuildError`]. The runner
//! wraps these in `anyhow` context before they reach `main`.

// miette/thiserror derive expansion trips `unused_assignments` on some
// toolchains; the lint cannot be `expect`ed because it is version dependent.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use camino::Utf8PathBuf;
use miette::Diagnostic;
use std::io;
use thiserror::Error;

/// Result alias used throughout the build engine.
pub type Result<T, E = BuildError> = std::result::Result<T, E>;

/// Errors raised during resolution, building, or execution.
#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    /// A stat, read, write, mkdir, or remove call failed.
    #[error("failed to {action} {path}")]
    #[diagnostic(code(gorun::io))]
    Io {
        /// What was being attempted, e.g. `read`.
        action: &'static str,
        /// Path the operation targeted.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The package clause or import block of a source file is malformed.
    #[error("{path}:{line}: {message}")]
    #[diagnostic(code(gorun::parse))]
    Parse {
        /// File being parsed.
        path: Utf8PathBuf,
        /// One-based line of the offending token.
        line: usize,
        /// Description of the problem.
        message: String,
    },

    /// A local package directory yielded no matching source files.
    #[error("no sources found for package {import_id} in {dir}")]
    #[diagnostic(code(gorun::no_sources))]
    NoSourcesFound {
        /// Import path that was being resolved.
        import_id: String,
        /// Directory that was scanned.
        dir: Utf8PathBuf,
    },

    /// A compiler, linker, archiver, debugger, or program could not run or
    /// exited unsuccessfully.
    #[error("{program}: {reason}")]
    #[diagnostic(code(gorun::toolchain))]
    Toolchain {
        /// Program that was invoked.
        program: Utf8PathBuf,
        /// Exit status or spawn failure description.
        reason: String,
    },

    /// Invalid configuration or command-line usage.
    #[error("{message}")]
    #[diagnostic(code(gorun::config))]
    Config {
        /// Description of the problem.
        message: String,
    },

    /// Local packages import each other in a loop.
    #[error("import cycle: {}", .cycle.join(" -> "))]
    #[diagnostic(code(gorun::import_cycle))]
    ImportCycle {
        /// Import ids forming the cycle; the first id is repeated at the end.
        cycle: Vec<String>,
    },

    /// A hashed cache directory already belongs to another source directory.
    #[error("cache directory {dir} belongs to {found}, not {expected}")]
    #[diagnostic(code(gorun::cache_collision))]
    CacheCollision {
        /// The hashed cache directory.
        dir: Utf8PathBuf,
        /// Source directory the caller expected.
        expected: Utf8PathBuf,
        /// Source directory recorded in the sidecar.
        found: String,
    },

    /// The entry file does not declare `package main`.
    #[error("entry file declares package {package}, expected package main")]
    #[diagnostic(code(gorun::not_a_program))]
    NotAProgram {
        /// Package declared by the entry file.
        package: String,
    },
}

impl BuildError {
    /// Build an [`BuildError::Io`] for `path`.
    pub fn io(action: &'static str, path: impl Into<Utf8PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Build a [`BuildError::Config`] from any displayable message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Return `true` when the error wraps a missing-file condition.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}
