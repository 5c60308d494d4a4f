//! Per-file source records.
//!
//! A [`SourceRecord`] captures what the build engine needs to know about one
//! `.go` file: the package it declares, the imports it names, and when it was
//! last modified. Records are immutable once built; memoisation lives in
//! [`crate::env::BuildEnv`].

mod header;
mod lexer;

use crate::error::{BuildError, Result};
use crate::fs;
use camino::{Utf8Path, Utf8PathBuf};
use std::time::SystemTime;

/// File extension of compilable sources.
pub const SOURCE_EXTENSION: &str = "go";

/// Suffix marking test files, which are never package sources.
pub const TEST_SUFFIX: &str = "_test.go";

/// Parsed header facts for a single source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    path: Utf8PathBuf,
    package_name: String,
    imports: Vec<String>,
    modified_at: SystemTime,
}

impl SourceRecord {
    /// Stat and parse the file at `path`.
    ///
    /// Only the package clause and imports are examined, so a file with a
    /// valid header and a broken body still produces a record.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Io`] if the file cannot be inspected or read and
    /// [`BuildError::Parse`] if its header is malformed.
    pub fn parse(path: &Utf8Path) -> Result<Self> {
        let modified_at = fs::modified_at(path)?;
        let bytes = std::fs::read(path).map_err(|source| BuildError::io("read", path, source))?;
        let text = String::from_utf8_lossy(&bytes);
        let header = header::parse_header(&text).map_err(|err| BuildError::Parse {
            path: path.to_path_buf(),
            line: err.line,
            message: err.message,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            package_name: header.package,
            imports: header.imports,
            modified_at,
        })
    }

    /// Replace the recorded modification time.
    ///
    /// Used when the record was parsed from a stripped copy of a script so that
    /// staleness follows the file the user edits.
    #[must_use]
    pub fn with_modified_at(mut self, modified_at: SystemTime) -> Self {
        self.modified_at = modified_at;
        self
    }

    /// Absolute path of the file; the record's identity.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Package declared by the file.
    #[must_use]
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// Cleaned import paths in source order, duplicates preserved.
    #[must_use]
    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    /// Timestamp compared against compiled artefacts.
    #[must_use]
    pub const fn modified_at(&self) -> SystemTime {
        self.modified_at
    }
}

/// Return `true` when a directory entry named `name` is a package source.
///
/// # Examples
///
/// ```
/// use gorun::source::is_package_source;
/// assert!(is_package_source("util.go"));
/// assert!(!is_package_source("util_test.go"));
/// assert!(!is_package_source("README.md"));
/// ```
#[must_use]
pub fn is_package_source(name: &str) -> bool {
    Utf8Path::new(name).extension() == Some(SOURCE_EXTENSION) && !name.ends_with(TEST_SUFFIX)
}
