//! Per-invocation build environment.
//!
//! Holds the immutable configuration plus the two pieces of mutable state
//! shared by every target: the memoised source records and the set of paths
//! that must be treated as absent.

use crate::config::{BuildFlags, ToolchainConfig};
use crate::error::Result;
use crate::source::SourceRecord;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Configuration and caches for one run of the build engine.
#[derive(Debug)]
pub struct BuildEnv<'cfg> {
    config: &'cfg ToolchainConfig,
    base_dir: Utf8PathBuf,
    source_cache: HashMap<Utf8PathBuf, Rc<SourceRecord>>,
    ignored: HashSet<Utf8PathBuf>,
}

impl<'cfg> BuildEnv<'cfg> {
    /// Create an environment rooted at `base_dir`, the entry file's directory.
    /// Local import paths resolve relative to it.
    #[must_use]
    pub fn new(config: &'cfg ToolchainConfig, base_dir: Utf8PathBuf) -> Self {
        Self {
            config,
            base_dir,
            source_cache: HashMap::new(),
            ignored: HashSet::new(),
        }
    }

    /// Toolchain configuration.
    #[must_use]
    pub const fn config(&self) -> &'cfg ToolchainConfig {
        self.config
    }

    /// Command-line switches.
    #[must_use]
    pub const fn flags(&self) -> &'cfg BuildFlags {
        &self.config.flags
    }

    /// Directory that local import paths are relative to.
    #[must_use]
    pub fn base_dir(&self) -> &Utf8Path {
        &self.base_dir
    }

    /// Treat `path` as absent from now on.
    pub fn ignore(&mut self, path: Utf8PathBuf) {
        self.ignored.insert(path);
    }

    /// Return `true` if `path` has been marked absent.
    #[must_use]
    pub fn is_ignored(&self, path: &Utf8Path) -> bool {
        self.ignored.contains(path)
    }

    /// Fetch the record for `path`, parsing it on first use.
    ///
    /// Ignored paths yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Propagates I/O and parse failures from [`SourceRecord::parse`].
    pub fn get_source(&mut self, path: &Utf8Path) -> Result<Option<Rc<SourceRecord>>> {
        if self.is_ignored(path) {
            return Ok(None);
        }
        if let Some(record) = self.source_cache.get(path) {
            return Ok(Some(Rc::clone(record)));
        }
        let record = Rc::new(SourceRecord::parse(path)?);
        tracing::debug!(%path, package = record.package_name(), "parsed source header");
        self.source_cache
            .insert(path.to_path_buf(), Rc::clone(&record));
        Ok(Some(record))
    }

    /// Number of distinct files parsed so far.
    #[must_use]
    pub fn cached_sources(&self) -> usize {
        self.source_cache.len()
    }
}
