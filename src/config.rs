//! Process-wide toolchain configuration.
//!
//! Everything here is resolved once at start-up from the command line and an
//! environment snapshot, then passed by reference into [`crate::env::BuildEnv`].
//! The environment is read through a lookup function so callers (and tests)
//! can supply their own view without mutating process globals.

use crate::error::{BuildError, Result};
use crate::fs::normalize;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use toolchain_env::{
    CACHE_ENV, DEBUGGER_ENV, GOARCH_ENV, GOBIN_ENV, GOOS_ENV, GOROOT_ENV, HOME_ENV, PATH_ENV,
};

/// Installation root used when `GOROOT` is unset.
pub const DEFAULT_GOROOT: &str = "/usr/local/go";

/// Debugger used when no override is configured.
pub const DEFAULT_DEBUGGER: &str = "gdb";

/// Cache directory, relative to the entry file, used by `--cache` alone.
pub const DEFAULT_CACHE_DIR: &str = ".go";

/// Archiver binary name.
pub const ARCHIVER: &str = "gopack";

/// Boolean switches chosen on the command line.
#[expect(
    clippy::struct_excessive_bools,
    reason = "each flag is an independent command-line switch"
)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildFlags {
    /// Keep objects in a cache directory instead of beside the sources.
    pub cache: bool,
    /// Debug build: no optimisation, extra symbols, run under the debugger.
    pub debug: bool,
    /// Delete existing objects and artefacts, then rebuild.
    pub rebuild: bool,
    /// Delete existing objects and artefacts without building.
    pub clean_only: bool,
    /// Disable compiler optimisation.
    pub no_optimize: bool,
    /// Reject `unsafe` imports at compile time.
    pub disallow_unsafe: bool,
    /// Ask the linker to retain extra symbols.
    pub extra_symbols: bool,
    /// Build but do not run the program.
    pub no_run: bool,
    /// Skip building and run the existing binary.
    pub run_only: bool,
}

impl BuildFlags {
    /// Build mode implied by the flags.
    #[must_use]
    pub const fn mode(&self) -> BuildMode {
        if self.debug {
            BuildMode::Debug
        } else {
            BuildMode::Release
        }
    }
}

/// Whether artefacts are built for debugging or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BuildMode {
    /// Unoptimised with extra symbols.
    Debug,
    /// Default optimised build.
    Release,
}

impl BuildMode {
    /// Leaf directory name used inside the cache.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }
}

/// Target architectures understood by the toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Arch {
    /// 64-bit x86.
    Amd64,
    /// 32-bit x86.
    I386,
    /// 32-bit ARM.
    Arm,
}

impl Arch {
    /// Parse a `GOARCH` value.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Config`] for architectures without a toolchain.
    pub fn from_goarch(goarch: &str) -> Result<Self> {
        match goarch {
            "amd64" => Ok(Self::Amd64),
            "386" => Ok(Self::I386),
            "arm" => Ok(Self::Arm),
            other => Err(BuildError::config(format!(
                "unsupported architecture {other}; expected amd64, 386, or arm"
            ))),
        }
    }

    /// Tool prefix and object suffix, e.g. `6` for `6g`, `6l`, and `x.6`.
    #[must_use]
    pub const fn letter(self) -> &'static str {
        match self {
            Self::Amd64 => "6",
            Self::I386 => "8",
            Self::Arm => "5",
        }
    }
}

/// Where compiled objects go when caching is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CacheRoot {
    /// A `./`-prefixed root: the package's relative directory is mirrored
    /// beneath `<entry dir>/<root>`.
    Relative(Utf8PathBuf),
    /// Any other root: each package directory gets a hashed subdirectory.
    Hashed(Utf8PathBuf),
}

/// Immutable toolchain configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolchainConfig {
    /// Target operating system, e.g. `linux`.
    pub goos: String,
    /// Target architecture as spelled in `GOARCH`.
    pub goarch: String,
    /// Parsed architecture.
    pub arch: Arch,
    /// Toolchain installation root.
    pub goroot: Utf8PathBuf,
    /// Directory holding the toolchain binaries, if pinned.
    pub gobin: Option<Utf8PathBuf>,
    /// Cache root, or `None` to build beside the sources.
    pub cache_root: Option<CacheRoot>,
    /// Debugger binary name or path.
    pub debugger: String,
    /// Executable search path.
    pub search_path: Vec<Utf8PathBuf>,
    /// Switches from the command line.
    pub flags: BuildFlags,
}

impl ToolchainConfig {
    /// Resolve configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Config`] when the architecture is unsupported.
    pub fn from_env(flags: BuildFlags) -> Result<Self> {
        Self::from_env_with(flags, |key| std::env::var(key).ok())
    }

    /// Resolve configuration using `read_env` to look up variables. Empty
    /// values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Config`] when the architecture is unsupported.
    pub fn from_env_with<F>(flags: BuildFlags, mut read_env: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut var = |key: &str| read_env(key).filter(|value| !value.is_empty());

        let goos = var(GOOS_ENV).unwrap_or_else(|| host_goos().to_owned());
        let goarch = var(GOARCH_ENV).unwrap_or_else(|| host_goarch().to_owned());
        let arch = Arch::from_goarch(&goarch)?;
        let goroot = var(GOROOT_ENV).map_or_else(|| Utf8PathBuf::from(DEFAULT_GOROOT), Utf8PathBuf::from);
        let gobin = var(GOBIN_ENV).map(Utf8PathBuf::from);
        let home = var(HOME_ENV);
        let cache_root = resolve_cache_root(var(CACHE_ENV), flags.cache, home.as_deref());
        let debugger = var(DEBUGGER_ENV).unwrap_or_else(|| DEFAULT_DEBUGGER.to_owned());
        let search_path = var(PATH_ENV).map(|raw| parse_search_path(&raw)).unwrap_or_default();

        Ok(Self {
            goos,
            goarch,
            arch,
            goroot,
            gobin,
            cache_root,
            debugger,
            search_path,
            flags,
        })
    }

    /// Directory holding installed package archives.
    #[must_use]
    pub fn package_root(&self) -> Utf8PathBuf {
        self.goroot
            .join("pkg")
            .join(format!("{}_{}", self.goos, self.goarch))
    }

    /// Expected archive of an installed package.
    #[must_use]
    pub fn installed_archive(&self, import_id: &str) -> Utf8PathBuf {
        self.package_root().join(format!("{import_id}.a"))
    }

    /// Object file suffix, e.g. `6`.
    #[must_use]
    pub const fn object_suffix(&self) -> &'static str {
        self.arch.letter()
    }

    /// Path of the compiler binary.
    #[must_use]
    pub fn compiler(&self) -> Utf8PathBuf {
        self.tool(&format!("{}g", self.arch.letter()))
    }

    /// Path of the linker binary.
    #[must_use]
    pub fn linker(&self) -> Utf8PathBuf {
        self.tool(&format!("{}l", self.arch.letter()))
    }

    /// Path of the archiver binary.
    #[must_use]
    pub fn archiver(&self) -> Utf8PathBuf {
        self.tool(ARCHIVER)
    }

    /// Locate a toolchain binary: inside `gobin` when pinned, otherwise the
    /// first match on the search path, otherwise the bare name.
    fn tool(&self, name: &str) -> Utf8PathBuf {
        if let Some(dir) = &self.gobin {
            return dir.join(name);
        }
        find_executable(name, &self.search_path).unwrap_or_else(|| Utf8PathBuf::from(name))
    }

    /// Locate the configured debugger.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Config`] when it is not on the search path.
    pub fn debugger_path(&self) -> Result<Utf8PathBuf> {
        find_executable(&self.debugger, &self.search_path)
            .ok_or_else(|| BuildError::config(format!("cannot find debugger {}", self.debugger)))
    }
}

/// Find `name` in `search_path`. Names containing a separator are checked
/// directly. Only regular files match.
#[must_use]
pub fn find_executable(name: &str, search_path: &[Utf8PathBuf]) -> Option<Utf8PathBuf> {
    let is_file = |path: &Utf8Path| path.metadata().is_ok_and(|meta| meta.is_file());
    if name.contains('/') {
        let direct = Utf8PathBuf::from(name);
        return is_file(&direct).then_some(direct);
    }
    search_path
        .iter()
        .map(|dir| dir.join(name))
        .find(|candidate| is_file(candidate))
}

fn parse_search_path(raw: &str) -> Vec<Utf8PathBuf> {
    std::env::split_paths(raw)
        .filter_map(|entry| Utf8PathBuf::from_path_buf(entry).ok())
        .map(|entry| {
            if entry.as_str().is_empty() {
                Utf8PathBuf::from(".")
            } else {
                entry
            }
        })
        .collect()
}

/// Decide the cache root from the configured value and `--cache`.
///
/// A configured value enables caching on its own. `.` selects the default
/// directory, a leading `~` expands to `home`, and a `./` prefix keeps the
/// root relative to the entry file.
fn resolve_cache_root(configured: Option<String>, enabled: bool, home: Option<&str>) -> Option<CacheRoot> {
    let raw = match configured {
        Some(value) => value,
        None if enabled => String::from("."),
        None => return None,
    };
    if raw == "." {
        return Some(CacheRoot::Relative(Utf8PathBuf::from(DEFAULT_CACHE_DIR)));
    }
    if let Some(relative) = raw.strip_prefix("./") {
        return Some(CacheRoot::Relative(normalize(Utf8Path::new(relative))));
    }
    let expanded = match (raw.strip_prefix('~'), home) {
        (Some(rest), Some(home_dir)) => {
            Utf8PathBuf::from(home_dir).join(rest.trim_start_matches('/'))
        }
        _ => Utf8PathBuf::from(&raw),
    };
    Some(CacheRoot::Hashed(normalize(&expanded)))
}

fn host_goos() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

fn host_goarch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        other => other,
    }
}
