#![forbid(unsafe_code)]

//! Environment variable names shared by gorun (library, binary, and tests).

/// Target operating system of the toolchain, e.g. `linux`.
pub const GOOS_ENV: &str = "GOOS";

/// Target architecture of the toolchain, e.g. `amd64`.
pub const GOARCH_ENV: &str = "GOARCH";

/// Root of the toolchain installation holding `pkg/<os>_<arch>`.
pub const GOROOT_ENV: &str = "GOROOT";

/// Directory containing the compiler, linker, and archiver binaries.
pub const GOBIN_ENV: &str = "GOBIN";

/// Cache root override for compiled objects.
///
/// # Examples
///
/// ```
/// use toolchain_env::CACHE_ENV;
/// assert_eq!(CACHE_ENV, "GORUN_CACHE");
/// ```
pub const CACHE_ENV: &str = "GORUN_CACHE";

/// Debugger binary used for `--debug` runs.
pub const DEBUGGER_ENV: &str = "GORUN_GDB";

/// Executable search path.
pub const PATH_ENV: &str = "PATH";

/// Home directory used to expand a leading `~` in the cache root.
pub const HOME_ENV: &str = "HOME";
