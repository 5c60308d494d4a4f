//! Filesystem probes shared by the build engine.
//!
//! Paths are UTF-8 throughout. Canonicalisation goes through capability-based
//! directory handles; everything else is a thin wrapper that attaches the
//! offending path to the error.

use crate::error::{BuildError, Result};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs as cap_fs};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Canonicalise `path`, resolving symlinks, and require the result be UTF-8.
///
/// Relative paths are first anchored at the process working directory so that
/// `..` segments never escape the capability handle.
///
/// # Errors
///
/// Returns an [`io::Error`] when the path does not exist or is not UTF-8.
pub fn canonicalize_utf8_path(path: &Path) -> io::Result<Utf8PathBuf> {
    let utf8 = Utf8Path::from_path(path).ok_or_else(|| {
        io::Error::new(
            ErrorKind::InvalidData,
            format!("path {} is not valid UTF-8", path.display()),
        )
    })?;
    let absolute = if utf8.is_relative() {
        let cwd = convert_path_to_utf8(std::env::current_dir()?, Utf8Path::new("."))?;
        normalize(&cwd.join(utf8))
    } else {
        normalize(utf8)
    };

    let (Some(parent), Some(name)) = (absolute.parent(), absolute.file_name()) else {
        return Ok(absolute);
    };
    let handle = cap_fs::Dir::open_ambient_dir(parent.as_std_path(), ambient_authority())?;
    let resolved = handle.canonicalize(Path::new(name))?;
    let canonical = convert_path_to_utf8(resolved, &absolute)?;
    if canonical.is_absolute() {
        Ok(canonical)
    } else {
        Ok(normalize(&parent.join(canonical)))
    }
}

fn convert_path_to_utf8(buf: PathBuf, reference: &Utf8Path) -> io::Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(buf).map_err(|_| {
        io::Error::new(
            ErrorKind::InvalidData,
            format!("canonical path for {reference} is not valid UTF-8"),
        )
    })
}

/// Lexically normalise `path`: drop `.` segments, fold `..` into the previous
/// segment, and collapse repeated separators. The filesystem is not touched.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use gorun::fs::normalize;
/// assert_eq!(normalize(Utf8Path::new("/a/./b/../c")), Utf8Path::new("/a/c"));
/// assert_eq!(normalize(Utf8Path::new("a/..")), Utf8Path::new("."));
/// ```
#[must_use]
pub fn normalize(path: &Utf8Path) -> Utf8PathBuf {
    let mut out: Vec<Utf8Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => match out.last() {
                Some(Utf8Component::Normal(_)) => {
                    out.pop();
                }
                Some(Utf8Component::RootDir | Utf8Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return Utf8PathBuf::from(".");
    }
    out.iter().collect()
}

/// Return `true` if anything (file, directory, or dangling link) sits at `path`.
#[must_use]
pub fn exists(path: &Utf8Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Modification time of `path` without following symlinks.
///
/// # Errors
///
/// Returns [`BuildError::Io`] when the path cannot be inspected.
pub fn modified_at(path: &Utf8Path) -> Result<SystemTime> {
    fs::symlink_metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|source| BuildError::io("stat", path, source))
}

/// Modification time of `path`, or `None` when it does not exist.
///
/// # Errors
///
/// Returns [`BuildError::Io`] for failures other than a missing file.
pub fn modified_if_exists(path: &Utf8Path) -> Result<Option<SystemTime>> {
    match modified_at(path) {
        Ok(time) => Ok(Some(time)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Names of the regular files directly inside `dir`, sorted.
///
/// A directory that cannot be read yields an empty list, matching how a
/// missing package directory simply contributes no sources.
#[must_use]
pub fn list_files(dir: &Utf8Path) -> Vec<String> {
    let Ok(entries) = dir.read_dir_utf8() else {
        tracing::debug!(%dir, "directory unreadable; treating as empty");
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|kind| !kind.is_dir()))
        .map(|entry| entry.file_name().to_owned())
        .collect();
    names.sort_unstable();
    names
}

/// Create `dir` and any missing parents. An existing directory is fine.
///
/// # Errors
///
/// Returns [`BuildError::Io`] when creation fails.
pub fn create_dir_all(dir: &Utf8Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| BuildError::io("create directory", dir, source))
}

/// Remove the file at `path`. A missing file counts as success; any other
/// failure is logged as a warning and otherwise ignored.
pub fn remove_quietly(path: &Utf8Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::debug!(%path, "removed"),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => tracing::warn!(%path, error = %err, "could not remove file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a/b/../c", "a/c")]
    #[case("./a//b/.", "a/b")]
    #[case("..", "..")]
    #[case("../a/..", "..")]
    #[case("/..", "/")]
    #[case("", ".")]
    fn normalize_is_lexical(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize(Utf8Path::new(input)), Utf8PathBuf::from(expected));
    }

    #[test]
    fn list_files_skips_directories_and_sorts() {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8Path::from_path(temp.path()).expect("utf8 temp dir");
        fs::write(root.join("b.go"), "").expect("write b");
        fs::write(root.join("a.go"), "").expect("write a");
        fs::create_dir(root.join("sub.go")).expect("mkdir");
        assert_eq!(list_files(root), vec!["a.go".to_owned(), "b.go".to_owned()]);
    }

    #[test]
    fn list_files_of_missing_dir_is_empty() {
        assert!(list_files(Utf8Path::new("/definitely/not/here")).is_empty());
    }

    #[test]
    fn modified_if_exists_reports_missing_as_none() {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8Path::from_path(temp.path()).expect("utf8 temp dir");
        assert!(modified_if_exists(&root.join("nope")).expect("probe").is_none());
    }

    #[test]
    fn remove_quietly_tolerates_missing_files() {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8Path::from_path(temp.path()).expect("utf8 temp dir");
        let file = root.join("gone");
        remove_quietly(&file);
        fs::write(&file, "x").expect("write");
        remove_quietly(&file);
        assert!(!exists(&file));
    }
}
