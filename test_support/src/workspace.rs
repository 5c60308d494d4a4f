//! Scratch source trees.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{self, File};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// A temporary directory holding a program and its packages.
#[derive(Debug)]
pub struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    /// Create an empty workspace.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .expect("utf8 temp dir")
            .canonicalize_utf8()
            .expect("canonical temp dir");
        Self { _dir: dir, root }
    }

    /// Workspace root.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Absolute path of `rel`.
    pub fn path(&self, rel: &str) -> Utf8PathBuf {
        self.root.join(rel)
    }

    /// Write `contents` to `rel`, creating parent directories, and return the
    /// absolute path.
    pub fn write(&self, rel: &str, contents: &str) -> Utf8PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&path, contents).expect("write file");
        path
    }

    /// Set the modification time of `rel`.
    pub fn set_mtime(&self, rel: &str, stamp: SystemTime) {
        let file = File::options()
            .write(true)
            .open(self.path(rel))
            .expect("open for mtime");
        file.set_modified(stamp).expect("set mtime");
    }

    /// Mark `rel` as edited after anything built so far by moving its
    /// modification time an hour into the future.
    pub fn touch(&self, rel: &str) {
        self.set_mtime(rel, SystemTime::now() + Duration::from_secs(3600));
    }

    /// Return `true` if `rel` exists.
    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}
