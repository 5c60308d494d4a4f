//! Object directory layout, clean/rebuild housekeeping, and staleness checks.

use crate::config::{BuildFlags, CacheRoot, ToolchainConfig};
use crate::error::{BuildError, Result};
use crate::fs;
use crate::source::SourceRecord;
use camino::{Utf8Path, Utf8PathBuf};
use sha2::{Digest, Sha256};
use std::rc::Rc;

/// Sidecar naming the source directory a hashed cache directory belongs to.
pub(crate) const SOURCE_DIR_SIDECAR: &str = "source-dir";

/// Where a target's artefacts go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct ObjectLayout {
    /// Directory holding object, archive, and binary.
    pub(super) dir: Utf8PathBuf,
    /// Hashed per-directory root carrying the sidecar, when one is used.
    pub(super) hashed_dir: Option<Utf8PathBuf>,
}

/// Lowercase hex SHA-256 of a directory path.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(hash_source_dir(Utf8Path::new("/src")).len(), 64);
/// ```
fn hash_source_dir(source_dir: &Utf8Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_dir.as_str().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Decide the object directory for sources in `source_dir`, which is
/// `base_dir/rel_dir`.
pub(super) fn layout(
    config: &ToolchainConfig,
    base_dir: &Utf8Path,
    rel_dir: &Utf8Path,
    source_dir: &Utf8Path,
) -> ObjectLayout {
    let mode = config.flags.mode().dir_name();
    match &config.cache_root {
        None => ObjectLayout {
            dir: source_dir.to_path_buf(),
            hashed_dir: None,
        },
        Some(CacheRoot::Relative(root)) => ObjectLayout {
            dir: fs::normalize(&base_dir.join(root).join(rel_dir).join(mode)),
            hashed_dir: None,
        },
        Some(CacheRoot::Hashed(root)) => {
            let hashed = root.join(hash_source_dir(source_dir));
            ObjectLayout {
                dir: hashed.join(mode),
                hashed_dir: Some(hashed),
            }
        }
    }
}

/// Create the object directory or, in clean and rebuild modes, delete the
/// previous object and final artefact from it. Also claims or verifies the
/// hashed directory's sidecar.
///
/// # Errors
///
/// Returns [`BuildError::Io`] when directory creation or the sidecar fails and
/// [`BuildError::CacheCollision`] when the hashed directory belongs elsewhere.
pub(super) fn prepare(
    flags: &BuildFlags,
    layout: &ObjectLayout,
    source_dir: &Utf8Path,
    stale_outputs: &[Utf8PathBuf],
) -> Result<()> {
    if !fs::exists(&layout.dir) {
        if !flags.clean_only {
            fs::create_dir_all(&layout.dir)?;
        }
    } else if flags.clean_only || flags.rebuild {
        for output in stale_outputs {
            fs::remove_quietly(output);
        }
    }
    if let Some(hashed) = &layout.hashed_dir
        && fs::exists(hashed)
    {
        claim_sidecar(hashed, source_dir)?;
    }
    Ok(())
}

fn claim_sidecar(hashed: &Utf8Path, source_dir: &Utf8Path) -> Result<()> {
    let sidecar = hashed.join(SOURCE_DIR_SIDECAR);
    match std::fs::read_to_string(&sidecar) {
        Ok(recorded) if recorded == source_dir.as_str() => Ok(()),
        Ok(recorded) => Err(BuildError::CacheCollision {
            dir: hashed.to_path_buf(),
            expected: source_dir.to_path_buf(),
            found: recorded,
        }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            std::fs::write(&sidecar, source_dir.as_str())
                .map_err(|source| BuildError::io("write", &sidecar, source))
        }
        Err(source) => Err(BuildError::io("read", sidecar, source)),
    }
}

/// Return `true` if `object` is missing or older than any of `sources`, or
/// if the `artifact` linked or archived from it is missing.
///
/// # Errors
///
/// Returns [`BuildError::Io`] when the object exists but cannot be inspected.
pub(super) fn is_stale<'a>(
    object: &Utf8Path,
    artifact: &Utf8Path,
    sources: impl IntoIterator<Item = &'a Rc<SourceRecord>>,
) -> Result<bool> {
    let Some(built_at) = fs::modified_if_exists(object)? else {
        tracing::debug!(%object, "object missing");
        return Ok(true);
    };
    if !fs::exists(artifact) {
        tracing::debug!(%artifact, "artefact missing");
        return Ok(true);
    }
    let newer = sources
        .into_iter()
        .find(|record| record.modified_at() > built_at);
    if let Some(record) = newer {
        tracing::debug!(%object, source = %record.path(), "source newer than object");
        return Ok(true);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildFlags;
    use rstest::rstest;
    use std::time::{Duration, SystemTime};

    fn config(cache_root: Option<CacheRoot>, debug: bool) -> ToolchainConfig {
        let flags = BuildFlags {
            debug,
            ..BuildFlags::default()
        };
        let mut config = ToolchainConfig::from_env_with(flags, |key| {
            (key == toolchain_env::GOARCH_ENV).then(|| "amd64".to_owned())
        })
        .expect("config");
        config.cache_root = cache_root;
        config
    }

    #[rstest]
    #[case(None, false, "/work/lib")]
    #[case(Some(CacheRoot::Relative(".go".into())), false, "/work/.go/lib/release")]
    #[case(Some(CacheRoot::Relative("out/cache".into())), true, "/work/out/cache/lib/debug")]
    fn unhashed_layouts(
        #[case] root: Option<CacheRoot>,
        #[case] debug: bool,
        #[case] expected: &str,
    ) {
        let cfg = config(root, debug);
        let plan = layout(&cfg, Utf8Path::new("/work"), Utf8Path::new("lib"), Utf8Path::new("/work/lib"));
        assert_eq!(plan.dir, Utf8PathBuf::from(expected));
        assert!(plan.hashed_dir.is_none());
    }

    #[test]
    fn hashed_layout_is_stable_per_directory() {
        let cfg = config(Some(CacheRoot::Hashed("/cache".into())), false);
        let first = layout(&cfg, Utf8Path::new("/w"), Utf8Path::new("."), Utf8Path::new("/w"));
        let again = layout(&cfg, Utf8Path::new("/w"), Utf8Path::new("."), Utf8Path::new("/w"));
        let other = layout(&cfg, Utf8Path::new("/w"), Utf8Path::new("lib"), Utf8Path::new("/w/lib"));
        assert_eq!(first, again);
        assert_ne!(first.dir, other.dir);
        let hashed = first.hashed_dir.expect("hashed dir");
        assert_eq!(first.dir, hashed.join("release"));
        assert_eq!(hashed.file_name().map(str::len), Some(64));
    }

    #[test]
    fn sidecar_mismatch_is_a_collision() {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8Path::from_path(temp.path()).expect("utf8 temp dir");
        let plan = ObjectLayout {
            dir: root.join("h/release"),
            hashed_dir: Some(root.join("h")),
        };
        let flags = BuildFlags::default();
        prepare(&flags, &plan, Utf8Path::new("/src/a"), &[]).expect("first claim");
        assert_eq!(
            std::fs::read_to_string(root.join("h").join(SOURCE_DIR_SIDECAR)).expect("sidecar"),
            "/src/a"
        );
        prepare(&flags, &plan, Utf8Path::new("/src/a"), &[]).expect("same owner");
        let err = prepare(&flags, &plan, Utf8Path::new("/src/b"), &[]).expect_err("collision");
        assert!(matches!(err, BuildError::CacheCollision { .. }));
    }

    #[test]
    fn clean_only_never_creates_directories() {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8Path::from_path(temp.path()).expect("utf8 temp dir");
        let plan = ObjectLayout {
            dir: root.join("h/release"),
            hashed_dir: Some(root.join("h")),
        };
        let flags = BuildFlags {
            clean_only: true,
            ..BuildFlags::default()
        };
        prepare(&flags, &plan, Utf8Path::new("/src/a"), &[]).expect("prepare");
        assert!(!fs::exists(&root.join("h")));
    }

    #[test]
    fn rebuild_removes_previous_outputs() {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8Path::from_path(temp.path()).expect("utf8 temp dir");
        let object = root.join("util.6");
        let archive = root.join("util.a");
        std::fs::write(&object, "").expect("object");
        let plan = ObjectLayout {
            dir: root.to_path_buf(),
            hashed_dir: None,
        };
        let flags = BuildFlags {
            rebuild: true,
            ..BuildFlags::default()
        };
        prepare(&flags, &plan, root, &[object.clone(), archive]).expect("prepare");
        assert!(!fs::exists(&object));
    }

    #[test]
    fn staleness_checks_object_mtime_and_artefact() {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8Path::from_path(temp.path()).expect("utf8 temp dir");
        let source = root.join("a.go");
        std::fs::write(&source, "package a\n").expect("source");
        let object = root.join("a.6");
        let archive = root.join("a.a");
        std::fs::write(&archive, "").expect("archive");
        let record = Rc::new(SourceRecord::parse(&source).expect("parse"));
        assert!(is_stale(&object, &archive, [&record]).expect("missing object"));

        std::fs::write(&object, "").expect("object");
        let file = std::fs::File::options().write(true).open(&object).expect("open");
        let built = SystemTime::now() + Duration::from_secs(60);
        file.set_modified(built).expect("set mtime");

        let older = Rc::new(SourceRecord::parse(&source).expect("parse").with_modified_at(built));
        assert!(!is_stale(&object, &archive, [&older]).expect("equal stamps are fresh"));
        let newer = Rc::new(
            SourceRecord::parse(&source)
                .expect("parse")
                .with_modified_at(built + Duration::from_secs(1)),
        );
        assert!(is_stale(&object, &archive, [&older, &newer]).expect("newer source"));

        std::fs::remove_file(&archive).expect("remove archive");
        assert!(is_stale(&object, &archive, [&older]).expect("missing archive"));
    }
}
