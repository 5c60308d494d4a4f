//! Graph discovery: sources, object directories, staleness, dependencies.

use super::{MAIN_IMPORT_ID, Target, TargetGraph, TargetId, cache, cycle::VisitState};
use crate::env::BuildEnv;
use crate::error::{BuildError, Result};
use crate::fs;
use crate::source::{SourceRecord, is_package_source};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::rc::Rc;

/// Split an import path into its directory and package name.
///
/// `a/b/c` lives in directory `a/b` and declares package `c`; a bare `c`
/// lives in the base directory.
fn split_import(import_id: &str) -> (&Utf8Path, &str) {
    match import_id.rsplit_once('/') {
        Some((dir, package)) => (Utf8Path::new(dir), package),
        None => (Utf8Path::new("."), import_id),
    }
}

impl TargetGraph {
    /// Add the program entry and resolve the whole graph below it.
    ///
    /// # Errors
    ///
    /// Fails with the first error met anywhere in the graph.
    pub fn resolve_entry(&mut self, env: &mut BuildEnv<'_>, entry: Target) -> Result<TargetId> {
        let id = self.insert(entry);
        self.resolve(env, id)?;
        Ok(id)
    }

    /// Resolve `id` and, transitively, every dependency it imports.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::NoSourcesFound`] for a local package without
    /// sources, [`BuildError::ImportCycle`] when local packages import each
    /// other, and any I/O or parse failure met on the way.
    pub fn resolve(&mut self, env: &mut BuildEnv<'_>, id: TargetId) -> Result<()> {
        self.enter(id);
        let outcome = self.resolve_target(env, id);
        self.leave(id, outcome.is_ok());
        outcome
    }

    fn resolve_target(&mut self, env: &mut BuildEnv<'_>, id: TargetId) -> Result<()> {
        if self.resolve_installed(env, id) {
            return Ok(());
        }

        let import_id = self[id].import_id.clone();
        let (rel_dir, package) = if import_id == MAIN_IMPORT_ID {
            (Utf8Path::new("."), MAIN_IMPORT_ID)
        } else {
            split_import(&import_id)
        };
        let source_dir = fs::normalize(&env.base_dir().join(rel_dir));
        if !self[id].sources_pinned {
            self[id].sources = discover_sources(env, &source_dir, package)?;
        }
        if self[id].sources.is_empty() {
            return Err(BuildError::NoSourcesFound {
                import_id,
                dir: source_dir,
            });
        }

        let config = env.config();
        let layout = cache::layout(config, env.base_dir(), rel_dir, &source_dir);
        let target = &mut self[id];
        target.object_dir = Some(layout.dir.clone());
        target.is_local = true;
        let object = target.object_file(config).unwrap_or_default();
        let artifact = target.artifact().unwrap_or_default();
        cache::prepare(
            env.flags(),
            &layout,
            &source_dir,
            &[object.clone(), artifact.clone()],
        )?;
        target.dirty = cache::is_stale(&object, &artifact, target.sources.values())?;
        tracing::debug!(import_id = %import_id, dirty = target.dirty, object_dir = %layout.dir, "resolved");

        let imports: Vec<String> = target
            .sources
            .values()
            .flat_map(|record| record.imports().iter().cloned())
            .collect();
        for import in imports {
            self.add_dependency(env, id, &import)?;
        }
        Ok(())
    }

    /// Short-circuit packages that already have an installed archive.
    fn resolve_installed(&mut self, env: &BuildEnv<'_>, id: TargetId) -> bool {
        let target = &mut self[id];
        if target.is_main() {
            return false;
        }
        let archive = env.config().installed_archive(&target.import_id);
        if !fs::exists(&archive) {
            return false;
        }
        target.object_dir = archive.parent().map(Utf8Path::to_path_buf);
        target.is_local = false;
        target.dirty = false;
        tracing::debug!(import_id = %target.import_id, %archive, "using installed package");
        true
    }

    /// Attach the target for `import` to `parent`.
    ///
    /// A dependency already in `parent`'s list moves to the end so the list
    /// reflects the most recent point of use. Targets already resolved
    /// elsewhere in the graph are reused as they are.
    fn add_dependency(
        &mut self,
        env: &mut BuildEnv<'_>,
        parent: TargetId,
        import: &str,
    ) -> Result<()> {
        let existing = self.lookup(import);
        if let Some(dep) = existing
            && let Some(pos) = self[parent].deps.iter().position(|id| *id == dep)
        {
            let deps = &mut self[parent].deps;
            deps.remove(pos);
            deps.push(dep);
            tracing::debug!(parent = %self[parent].import_id, dep = import, "moved dependency to end");
            return Ok(());
        }

        let dep = match existing {
            Some(dep) => match self.state(dep) {
                Some(VisitState::Visiting) => return Err(self.cycle_error(dep)),
                Some(VisitState::Visited) => dep,
                None => {
                    self.resolve(env, dep)?;
                    dep
                }
            },
            None => {
                let dep = self.insert(Target::package(import));
                self.resolve(env, dep)?;
                dep
            }
        };
        if self[dep].is_local {
            self[parent].deps.push(dep);
        }
        Ok(())
    }
}

/// Collect the sources in `dir` that declare `package`.
fn discover_sources(
    env: &mut BuildEnv<'_>,
    dir: &Utf8Path,
    package: &str,
) -> Result<IndexMap<Utf8PathBuf, Rc<SourceRecord>>> {
    let mut sources = IndexMap::new();
    for name in fs::list_files(dir) {
        if !is_package_source(&name) {
            continue;
        }
        let path = dir.join(&name);
        if let Some(record) = env.get_source(&path)?
            && record.package_name() == package
        {
            sources.insert(path, record);
        }
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("util", ".", "util")]
    #[case("lib/strutil", "lib", "strutil")]
    #[case("a/b/c", "a/b", "c")]
    fn imports_split_into_dir_and_package(
        #[case] import: &str,
        #[case] dir: &str,
        #[case] package: &str,
    ) {
        assert_eq!(split_import(import), (Utf8Path::new(dir), package));
    }
}
