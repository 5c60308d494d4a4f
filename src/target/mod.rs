//! Compilable units and the arena that owns them.
//!
//! A [`Target`] is either the program entry or a package named by an import
//! path. Targets live in a [`TargetGraph`] keyed by import id, so a package
//! referenced from several places is resolved and built exactly once per run.
//! Dependencies are stored as [`TargetId`] indices rather than references.

mod build;
mod cache;
mod cycle;
mod resolve;

use crate::config::ToolchainConfig;
use crate::error::{BuildError, Result};
use crate::source::SourceRecord;
use camino::{Utf8Path, Utf8PathBuf};
use cycle::VisitState;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::ops::{Index, IndexMut};
use std::rc::Rc;

/// Import id reserved for the program entry.
pub const MAIN_IMPORT_ID: &str = "main";

/// Index of a target inside its [`TargetGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(usize);

/// One package or the program entry.
#[derive(Debug, Clone)]
pub struct Target {
    name: String,
    import_id: String,
    object_dir: Option<Utf8PathBuf>,
    sources: IndexMap<Utf8PathBuf, Rc<SourceRecord>>,
    deps: Vec<TargetId>,
    is_local: bool,
    dirty: bool,
    sources_pinned: bool,
}

impl Target {
    /// A package target for `import_id`, named after its last path segment.
    #[must_use]
    pub fn package(import_id: &str) -> Self {
        let name = import_id.rsplit('/').next().unwrap_or(import_id);
        Self::with_name(name, import_id)
    }

    /// The program entry named `name`, whose only source is `record`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::NotAProgram`] unless the record declares
    /// `package main`.
    pub fn entry(name: &str, record: Rc<SourceRecord>) -> Result<Self> {
        if record.package_name() != MAIN_IMPORT_ID {
            return Err(BuildError::NotAProgram {
                package: record.package_name().to_owned(),
            });
        }
        let mut target = Self::with_name(name, MAIN_IMPORT_ID);
        target
            .sources
            .insert(record.path().to_path_buf(), record);
        target.sources_pinned = true;
        Ok(target)
    }

    fn with_name(name: &str, import_id: &str) -> Self {
        Self {
            name: name.to_owned(),
            import_id: import_id.to_owned(),
            object_dir: None,
            sources: IndexMap::new(),
            deps: Vec::new(),
            is_local: true,
            dirty: false,
            sources_pinned: false,
        }
    }

    /// Artefact base name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Graph identity: `main` or the import path.
    #[must_use]
    pub fn import_id(&self) -> &str {
        &self.import_id
    }

    /// Return `true` for the program entry.
    #[must_use]
    pub fn is_main(&self) -> bool {
        self.import_id == MAIN_IMPORT_ID
    }

    /// Directory holding this target's artefacts, once resolved.
    #[must_use]
    pub fn object_dir(&self) -> Option<&Utf8Path> {
        self.object_dir.as_deref()
    }

    /// Owned source records keyed by path.
    #[must_use]
    pub const fn sources(&self) -> &IndexMap<Utf8PathBuf, Rc<SourceRecord>> {
        &self.sources
    }

    /// Local dependencies in include order.
    #[must_use]
    pub fn deps(&self) -> &[TargetId] {
        &self.deps
    }

    /// Return `true` if this tool compiles the target itself.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        self.is_local
    }

    /// Return `true` if the target's artefact must be rebuilt.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Compiled object, e.g. `<dir>/util.6`.
    #[must_use]
    pub fn object_file(&self, config: &ToolchainConfig) -> Option<Utf8PathBuf> {
        self.object_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.{}", self.name, config.object_suffix())))
    }

    /// Final artefact: the executable for the entry, the archive otherwise.
    #[must_use]
    pub fn artifact(&self) -> Option<Utf8PathBuf> {
        self.object_dir.as_ref().map(|dir| {
            if self.is_main() {
                dir.join(&self.name)
            } else {
                dir.join(format!("{}.a", self.name))
            }
        })
    }
}

/// Arena of targets indexed by import id.
#[derive(Debug, Default)]
pub struct TargetGraph {
    targets: Vec<Target>,
    index: HashMap<String, TargetId>,
    states: HashMap<TargetId, VisitState>,
    stack: Vec<TargetId>,
    built: HashMap<TargetId, bool>,
}

impl TargetGraph {
    /// An empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `target` to the arena. A target with the same import id is replaced
    /// in the index but keeps its slot.
    pub fn insert(&mut self, target: Target) -> TargetId {
        let id = TargetId(self.targets.len());
        self.index.insert(target.import_id.clone(), id);
        self.targets.push(target);
        id
    }

    /// Look up a target by import id.
    #[must_use]
    pub fn lookup(&self, import_id: &str) -> Option<TargetId> {
        self.index.get(import_id).copied()
    }

    /// Number of targets, including installed packages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Return `true` when no target has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Every local target reachable from `id`, dependencies before
    /// dependents, each listed once. `id` itself is excluded.
    #[must_use]
    pub fn link_closure(&self, id: TargetId) -> Vec<TargetId> {
        fn walk(graph: &TargetGraph, id: TargetId, seen: &mut Vec<TargetId>) {
            for &dep in graph[id].deps() {
                if !seen.contains(&dep) {
                    walk(graph, dep, seen);
                    seen.push(dep);
                }
            }
        }
        let mut seen = Vec::new();
        walk(self, id, &mut seen);
        seen
    }

    /// Render the graph as JSON for diagnostics.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let snapshot: Vec<TargetSnapshot<'_>> = self
            .targets
            .iter()
            .map(|target| TargetSnapshot {
                name: &target.name,
                import_id: &target.import_id,
                object_dir: target.object_dir.as_deref(),
                sources: target.sources.keys().map(Utf8PathBuf::as_path).collect(),
                deps: target
                    .deps
                    .iter()
                    .map(|dep| self[*dep].import_id.as_str())
                    .collect(),
                is_local: target.is_local,
                dirty: target.dirty,
            })
            .collect();
        serde_json::to_value(snapshot).unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Serialize)]
struct TargetSnapshot<'a> {
    name: &'a str,
    import_id: &'a str,
    object_dir: Option<&'a Utf8Path>,
    sources: Vec<&'a Utf8Path>,
    deps: Vec<&'a str>,
    is_local: bool,
    dirty: bool,
}

impl Index<TargetId> for TargetGraph {
    type Output = Target;

    #[expect(
        clippy::indexing_slicing,
        reason = "TargetId values are only minted by TargetGraph::insert"
    )]
    fn index(&self, id: TargetId) -> &Target {
        &self.targets[id.0]
    }
}

impl IndexMut<TargetId> for TargetGraph {
    #[expect(
        clippy::indexing_slicing,
        reason = "TargetId values are only minted by TargetGraph::insert"
    )]
    fn index_mut(&mut self, id: TargetId) -> &mut Target {
        &mut self.targets[id.0]
    }
}
