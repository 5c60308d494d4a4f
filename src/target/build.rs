//! Ordered compilation of a resolved graph.

use super::{TargetGraph, TargetId};
use crate::config::ToolchainConfig;
use crate::error::Result;
use crate::runner::process::{Invocation, ProcessGateway};
use camino::Utf8Path;

impl TargetGraph {
    /// Build `id` after its dependencies.
    ///
    /// Returns `true` if this target's own artefact was rebuilt. A target is
    /// rebuilt when it is stale or when any dependency was rebuilt. Each
    /// target is built at most once; later calls return the first outcome.
    ///
    /// # Errors
    ///
    /// Propagates the first toolchain failure unchanged.
    pub fn build(
        &mut self,
        config: &ToolchainConfig,
        gateway: &dyn ProcessGateway,
        id: TargetId,
    ) -> Result<bool> {
        if let Some(&rebuilt) = self.built.get(&id) {
            return Ok(rebuilt);
        }
        let mut dep_rebuilt = false;
        for dep in self[id].deps.clone() {
            dep_rebuilt |= self.build(config, gateway, dep)?;
        }
        if dep_rebuilt && !self[id].dirty {
            tracing::debug!(import_id = %self[id].import_id, "dependency rebuilt; forcing rebuild");
            self[id].dirty = true;
        }
        let rebuilt = self.build_own(config, gateway, id)?;
        self.built.insert(id, rebuilt);
        Ok(rebuilt)
    }

    fn build_own(
        &mut self,
        config: &ToolchainConfig,
        gateway: &dyn ProcessGateway,
        id: TargetId,
    ) -> Result<bool> {
        let target = &self[id];
        if !target.dirty {
            return Ok(false);
        }
        let (Some(object), Some(artifact)) = (target.object_file(config), target.artifact()) else {
            return Ok(false);
        };

        gateway.run_tool(&self.compile_invocation(config, id, &object))?;
        let finish = if target.is_main() {
            self.link_invocation(config, id, &object, &artifact)
        } else {
            Invocation::new(config.archiver())
                .arg("grc")
                .arg(artifact.as_str())
                .arg(object.as_str())
        };
        gateway.run_tool(&finish)?;

        self[id].dirty = false;
        Ok(true)
    }

    fn compile_invocation(
        &self,
        config: &ToolchainConfig,
        id: TargetId,
        object: &Utf8Path,
    ) -> Invocation {
        let flags = &config.flags;
        let target = &self[id];
        let mut compile = Invocation::new(config.compiler());
        if flags.no_optimize || flags.debug {
            compile = compile.arg("-N");
        }
        if flags.disallow_unsafe {
            compile = compile.arg("-u");
        }
        compile = compile.arg("-o").arg(object.as_str());
        for dep in &target.deps {
            if let Some(dir) = self[*dep].object_dir() {
                compile = compile.arg("-I").arg(dir.as_str());
            }
        }
        target
            .sources
            .keys()
            .fold(compile, |cmd, path| cmd.arg(path.as_str()))
    }

    fn link_invocation(
        &self,
        config: &ToolchainConfig,
        id: TargetId,
        object: &Utf8Path,
        binary: &Utf8Path,
    ) -> Invocation {
        let flags = &config.flags;
        let mut link = Invocation::new(config.linker());
        if flags.extra_symbols || flags.debug {
            link = link.arg("-e");
        }
        link = link.arg("-o").arg(binary.as_str());
        for dep in self.link_closure(id) {
            if let Some(dir) = self[dep].object_dir() {
                link = link.arg("-L").arg(dir.as_str());
            }
        }
        link.arg(object.as_str())
    }
}
