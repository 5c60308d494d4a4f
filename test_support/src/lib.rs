//! Test utilities for driving the build engine.
//!
//! This crate provides scratch workspaces with controllable timestamps, a
//! fake compiler/linker/archiver written as shell scripts, and an in-process
//! recording gateway.

pub mod gateway;
pub mod toolchain;
pub mod workspace;

pub use gateway::RecordingGateway;
pub use toolchain::FakeToolchain;
pub use workspace::Workspace;

use camino::Utf8Path;
use gorun::config::{BuildFlags, ToolchainConfig};
use gorun::env::BuildEnv;
use gorun::target::{Target, TargetGraph, TargetId};

/// Configuration for the amd64 toolchain whose binaries live in `gobin`.
///
/// `goroot` decides which packages count as installed.
pub fn config_with(flags: BuildFlags, gobin: &str, goroot: &str) -> ToolchainConfig {
    ToolchainConfig::from_env_with(flags, |key| match key {
        toolchain_env::GOOS_ENV => Some("linux".to_owned()),
        toolchain_env::GOARCH_ENV => Some("amd64".to_owned()),
        toolchain_env::GOROOT_ENV => Some(goroot.to_owned()),
        toolchain_env::GOBIN_ENV => Some(gobin.to_owned()),
        _ => None,
    })
    .expect("test configuration")
}

/// Configuration with no installed packages and tools under `/fake/bin`.
pub fn config(flags: BuildFlags) -> ToolchainConfig {
    config_with(flags, "/fake/bin", "/nonexistent/goroot")
}

/// Resolve the program whose entry file is `entry`, using a fresh
/// environment rooted at the entry's directory.
pub fn resolve_program(
    config: &ToolchainConfig,
    entry: &Utf8Path,
) -> gorun::error::Result<(TargetGraph, TargetId)> {
    let base_dir = entry.parent().expect("entry directory").to_path_buf();
    let mut env = BuildEnv::new(config, base_dir);
    let record = env.get_source(entry)?.expect("entry is not ignored");
    let name = entry.file_stem().expect("entry file stem");
    let target = Target::entry(name, record)?;
    let mut graph = TargetGraph::new();
    let id = graph.resolve_entry(&mut env, target)?;
    Ok((graph, id))
}

/// Resolve and build the program at `entry`, returning the graph and whether
/// the entry was rebuilt.
pub fn build_program(
    config: &ToolchainConfig,
    gateway: &RecordingGateway,
    entry: &Utf8Path,
) -> gorun::error::Result<(TargetGraph, TargetId, bool)> {
    let (mut graph, id) = resolve_program(config, entry)?;
    let rebuilt = graph.build(config, gateway, id)?;
    Ok((graph, id, rebuilt))
}

/// Import ids of `id`'s dependencies, in order.
pub fn dep_ids(graph: &TargetGraph, id: TargetId) -> Vec<String> {
    graph[id]
        .deps()
        .iter()
        .map(|dep| graph[*dep].import_id().to_owned())
        .collect()
}
