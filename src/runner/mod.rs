//! CLI execution: materialise the entry, resolve, build, then run.
//!
//! This module keeps `main` minimal. [`run`] wires the real environment and
//! process gateway; [`run_with`] takes both explicitly so the whole pipeline
//! can be driven against a fake toolchain.

pub mod process;

use crate::cli::Cli;
use crate::config::ToolchainConfig;
use crate::env::BuildEnv;
use crate::error::BuildError;
use crate::fs;
use crate::script::{self, Materialized};
use crate::source::SOURCE_EXTENSION;
use crate::target::{Target, TargetGraph, TargetId};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use process::{Invocation, ProcessGateway, SystemGateway};
use std::rc::Rc;
use tracing::{Level, debug, info};

/// Suffix given to binaries built from entry files without a `.go`
/// extension, so the binary never overwrites the script.
pub const SCRIPT_BINARY_SUFFIX: &str = "out";

/// Execute the parsed [`Cli`] against the process environment.
///
/// Returns the exit code to report: `0` when nothing was run, otherwise the
/// program's (or debugger's) own status.
///
/// # Errors
///
/// Returns an error if configuration, resolution, building, or launching the
/// program fails.
pub fn run(cli: &Cli) -> Result<i32> {
    let config = ToolchainConfig::from_env(cli.flags()).context("read toolchain configuration")?;
    run_with(cli, &config, &SystemGateway)
}

/// Execute the parsed [`Cli`] with explicit configuration and gateway.
///
/// # Errors
///
/// See [`run`].
pub fn run_with(cli: &Cli, config: &ToolchainConfig, gateway: &dyn ProcessGateway) -> Result<i32> {
    let file = cli
        .file()
        .ok_or_else(|| BuildError::config("no source file given"))?;
    let entry = fs::canonicalize_utf8_path(file)
        .with_context(|| format!("cannot find {}", file.display()))?;
    let base_dir = entry
        .parent()
        .map_or_else(|| Utf8PathBuf::from("/"), Utf8Path::to_path_buf);
    let name = target_name(&entry);

    let mut env = BuildEnv::new(config, base_dir);
    let materialized = script::materialize(&mut env, &entry)
        .with_context(|| format!("load entry file {entry}"))?;
    let outcome = build_entry(&mut env, gateway, &materialized, &name);
    materialized.cleanup();
    let (graph, id) = outcome?;

    let flags = &config.flags;
    if flags.clean_only || flags.no_run {
        return Ok(0);
    }
    launch(config, gateway, &graph[id], cli.program_args())
}

/// Return `true` when `err` stems from bad configuration or usage, so the
/// caller should follow the message with a usage summary.
#[must_use]
pub fn is_usage_error(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::Config { .. })
    )
}

/// Artefact name for the entry file.
fn target_name(entry: &Utf8Path) -> String {
    match (entry.extension(), entry.file_stem()) {
        (Some(SOURCE_EXTENSION), Some(stem)) => stem.to_owned(),
        _ => format!(
            "{}.{SCRIPT_BINARY_SUFFIX}",
            entry.file_name().unwrap_or("main")
        ),
    }
}

fn build_entry(
    env: &mut BuildEnv<'_>,
    gateway: &dyn ProcessGateway,
    materialized: &Materialized,
    name: &str,
) -> Result<(TargetGraph, TargetId)> {
    let entry = Target::entry(name, Rc::clone(&materialized.record))?;
    let mut graph = TargetGraph::new();
    let id = graph
        .resolve_entry(env, entry)
        .context("resolve dependencies")?;
    log_graph(&graph);
    debug!(sources = env.cached_sources(), targets = graph.len(), "resolution complete");

    let flags = env.flags();
    if flags.clean_only || flags.run_only {
        return Ok((graph, id));
    }
    let rebuilt = graph
        .build(env.config(), gateway, id)
        .context("build program")?;
    info!(rebuilt, "build complete");
    Ok((graph, id))
}

fn log_graph(graph: &TargetGraph) {
    if !tracing::enabled!(Level::DEBUG) {
        return;
    }
    match serde_json::to_string_pretty(&graph.to_json()) {
        Ok(json) => debug!("target graph:\n{json}"),
        Err(err) => debug!("could not render target graph: {err}"),
    }
}

fn launch(
    config: &ToolchainConfig,
    gateway: &dyn ProcessGateway,
    entry: &Target,
    program_args: &[String],
) -> Result<i32> {
    let binary = entry
        .artifact()
        .context("entry target has no object directory")?;
    if !fs::exists(&binary) {
        return Err(BuildError::Toolchain {
            program: binary,
            reason: String::from("program has not been built"),
        }
        .into());
    }
    let invocation = if config.flags.debug {
        Invocation::new(config.debugger_path()?)
            .arg("--args")
            .arg(binary.as_str())
    } else {
        Invocation::new(binary)
    }
    .args(program_args.iter().cloned());
    Ok(gateway.run_interactive(&invocation)?)
}

#[cfg(test)]
mod tests;
