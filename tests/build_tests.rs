//! Integration tests for incremental builds.
//!
//! A recording gateway stands in for the toolchain: it logs every command and
//! creates the file each command would write, so timestamps behave as they
//! would after a real build.

use anyhow::{Context, Result, ensure};
use gorun::config::BuildFlags;
use rstest::{fixture, rstest};
use test_support::{RecordingGateway, Workspace, build_program, config, resolve_program};

/// `main.go` importing `util`, which lives beside it.
#[fixture]
fn hello_util() -> Workspace {
    let ws = Workspace::new();
    ws.write("util.go", "package util\n\nfunc Hello() string { return \"hi\" }\n");
    ws.write(
        "main.go",
        "package main\n\nimport \"util\"\n\nfunc main() { println(util.Hello()) }\n",
    );
    ws
}

/// `main -> lib/app -> lib/core`, both packages sharing the `lib` directory.
#[fixture]
fn chain() -> Workspace {
    let ws = Workspace::new();
    ws.write("lib/core.go", "package core\n");
    ws.write("lib/app.go", "package app\nimport \"lib/core\"\n");
    ws.write("main.go", "package main\nimport \"lib/app\"\n");
    ws
}

#[rstest]
fn first_build_compiles_everything_then_nothing(hello_util: Workspace) -> Result<()> {
    let ws = hello_util;
    let cfg = config(BuildFlags::default());
    let gateway = RecordingGateway::default();
    let entry = ws.path("main.go");

    let (graph, id) = resolve_program(&cfg, &entry)?;
    let util = graph.lookup("util").context("util target")?;
    ensure!(graph[id].is_dirty() && graph[util].is_dirty(), "both start dirty");

    let (_, _, rebuilt) = build_program(&cfg, &gateway, &entry)?;
    ensure!(rebuilt, "entry rebuilt on first build");
    ensure!(
        gateway.tool_names() == ["6g", "gopack", "6g", "6l"],
        "got {:?}",
        gateway.tool_names()
    );
    ensure!(ws.exists("main") && ws.exists("util.a"), "artefacts written");

    gateway.reset();
    let (graph, id) = resolve_program(&cfg, &entry)?;
    let util = graph.lookup("util").context("util target")?;
    ensure!(!graph[id].is_dirty() && !graph[util].is_dirty(), "both clean");
    let (_, _, rebuilt) = build_program(&cfg, &gateway, &entry)?;
    ensure!(!rebuilt, "nothing to do");
    ensure!(gateway.tools().is_empty(), "got {:?}", gateway.tool_names());
    Ok(())
}

#[rstest]
fn touching_a_dependency_rebuilds_every_dependent(chain: Workspace) -> Result<()> {
    let ws = chain;
    let cfg = config(BuildFlags::default());
    let gateway = RecordingGateway::default();
    let entry = ws.path("main.go");
    build_program(&cfg, &gateway, &entry)?;

    ws.touch("lib/core.go");
    gateway.reset();
    let (graph, id) = resolve_program(&cfg, &entry)?;
    let app = graph.lookup("lib/app").context("app target")?;
    ensure!(!graph[id].is_dirty() && !graph[app].is_dirty(), "dependents look fresh");

    build_program(&cfg, &gateway, &entry)?;
    ensure!(
        gateway.tool_names() == ["6g", "gopack", "6g", "gopack", "6g", "6l"],
        "got {:?}",
        gateway.tool_names()
    );
    Ok(())
}

#[test]
fn diamond_dependency_is_built_once() -> Result<()> {
    let ws = Workspace::new();
    ws.write("lib/base.go", "package base\n");
    ws.write("lib/left.go", "package left\nimport \"lib/base\"\n");
    ws.write("lib/right.go", "package right\nimport \"lib/base\"\n");
    let entry = ws.write(
        "main.go",
        "package main\nimport (\n\t\"lib/left\"\n\t\"lib/right\"\n)\n",
    );
    let cfg = config(BuildFlags::default());
    let gateway = RecordingGateway::default();

    build_program(&cfg, &gateway, &entry)?;
    let base_archives = gateway
        .outputs()
        .iter()
        .filter(|out| out.ends_with("base.a"))
        .count();
    ensure!(base_archives == 1, "base archived {base_archives} times");

    ws.touch("lib/base.go");
    gateway.reset();
    build_program(&cfg, &gateway, &entry)?;
    ensure!(gateway.tool_names().len() == 8, "got {:?}", gateway.tool_names());
    Ok(())
}

#[rstest]
fn compile_and_link_arguments(chain: Workspace) -> Result<()> {
    let ws = chain;
    let flags = BuildFlags {
        debug: true,
        disallow_unsafe: true,
        ..BuildFlags::default()
    };
    let cfg = config(flags);
    let gateway = RecordingGateway::default();
    build_program(&cfg, &gateway, &ws.path("main.go"))?;

    let tools = gateway.tools();
    let lib_dir = ws.path("lib");
    let compile_main = tools.get(4).context("main compile")?;
    ensure!(
        compile_main.arguments()
            == [
                "-N",
                "-u",
                "-o",
                ws.path("main.6").as_str(),
                "-I",
                lib_dir.as_str(),
                ws.path("main.go").as_str(),
            ],
        "compiler args: {:?}",
        compile_main.arguments()
    );
    let link = tools.get(5).context("link")?;
    ensure!(link.program().as_str() == "/fake/bin/6l", "linker path");
    ensure!(
        link.arguments()
            == [
                "-e",
                "-o",
                ws.path("main").as_str(),
                "-L",
                lib_dir.as_str(),
                "-L",
                lib_dir.as_str(),
                ws.path("main.6").as_str(),
            ],
        "linker args: {:?}",
        link.arguments()
    );
    let archive = tools.get(1).context("core archive")?;
    ensure!(
        archive.arguments()
            == [
                "grc",
                lib_dir.join("core.a").as_str(),
                lib_dir.join("core.6").as_str(),
            ],
        "archiver args: {:?}",
        archive.arguments()
    );
    Ok(())
}

#[rstest]
fn clean_removes_artefacts_without_compiling(hello_util: Workspace) -> Result<()> {
    let ws = hello_util;
    let gateway = RecordingGateway::default();
    let entry = ws.path("main.go");
    build_program(&config(BuildFlags::default()), &gateway, &entry)?;
    ensure!(ws.exists("main.6") && ws.exists("util.6"), "objects built");

    gateway.reset();
    let clean = config(BuildFlags {
        clean_only: true,
        ..BuildFlags::default()
    });
    resolve_program(&clean, &entry)?;
    ensure!(gateway.tools().is_empty(), "clean runs no tools");
    for artefact in ["main.6", "main", "util.6", "util.a"] {
        ensure!(!ws.exists(artefact), "{artefact} should be removed");
    }

    build_program(&config(BuildFlags::default()), &gateway, &entry)?;
    ensure!(ws.exists("main") && ws.exists("util.a"), "rebuilt after clean");
    Ok(())
}

#[rstest]
fn rebuild_flag_forces_full_rebuild(hello_util: Workspace) -> Result<()> {
    let ws = hello_util;
    let gateway = RecordingGateway::default();
    let entry = ws.path("main.go");
    build_program(&config(BuildFlags::default()), &gateway, &entry)?;

    gateway.reset();
    let rebuild = config(BuildFlags {
        rebuild: true,
        ..BuildFlags::default()
    });
    build_program(&rebuild, &gateway, &entry)?;
    ensure!(
        gateway.tool_names() == ["6g", "gopack", "6g", "6l"],
        "got {:?}",
        gateway.tool_names()
    );
    Ok(())
}

#[test]
fn extra_symbols_and_no_optimize_outside_debug() -> Result<()> {
    let ws = Workspace::new();
    let entry = ws.write("main.go", "package main\n");
    let cfg = config(BuildFlags {
        no_optimize: true,
        extra_symbols: true,
        ..BuildFlags::default()
    });
    let gateway = RecordingGateway::default();
    build_program(&cfg, &gateway, &entry)?;

    let tools = gateway.tools();
    let compile = tools.first().context("compile")?;
    let link = tools.get(1).context("link")?;
    ensure!(compile.arguments().first().map(String::as_str) == Some("-N"), "-N first");
    ensure!(!compile.arguments().iter().any(|arg| arg == "-u"), "no -u");
    ensure!(link.arguments().first().map(String::as_str) == Some("-e"), "-e first");
    Ok(())
}

#[rstest]
#[case::failed_link("6l", &["6g", "6l"], "main")]
#[case::failed_archive("gopack", &["6g", "gopack", "6g", "6l"], "util.a")]
fn failed_final_step_is_retried_next_run(
    hello_util: Workspace,
    #[case] failing: &str,
    #[case] retried: &[&str],
    #[case] artefact: &str,
) -> Result<()> {
    let ws = hello_util;
    let cfg = config(BuildFlags::default());
    let gateway = RecordingGateway::failing_once(failing);
    let entry = ws.path("main.go");

    ensure!(build_program(&cfg, &gateway, &entry).is_err(), "{failing} should fail");
    ensure!(!ws.exists(artefact), "{artefact} not written by the failed step");

    gateway.reset();
    let (_, _, rebuilt) = build_program(&cfg, &gateway, &entry)?;
    ensure!(rebuilt, "entry rebuilt after the failure");
    ensure!(gateway.tool_names() == retried, "got {:?}", gateway.tool_names());
    ensure!(ws.exists("main") && ws.exists("util.a"), "artefacts written");
    Ok(())
}
