//! Unit tests for the run pipeline, driven through a fake gateway.

use super::*;
use crate::config::BuildFlags;
use crate::error::Result as BuildResult;
use clap::Parser;
use rstest::rstest;
use std::cell::RefCell;

#[derive(Default)]
struct TouchingGateway {
    tools: RefCell<Vec<Invocation>>,
    launched: RefCell<Vec<Invocation>>,
}

impl ProcessGateway for TouchingGateway {
    fn run_tool(&self, invocation: &Invocation) -> BuildResult<()> {
        if let Some(output) = invocation.output() {
            std::fs::write(output, "").expect("touch output");
        }
        self.tools.borrow_mut().push(invocation.clone());
        Ok(())
    }

    fn run_interactive(&self, invocation: &Invocation) -> BuildResult<i32> {
        self.launched.borrow_mut().push(invocation.clone());
        Ok(7)
    }
}

fn config(flags: BuildFlags) -> ToolchainConfig {
    ToolchainConfig::from_env_with(flags, |key| match key {
        toolchain_env::GOARCH_ENV => Some("amd64".to_owned()),
        toolchain_env::GOROOT_ENV => Some("/nonexistent/goroot".to_owned()),
        toolchain_env::GOBIN_ENV => Some("/tools".to_owned()),
        _ => None,
    })
    .expect("config")
}

fn cli(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("gorun").chain(args.iter().copied())).expect("cli")
}

#[rstest]
#[case("hello.go", "hello")]
#[case("hello", "hello.out")]
#[case("tool.sh", "tool.sh.out")]
fn target_names_never_collide_with_the_entry(#[case] file: &str, #[case] expected: &str) {
    assert_eq!(target_name(Utf8Path::new(file)), expected);
}

#[test]
fn builds_then_launches_with_program_args() {
    let temp = tempfile::tempdir().expect("temp dir");
    let dir = Utf8Path::from_path(temp.path()).expect("utf8 temp dir");
    std::fs::write(dir.join("hello.go"), "package main\n").expect("write");
    let entry = dir.join("hello.go");
    let parsed = cli(&[entry.as_str(), "--flag", "value"]);
    let gateway = TouchingGateway::default();

    let status = run_with(&parsed, &config(parsed.flags()), &gateway).expect("run");

    assert_eq!(status, 7);
    let programs: Vec<Utf8PathBuf> = gateway
        .tools
        .borrow()
        .iter()
        .map(|tool| tool.program().to_path_buf())
        .collect();
    assert_eq!(programs, ["/tools/6g", "/tools/6l"].map(Utf8PathBuf::from));
    let launched = gateway.launched.borrow();
    let program = launched.first().expect("program launched");
    assert_eq!(launched.len(), 1);
    assert_eq!(program.program(), dir.join("hello"));
    assert_eq!(program.arguments(), ["--flag", "value"]);
}

#[test]
fn no_run_builds_without_launching() {
    let temp = tempfile::tempdir().expect("temp dir");
    let dir = Utf8Path::from_path(temp.path()).expect("utf8 temp dir");
    std::fs::write(dir.join("hello.go"), "package main\n").expect("write");
    let entry = dir.join("hello.go");
    let parsed = cli(&["-R", entry.as_str()]);
    let gateway = TouchingGateway::default();

    let status = run_with(&parsed, &config(parsed.flags()), &gateway).expect("run");

    assert_eq!(status, 0);
    assert_eq!(gateway.tools.borrow().len(), 2);
    assert!(gateway.launched.borrow().is_empty());
}

#[test]
fn run_only_requires_an_existing_binary() {
    let temp = tempfile::tempdir().expect("temp dir");
    let dir = Utf8Path::from_path(temp.path()).expect("utf8 temp dir");
    std::fs::write(dir.join("hello.go"), "package main\n").expect("write");
    let entry = dir.join("hello.go");
    let parsed = cli(&["-x", entry.as_str()]);
    let gateway = TouchingGateway::default();

    let err = run_with(&parsed, &config(parsed.flags()), &gateway).expect_err("no binary yet");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::Toolchain { .. })
    ));
    assert!(gateway.tools.borrow().is_empty());

    std::fs::write(dir.join("hello"), "").expect("fake binary");
    let status = run_with(&parsed, &config(parsed.flags()), &gateway).expect("run existing");
    assert_eq!(status, 7);
    assert!(gateway.tools.borrow().is_empty());
}

#[test]
fn non_main_entry_is_rejected() {
    let temp = tempfile::tempdir().expect("temp dir");
    let dir = Utf8Path::from_path(temp.path()).expect("utf8 temp dir");
    std::fs::write(dir.join("lib.go"), "package lib\n").expect("write");
    let entry = dir.join("lib.go");
    let parsed = cli(&[entry.as_str()]);
    let err = run_with(&parsed, &config(parsed.flags()), &TouchingGateway::default())
        .expect_err("not a program");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::NotAProgram { .. })
    ));
}

#[test]
fn script_copy_is_removed_after_the_build() {
    let temp = tempfile::tempdir().expect("temp dir");
    let dir = Utf8Path::from_path(temp.path()).expect("utf8 temp dir");
    let script = dir.join("hello");
    std::fs::write(&script, "#!/usr/bin/env gorun\npackage main\n").expect("write");
    let parsed = cli(&["-R", script.as_str()]);
    let gateway = TouchingGateway::default();

    run_with(&parsed, &config(parsed.flags()), &gateway).expect("run");

    let leftovers: Vec<String> = crate::fs::list_files(dir)
        .into_iter()
        .filter(|name| name.ends_with(".go"))
        .collect();
    assert!(leftovers.is_empty(), "temporary copies left: {leftovers:?}");
    assert!(dir.join("hello.out").exists());
    assert_eq!(
        std::fs::read_to_string(&script).expect("script"),
        "#!/usr/bin/env gorun\npackage main\n"
    );
}

#[test]
fn debug_runs_the_program_under_the_debugger() {
    let temp = tempfile::tempdir().expect("temp dir");
    let dir = Utf8Path::from_path(temp.path()).expect("utf8 temp dir");
    let bin = dir.join("bin");
    std::fs::create_dir(&bin).expect("bin dir");
    std::fs::write(bin.join("fake-gdb"), "").expect("debugger");
    std::fs::write(dir.join("hello.go"), "package main\n").expect("write");
    let entry = dir.join("hello.go");
    let parsed = cli(&["-d", entry.as_str(), "--x", "y"]);
    let cfg = ToolchainConfig::from_env_with(parsed.flags(), |key| match key {
        toolchain_env::GOARCH_ENV => Some("amd64".to_owned()),
        toolchain_env::GOROOT_ENV => Some("/nonexistent/goroot".to_owned()),
        toolchain_env::GOBIN_ENV => Some("/tools".to_owned()),
        toolchain_env::DEBUGGER_ENV => Some("fake-gdb".to_owned()),
        toolchain_env::PATH_ENV => Some(bin.to_string()),
        _ => None,
    })
    .expect("config");
    let gateway = TouchingGateway::default();

    let status = run_with(&parsed, &cfg, &gateway).expect("run");

    assert_eq!(status, 7);
    let launched = gateway.launched.borrow();
    let debugger = launched.first().expect("debugger launched");
    assert_eq!(launched.len(), 1);
    assert_eq!(debugger.program(), bin.join("fake-gdb"));
    let binary = dir.join("hello");
    assert_eq!(
        debugger.arguments(),
        ["--args", binary.as_str(), "--x", "y"]
    );
}

#[test]
fn missing_debugger_is_a_usage_error() {
    let temp = tempfile::tempdir().expect("temp dir");
    let dir = Utf8Path::from_path(temp.path()).expect("utf8 temp dir");
    std::fs::write(dir.join("hello.go"), "package main\n").expect("write");
    let entry = dir.join("hello.go");
    let parsed = cli(&["-d", entry.as_str()]);
    let err = run_with(&parsed, &config(parsed.flags()), &TouchingGateway::default())
        .expect_err("no debugger on an empty search path");
    assert!(is_usage_error(&err));
}

#[test]
fn build_failures_are_not_usage_errors() {
    let temp = tempfile::tempdir().expect("temp dir");
    let dir = Utf8Path::from_path(temp.path()).expect("utf8 temp dir");
    std::fs::write(dir.join("hello.go"), "package main\nimport \"gone\"\n").expect("write");
    let entry = dir.join("hello.go");
    let parsed = cli(&[entry.as_str()]);
    let err = run_with(&parsed, &config(parsed.flags()), &TouchingGateway::default())
        .expect_err("missing package");
    assert!(!is_usage_error(&err));
}
