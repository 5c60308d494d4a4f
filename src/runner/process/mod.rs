//! Spawning toolchain processes and the built program.
//!
//! The build engine talks to the outside world only through
//! [`ProcessGateway`]. [`SystemGateway`] runs real processes: toolchain
//! commands get a null stdin with their output streamed back through reader
//! threads, while the built program (or the debugger) inherits the terminal.

mod streaming;

use crate::error::{BuildError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;
use std::io::{self, BufReader};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use streaming::{ForwardStats, forward_child_output};
use tracing::info;

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: Utf8PathBuf,
    args: Vec<String>,
}

impl Invocation {
    /// Start an invocation of `program`.
    pub fn new(program: impl Into<Utf8PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Program to execute.
    #[must_use]
    pub fn program(&self) -> &Utf8Path {
        &self.program
    }

    /// Arguments after the program name.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// File the command writes: the value of `-o`, or the archive named by a
    /// `grc` archiver call.
    #[must_use]
    pub fn output(&self) -> Option<&str> {
        let mut args = self.args.iter();
        if self.args.first().is_some_and(|first| first == "grc") {
            return self.args.get(1).map(String::as_str);
        }
        args.position(|arg| arg == "-o")?;
        args.next().map(String::as_str)
    }

    /// Shell-quoted command line for logs.
    #[must_use]
    pub fn display(&self) -> String {
        let words =
            || std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str));
        shlex::try_join(words()).unwrap_or_else(|_| words().join(" "))
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(self.program.as_std_path());
        cmd.args(&self.args);
        cmd
    }

    fn spawn_error(&self, err: &io::Error) -> BuildError {
        BuildError::Toolchain {
            program: self.program.clone(),
            reason: format!("could not start: {err}"),
        }
    }
}

/// Process execution as seen by the build engine and the runner.
pub trait ProcessGateway {
    /// Run a toolchain command to completion.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Toolchain`] when the process cannot be started or
    /// exits unsuccessfully.
    fn run_tool(&self, invocation: &Invocation) -> Result<()>;

    /// Run a program attached to the terminal and return its exit code.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Toolchain`] when the process cannot be started.
    fn run_interactive(&self, invocation: &Invocation) -> Result<i32>;
}

/// Gateway that spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemGateway;

impl ProcessGateway for SystemGateway {
    fn run_tool(&self, invocation: &Invocation) -> Result<()> {
        info!("Running command: {}", invocation.display());
        let mut cmd = invocation.command();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let child = cmd.spawn().map_err(|err| invocation.spawn_error(&err))?;
        let status = stream_output(child).map_err(|err| BuildError::Toolchain {
            program: invocation.program.clone(),
            reason: err.to_string(),
        })?;
        check_exit_status(invocation.program(), status)
    }

    fn run_interactive(&self, invocation: &Invocation) -> Result<i32> {
        info!("Running program: {}", invocation.display());
        let status = invocation
            .command()
            .status()
            .map_err(|err| invocation.spawn_error(&err))?;
        Ok(exit_code(status))
    }
}

fn stream_output(mut child: Child) -> io::Result<ExitStatus> {
    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        terminate_child(&mut child);
        return Err(io::Error::other("child process is missing an output pipe"));
    };
    let out = thread::spawn(move || {
        forward_child_output(BufReader::new(stdout), io::stdout().lock(), "stdout")
    });
    let err = thread::spawn(move || {
        forward_child_output(BufReader::new(stderr), io::stderr().lock(), "stderr")
    });
    let status = child.wait()?;
    report_forwarding(out.join(), "stdout");
    report_forwarding(err.join(), "stderr");
    Ok(status)
}

fn report_forwarding(result: thread::Result<ForwardStats>, stream_name: &str) {
    match result {
        Ok(stats) if stats.write_failed => {
            tracing::debug!(
                read = stats.bytes_read,
                written = stats.bytes_written,
                "{stream_name} closed early; output truncated"
            );
        }
        Ok(_) => {}
        Err(err) => tracing::warn!("{stream_name} forwarding thread panicked: {err:?}"),
    }
}

fn terminate_child(child: &mut Child) {
    if let Err(err) = child.kill() {
        tracing::debug!("failed to kill child: {err}");
    }
    if let Err(err) = child.wait() {
        tracing::debug!("failed to reap child: {err}");
    }
}

fn check_exit_status(program: &Utf8Path, status: ExitStatus) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    Err(BuildError::Toolchain {
        program: program.to_path_buf(),
        reason: format!("exited with {status}"),
    })
}

/// Map a child's exit status onto this process's exit code.
///
/// Codes outside `0..=255` become `1`. On Unix a child killed by a signal
/// yields `128 + signal`.
#[must_use]
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return if (0..=255).contains(&code) { code } else { 1 };
    }
    signal_exit_code(status).unwrap_or(1)
}

#[cfg(unix)]
fn signal_exit_code(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map(|signal| signal.saturating_add(128))
}

#[cfg(not(unix))]
const fn signal_exit_code(_status: ExitStatus) -> Option<i32> {
    None
}
