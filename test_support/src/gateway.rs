//! In-process stand-in for the toolchain.

use gorun::error::{BuildError, Result};
use gorun::runner::process::{Invocation, ProcessGateway};
use std::cell::RefCell;
use std::fs;

/// Gateway that records every invocation and creates each tool's output file
/// instead of running anything.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    tools: RefCell<Vec<Invocation>>,
    launched: RefCell<Vec<Invocation>>,
    exit_code: i32,
    fail_next: RefCell<Option<String>>,
}

impl RecordingGateway {
    /// A gateway whose launched programs exit with `exit_code`.
    pub fn exiting_with(exit_code: i32) -> Self {
        Self {
            exit_code,
            ..Self::default()
        }
    }

    /// A gateway whose first run of the tool named `tool` (e.g. `6l`) fails
    /// without writing its output. Later runs succeed.
    pub fn failing_once(tool: &str) -> Self {
        Self {
            fail_next: RefCell::new(Some(tool.to_owned())),
            ..Self::default()
        }
    }

    /// Toolchain commands run so far.
    pub fn tools(&self) -> Vec<Invocation> {
        self.tools.borrow().clone()
    }

    /// Base names of the tools run so far, e.g. `["6g", "gopack"]`.
    pub fn tool_names(&self) -> Vec<String> {
        self.tools
            .borrow()
            .iter()
            .filter_map(|inv| inv.program().file_name().map(str::to_owned))
            .collect()
    }

    /// Outputs written so far, in order.
    pub fn outputs(&self) -> Vec<String> {
        self.tools
            .borrow()
            .iter()
            .filter_map(|inv| inv.output().map(str::to_owned))
            .collect()
    }

    /// Programs launched so far.
    pub fn launched(&self) -> Vec<Invocation> {
        self.launched.borrow().clone()
    }

    /// Forget everything recorded.
    pub fn reset(&self) {
        self.tools.borrow_mut().clear();
        self.launched.borrow_mut().clear();
    }
}

impl ProcessGateway for RecordingGateway {
    fn run_tool(&self, invocation: &Invocation) -> Result<()> {
        let name = invocation.program().file_name().unwrap_or_default();
        let mut fail_next = self.fail_next.borrow_mut();
        if fail_next.as_deref() == Some(name) {
            *fail_next = None;
            return Err(BuildError::Toolchain {
                program: invocation.program().to_path_buf(),
                reason: String::from("exited with status 1"),
            });
        }
        drop(fail_next);
        if let Some(output) = invocation.output() {
            fs::write(output, "").expect("touch tool output");
        }
        self.tools.borrow_mut().push(invocation.clone());
        Ok(())
    }

    fn run_interactive(&self, invocation: &Invocation) -> Result<i32> {
        self.launched.borrow_mut().push(invocation.clone());
        Ok(self.exit_code)
    }
}
