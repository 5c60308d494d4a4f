//! Fake toolchain binaries for end-to-end runs.
//!
//! Each tool appends its command line to a shared log and creates the file
//! named by `-o` (or the archive for `gopack grc`). The fake linker writes a
//! shell script that prints its arguments and exits with the status in
//! `FAKE_EXIT`, defaulting to zero.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tempfile::TempDir;

/// Directory of fake `6g`, `6l`, and `gopack` executables.
#[derive(Debug)]
pub struct FakeToolchain {
    _dir: TempDir,
    bin: Utf8PathBuf,
    log: Utf8PathBuf,
}

fn output_loop() -> &'static str {
    concat!(
        "out=\"\"\n",
        "while [ $# -gt 0 ]; do\n",
        "  if [ \"$1\" = \"-o\" ]; then out=\"$2\"; shift; fi\n",
        "  shift\n",
        "done\n",
    )
}

impl FakeToolchain {
    /// Install the fake tools into a fresh temporary directory.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let bin = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
        let log = bin.join("invocations.log");
        let record = format!("echo \"$(basename \"$0\") $*\" >> '{log}'\n");

        let compiler = format!("#!/bin/sh\n{record}{}: > \"$out\"\n", output_loop());
        let linker = format!(
            concat!(
                "#!/bin/sh\n{record}{scan}",
                "printf '#!/bin/sh\\necho \"program ran: $*\"\\nexit ${{FAKE_EXIT:-0}}\\n' > \"$out\"\n",
                "chmod +x \"$out\"\n",
            ),
            record = record,
            scan = output_loop(),
        );
        let archiver = format!("#!/bin/sh\n{record}: > \"$2\"\n");

        write_executable(&bin.join("6g"), &compiler);
        write_executable(&bin.join("6l"), &linker);
        write_executable(&bin.join("gopack"), &archiver);
        Self { _dir: dir, bin, log }
    }

    /// Directory to export as `GOBIN`.
    pub fn bin(&self) -> &Utf8Path {
        &self.bin
    }

    /// Logged command lines, one per tool run, e.g. `6g -o /x/util.6 ...`.
    pub fn invocations(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .map(|text| text.lines().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    /// Logged tool names only.
    pub fn tool_names(&self) -> Vec<String> {
        self.invocations()
            .iter()
            .filter_map(|line| line.split_whitespace().next().map(str::to_owned))
            .collect()
    }

    /// Forget logged invocations.
    pub fn clear_log(&self) {
        if self.log.exists() {
            fs::remove_file(&self.log).expect("clear log");
        }
    }
}

impl Default for FakeToolchain {
    fn default() -> Self {
        Self::new()
    }
}

fn write_executable(path: &Utf8Path, body: &str) {
    fs::write(path, body).expect("write fake tool");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path).expect("meta").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms).expect("perms");
    }
}
