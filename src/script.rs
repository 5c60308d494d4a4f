//! Script mode: run a source file that starts with a `#!` header.
//!
//! The header is stripped by [`strip_script_header`], a pure byte transform.
//! [`materialize`] wraps it with the filesystem work: writing the stripped
//! body to a temporary `.go` file beside the script and parsing that copy.

use crate::env::BuildEnv;
use crate::error::{BuildError, Result};
use crate::fs;
use crate::source::SourceRecord;
use camino::{Utf8Path, Utf8PathBuf};
use std::io::Write;
use std::rc::Rc;
use tempfile::{Builder, NamedTempFile};

const HEADER_MARKER: u8 = b'#';

/// Strip leading header lines from `bytes`.
///
/// Nothing is stripped unless the very first byte is `#`. Otherwise every
/// leading line whose first non-blank byte is `#`, and every blank line, is
/// dropped. The result starts at the first byte of the first line that does
/// not qualify. Only `\n` ends a line. Returns the remaining bytes and the
/// number of lines consumed.
///
/// # Examples
///
/// ```
/// use gorun::script::strip_script_header;
/// let (body, lines) = strip_script_header(b"#!/usr/bin/env gorun\npackage main\n");
/// assert_eq!(body, b"package main\n");
/// assert_eq!(lines, 1);
/// ```
#[must_use]
pub fn strip_script_header(bytes: &[u8]) -> (Vec<u8>, usize) {
    if bytes.first() != Some(&HEADER_MARKER) {
        return (bytes.to_vec(), 0);
    }
    let mut consumed = 0;
    let mut rest = bytes;
    loop {
        let blank = rest
            .iter()
            .take_while(|byte| matches!(byte, b' ' | b'\t'))
            .count();
        let after_blank = rest.get(blank..).unwrap_or_default();
        match after_blank.first() {
            Some(&HEADER_MARKER | b'\n') => {}
            Some(_) => return (after_blank.to_vec(), consumed),
            None => return (Vec::new(), consumed),
        }
        let Some(newline) = after_blank.iter().position(|byte| *byte == b'\n') else {
            return (Vec::new(), consumed + 1);
        };
        consumed += 1;
        rest = after_blank.get(newline + 1..).unwrap_or_default();
    }
}

/// The entry file, ready to compile.
#[derive(Debug)]
pub struct Materialized {
    /// Record to pin as the entry target's only source.
    pub record: Rc<SourceRecord>,
    /// Stripped copy, present only for scripts. Dropping it deletes the file.
    pub temp: Option<NamedTempFile>,
}

impl Materialized {
    /// Delete the temporary copy, if any. Failures are logged and ignored.
    pub fn cleanup(self) {
        let Some(temp) = self.temp else {
            return;
        };
        let path = temp.path().to_path_buf();
        if let Err(err) = temp.close() {
            tracing::warn!(path = %path.display(), error = %err, "could not remove temporary script copy");
        }
    }
}

/// Produce a source record for the entry file at `path`.
///
/// Plain sources go through the environment's record cache. Scripts are
/// stripped into a temporary file next to the original; both paths are
/// marked ignored so directory scans skip them, and the record keeps the
/// script's own modification time.
///
/// # Errors
///
/// Returns [`BuildError::Io`] when the file cannot be read or the copy cannot
/// be written, and [`BuildError::Parse`] when the header is malformed.
pub fn materialize(env: &mut BuildEnv<'_>, path: &Utf8Path) -> Result<Materialized> {
    let bytes = std::fs::read(path).map_err(|source| BuildError::io("read", path, source))?;
    if bytes.first() != Some(&HEADER_MARKER) {
        let record = env
            .get_source(path)?
            .ok_or_else(|| BuildError::config(format!("{path} is excluded from the build")))?;
        return Ok(Materialized { record, temp: None });
    }

    let (body, stripped) = strip_script_header(&bytes);
    tracing::debug!(%path, stripped, "stripped script header");
    let modified_at = fs::modified_at(path)?;
    let dir = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let stem = path.file_stem().unwrap_or("script");
    let mut temp = Builder::new()
        .prefix(&format!(".{stem}."))
        .suffix(".go")
        .tempfile_in(dir)
        .map_err(|source| BuildError::io("create temporary copy of", path, source))?;
    temp.write_all(&body)
        .and_then(|()| temp.flush())
        .map_err(|source| BuildError::io("write temporary copy of", path, source))?;

    let temp_path = Utf8PathBuf::from_path_buf(temp.path().to_path_buf())
        .map_err(|_| BuildError::config(format!("temporary copy of {path} is not UTF-8")))?;
    env.ignore(path.to_path_buf());
    env.ignore(temp_path.clone());
    let record = SourceRecord::parse(&temp_path)?.with_modified_at(modified_at);
    Ok(Materialized {
        record: Rc::new(record),
        temp: Some(temp),
    })
}
