//! Error-record formatting: the one contract boundary the core spec
//! explicitly keeps external. `bfcore` only ever constructs
//! [`bfcore::error::CompileError`] values; this module turns them into
//! either a human-readable line on stderr or a JSON record on stdout.
//!
//! JSON escaping is delegated to `serde_json`, which already implements
//! the spec's rules for control bytes (`\uXXXX`) and `"`/`\`. The one rule
//! `serde_json` can't apply on our behalf is "invalid UTF-8 bytes ->
//! U+FFFD", since a [`std::path::Path`] is not guaranteed to be valid
//! UTF-8 in the first place; [`Path::to_string_lossy`] performs exactly
//! that substitution before the path ever reaches a `String`.

use std::path::Path;

use bfcore::error::CompileError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorRecord {
    pub id: &'static str,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub instruction: Option<u8>,
}

impl ErrorRecord {
    pub fn from_core(err: &CompileError, file: Option<&Path>) -> Self {
        Self {
            id: err.kind.tag(),
            message: err.message.clone(),
            file: file.map(|p| p.to_string_lossy().into_owned()),
            line: err.location.map(|l| l.line),
            column: err.location.map(|l| l.column),
            instruction: err.instruction,
        }
    }
}

/// Decides where and how diagnostics go, per `--quiet`/`--json`.
pub struct Reporter {
    quiet: bool,
    json: bool,
}

impl Reporter {
    pub fn new(quiet: bool, json: bool) -> Self {
        Self { quiet, json }
    }

    pub fn report(&self, record: &ErrorRecord) {
        if self.json {
            match serde_json::to_string(record) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("bfc: failed to serialize error record: {e}"),
            }
            return;
        }
        if self.quiet {
            return;
        }
        let location = match (&record.line, &record.column) {
            (Some(line), Some(col)) => format!(":{line}:{col}"),
            _ => String::new(),
        };
        let file = record.file.as_deref().unwrap_or("<unknown>");
        eprintln!("{file}{location}: error: {} [{}]", record.message, record.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bfcore::error::{CompileError, ErrorKind};
    use std::path::Path;

    #[test]
    fn from_core_carries_every_optional_field() {
        let err = CompileError::new(ErrorKind::UnmatchedOpen, "unclosed loop").with_location(3, 7).with_instruction(b'[');
        let record = ErrorRecord::from_core(&err, Some(Path::new("prog.bf")));

        assert_eq!(record.id, "UnmatchedOpen");
        assert_eq!(record.file.as_deref(), Some("prog.bf"));
        assert_eq!(record.line, Some(3));
        assert_eq!(record.column, Some(7));
        assert_eq!(record.instruction, Some(b'['));
    }

    #[test]
    fn from_core_leaves_unset_fields_as_none() {
        let err = CompileError::new(ErrorKind::NoSourceFiles, "no source files given");
        let record = ErrorRecord::from_core(&err, None);

        assert_eq!(record.file, None);
        assert_eq!(record.line, None);
        assert_eq!(record.column, None);
        assert_eq!(record.instruction, None);
    }

    #[test]
    fn json_record_escapes_control_bytes_and_quotes() {
        let err = CompileError::new(ErrorKind::BadSourceExtension, "line one\nwith a \"quote\"\tand a tab");
        let record = ErrorRecord::from_core(&err, None);
        let json = serde_json::to_string(&record).unwrap();

        assert!(json.contains("\\n"));
        assert!(json.contains("\\\""));
        assert!(json.contains("\\t"));
    }
}
