//! JSONL operation log: append-only line-delimited JSON.
//!
//! Each line is a self-contained JSON object, assembled in memory and
//! written with a single `write_all` so a tailing process never sees a
//! partial line.
//!
//! Degradation chain:
//! 1. Primary file path
//! 2. stderr with `[RTE-OPLOG]` prefix
//! 3. Silent discard (logging must never take the engine down)

#![allow(missing_docs)]

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::logger::OperationLogger;

/// Which engine step a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Backup,
    Disable,
    Restore,
    Delete,
}

/// Whether the step succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpOutcome {
    Success,
    Failed,
}

/// One attempted step, successful or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRecord {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    pub kind: OperationKind,
    /// Path the step operated on.
    pub source: String,
    /// Rename/copy destination, when the step has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    pub outcome: OpOutcome,
    /// Failure reason, present only on failed outcomes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationRecord {
    /// A successful step.
    #[must_use]
    pub fn success(kind: OperationKind, source: &Path, destination: Option<&Path>) -> Self {
        Self {
            ts: format_utc_now(),
            kind,
            source: source.to_string_lossy().into_owned(),
            destination: destination.map(|d| d.to_string_lossy().into_owned()),
            outcome: OpOutcome::Success,
            error: None,
        }
    }

    /// A failed step with its reason.
    #[must_use]
    pub fn failed(
        kind: OperationKind,
        source: &Path,
        destination: Option<&Path>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            ts: format_utc_now(),
            kind,
            source: source.to_string_lossy().into_owned(),
            destination: destination.map(|d| d.to_string_lossy().into_owned()),
            outcome: OpOutcome::Failed,
            error: Some(error.into()),
        }
    }
}

fn format_utc_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Degradation state of the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Normal,
    Stderr,
    Discard,
}

/// Append-only JSONL writer with graceful degradation.
pub struct JsonlOpWriter {
    path: PathBuf,
    state: Mutex<WriterState>,
}

impl JsonlOpWriter {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            state: Mutex::new(WriterState::Normal),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_line(&self, line: &str) {
        let mut state = self.state.lock();
        if *state == WriterState::Normal && Self::try_append(&self.path, line).is_err() {
            *state = WriterState::Stderr;
        }
        match *state {
            WriterState::Normal => {}
            WriterState::Stderr => {
                if writeln!(std::io::stderr(), "[RTE-OPLOG] {line}").is_err() {
                    *state = WriterState::Discard;
                }
            }
            WriterState::Discard => {}
        }
    }

    fn try_append(path: &Path, line: &str) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        file.write_all(buf.as_bytes())
    }
}

impl OperationLogger for JsonlOpWriter {
    fn record(&self, record: OperationRecord) {
        // An unrepresentable record is dropped.
        if let Ok(line) = serde_json::to_string(&record) {
            self.append_line(&line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn record_lines_are_self_contained_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ops.jsonl");
        let writer = JsonlOpWriter::new(path.clone());

        writer.record(OperationRecord::success(
            OperationKind::Disable,
            Path::new("/data/junk"),
            Some(Path::new("/data/junk.rte-disabled")),
        ));
        writer.record(OperationRecord::failed(
            OperationKind::Restore,
            Path::new("/data/junk"),
            None,
            "original path now exists",
        ));

        let raw = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: OperationRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.kind, OperationKind::Disable);
        assert_eq!(first.outcome, OpOutcome::Success);
        assert!(first.error.is_none());

        let second: OperationRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.outcome, OpOutcome::Failed);
        assert_eq!(second.error.as_deref(), Some("original path now exists"));
    }

    #[test]
    fn success_records_omit_error_field() {
        let record = OperationRecord::success(OperationKind::Delete, Path::new("/x"), None);
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("\"error\""));
        assert!(!json.contains("\"destination\""));
        assert!(json.contains("\"delete\""));
    }

    #[test]
    fn writer_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/deep/ops.jsonl");
        let writer = JsonlOpWriter::new(path.clone());
        writer.record(OperationRecord::success(
            OperationKind::Backup,
            Path::new("/y"),
            None,
        ));
        assert!(path.exists());
    }

    #[test]
    fn unwritable_primary_degrades_without_panicking() {
        // Point the writer at a path whose parent is a file, so appends fail.
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not dir").unwrap();
        let writer = JsonlOpWriter::new(blocker.join("ops.jsonl"));

        // Must not panic or error; record goes to stderr or is dropped.
        writer.record(OperationRecord::success(
            OperationKind::Disable,
            Path::new("/z"),
            None,
        ));
        writer.record(OperationRecord::success(
            OperationKind::Delete,
            Path::new("/z"),
            None,
        ));
    }
}
