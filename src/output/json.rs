//! JSON report for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "root": "/data",
//!   "generated_at": "2024-05-01T12:00:00Z",
//!   "scan": {
//!     "found": 3, "scanned": 3, "added": 3, "updated": 0,
//!     "deleted": 0, "failed": 0, "skipped_empty": 0, "duration_ms": 42
//!   },
//!   "analysis": {
//!     "files_total": 3, "candidates": 1,
//!     "duplicate_groups": 1, "reclaimable_bytes": 23
//!   },
//!   "groups": [
//!     { "hash": "8d9a...", "length": 23, "files": ["/data/a", "/data/b"] }
//!   ],
//!   "exit_code": 0,
//!   "exit_code_name": "DD000"
//! }
//! ```

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::duplicates::DuplicateGroup;
use crate::error::ExitCode;
use crate::scanner::ScanStatsSnapshot;

use super::Report;

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// Content hash as 32 lowercase hex characters
    pub hash: String,
    /// File length in bytes
    pub length: u64,
    /// Member paths, sorted
    pub files: Vec<String>,
}

impl From<&DuplicateGroup> for JsonDuplicateGroup {
    fn from(group: &DuplicateGroup) -> Self {
        Self {
            hash: group.key.hash.to_hex(),
            length: group.key.length,
            files: group.paths().map(str::to_string).collect(),
        }
    }
}

/// Scan counters in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonScan {
    /// Per-pass scan counters
    #[serde(flatten)]
    pub stats: ScanStatsSnapshot,
    /// Duration of the scan in milliseconds
    pub duration_ms: u64,
}

/// Duplicate analysis summary in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonAnalysis {
    /// Records examined under the scanned directory
    pub files_total: u64,
    /// Keys flagged by the candidate filter
    pub candidates: u64,
    /// Confirmed duplicate groups
    pub duplicate_groups: usize,
    /// Bytes freed by keeping one copy per group
    pub reclaimable_bytes: u64,
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Scanned directory
    pub root: String,
    /// Report creation time
    pub generated_at: DateTime<Utc>,
    /// Scan counters
    pub scan: JsonScan,
    /// Analysis summary
    pub analysis: JsonAnalysis,
    /// Duplicate groups
    pub groups: Vec<JsonDuplicateGroup>,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DD000")
    pub exit_code_name: String,
}

impl JsonOutput {
    /// Build the JSON document for `report`.
    #[must_use]
    pub fn new(report: &Report, exit_code: ExitCode) -> Self {
        Self {
            root: report.scan.root.to_string_lossy().into_owned(),
            generated_at: Utc::now(),
            scan: JsonScan {
                stats: report.scan.stats,
                duration_ms: report.scan.duration.as_millis() as u64,
            },
            analysis: JsonAnalysis {
                files_total: report.analysis.files_total,
                candidates: report.analysis.candidates,
                duplicate_groups: report.groups.len(),
                reclaimable_bytes: report.reclaimable_bytes(),
            },
            groups: report.groups.iter().map(JsonDuplicateGroup::from).collect(),
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON output: {0}")]
    Io(#[from] std::io::Error),
}
