//! Report formatters for scan and duplicate analysis results.
//!
//! This module provides the two report formats:
//! - [`text`]: human-readable listing, one block per duplicate group
//! - [`json`]: machine-readable document for scripting
//!
//! Both render a [`Report`], which bundles the scan outcome with the
//! duplicate groups found under the scanned directory.

pub mod json;
pub mod text;

use crate::duplicates::{DuplicateGroup, IndexStats};
use crate::scanner::ScanReport;

// Re-export main types
pub use json::{JsonOutput, JsonOutputError};
pub use text::TextOutput;

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct Report {
    /// Outcome of the scan pass
    pub scan: ScanReport,
    /// Duplicate index diagnostics
    pub analysis: IndexStats,
    /// Duplicate groups, smallest files first
    pub groups: Vec<DuplicateGroup>,
}

impl Report {
    /// Bundle the results of a run.
    #[must_use]
    pub fn new(scan: ScanReport, analysis: IndexStats, groups: Vec<DuplicateGroup>) -> Self {
        Self {
            scan,
            analysis,
            groups,
        }
    }

    /// Whether any duplicates were found.
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Files that are redundant copies (each group minus one member).
    #[must_use]
    pub fn duplicate_files(&self) -> usize {
        self.groups.iter().map(|g| g.len().saturating_sub(1)).sum()
    }

    /// Bytes freed by keeping one copy per group.
    #[must_use]
    pub fn reclaimable_bytes(&self) -> u64 {
        self.groups.iter().map(DuplicateGroup::reclaimable).sum()
    }
}
