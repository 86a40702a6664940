//! Per-scan counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters shared by the walk and all file tasks of one scan.
///
/// Every counter only ever increases during a scan.
#[derive(Debug, Default)]
pub struct ScanStats {
    found: AtomicU64,
    scanned: AtomicU64,
    added: AtomicU64,
    updated: AtomicU64,
    deleted: AtomicU64,
    failed: AtomicU64,
    skipped_empty: AtomicU64,
}

/// Point-in-time copy of [`ScanStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStatsSnapshot {
    /// Regular files discovered by the walk
    pub found: u64,
    /// Files visited by a worker, whatever the outcome
    pub scanned: u64,
    /// Files recorded for the first time
    pub added: u64,
    /// Files re-hashed because size or mtime changed
    pub updated: u64,
    /// Stale records purged after the walk
    pub deleted: u64,
    /// Files whose stat or hash failed
    pub failed: u64,
    /// Zero-length files ignored
    pub skipped_empty: u64,
}

impl ScanStatsSnapshot {
    /// Files whose content was hashed during the scan.
    #[must_use]
    pub fn hashed(&self) -> u64 {
        self.added + self.updated
    }

    /// Whether any file could not be processed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Counts accumulated since `earlier` was taken.
    #[must_use]
    pub fn since(&self, earlier: &Self) -> Self {
        Self {
            found: self.found.saturating_sub(earlier.found),
            scanned: self.scanned.saturating_sub(earlier.scanned),
            added: self.added.saturating_sub(earlier.added),
            updated: self.updated.saturating_sub(earlier.updated),
            deleted: self.deleted.saturating_sub(earlier.deleted),
            failed: self.failed.saturating_sub(earlier.failed),
            skipped_empty: self.skipped_empty.saturating_sub(earlier.skipped_empty),
        }
    }
}

macro_rules! incr {
    ($($name:ident => $field:ident),* $(,)?) => {
        $(
            pub(crate) fn $name(&self) -> u64 {
                self.$field.fetch_add(1, Ordering::Relaxed) + 1
            }
        )*
    };
}

impl ScanStats {
    incr! {
        incr_found => found,
        incr_scanned => scanned,
        incr_added => added,
        incr_updated => updated,
        incr_failed => failed,
        incr_skipped_empty => skipped_empty,
    }

    pub(crate) fn add_deleted(&self, n: u64) {
        self.deleted.fetch_add(n, Ordering::Relaxed);
    }

    /// Copy the current values.
    #[must_use]
    pub fn snapshot(&self) -> ScanStatsSnapshot {
        ScanStatsSnapshot {
            found: self.found.load(Ordering::Relaxed),
            scanned: self.scanned.load(Ordering::Relaxed),
            added: self.added.load(Ordering::Relaxed),
            updated: self.updated.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped_empty: self.skipped_empty.load(Ordering::Relaxed),
        }
    }
}
