//! Incremental scan of one directory subtree.
//!
//! # Overview
//!
//! A scan pass has three steps:
//!
//! 1. **Walk**: the caller's thread walks the tree depth-first and hands each
//!    regular file to a rayon pool of `io_threads` workers.
//! 2. **Refresh**: each worker stats its file and compares size and mtime
//!    with the stored record. Changed or new files are hashed and written;
//!    unchanged records are rewritten with the new scan time only.
//! 3. **Cleanup**: once every task has finished, records under the scanned
//!    directory that this pass did not touch are deleted.
//!
//! Every record written by a pass carries the same `scan_time`, the pass's
//! start timestamp. That timestamp is strictly greater than any scan time
//! already stored, so a record refreshed by an earlier pass is always stale
//! to a later one, even within the same wall-clock second.
//!
//! # Failure Handling
//!
//! Stat and hash failures affect only their own file: they are logged,
//! counted as failed, and no record is written. A store failure aborts the
//! pass: the first one is returned once the workers drain, and cleanup is
//! skipped.

use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant, UNIX_EPOCH};

use crate::progress::{ProgressCallback, PHASE_CLEANUP, PHASE_SCAN};
use crate::store::{dir_prefix, FileRecord, RecordStore, StoreError};

use super::hasher::hash_file;
use super::stats::{ScanStats, ScanStatsSnapshot};
use super::walker::Walker;
use super::{ScanError, ScannerConfig};

/// Outcome of one [`Scanner::scan`] pass.
#[derive(Debug, Clone)]
pub struct ScanReport {
    /// Canonical root directory that was scanned
    pub root: PathBuf,
    /// Path prefix that selects this root's records in the store
    pub prefix: String,
    /// Scan time stamped on every record written by this pass
    pub started_at: i64,
    /// Counters for this pass only
    pub stats: ScanStatsSnapshot,
    /// Wall-clock duration of the pass
    pub duration: Duration,
}

/// Keeps a [`RecordStore`] in sync with directory trees.
///
/// Counters in [`Scanner::stats`] accumulate over every pass run by the
/// same scanner; [`ScanReport::stats`] holds the counts for one pass.
pub struct Scanner {
    store: Arc<dyn RecordStore>,
    config: ScannerConfig,
    stats: ScanStats,
    progress: Option<Arc<dyn ProgressCallback>>,
}

impl Scanner {
    /// Create a scanner writing to `store`.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, config: ScannerConfig) -> Self {
        Self {
            store,
            config: ScannerConfig::new(config.io_threads),
            stats: ScanStats::default(),
            progress: None,
        }
    }

    /// Report phases and per-file progress to `callback`.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Current counters. Safe to call from another thread during a scan.
    #[must_use]
    pub fn stats(&self) -> ScanStatsSnapshot {
        self.stats.snapshot()
    }

    /// Bring the store up to date for the tree under `root`.
    ///
    /// # Errors
    ///
    /// - [`ScanError::NotFound`] / [`ScanError::NotADirectory`] if `root` is
    ///   not an existing directory
    /// - [`ScanError::NonUtf8Root`] if the canonical root is not valid UTF-8
    /// - [`ScanError::ScanTimeExhausted`] if a stored scan time is `i64::MAX`
    /// - [`ScanError::Store`] if the record store fails at any point
    /// - [`ScanError::WorkerPool`] if worker threads cannot be spawned
    pub fn scan(&self, root: &Path) -> Result<ScanReport, ScanError> {
        let timer = Instant::now();
        let before = self.stats.snapshot();

        let root = canonical_root(root)?;
        let prefix = dir_prefix(&root);
        let started_at = self.next_scan_time()?;

        log::info!("Scanning {}", root.display());
        log::debug!(
            "Scan time {}, prefix {:?}, {} worker threads",
            started_at,
            prefix,
            self.config.io_threads
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.io_threads)
            .thread_name(|i| format!("ddet-io-{}", i))
            .build()?;

        let fatal: OnceLock<StoreError> = OnceLock::new();

        if let Some(cb) = &self.progress {
            cb.on_phase_start(PHASE_SCAN, 0);
        }

        // The scope returns only after every spawned task has finished.
        pool.in_place_scope(|scope| {
            let fatal = &fatal;
            for entry in Walker::new(&root).walk() {
                if fatal.get().is_some() {
                    break;
                }
                match entry {
                    Ok(path) => {
                        self.stats.incr_found();
                        scope.spawn(move |_| self.refresh_file(&path, started_at, fatal));
                    }
                    Err(e) => {
                        log::warn!("{}", e);
                        self.stats.incr_failed();
                    }
                }
            }
        });

        if let Some(cb) = &self.progress {
            cb.on_phase_end(PHASE_SCAN);
        }

        if let Some(err) = fatal.into_inner() {
            log::error!("Scan of {} aborted: {}", root.display(), err);
            return Err(err.into());
        }

        if let Some(cb) = &self.progress {
            cb.on_phase_start(PHASE_CLEANUP, 0);
        }
        let deleted = self.store.delete_stale_under_prefix(&prefix, started_at);
        if let Some(cb) = &self.progress {
            cb.on_phase_end(PHASE_CLEANUP);
        }
        let deleted = deleted?;
        self.stats.add_deleted(deleted);

        let stats = self.stats.snapshot().since(&before);
        let duration = timer.elapsed();
        log::info!(
            "Scanned {} files in {:.2?}: {} added, {} updated, {} deleted, {} failed",
            stats.scanned,
            duration,
            stats.added,
            stats.updated,
            stats.deleted,
            stats.failed
        );

        Ok(ScanReport {
            root,
            prefix,
            started_at,
            stats,
            duration,
        })
    }

    /// Start timestamp for a new pass, strictly after every stored scan time.
    fn next_scan_time(&self) -> Result<i64, ScanError> {
        let now = chrono::Utc::now().timestamp();
        match self.store.latest_scan_time()? {
            Some(latest) if latest >= now => latest
                .checked_add(1)
                .ok_or(ScanError::ScanTimeExhausted(latest)),
            _ => Ok(now),
        }
    }

    /// Worker task for one file. Every dispatched file counts as scanned,
    /// whatever the outcome.
    fn refresh_file(&self, path: &Path, scan_time: i64, fatal: &OnceLock<StoreError>) {
        self.visit_file(path, scan_time, fatal);

        let scanned = self.stats.incr_scanned();
        if let Some(cb) = &self.progress {
            cb.on_progress(scanned as usize, &path.to_string_lossy());
        }
    }

    /// Store errors go to `fatal`; everything else is counted and logged
    /// here.
    fn visit_file(&self, path: &Path, scan_time: i64, fatal: &OnceLock<StoreError>) {
        let Some(key) = path.to_str() else {
            log::warn!("Skipping non UTF-8 path: {}", path.display());
            self.stats.incr_failed();
            return;
        };

        let metadata = match fs::symlink_metadata(path) {
            Ok(m) => m,
            Err(e) => {
                log::warn!("Failed to stat {}: {}", path.display(), e);
                self.stats.incr_failed();
                return;
            }
        };

        let length = metadata.len();
        if length == 0 {
            log::trace!("Skipping empty file: {}", path.display());
            self.stats.incr_skipped_empty();
            return;
        }
        let last_modified = mtime_secs(&metadata);

        if let Err(e) = self.refresh_record(path, key, length, last_modified, scan_time) {
            // Only the first store error is kept.
            let _ = fatal.set(e);
        }
    }

    fn refresh_record(
        &self,
        path: &Path,
        key: &str,
        length: u64,
        last_modified: i64,
        scan_time: i64,
    ) -> Result<(), StoreError> {
        let existing = self.store.get(key)?;

        match existing {
            Some(record) if record.matches_stat(length, last_modified) => {
                log::trace!("Unchanged: {}", key);
                self.store.upsert(&record.with_scan_time(scan_time))?;
            }
            previous => {
                let content_hash = match hash_file(path) {
                    Ok(hash) => hash,
                    Err(e) => {
                        log::warn!("Failed to hash {}: {}", path.display(), e);
                        self.stats.incr_failed();
                        return Ok(());
                    }
                };
                let record = FileRecord::new(key, length, last_modified, content_hash, scan_time);
                self.store.upsert(&record)?;

                if previous.is_some() {
                    log::debug!("Updated: {}", key);
                    self.stats.incr_updated();
                } else {
                    log::debug!("Added: {}", key);
                    self.stats.incr_added();
                }
            }
        }
        Ok(())
    }
}

fn canonical_root(root: &Path) -> Result<PathBuf, ScanError> {
    let metadata =
        fs::metadata(root).map_err(|e| ScanError::from_io(root.to_path_buf(), e))?;
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    let canonical =
        fs::canonicalize(root).map_err(|e| ScanError::from_io(root.to_path_buf(), e))?;
    // Record keys are UTF-8, so a root that is not could never be purged
    // by an exact prefix.
    if canonical.to_str().is_none() {
        return Err(ScanError::NonUtf8Root(canonical));
    }
    Ok(canonical)
}

/// Modification time in whole seconds since the Unix epoch.
fn mtime_secs(metadata: &Metadata) -> i64 {
    let modified = metadata.modified().unwrap_or(UNIX_EPOCH);
    match modified.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
        Err(e) => -i64::try_from(e.duration().as_secs()).unwrap_or(i64::MAX),
    }
}
