//! Incremental directory scanner.
//!
//! This module brings the record store up to date for one directory
//! subtree:
//! - Sequential, deterministic directory walking using walkdir
//! - Change detection by size and modification time
//! - Content hashing with BLAKE3 on a bounded rayon worker pool
//! - Purging of records for files that no longer exist
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`hasher`]: BLAKE3 file hashing (streaming)
//! - [`stats`]: Atomic per-scan counters
//! - [`incremental`]: The [`Scanner`] that ties them to a [`RecordStore`]
//!
//! # Example
//!
//! ```no_run
//! use ddet::scanner::{Scanner, ScannerConfig};
//! use ddet::store::MemoryStore;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! let scanner = Scanner::new(store, ScannerConfig::default());
//! let report = scanner.scan(Path::new("/data")).unwrap();
//! println!("{} files added", report.stats.added);
//! ```
//!
//! [`RecordStore`]: crate::store::RecordStore

pub mod hasher;
pub mod incremental;
pub mod stats;
pub mod walker;

use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::store::StoreError;

// Re-export main types
pub use hasher::{hash_bytes, hash_file};
pub use incremental::{ScanReport, Scanner};
pub use stats::{ScanStats, ScanStatsSnapshot};
pub use walker::Walker;

/// Default number of concurrent file tasks.
pub const DEFAULT_IO_THREADS: usize = 4;

/// Scanner tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Number of worker threads that stat and hash files.
    pub io_threads: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            io_threads: DEFAULT_IO_THREADS,
        }
    }
}

impl ScannerConfig {
    /// Create a configuration, raising `io_threads` to at least 1.
    #[must_use]
    pub fn new(io_threads: usize) -> Self {
        Self {
            io_threads: io_threads.max(1),
        }
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The root directory's canonical path is not valid UTF-8.
    #[error("Path is not valid UTF-8: {0}")]
    NonUtf8Root(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The store holds a scan time no later pass can exceed.
    #[error("Stored scan time {0} leaves no room for a later scan")]
    ScanTimeExhausted(i64),

    /// The record store failed; the scan was abandoned.
    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    /// The worker pool could not be started.
    #[error("Failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl ScanError {
    /// Classify an I/O error for `path`.
    pub(crate) fn from_io(path: PathBuf, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            _ => Self::Io {
                path,
                source: error,
            },
        }
    }
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}
