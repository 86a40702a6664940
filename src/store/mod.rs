//! Persistent file record store.
//!
//! The store keeps one [`FileRecord`] per path between runs so unchanged
//! files never need to be re-hashed, and so the duplicate index can work
//! over more files than fit in memory.
//!
//! # Architecture
//!
//! * [`record`]: The persisted data model ([`FileRecord`], [`ContentHash`]).
//! * [`database`]: [`SqliteStore`], the on-disk implementation.
//! * [`memory`]: [`MemoryStore`], an in-process implementation with the
//!   same contract.
//!
//! Both implementations serialize every operation behind a single mutex, so
//! concurrent scanner tasks never race on writes.
//!
//! # Prefix Matching
//!
//! Prefix operations compare raw path strings: `"/data/a"` matches
//! `"/data/a/x"` and also `"/data/ab"`. Callers that mean "everything inside
//! this directory" should pass the directory with a trailing separator (see
//! [`dir_prefix`]).

pub mod database;
pub mod memory;
pub mod record;

use std::path::{Path, PathBuf, MAIN_SEPARATOR};

pub use database::SqliteStore;
pub use memory::MemoryStore;
pub use record::{ContentHash, FileRecord, ParseHashError, HASH_LEN};

/// Errors returned by record stores.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The SQLite layer failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The database file or its directory could not be prepared.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A stored content hash is not valid hex.
    #[error("Malformed content hash {value:?} stored for {path}")]
    Decode {
        /// Path of the offending record
        path: String,
        /// The stored value
        value: String,
    },

    /// Another thread panicked while holding the store lock.
    #[error("Record store lock poisoned")]
    LockPoisoned,
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A keyed store of [`FileRecord`]s, one per path.
///
/// Implementations must be safe to share across scanner worker threads.
/// Callbacks passed to [`RecordStore::for_each_under_prefix`] run while the
/// store is locked and must not call back into the store.
pub trait RecordStore: Send + Sync {
    /// Insert or replace a single record.
    fn upsert(&self, record: &FileRecord) -> StoreResult<()> {
        self.upsert_batch(std::slice::from_ref(record))
    }

    /// Insert or replace several records atomically.
    fn upsert_batch(&self, records: &[FileRecord]) -> StoreResult<()>;

    /// Look up the record for `path`.
    fn get(&self, path: &str) -> StoreResult<Option<FileRecord>>;

    /// All records with exactly this content hash and length, sorted by path.
    fn get_by_key(&self, hash: &ContentHash, length: u64) -> StoreResult<Vec<FileRecord>>;

    /// Stream every record whose path starts with `prefix`, in path order.
    fn for_each_under_prefix(
        &self,
        prefix: &str,
        f: &mut dyn FnMut(FileRecord),
    ) -> StoreResult<()>;

    /// Delete records under `prefix` whose `scan_time` is before `cutoff`.
    ///
    /// Returns the number of records removed.
    fn delete_stale_under_prefix(&self, prefix: &str, cutoff: i64) -> StoreResult<u64>;

    /// The most recent `scan_time` of any record, if the store is not empty.
    fn latest_scan_time(&self) -> StoreResult<Option<i64>>;

    /// Total number of records.
    fn count(&self) -> StoreResult<u64>;
}

/// Prefix selecting everything inside `dir` and nothing beside it.
///
/// Appends the platform separator unless `dir` already ends with one.
///
/// # Example
///
/// ```
/// use ddet::store::dir_prefix;
/// use std::path::Path;
///
/// if cfg!(unix) {
///     assert_eq!(dir_prefix(Path::new("/data/photos")), "/data/photos/");
///     assert_eq!(dir_prefix(Path::new("/")), "/");
/// }
/// ```
#[must_use]
pub fn dir_prefix(dir: &Path) -> String {
    let mut prefix = dir.to_string_lossy().into_owned();
    if !prefix.ends_with(MAIN_SEPARATOR) {
        prefix.push(MAIN_SEPARATOR);
    }
    prefix
}
