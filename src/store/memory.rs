//! In-process record store.
//!
//! Useful for one-shot runs that should leave nothing on disk, and as a
//! reference implementation of the [`RecordStore`] contract.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{ContentHash, FileRecord, RecordStore, StoreError, StoreResult};

/// Record store kept entirely in memory, ordered by path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, FileRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every record, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LockPoisoned`] if a writer panicked.
    pub fn clear(&self) -> StoreResult<u64> {
        let mut records = self.lock()?;
        let removed = records.len() as u64;
        records.clear();
        Ok(removed)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, BTreeMap<String, FileRecord>>> {
        self.records.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl RecordStore for MemoryStore {
    fn upsert_batch(&self, records: &[FileRecord]) -> StoreResult<()> {
        let mut map = self.lock()?;
        for record in records {
            map.insert(record.path.clone(), record.clone());
        }
        Ok(())
    }

    fn get(&self, path: &str) -> StoreResult<Option<FileRecord>> {
        Ok(self.lock()?.get(path).cloned())
    }

    fn get_by_key(&self, hash: &ContentHash, length: u64) -> StoreResult<Vec<FileRecord>> {
        Ok(self
            .lock()?
            .values()
            .filter(|r| r.content_hash == *hash && r.length == length)
            .cloned()
            .collect())
    }

    fn for_each_under_prefix(
        &self,
        prefix: &str,
        f: &mut dyn FnMut(FileRecord),
    ) -> StoreResult<()> {
        let map = self.lock()?;
        // Keys sharing a prefix are contiguous in a BTreeMap.
        for (path, record) in map.range(prefix.to_string()..) {
            if !path.starts_with(prefix) {
                break;
            }
            f(record.clone());
        }
        Ok(())
    }

    fn delete_stale_under_prefix(&self, prefix: &str, cutoff: i64) -> StoreResult<u64> {
        let mut map = self.lock()?;
        let before = map.len();
        map.retain(|path, record| !(path.starts_with(prefix) && record.scan_time < cutoff));
        Ok((before - map.len()) as u64)
    }

    fn latest_scan_time(&self) -> StoreResult<Option<i64>> {
        Ok(self.lock()?.values().map(|r| r.scan_time).max())
    }

    fn count(&self) -> StoreResult<u64> {
        Ok(self.lock()?.len() as u64)
    }
}
