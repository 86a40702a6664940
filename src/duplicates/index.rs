//! Two-pass duplicate detection over a record store.
//!
//! # Overview
//!
//! Holding every distinct `(hash, length)` key in memory would cost memory
//! proportional to the whole store. Instead:
//!
//! 1. **Weak pass**: stream every record under the prefix through a
//!    fixed-size [`CompositeFilter`]. A key the filter has (probably) seen
//!    before becomes a *candidate*; otherwise it is added to the filter.
//! 2. **Verification**: each candidate is looked up exactly in the store.
//!    Filter false positives come back with a single match and are dropped.
//!
//! Memory is therefore bounded by the filter size plus the number of keys
//! that actually repeat (and the occasional false positive).
//!
//! # Example
//!
//! ```
//! use ddet::duplicates::DuplicateIndex;
//! use ddet::filter::FilterConfig;
//! use ddet::store::{ContentHash, FileRecord, MemoryStore, RecordStore};
//!
//! let store = MemoryStore::new();
//! let hash = ContentHash::new([3; 16]);
//! store.upsert(&FileRecord::new("/d/a", 5, 0, hash, 1)).unwrap();
//! store.upsert(&FileRecord::new("/d/b", 5, 0, hash, 1)).unwrap();
//!
//! let mut index = DuplicateIndex::new(FilterConfig::default()).unwrap();
//! index.add_all(&store, "/d/").unwrap();
//!
//! let keys = index.duplicate_keys();
//! assert_eq!(keys.len(), 1);
//! assert_eq!(index.group_members(&store, &keys[0]).unwrap().len(), 2);
//! ```

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use crate::filter::{CompositeFilter, FilterConfig, FilterError};
use crate::progress::{ProgressCallback, PHASE_VERIFY};
use crate::store::{FileRecord, RecordStore, StoreError};

use super::groups::{DuplicateGroup, DuplicateKey};

/// Errors produced while building the index.
#[derive(thiserror::Error, Debug)]
pub enum IndexError {
    /// The record store failed or returned an undecodable record.
    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    /// The candidate filter rejected a key or its configuration.
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),
}

/// Counters describing the last build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct IndexStats {
    /// Records streamed in the weak pass
    pub files_total: u64,
    /// Keys flagged by the weak pass
    pub candidates: u64,
    /// Candidates confirmed to repeat
    pub confirmed: u64,
    /// Candidates that turned out to be filter false positives
    pub false_positives: u64,
    /// Fraction of filter slots set after the weak pass
    pub filter_fill_ratio: f64,
}

/// Finds keys shared by more than one record.
pub struct DuplicateIndex {
    config: FilterConfig,
    filter: CompositeFilter,
    candidates: HashSet<DuplicateKey>,
    known_keys: HashMap<DuplicateKey, BTreeSet<String>>,
    files_total: u64,
    false_positives: u64,
    progress: Option<Arc<dyn ProgressCallback>>,
}

impl DuplicateIndex {
    /// Create an empty index whose weak pass uses a filter built from
    /// `config`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Filter`] if `config` is invalid.
    pub fn new(config: FilterConfig) -> Result<Self, IndexError> {
        Ok(Self {
            config,
            filter: CompositeFilter::new(config)?,
            candidates: HashSet::new(),
            known_keys: HashMap::new(),
            files_total: 0,
            false_positives: 0,
            progress: None,
        })
    }

    /// Report verification progress to `callback`.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Index every record whose path starts with `prefix`.
    ///
    /// May be called repeatedly with different prefixes; results accumulate.
    ///
    /// # Errors
    ///
    /// Any store or filter error aborts the build. The index is then reset
    /// to empty so a partial result is never reported.
    pub fn add_all(&mut self, store: &dyn RecordStore, prefix: &str) -> Result<(), IndexError> {
        let result = self
            .weak_pass(store, prefix)
            .and_then(|()| self.verify(store, prefix));

        if let Err(e) = &result {
            log::error!("Duplicate analysis of {:?} failed: {}", prefix, e);
            self.reset();
        }
        result
    }

    fn weak_pass(&mut self, store: &dyn RecordStore, prefix: &str) -> Result<(), IndexError> {
        let mut filter_error: Option<FilterError> = None;
        let filter = &mut self.filter;
        let candidates = &mut self.candidates;
        let files_total = &mut self.files_total;

        store.for_each_under_prefix(prefix, &mut |record| {
            if filter_error.is_some() {
                return;
            }
            *files_total += 1;

            let key = DuplicateKey::from(&record);
            let digest = key.hash.as_bytes();
            let length = key.length as i64;
            let outcome = match filter.contains(digest, length) {
                Ok(true) => {
                    if candidates.insert(key) {
                        log::trace!("Candidate {} ({} bytes): {}", key.hash, key.length, record.path);
                    }
                    Ok(())
                }
                Ok(false) => filter.add(digest, length),
                Err(e) => Err(e),
            };
            if let Err(e) = outcome {
                filter_error = Some(e);
            }
        })?;

        if let Some(e) = filter_error {
            return Err(e.into());
        }

        log::info!(
            "First pass over {} files identified {} candidate keys",
            self.files_total,
            self.candidates.len()
        );
        log::debug!(
            "Filter fill ratio {:.3}, estimated false positive rate {:.4}",
            self.filter.membership().fill_ratio(),
            self.filter.membership().estimated_fp_rate()
        );
        Ok(())
    }

    fn verify(&mut self, store: &dyn RecordStore, prefix: &str) -> Result<(), IndexError> {
        let mut pending: Vec<DuplicateKey> = self.candidates.drain().collect();
        pending.sort();

        if let Some(cb) = &self.progress {
            cb.on_phase_start(PHASE_VERIFY, pending.len());
        }

        for (i, key) in pending.iter().enumerate() {
            let matches: Vec<FileRecord> = store
                .get_by_key(&key.hash, key.length)?
                .into_iter()
                .filter(|r| r.path.starts_with(prefix))
                .collect();

            if let Some(cb) = &self.progress {
                cb.on_progress(i + 1, &key.hash.to_hex());
            }

            if matches.len() <= 1 {
                log::trace!("False positive: {} ({} bytes)", key.hash, key.length);
                self.false_positives += 1;
                continue;
            }

            let paths = self.known_keys.entry(*key).or_default();
            paths.extend(matches.into_iter().map(|r| r.path));
        }

        if let Some(cb) = &self.progress {
            cb.on_phase_end(PHASE_VERIFY);
        }

        log::info!(
            "Verification confirmed {} duplicate keys",
            self.duplicate_key_count()
        );
        Ok(())
    }

    fn reset(&mut self) {
        if let Ok(filter) = CompositeFilter::new(self.config) {
            self.filter = filter;
        }
        self.candidates.clear();
        self.known_keys.clear();
        self.files_total = 0;
        self.false_positives = 0;
    }

    fn duplicate_key_count(&self) -> usize {
        self.known_keys.values().filter(|p| p.len() > 1).count()
    }

    /// Keys with more than one confirmed record, smallest files first.
    ///
    /// Empty, never absent, when nothing repeats.
    #[must_use]
    pub fn duplicate_keys(&self) -> Vec<DuplicateKey> {
        let mut keys: Vec<DuplicateKey> = self
            .known_keys
            .iter()
            .filter(|(_, paths)| paths.len() > 1)
            .map(|(key, _)| *key)
            .collect();
        keys.sort();
        keys
    }

    /// Number of records seen by the weak pass.
    #[must_use]
    pub fn files_total(&self) -> u64 {
        self.files_total
    }

    /// All records in the store carrying `key`, sorted by path.
    ///
    /// The prefix given to [`add_all`](Self::add_all) is not applied here.
    ///
    /// # Errors
    ///
    /// Propagates store and decode errors.
    pub fn group_members(
        &self,
        store: &dyn RecordStore,
        key: &DuplicateKey,
    ) -> Result<Vec<FileRecord>, IndexError> {
        let mut members = store.get_by_key(&key.hash, key.length)?;
        members.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(members)
    }

    /// Materialize a [`DuplicateGroup`] for every duplicate key.
    ///
    /// # Errors
    ///
    /// Propagates store and decode errors.
    pub fn groups(&self, store: &dyn RecordStore) -> Result<Vec<DuplicateGroup>, IndexError> {
        self.duplicate_keys()
            .into_iter()
            .map(|key| Ok(DuplicateGroup::new(key, self.group_members(store, &key)?)))
            .collect()
    }

    /// Diagnostics for the builds so far.
    #[must_use]
    pub fn stats(&self) -> IndexStats {
        let confirmed = self.duplicate_key_count() as u64;
        IndexStats {
            files_total: self.files_total,
            candidates: confirmed + self.false_positives,
            confirmed,
            false_positives: self.false_positives,
            filter_fill_ratio: self.filter.membership().fill_ratio(),
        }
    }
}
