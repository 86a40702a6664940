//! Duplicate keys and groups.
//!
//! # Overview
//!
//! Two files are duplicates when they share a [`DuplicateKey`]: the same
//! content hash *and* the same length. A [`DuplicateGroup`] is one key with
//! all the records that carry it.
//!
//! # Example
//!
//! ```
//! use ddet::duplicates::{DuplicateGroup, DuplicateKey};
//! use ddet::store::{ContentHash, FileRecord};
//!
//! let hash = ContentHash::new([7; 16]);
//! let files = vec![
//!     FileRecord::new("/a.txt", 100, 0, hash, 1),
//!     FileRecord::new("/b.txt", 100, 0, hash, 1),
//! ];
//! let group = DuplicateGroup::new(DuplicateKey::new(hash, 100), files);
//!
//! assert_eq!(group.len(), 2);
//! assert_eq!(group.total_size(), 200);
//! assert_eq!(group.reclaimable(), 100);
//! ```

use std::cmp::Ordering;

use serde::Serialize;

use crate::store::{ContentHash, FileRecord};

/// Identity of a set of duplicate files.
///
/// Ordered by length first, then by hash, so listings run from the smallest
/// files to the largest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DuplicateKey {
    /// Size in bytes shared by every member
    pub length: u64,
    /// Content hash shared by every member
    pub hash: ContentHash,
}

impl DuplicateKey {
    /// Create a key.
    #[must_use]
    pub fn new(hash: ContentHash, length: u64) -> Self {
        Self { length, hash }
    }
}

impl Ord for DuplicateKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.length
            .cmp(&other.length)
            .then_with(|| self.hash.cmp(&other.hash))
    }
}

impl PartialOrd for DuplicateKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<&FileRecord> for DuplicateKey {
    fn from(record: &FileRecord) -> Self {
        Self::new(record.content_hash, record.length)
    }
}

/// A duplicate key and the records that share it, sorted by path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    /// Shared key
    pub key: DuplicateKey,
    /// Member records
    pub files: Vec<FileRecord>,
}

impl DuplicateGroup {
    /// Create a group. Members are sorted by path.
    #[must_use]
    pub fn new(key: DuplicateKey, mut files: Vec<FileRecord>) -> Self {
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Self { key, files }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total size of all files in this group.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.key.length * self.files.len() as u64
    }

    /// Bytes freed by keeping a single copy.
    #[must_use]
    pub fn reclaimable(&self) -> u64 {
        self.key.length * self.files.len().saturating_sub(1) as u64
    }

    /// Member paths in order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.path.as_str())
    }
}
