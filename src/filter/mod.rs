//! Probabilistic membership filters for duplicate candidate detection.
//!
//! This module provides the two filters used by the duplicate index's weak
//! pass:
//!
//! * [`bloom`]: [`MembershipFilter`], a fixed-size bit array keyed by 16-byte
//!   content digests.
//! * [`composite`]: [`CompositeFilter`], which folds a `(digest, length)` pair
//!   into a single digest and stores it in a [`MembershipFilter`].
//!
//! Both filters answer "definitely absent" or "possibly present". A positive
//! answer is only a candidate signal and must be verified against the record
//! store.
//!
//! # Example
//!
//! ```
//! use ddet::filter::{FilterConfig, MembershipFilter};
//!
//! let mut filter = MembershipFilter::new(FilterConfig::default()).unwrap();
//! let digest = [7u8; 16];
//!
//! assert!(!filter.contains(&digest).unwrap());
//! filter.add(&digest).unwrap();
//! assert!(filter.contains(&digest).unwrap());
//! ```

pub mod bloom;
pub mod composite;

use serde::{Deserialize, Serialize};

pub use bloom::MembershipFilter;
pub use composite::CompositeFilter;

/// Size of the digests accepted by the filters, in bytes.
pub const DIGEST_LEN: usize = 16;

/// Default number of slots in the bit array.
pub const DEFAULT_SLOTS: usize = 5192;

/// Default number of slots set per entry.
pub const DEFAULT_SLOTS_PER_ENTRY: usize = 2;

/// Largest slot count addressable by a 2-byte window.
pub const MAX_SLOTS: usize = 1 << 16;

/// Largest slots-per-entry value (one 2-byte window each).
pub const MAX_SLOTS_PER_ENTRY: usize = DIGEST_LEN / 2;

/// Sizing parameters for a [`MembershipFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Number of bits in the filter.
    pub slots: usize,
    /// Number of bits set for each entry.
    pub slots_per_entry: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            slots: DEFAULT_SLOTS,
            slots_per_entry: DEFAULT_SLOTS_PER_ENTRY,
        }
    }
}

impl FilterConfig {
    /// Create a filter configuration.
    #[must_use]
    pub fn new(slots: usize, slots_per_entry: usize) -> Self {
        Self {
            slots,
            slots_per_entry,
        }
    }

    /// Check that the parameters can be honoured by a 16-byte digest.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidConfig`] if `slots` is outside
    /// `1..=65536` or `slots_per_entry` is outside `1..=8`.
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.slots == 0 || self.slots > MAX_SLOTS {
            return Err(FilterError::InvalidConfig(format!(
                "slots must be between 1 and {}, got {}",
                MAX_SLOTS, self.slots
            )));
        }
        if self.slots_per_entry == 0 || self.slots_per_entry > MAX_SLOTS_PER_ENTRY {
            return Err(FilterError::InvalidConfig(format!(
                "slots_per_entry must be between 1 and {}, got {}",
                MAX_SLOTS_PER_ENTRY, self.slots_per_entry
            )));
        }
        Ok(())
    }
}

/// Errors raised by filter misuse.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// The key was not a 16-byte digest.
    #[error("Invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        /// Required key length
        expected: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// The filter parameters cannot be used.
    #[error("Invalid filter configuration: {0}")]
    InvalidConfig(String),
}

/// Check that `key` is exactly [`DIGEST_LEN`] bytes.
pub(crate) fn check_key(key: &[u8]) -> Result<&[u8; DIGEST_LEN], FilterError> {
    key.try_into().map_err(|_| FilterError::InvalidKeyLength {
        expected: DIGEST_LEN,
        actual: key.len(),
    })
}
