//! Fixed-size Bloom filter over 16-byte content digests.
//!
//! # Overview
//!
//! Each digest is mapped to `slots_per_entry` bit positions. Position `i` is
//! the big-endian value of the digest bytes `[2i, 2i + 1]` modulo the slot
//! count. Because the inputs are already uniformly distributed digests, no
//! further hashing is needed to spread them over the bit array.
//!
//! The filter never shrinks and has no removal operation. With the default
//! parameters (5192 slots, 2 per entry) roughly one probe in ten reports a
//! false positive after a thousand insertions.

use super::{check_key, FilterConfig, FilterError};

const WORD_BITS: usize = u64::BITS as usize;

/// Bit-array membership filter for 16-byte digests.
#[derive(Debug, Clone)]
pub struct MembershipFilter {
    bits: Vec<u64>,
    config: FilterConfig,
}

impl MembershipFilter {
    /// Create an empty filter.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidConfig`] if the configuration cannot
    /// be addressed by 2-byte digest windows.
    pub fn new(config: FilterConfig) -> Result<Self, FilterError> {
        config.validate()?;
        let words = config.slots.div_ceil(WORD_BITS);
        Ok(Self {
            bits: vec![0; words],
            config,
        })
    }

    /// Mark `key` as present.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidKeyLength`] unless `key` is 16 bytes.
    pub fn add(&mut self, key: &[u8]) -> Result<(), FilterError> {
        let key = check_key(key)?;
        for i in 0..self.config.slots_per_entry {
            let slot = self.slot(key, i);
            self.bits[slot / WORD_BITS] |= 1u64 << (slot % WORD_BITS);
        }
        Ok(())
    }

    /// Report whether `key` is possibly present.
    ///
    /// `false` means the key was definitely never added.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidKeyLength`] unless `key` is 16 bytes.
    pub fn contains(&self, key: &[u8]) -> Result<bool, FilterError> {
        let key = check_key(key)?;
        Ok((0..self.config.slots_per_entry).all(|i| {
            let slot = self.slot(key, i);
            self.bits[slot / WORD_BITS] & (1u64 << (slot % WORD_BITS)) != 0
        }))
    }

    /// The parameters this filter was built with.
    #[must_use]
    pub fn config(&self) -> FilterConfig {
        self.config
    }

    /// Number of bits currently set.
    #[must_use]
    pub fn set_bits(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Fraction of slots that are set, in `0.0..=1.0`.
    #[must_use]
    pub fn fill_ratio(&self) -> f64 {
        self.set_bits() as f64 / self.config.slots as f64
    }

    /// Estimated probability that a never-added key reports present.
    #[must_use]
    pub fn estimated_fp_rate(&self) -> f64 {
        self.fill_ratio().powi(self.config.slots_per_entry as i32)
    }

    fn slot(&self, key: &[u8; 16], i: usize) -> usize {
        let window = u16::from_be_bytes([key[i * 2], key[i * 2 + 1]]);
        usize::from(window) % self.config.slots
    }
}
