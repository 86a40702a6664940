//! Filter keyed by `(content digest, length)` pairs.
//!
//! The duplicate key is a 16-byte digest plus a file length, but
//! [`MembershipFilter`] only accepts 16-byte values. The pair is folded into
//! one digest by hashing `digest || varint(length)`, where the length is
//! zigzag/LEB128 encoded into a zero-padded 10-byte field so that every key
//! hashes the same number of bytes.

use super::{check_key, FilterConfig, FilterError, MembershipFilter, DIGEST_LEN};

/// Maximum LEB128 length of a 64-bit integer.
const VARINT_LEN: usize = 10;

/// Membership filter over `(digest, length)` pairs.
#[derive(Debug, Clone)]
pub struct CompositeFilter {
    inner: MembershipFilter,
}

impl CompositeFilter {
    /// Create an empty composite filter.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidConfig`] for unusable parameters.
    pub fn new(config: FilterConfig) -> Result<Self, FilterError> {
        Ok(Self {
            inner: MembershipFilter::new(config)?,
        })
    }

    /// Mark the pair as present.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidKeyLength`] unless `digest` is 16 bytes.
    pub fn add(&mut self, digest: &[u8], length: i64) -> Result<(), FilterError> {
        let key = rehash(digest, length)?;
        self.inner.add(&key)
    }

    /// Report whether the pair is possibly present.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidKeyLength`] unless `digest` is 16 bytes.
    pub fn contains(&self, digest: &[u8], length: i64) -> Result<bool, FilterError> {
        let key = rehash(digest, length)?;
        self.inner.contains(&key)
    }

    /// The underlying bit-array filter.
    #[must_use]
    pub fn membership(&self) -> &MembershipFilter {
        &self.inner
    }
}

/// Fold a `(digest, length)` pair into a single 16-byte digest.
fn rehash(digest: &[u8], length: i64) -> Result<[u8; DIGEST_LEN], FilterError> {
    let digest = check_key(digest)?;

    let mut buf = [0u8; DIGEST_LEN + VARINT_LEN];
    buf[..DIGEST_LEN].copy_from_slice(digest);
    put_varint(&mut buf[DIGEST_LEN..], length);

    let hash = blake3::hash(&buf);
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(&hash.as_bytes()[..DIGEST_LEN]);
    Ok(out)
}

/// Write `value` as a zigzag LEB128 varint, returning the bytes used.
fn put_varint(buf: &mut [u8], value: i64) -> usize {
    let mut zz = ((value << 1) ^ (value >> 63)) as u64;
    let mut i = 0;
    while zz >= 0x80 {
        buf[i] = (zz as u8) | 0x80;
        zz >>= 7;
        i += 1;
    }
    buf[i] = zz as u8;
    i + 1
}
