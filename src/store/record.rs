//! Persisted file record definitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Length of a content hash in bytes.
pub const HASH_LEN: usize = 16;

/// 128-bit content digest of a file.
///
/// Persisted as 32 lowercase hex characters. Byte order and hex order
/// compare identically, so sorting either representation gives the same
/// result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; HASH_LEN]);

impl ContentHash {
    /// Wrap raw digest bytes.
    #[must_use]
    pub const fn new(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Lowercase hex encoding (32 characters).
    #[must_use]
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(HASH_LEN * 2);
        for byte in self.0 {
            out.push(char::from(HEX_DIGITS[usize::from(byte >> 4)]));
            out.push(char::from(HEX_DIGITS[usize::from(byte & 0x0f)]));
        }
        out
    }

    /// Decode a 32-character hex string.
    ///
    /// Accepts upper- or lowercase digits; returns `None` for any other
    /// length or character.
    #[must_use]
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != HASH_LEN * 2 {
            return None;
        }
        let mut out = [0u8; HASH_LEN];
        for (i, pair) in bytes.chunks_exact(2).enumerate() {
            out[i] = (hex_value(pair[0])? << 4) | hex_value(pair[1])?;
        }
        Some(Self(out))
    }
}

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Error returned when parsing a [`ContentHash`] from text.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid content hash: {0:?}")]
pub struct ParseHashError(pub String);

impl FromStr for ContentHash {
    type Err = ParseHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s).ok_or_else(|| ParseHashError(s.to_string()))
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Everything the store keeps about one file.
///
/// The duplicate index relies on `content_hash` and `length`; the scanner
/// relies on `length`, `last_modified` and `scan_time` to decide what must
/// be re-hashed and what is stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path, unique per record
    pub path: String,
    /// File size in bytes
    pub length: u64,
    /// Modification time, seconds since the Unix epoch
    pub last_modified: i64,
    /// Digest of the file content
    pub content_hash: ContentHash,
    /// Start time of the scan pass that last confirmed this record
    pub scan_time: i64,
}

impl FileRecord {
    /// Create a new record.
    #[must_use]
    pub fn new(
        path: impl Into<String>,
        length: u64,
        last_modified: i64,
        content_hash: ContentHash,
        scan_time: i64,
    ) -> Self {
        Self {
            path: path.into(),
            length,
            last_modified,
            content_hash,
            scan_time,
        }
    }

    /// Same record, confirmed by another scan pass.
    #[must_use]
    pub fn with_scan_time(mut self, scan_time: i64) -> Self {
        self.scan_time = scan_time;
        self
    }

    /// Whether the stored size and mtime still describe the file.
    #[must_use]
    pub fn matches_stat(&self, length: u64, last_modified: i64) -> bool {
        self.length == length && self.last_modified == last_modified
    }
}
