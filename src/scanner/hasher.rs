//! Streaming content digests.
//!
//! Files are hashed with BLAKE3 and the first 128 bits of the output are
//! kept as the [`ContentHash`]. Content is streamed through a fixed-size
//! buffer, so memory use does not depend on file size.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use crate::store::{ContentHash, HASH_LEN};

use super::HashError;

/// Read buffer size for streaming file content.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Digest of an in-memory byte slice.
///
/// Gives the same result as [`hash_file`] on a file with these contents.
#[must_use]
pub fn hash_bytes(data: &[u8]) -> ContentHash {
    truncate(blake3::hash(data))
}

/// Digest of a file's content.
///
/// # Errors
///
/// Returns [`HashError::NotFound`] or [`HashError::PermissionDenied`] when
/// the file cannot be opened, and [`HashError::Io`] for any read failure.
pub fn hash_file(path: &Path) -> Result<ContentHash, HashError> {
    let file = File::open(path).map_err(|e| classify(path, e))?;
    let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);

    let mut hasher = blake3::Hasher::new();
    io::copy(&mut reader, &mut hasher).map_err(|e| classify(path, e))?;

    let hash = truncate(hasher.finalize());
    log::trace!("Hashed {} -> {}", path.display(), hash);
    Ok(hash)
}

fn truncate(hash: blake3::Hash) -> ContentHash {
    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(&hash.as_bytes()[..HASH_LEN]);
    ContentHash::new(out)
}

fn classify(path: &Path, error: io::Error) -> HashError {
    match error.kind() {
        io::ErrorKind::NotFound => HashError::NotFound(path.to_path_buf()),
        io::ErrorKind::PermissionDenied => HashError::PermissionDenied(path.to_path_buf()),
        _ => HashError::Io {
            path: path.to_path_buf(),
            source: error,
        },
    }
}
