//! Depth-first directory walker using walkdir.
//!
//! # Overview
//!
//! The walk is sequential and deterministic: entries within a directory are
//! visited in file-name order. Only regular files are yielded. Symbolic
//! links are never followed and are not reported, so a link to a file is
//! not scanned twice and link cycles cannot occur.
//!
//! Errors for individual entries (unreadable directories, entries that
//! vanish mid-walk) are yielded as [`ScanError`] values without stopping
//! the iteration.
//!
//! # Example
//!
//! ```no_run
//! use ddet::scanner::Walker;
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/data"));
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(path) => println!("{}", path.display()),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::ScanError;

/// Sequential walker over the regular files under a root directory.
#[derive(Debug, Clone)]
pub struct Walker {
    root: PathBuf,
}

impl Walker {
    /// Create a walker rooted at `root`.
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// The directory this walker starts from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the tree, yielding the path of every regular file.
    pub fn walk(&self) -> impl Iterator<Item = Result<PathBuf, ScanError>> + '_ {
        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(move |entry| match entry {
                Ok(entry) => {
                    let file_type = entry.file_type();
                    if file_type.is_file() {
                        Some(Ok(entry.into_path()))
                    } else {
                        if file_type.is_symlink() {
                            log::trace!("Skipping symlink: {}", entry.path().display());
                        }
                        None
                    }
                }
                Err(e) => Some(Err(self.handle_walk_error(e))),
            })
    }

    fn handle_walk_error(&self, error: walkdir::Error) -> ScanError {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);

        match error.into_io_error() {
            Some(io) => ScanError::from_io(path, io),
            None => ScanError::Io {
                path,
                source: std::io::Error::other("filesystem loop detected"),
            },
        }
    }
}
