//! Duplicate detection over the record store.
//!
//! This module provides:
//! - [`DuplicateKey`] and [`DuplicateGroup`], the result types
//! - [`DuplicateIndex`], a two-pass analysis that finds repeated keys
//!   under a path prefix with memory bounded by the candidate filter

pub mod groups;
pub mod index;

pub use groups::{DuplicateGroup, DuplicateKey};
pub use index::{DuplicateIndex, IndexError, IndexStats};
