//! lexdb-text
//!
//! Tantivy-backed exact index: the accelerated first search tier. It mirrors
//! chunk text and can be dropped or rebuilt at any time.
pub mod index;
pub mod tantivy_utils;

pub use index::TantivyExactIndex;
