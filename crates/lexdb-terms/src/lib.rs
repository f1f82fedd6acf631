//! lexdb-terms
//!
//! The term index every tier falls back on, the term-frequency scorer and
//! the prefix matcher used when no query term is in the vocabulary.
pub mod frequency;
pub mod fuzzy;
pub mod index;
pub mod scoring;

pub use frequency::FrequencySearch;
pub use fuzzy::PrefixSearch;
pub use index::{TermEntry, TermIndex, TermIndexReader};
