//! In-memory term index: normalized term -> chunk -> token positions.
//!
//! Writers stage a chunk's complete entry set without holding the lock and
//! then swap it in under one write guard, so a reader sees either all of a
//! chunk's old entries or all of its new ones.

use parking_lot::{RwLock, RwLockReadGuard};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use lexdb_core::tokenize::{normalize_term, tokenize};
use lexdb_core::types::ChunkId;

/// Occurrences of one term in one chunk. `frequency == positions.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermEntry {
    pub chunk_id: ChunkId,
    pub frequency: usize,
    pub positions: Vec<usize>,
}

impl TermEntry {
    fn new(chunk_id: &str, positions: &[usize]) -> Self {
        Self { chunk_id: chunk_id.to_string(), frequency: positions.len(), positions: positions.to_vec() }
    }
}

/// A chunk's entries, built off to the side before publication.
type Staged = BTreeMap<String, Vec<usize>>;

#[derive(Debug, Default)]
struct Postings {
    /// Ordered so prefix scans are a range walk.
    terms: BTreeMap<String, BTreeMap<ChunkId, Vec<usize>>>,
    /// Reverse map used to drop a chunk's previous entries on re-index.
    chunk_terms: HashMap<ChunkId, Vec<String>>,
}

impl Postings {
    fn replace(&mut self, chunk_id: &str, staged: Staged) {
        self.remove(chunk_id);
        let mut chunk_terms = Vec::with_capacity(staged.len());
        for (term, positions) in staged {
            self.terms.entry(term.clone()).or_default().insert(chunk_id.to_string(), positions);
            chunk_terms.push(term);
        }
        self.chunk_terms.insert(chunk_id.to_string(), chunk_terms);
    }

    fn remove(&mut self, chunk_id: &str) {
        let Some(previous) = self.chunk_terms.remove(chunk_id) else { return };
        for term in previous {
            if let Some(chunks) = self.terms.get_mut(&term) {
                chunks.remove(chunk_id);
                if chunks.is_empty() {
                    self.terms.remove(&term);
                }
            }
        }
    }
}

fn stage(text: &str) -> Staged {
    let mut staged = Staged::new();
    for token in tokenize(text) {
        staged.entry(token.term).or_default().push(token.position);
    }
    staged
}

#[derive(Debug, Default)]
pub struct TermIndex {
    postings: RwLock<Postings>,
}

impl TermIndex {
    pub fn new() -> Self { Self::default() }

    /// Replaces every entry of `chunk_id` with the entries of `text`.
    /// Calling it again with the same text leaves the index unchanged.
    pub fn index_chunk(&self, chunk_id: &str, text: &str) {
        let staged = stage(text);
        let distinct_terms = staged.len();
        self.postings.write().replace(chunk_id, staged);
        tracing::trace!(chunk_id, distinct_terms, "published term entries");
    }

    /// A consistent view for several lookups in a row. Ingestion waits while
    /// a reader is alive, so keep it short.
    pub fn reader(&self) -> TermIndexReader<'_> {
        TermIndexReader { postings: self.postings.read() }
    }

    pub fn lookup(&self, term: &str) -> Vec<TermEntry> { self.reader().lookup(term) }

    pub fn prefix_lookup(&self, prefix: &str) -> Vec<String> { self.reader().prefix_lookup(prefix) }

    pub fn vocabulary_size(&self) -> usize { self.postings.read().terms.len() }

    pub fn chunk_count(&self) -> usize { self.postings.read().chunk_terms.len() }
}

pub struct TermIndexReader<'a> {
    postings: RwLockReadGuard<'a, Postings>,
}

impl TermIndexReader<'_> {
    /// Entries for an already-normalized term, ordered by chunk id. Unknown
    /// terms give an empty vec.
    pub fn lookup(&self, term: &str) -> Vec<TermEntry> {
        self.postings
            .terms
            .get(term)
            .map(|chunks| chunks.iter().map(|(id, positions)| TermEntry::new(id, positions)).collect())
            .unwrap_or_default()
    }

    /// `(chunk id, frequency)` pairs for `term` without copying positions.
    pub fn frequencies<'s>(&'s self, term: &str) -> impl Iterator<Item = (&'s str, usize)> + 's {
        self.postings
            .terms
            .get(term)
            .into_iter()
            .flat_map(|chunks| chunks.iter().map(|(id, positions)| (id.as_str(), positions.len())))
    }

    /// Vocabulary terms starting with `prefix`, compared case-insensitively.
    pub fn prefix_lookup(&self, prefix: &str) -> Vec<String> {
        let prefix = normalize_term(prefix);
        self.postings
            .terms
            .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
            .take_while(|(term, _)| term.starts_with(prefix.as_str()))
            .map(|(term, _)| term.clone())
            .collect()
    }

    pub fn contains_term(&self, term: &str) -> bool { self.postings.terms.contains_key(term) }
}
