use crate::types::{DocumentChunk, SearchHit};

/// An accelerated full-text index with its own relevance ranking.
///
/// It is a derived cache over chunk text: the engine stays correct without
/// it and never trusts it to be newer than its last published commit.
pub trait ExactIndexer: Send + Sync {
    /// Adds or replaces the given chunks and publishes them in one step.
    fn index(&self, chunks: &[DocumentChunk]) -> anyhow::Result<()>;

    /// Ranked lookup of chunks containing any of the normalized `terms`,
    /// best first, at most `k` hits.
    fn query(&self, terms: &[String], k: usize) -> anyhow::Result<Vec<SearchHit>>;
}
