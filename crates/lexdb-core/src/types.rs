//! Domain types shared by the term index, the exact index and the engine.

use serde::{Deserialize, Serialize};

use crate::error::InvalidQueryError;
use crate::tokenize;

pub type ChunkId = String;

/// Where a chunk came from and which slice of its document it is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub filename: String,
    pub extension: String,
    pub directory: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

/// A chunk of a source document that is independently indexed.
///
/// - `id`: stable, unique chunk identifier
/// - `content`: the text payload of the chunk
/// - `metadata`: origin of the chunk, echoed back in search results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: ChunkId,
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// Indicates which search tier produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TierKind {
    Exact,
    Frequency,
    Prefix,
}

impl std::fmt::Display for TierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Exact => "exact",
            Self::Frequency => "frequency",
            Self::Prefix => "prefix",
        };
        f.write_str(name)
    }
}

/// The minimal surface returned by every tier.
///
/// `id` matches `DocumentChunk::id`. `score` is tier-specific, never
/// negative, and higher is always better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: ChunkId,
    pub score: f32,
    pub source: TierKind,
}

/// A search hit with the chunk's metadata attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub chunk_id: ChunkId,
    pub score: f32,
    pub tier: TierKind,
    pub metadata: ChunkMetadata,
}

/// Normalized query terms plus the requested result limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    terms: Vec<String>,
    top_k: usize,
}

impl Query {
    /// Tokenizes `text` exactly like chunk text is tokenized at ingestion.
    /// Repeated terms are kept once, in order of first appearance.
    pub fn parse(text: &str, top_k: usize) -> std::result::Result<Self, InvalidQueryError> {
        if top_k == 0 {
            return Err(InvalidQueryError::ZeroTopK);
        }
        let mut terms: Vec<String> = Vec::new();
        for token in tokenize::tokenize(text) {
            if !terms.contains(&token.term) {
                terms.push(token.term);
            }
        }
        if terms.is_empty() {
            return Err(InvalidQueryError::NoTerms(text.to_string()));
        }
        Ok(Self { terms, top_k })
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }
}
