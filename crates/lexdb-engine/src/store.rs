use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hasher;
use twox_hash::XxHash64;

use lexdb_core::types::{ChunkId, ChunkMetadata, DocumentChunk};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredChunk {
    pub content: String,
    pub metadata: ChunkMetadata,
    content_hash: u64,
}

/// Chunk text and metadata by id, for the lifetime of the process.
#[derive(Debug, Default)]
pub struct ChunkStore {
    chunks: RwLock<HashMap<ChunkId, StoredChunk>>,
}

pub fn content_hash(text: &str) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(text.as_bytes());
    hasher.finish()
}

impl ChunkStore {
    pub fn new() -> Self { Self::default() }

    /// Stores `chunk` and reports whether its text differs from what was
    /// stored before. Metadata is refreshed either way.
    pub fn upsert(&self, chunk: &DocumentChunk) -> bool {
        let hash = content_hash(&chunk.content);
        let mut chunks = self.chunks.write();
        if let Some(existing) = chunks.get_mut(&chunk.id) {
            if existing.content_hash == hash && existing.content == chunk.content {
                existing.metadata = chunk.metadata.clone();
                return false;
            }
        }
        chunks.insert(chunk.id.clone(), StoredChunk { content: chunk.content.clone(), metadata: chunk.metadata.clone(), content_hash: hash });
        true
    }

    pub fn get(&self, id: &str) -> Option<StoredChunk> { self.chunks.read().get(id).cloned() }

    pub fn metadata(&self, id: &str) -> Option<ChunkMetadata> { self.chunks.read().get(id).map(|c| c.metadata.clone()) }

    pub fn contains(&self, id: &str) -> bool { self.chunks.read().contains_key(id) }

    pub fn len(&self) -> usize { self.chunks.read().len() }

    pub fn is_empty(&self) -> bool { self.chunks.read().is_empty() }
}
