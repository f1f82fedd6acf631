use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;

use lexdb_core::config::SearchSettings;
use lexdb_core::error::{IngestionError, InvalidQueryError, Result};
use lexdb_core::traits::ExactIndexer;
use lexdb_core::types::{ChunkId, ChunkMetadata, DocumentChunk, Query, RankedResult, TierKind};
use lexdb_terms::TermIndex;
use lexdb_text::TantivyExactIndex;

use crate::orchestrator::{SearchOrchestrator, TierStatus};
use crate::store::{ChunkStore, StoredChunk};

/// Results of one query plus which tier produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResponse {
    pub tier: Option<TierKind>,
    pub attempts: Vec<(TierKind, TierStatus)>,
    pub results: Vec<RankedResult>,
}

/// Held for the whole of an ingest call.
#[derive(Debug, Default)]
struct IngestState {
    /// Chunks whose current text the exact index has not accepted yet.
    exact_pending: BTreeSet<ChunkId>,
}

/// Owns every index. `ingest` and `search` take `&self` and may be called
/// from several threads at once; ingest calls run one at a time.
pub struct SearchEngine {
    settings: SearchSettings,
    store: Arc<ChunkStore>,
    terms: Arc<TermIndex>,
    exact: Option<Arc<dyn ExactIndexer>>,
    orchestrator: SearchOrchestrator,
    ingest_state: Mutex<IngestState>,
}

impl SearchEngine {
    /// Validates `settings` and probes the tantivy index once. An unavailable
    /// exact index only disables tier 1.
    pub fn new(settings: SearchSettings) -> Result<Self> {
        settings.validate()?;
        let exact: Option<Arc<dyn ExactIndexer>> = match TantivyExactIndex::open(&settings.exact_index) {
            Ok(index) => Some(Arc::new(index)),
            Err(e) => {
                tracing::warn!(reason = %e.reason, "exact index unavailable, tier 1 disabled");
                None
            }
        };
        Self::with_exact_index(settings, exact)
    }

    pub fn with_exact_index(settings: SearchSettings, exact: Option<Arc<dyn ExactIndexer>>) -> Result<Self> {
        settings.validate()?;
        let terms = Arc::new(TermIndex::new());
        let store = Arc::new(ChunkStore::new());
        let orchestrator = SearchOrchestrator::standard(Arc::clone(&terms), Arc::clone(&store), exact.clone(), &settings);
        tracing::info!(exact_index = exact.is_some(), "search engine ready");
        Ok(Self { settings, store, terms, exact, orchestrator, ingest_state: Mutex::new(IngestState::default()) })
    }

    pub fn settings(&self) -> &SearchSettings { &self.settings }

    pub fn exact_index_enabled(&self) -> bool { self.exact.is_some() }

    pub fn ingest(&self, chunk_id: &str, text: &str, metadata: ChunkMetadata) -> std::result::Result<(), IngestionError> {
        let chunk = DocumentChunk { id: chunk_id.to_string(), content: text.to_string(), metadata };
        self.ingest_chunks(std::slice::from_ref(&chunk)).map(|_| ())
    }

    /// Validates the whole batch before touching any index, then publishes
    /// the changed chunks to the exact index in one commit. Chunks whose
    /// exact write failed earlier are sent again with it. Returns how many
    /// chunks had new text.
    pub fn ingest_chunks(&self, chunks: &[DocumentChunk]) -> std::result::Result<usize, IngestionError> {
        for chunk in chunks {
            validate(chunk)?;
        }
        let mut state = self.ingest_state.lock();
        let mut changed = 0;
        for chunk in chunks {
            // store first: a chunk visible in the term index always has metadata
            if !self.store.upsert(chunk) {
                tracing::debug!(chunk_id = %chunk.id, "unchanged text, metadata refreshed");
                continue;
            }
            self.terms.index_chunk(&chunk.id, &chunk.content);
            state.exact_pending.insert(chunk.id.clone());
            changed += 1;
        }
        match &self.exact {
            Some(exact) => self.flush_exact(exact.as_ref(), &mut state),
            None => state.exact_pending.clear(),
        }
        tracing::debug!(received = chunks.len(), indexed = changed, "ingested batch");
        Ok(changed)
    }

    fn flush_exact(&self, exact: &dyn ExactIndexer, state: &mut IngestState) {
        if state.exact_pending.is_empty() { return; }
        let batch: Vec<DocumentChunk> = state
            .exact_pending
            .iter()
            .filter_map(|id| {
                let stored = self.store.get(id)?;
                Some(DocumentChunk { id: id.clone(), content: stored.content, metadata: stored.metadata })
            })
            .collect();
        match exact.index(&batch) {
            Ok(()) => state.exact_pending.clear(),
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), pending = batch.len(), "exact index update failed, retrying on next ingest");
            }
        }
    }

    pub fn search(&self, query_text: &str, top_k: usize) -> std::result::Result<Vec<RankedResult>, InvalidQueryError> {
        Ok(self.search_detailed(query_text, top_k)?.results)
    }

    pub fn search_detailed(&self, query_text: &str, top_k: usize) -> std::result::Result<SearchResponse, InvalidQueryError> {
        let query = Query::parse(query_text, top_k)?;
        let outcome = self.orchestrator.run(&query);
        let results = outcome
            .hits
            .into_iter()
            .filter_map(|hit| {
                let metadata = self.store.metadata(&hit.id)?;
                Some(RankedResult { chunk_id: hit.id, score: hit.score, tier: hit.source, metadata })
            })
            .collect();
        Ok(SearchResponse { tier: outcome.tier, attempts: outcome.attempts, results })
    }

    pub fn get_chunk(&self, chunk_id: &str) -> Option<StoredChunk> { self.store.get(chunk_id) }

    pub fn chunk_count(&self) -> usize { self.store.len() }

    pub fn vocabulary_size(&self) -> usize { self.terms.vocabulary_size() }
}

fn validate(chunk: &DocumentChunk) -> std::result::Result<(), IngestionError> {
    if chunk.id.trim().is_empty() {
        return Err(IngestionError::EmptyChunkId);
    }
    let m = &chunk.metadata;
    if m.total_chunks > 0 && m.chunk_index >= m.total_chunks {
        return Err(IngestionError::InvalidMetadata {
            chunk_id: chunk.id.clone(),
            reason: format!("chunk_index {} is not below total_chunks {}", m.chunk_index, m.total_chunks),
        });
    }
    Ok(())
}
