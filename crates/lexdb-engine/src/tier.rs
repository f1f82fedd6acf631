use std::sync::Arc;

use lexdb_core::config::{FuzzySettings, ScoringWeights};
use lexdb_core::traits::ExactIndexer;
use lexdb_core::types::{Query, SearchHit, TierKind};
use lexdb_terms::scoring::rank;
use lexdb_terms::{FrequencySearch, PrefixSearch, TermIndex};

use crate::store::ChunkStore;

/// What a single tier made of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum TierOutcome {
    /// The tier cannot run in this process.
    Disabled,
    Empty,
    Matched(Vec<SearchHit>),
}

impl TierOutcome {
    pub fn from_hits(hits: Vec<SearchHit>) -> Self {
        if hits.is_empty() { Self::Empty } else { Self::Matched(hits) }
    }
}

pub trait SearchTier: Send + Sync {
    fn kind(&self) -> TierKind;
    fn attempt(&self, query: &Query) -> TierOutcome;
}

/// Tier 1. `None` means the exact index failed its startup check. Hits for
/// chunks the store does not hold are dropped before the tier reports.
pub struct ExactTier {
    index: Option<Arc<dyn ExactIndexer>>,
    store: Arc<ChunkStore>,
}

impl ExactTier {
    pub fn new(index: Option<Arc<dyn ExactIndexer>>, store: Arc<ChunkStore>) -> Self { Self { index, store } }
}

impl SearchTier for ExactTier {
    fn kind(&self) -> TierKind { TierKind::Exact }

    fn attempt(&self, query: &Query) -> TierOutcome {
        let Some(index) = &self.index else { return TierOutcome::Disabled };
        match index.query(query.terms(), query.top_k()) {
            Ok(mut hits) => {
                hits.retain(|h| self.store.contains(&h.id));
                for h in &mut hits { h.source = TierKind::Exact; }
                rank(&mut hits, query.top_k());
                TierOutcome::from_hits(hits)
            }
            Err(e) => {
                // a failing query is an empty answer, the capability stays on
                tracing::warn!(error = %format!("{e:#}"), "exact index query failed");
                TierOutcome::Empty
            }
        }
    }
}

pub struct FrequencyTier {
    index: Arc<TermIndex>,
    weights: ScoringWeights,
}

impl FrequencyTier {
    pub fn new(index: Arc<TermIndex>, weights: ScoringWeights) -> Self { Self { index, weights } }
}

impl SearchTier for FrequencyTier {
    fn kind(&self) -> TierKind { TierKind::Frequency }

    fn attempt(&self, query: &Query) -> TierOutcome {
        TierOutcome::from_hits(FrequencySearch::new(&self.index, self.weights).search(query))
    }
}

pub struct PrefixTier {
    index: Arc<TermIndex>,
    weights: ScoringWeights,
    fuzzy: FuzzySettings,
}

impl PrefixTier {
    pub fn new(index: Arc<TermIndex>, weights: ScoringWeights, fuzzy: FuzzySettings) -> Self { Self { index, weights, fuzzy } }
}

impl SearchTier for PrefixTier {
    fn kind(&self) -> TierKind { TierKind::Prefix }

    fn attempt(&self, query: &Query) -> TierOutcome {
        TierOutcome::from_hits(PrefixSearch::new(&self.index, self.weights, self.fuzzy).search(query))
    }
}
