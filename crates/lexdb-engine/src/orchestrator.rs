//! Tier fallthrough.
//!
//! Tiers are tried in order and the first one that returns at least one hit
//! answers the query. Results of different tiers are never merged, so every
//! hit in an outcome carries the same `TierKind`.

use std::collections::HashSet;
use std::sync::Arc;

use lexdb_core::config::SearchSettings;
use lexdb_core::traits::ExactIndexer;
use lexdb_core::types::{Query, SearchHit, TierKind};
use lexdb_terms::TermIndex;

use crate::store::ChunkStore;
use crate::tier::{ExactTier, FrequencyTier, PrefixTier, SearchTier, TierOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierStatus {
    Disabled,
    Empty,
    Matched(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// The answering tier, `None` when every tier came up empty.
    pub tier: Option<TierKind>,
    pub hits: Vec<SearchHit>,
    pub attempts: Vec<(TierKind, TierStatus)>,
}

pub struct SearchOrchestrator {
    tiers: Vec<Box<dyn SearchTier>>,
}

impl SearchOrchestrator {
    pub fn new(tiers: Vec<Box<dyn SearchTier>>) -> Self { Self { tiers } }

    /// Exact, then frequency, then prefix.
    pub fn standard(terms: Arc<TermIndex>, store: Arc<ChunkStore>, exact: Option<Arc<dyn ExactIndexer>>, settings: &SearchSettings) -> Self {
        Self::new(vec![
            Box::new(ExactTier::new(exact, store)),
            Box::new(FrequencyTier::new(Arc::clone(&terms), settings.weights)),
            Box::new(PrefixTier::new(terms, settings.weights, settings.fuzzy)),
        ])
    }

    pub fn tiers(&self) -> impl Iterator<Item = TierKind> + '_ { self.tiers.iter().map(|t| t.kind()) }

    pub fn run(&self, query: &Query) -> SearchOutcome {
        let mut attempts = Vec::with_capacity(self.tiers.len());
        for tier in &self.tiers {
            let kind = tier.kind();
            let hits = match tier.attempt(query) {
                TierOutcome::Disabled => {
                    tracing::debug!(tier = %kind, "tier disabled, falling through");
                    attempts.push((kind, TierStatus::Disabled));
                    continue;
                }
                TierOutcome::Empty => vec![],
                TierOutcome::Matched(hits) => finalize(hits, query.top_k()),
            };
            if hits.is_empty() {
                tracing::debug!(tier = %kind, "no hits, falling through");
                attempts.push((kind, TierStatus::Empty));
                continue;
            }
            tracing::debug!(tier = %kind, hits = hits.len(), "tier answered");
            attempts.push((kind, TierStatus::Matched(hits.len())));
            return SearchOutcome { tier: Some(kind), hits, attempts };
        }
        tracing::debug!(terms = ?query.terms(), "all tiers empty");
        SearchOutcome { tier: None, hits: vec![], attempts }
    }
}

/// First occurrence of each chunk id wins; the tier's order is kept.
fn finalize(hits: Vec<SearchHit>, top_k: usize) -> Vec<SearchHit> {
    let mut seen = HashSet::new();
    hits.into_iter().filter(|h| seen.insert(h.id.clone())).take(top_k).collect()
}
