use lexdb_core::config::ScoringWeights;
use lexdb_core::types::{Query, SearchHit, TierKind};

use crate::index::TermIndex;
use crate::scoring::score_groups;

/// Scores every chunk containing at least one query term by coverage and
/// total frequency of the matched terms.
pub struct FrequencySearch<'a> {
    index: &'a TermIndex,
    weights: ScoringWeights,
}

impl<'a> FrequencySearch<'a> {
    pub fn new(index: &'a TermIndex, weights: ScoringWeights) -> Self { Self { index, weights } }

    pub fn search(&self, query: &Query) -> Vec<SearchHit> {
        let groups: Vec<Vec<String>> = query.terms().iter().map(|term| vec![term.clone()]).collect();
        let reader = self.index.reader();
        score_groups(&reader, &groups, &self.weights, 1.0, TierKind::Frequency, query.top_k())
    }
}
