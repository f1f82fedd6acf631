//! Last-resort prefix matching over the term vocabulary.
//!
//! Each query term is cut back one character at a time, from its full length
//! down to `min_prefix_len`, until some vocabulary term starts with the cut.
//! The matches stand in for the query term and are scored like the frequency
//! tier, scaled by `discount`.

use lexdb_core::config::{FuzzySettings, ScoringWeights};
use lexdb_core::types::{Query, SearchHit, TierKind};

use crate::index::{TermIndex, TermIndexReader};
use crate::scoring::score_groups;

pub struct PrefixSearch<'a> {
    index: &'a TermIndex,
    weights: ScoringWeights,
    settings: FuzzySettings,
}

impl<'a> PrefixSearch<'a> {
    pub fn new(index: &'a TermIndex, weights: ScoringWeights, settings: FuzzySettings) -> Self {
        Self { index, weights, settings }
    }

    /// Vocabulary terms standing in for `term`, from the longest prefix of
    /// `term` that matches anything. Empty when even the shortest fails.
    pub fn expand(&self, reader: &TermIndexReader<'_>, term: &str) -> Vec<String> {
        let chars: Vec<char> = term.chars().collect();
        let min_len = self.settings.min_prefix_len;
        if chars.len() < min_len {
            return vec![];
        }
        for len in (min_len..=chars.len()).rev() {
            let prefix: String = chars[..len].iter().collect();
            let matches = reader.prefix_lookup(&prefix);
            if !matches.is_empty() {
                tracing::trace!(term, prefix = %prefix, matches = matches.len(), "prefix expansion");
                return matches;
            }
        }
        vec![]
    }

    pub fn search(&self, query: &Query) -> Vec<SearchHit> {
        let reader = self.index.reader();
        let groups: Vec<Vec<String>> = query.terms().iter().map(|term| self.expand(&reader, term)).collect();
        if groups.iter().all(Vec::is_empty) {
            return vec![];
        }
        score_groups(&reader, &groups, &self.weights, self.settings.discount, TierKind::Prefix, query.top_k())
    }
}
