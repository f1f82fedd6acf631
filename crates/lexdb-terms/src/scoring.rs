//! The term-frequency score shared by the frequency and prefix tiers.

use std::collections::HashMap;

use lexdb_core::config::ScoringWeights;
use lexdb_core::types::{SearchHit, TierKind};

use crate::index::TermIndexReader;

/// `matched * coverage + sat(total_frequency) * frequency + bonus`.
///
/// `sat(f) = f / (f + frequency_saturation)` is strictly increasing and below
/// one, so with `frequency < coverage` an extra matched term always wins over
/// any amount of repetition.
pub fn term_frequency_score(weights: &ScoringWeights, terms_matched: usize, total_frequency: usize, query_terms: usize) -> f32 {
    let frequency = total_frequency as f32;
    let saturated = frequency / (frequency + weights.frequency_saturation);
    let bonus = if terms_matched == query_terms { weights.full_match_bonus } else { 0.0 };
    terms_matched as f32 * weights.coverage + saturated * weights.frequency + bonus
}

/// Orders hits by score descending, then chunk id ascending, and keeps `top_k`.
pub fn rank(hits: &mut Vec<SearchHit>, top_k: usize) {
    hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
    hits.truncate(top_k);
}

#[derive(Default)]
struct Accumulator {
    matched: usize,
    frequency: usize,
    last_group: Option<usize>,
}

/// Scores chunks against query term groups. Each group holds the index terms
/// that count as a match for one query term; a chunk covers the group when
/// any of them occurs in it, and every occurrence adds to its frequency.
pub(crate) fn score_groups(
    reader: &TermIndexReader<'_>,
    groups: &[Vec<String>],
    weights: &ScoringWeights,
    scale: f32,
    source: TierKind,
    top_k: usize,
) -> Vec<SearchHit> {
    let mut by_chunk: HashMap<&str, Accumulator> = HashMap::new();
    for (group_index, group) in groups.iter().enumerate() {
        for term in group {
            for (chunk_id, frequency) in reader.frequencies(term) {
                let acc = by_chunk.entry(chunk_id).or_default();
                if acc.last_group != Some(group_index) {
                    acc.matched += 1;
                    acc.last_group = Some(group_index);
                }
                acc.frequency += frequency;
            }
        }
    }

    let mut hits: Vec<SearchHit> = by_chunk
        .into_iter()
        .map(|(chunk_id, acc)| SearchHit {
            id: chunk_id.to_string(),
            score: term_frequency_score(weights, acc.matched, acc.frequency, groups.len()) * scale,
            source,
        })
        .collect();
    rank(&mut hits, top_k);
    hits
}
