use std::sync::Arc;

use parking_lot::Mutex;

use lexdb_core::config::{ExactIndexSettings, SearchSettings};
use lexdb_core::error::{IngestionError, InvalidQueryError};
use lexdb_core::traits::ExactIndexer;
use lexdb_core::types::{ChunkMetadata, DocumentChunk, Query, RankedResult, SearchHit, TierKind};
use lexdb_engine::{build_context, format_reference, SearchEngine, TierStatus};
use lexdb_terms::{FrequencySearch, TermIndex};

fn settings_without_exact() -> SearchSettings {
    SearchSettings { exact_index: ExactIndexSettings { enabled: false, ..ExactIndexSettings::default() }, ..SearchSettings::default() }
}

fn meta(source: &str, chunk_index: usize, total_chunks: usize) -> ChunkMetadata {
    ChunkMetadata { source: source.to_string(), chunk_index, total_chunks, ..ChunkMetadata::default() }
}

fn fox_engine(settings: SearchSettings) -> SearchEngine {
    let engine = SearchEngine::new(settings).expect("engine");
    engine.ingest("c1", "the quick brown fox", meta("/docs/one.llm", 0, 1)).unwrap();
    engine.ingest("c2", "quick quick fox fox fox", meta("/docs/two.llm", 0, 1)).unwrap();
    engine
}

fn ids(results: &[RankedResult]) -> Vec<&str> {
    results.iter().map(|r| r.chunk_id.as_str()).collect()
}

/// Stands in for tier 1 and records how often it was written to.
struct FakeExact {
    hits: Vec<SearchHit>,
    fail_query: bool,
    batches: Mutex<Vec<usize>>,
}

impl FakeExact {
    fn returning(hits: Vec<SearchHit>) -> Arc<Self> { Arc::new(Self { hits, fail_query: false, batches: Mutex::new(vec![]) }) }
    fn failing() -> Arc<Self> { Arc::new(Self { hits: vec![], fail_query: true, batches: Mutex::new(vec![]) }) }
}

impl ExactIndexer for FakeExact {
    fn index(&self, chunks: &[DocumentChunk]) -> anyhow::Result<()> {
        self.batches.lock().push(chunks.len());
        Ok(())
    }

    fn query(&self, _terms: &[String], k: usize) -> anyhow::Result<Vec<SearchHit>> {
        if self.fail_query {
            anyhow::bail!("index corrupted");
        }
        Ok(self.hits.iter().take(k).cloned().collect())
    }
}

#[test]
fn frequency_tier_ranks_higher_frequency_first() {
    let engine = fox_engine(settings_without_exact());
    assert!(!engine.exact_index_enabled());

    let response = engine.search_detailed("quick fox", 2).unwrap();
    assert_eq!(response.tier, Some(TierKind::Frequency));
    assert_eq!(ids(&response.results), ["c2", "c1"]);
    assert_eq!(response.attempts[0], (TierKind::Exact, TierStatus::Disabled));
    assert!(response.results.iter().all(|r| r.tier == TierKind::Frequency && r.score >= 0.0));
    assert_eq!(response.results[0].metadata.source, "/docs/two.llm");
}

#[test]
fn unknown_term_falls_through_to_prefix_tier() {
    let engine = fox_engine(settings_without_exact());
    let response = engine.search_detailed("qu", 5).unwrap();
    assert_eq!(response.tier, Some(TierKind::Prefix));
    assert_eq!(ids(&response.results), ["c2", "c1"]);
    assert_eq!(
        response.attempts,
        vec![(TierKind::Exact, TierStatus::Disabled), (TierKind::Frequency, TierStatus::Empty), (TierKind::Prefix, TierStatus::Matched(2))]
    );
}

#[test]
fn disabled_exact_tier_matches_frequency_search_run_directly() {
    let engine = fox_engine(settings_without_exact());
    let direct_index = TermIndex::new();
    direct_index.index_chunk("c1", "the quick brown fox");
    direct_index.index_chunk("c2", "quick quick fox fox fox");

    for text in ["quick fox", "fox", "brown quick", "the"] {
        let direct = FrequencySearch::new(&direct_index, SearchSettings::default().weights).search(&Query::parse(text, 5).unwrap());
        let via_engine = engine.search(text, 5).unwrap();
        let direct_ids: Vec<&str> = direct.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids(&via_engine), direct_ids, "query {text}");
        assert!(via_engine.iter().zip(&direct).all(|(r, h)| r.score == h.score));
    }
}

#[test]
fn tantivy_backed_engine_answers_from_exact_tier() {
    let engine = fox_engine(SearchSettings::default());
    assert!(engine.exact_index_enabled());

    let response = engine.search_detailed("quick fox", 5).unwrap();
    assert_eq!(response.tier, Some(TierKind::Exact));
    let mut found = ids(&response.results);
    found.sort_unstable();
    assert_eq!(found, ["c1", "c2"]);

    // tantivy has no "qu" token, the prefix tier still answers
    assert_eq!(engine.search_detailed("qu", 5).unwrap().tier, Some(TierKind::Prefix));
}

#[test]
fn empty_exact_answer_falls_to_frequency() {
    let fake = FakeExact::returning(vec![]);
    let engine = SearchEngine::with_exact_index(SearchSettings::default(), Some(fake.clone())).unwrap();
    engine.ingest("c1", "the quick brown fox", meta("a", 0, 1)).unwrap();
    engine.ingest("c2", "quick quick fox fox fox", meta("b", 0, 1)).unwrap();

    let response = engine.search_detailed("quick fox", 2).unwrap();
    assert_eq!(response.attempts[0], (TierKind::Exact, TierStatus::Empty));
    assert_eq!(response.tier, Some(TierKind::Frequency));
    assert_eq!(ids(&response.results), ["c2", "c1"]);
}

#[test]
fn exact_hits_are_returned_alone_in_tie_order() {
    let hits = vec![
        SearchHit { id: "c2".into(), score: 1.0, source: TierKind::Exact },
        SearchHit { id: "c1".into(), score: 1.0, source: TierKind::Exact },
    ];
    let engine = SearchEngine::with_exact_index(SearchSettings::default(), Some(FakeExact::returning(hits))).unwrap();
    engine.ingest("c1", "alpha", meta("a", 0, 1)).unwrap();
    engine.ingest("c2", "alpha", meta("b", 0, 1)).unwrap();
    engine.ingest("c3", "alpha alpha alpha", meta("c", 0, 1)).unwrap();

    let results = engine.search("alpha", 5).unwrap();
    assert_eq!(ids(&results), ["c1", "c2"]);
    assert!(results.iter().all(|r| r.tier == TierKind::Exact));
}

#[test]
fn failing_exact_query_is_treated_as_empty() {
    let engine = SearchEngine::with_exact_index(SearchSettings::default(), Some(FakeExact::failing())).unwrap();
    engine.ingest("c1", "alpha beta", meta("a", 0, 1)).unwrap();

    let response = engine.search_detailed("alpha", 3).unwrap();
    assert_eq!(response.tier, Some(TierKind::Frequency));
    assert!(engine.exact_index_enabled());
}

#[test]
fn exact_hits_for_unknown_chunks_fall_through() {
    let hits = vec![SearchHit { id: "ghost".into(), score: 3.0, source: TierKind::Exact }];
    let engine = SearchEngine::with_exact_index(SearchSettings::default(), Some(FakeExact::returning(hits))).unwrap();
    engine.ingest("c1", "alpha", meta("a", 0, 1)).unwrap();

    let response = engine.search_detailed("alpha", 3).unwrap();
    assert_eq!(response.attempts[0], (TierKind::Exact, TierStatus::Empty));
    assert_eq!(response.tier, Some(TierKind::Frequency));
    assert_eq!(ids(&response.results), ["c1"]);
}

#[test]
fn unknown_exact_hits_do_not_use_up_top_k() {
    let hits = vec![
        SearchHit { id: "ghost".into(), score: 9.0, source: TierKind::Exact },
        SearchHit { id: "c1".into(), score: 2.0, source: TierKind::Exact },
        SearchHit { id: "c2".into(), score: 1.0, source: TierKind::Exact },
    ];
    let engine = SearchEngine::with_exact_index(SearchSettings::default(), Some(FakeExact::returning(hits))).unwrap();
    engine.ingest("c1", "alpha", meta("a", 0, 1)).unwrap();
    engine.ingest("c2", "alpha", meta("b", 0, 1)).unwrap();

    let response = engine.search_detailed("alpha", 3).unwrap();
    assert_eq!(response.tier, Some(TierKind::Exact));
    assert_eq!(ids(&response.results), ["c1", "c2"]);
}

/// Rejects the `fail_on`-th write (1-based) and records every batch it sees.
struct FlakyExact {
    fail_on: usize,
    batches: Mutex<Vec<Vec<String>>>,
}

impl ExactIndexer for FlakyExact {
    fn index(&self, chunks: &[DocumentChunk]) -> anyhow::Result<()> {
        let mut batches = self.batches.lock();
        batches.push(chunks.iter().map(|c| c.id.clone()).collect());
        if batches.len() == self.fail_on {
            anyhow::bail!("disk full");
        }
        Ok(())
    }

    fn query(&self, _terms: &[String], _k: usize) -> anyhow::Result<Vec<SearchHit>> { Ok(vec![]) }
}

#[test]
fn failed_exact_write_is_resent_on_next_ingest() {
    let flaky = Arc::new(FlakyExact { fail_on: 2, batches: Mutex::new(vec![]) });
    let engine = SearchEngine::with_exact_index(SearchSettings::default(), Some(flaky.clone())).unwrap();
    engine.ingest("c1", "alpha", meta("a", 0, 1)).unwrap();
    engine.ingest("c2", "beta", meta("b", 0, 1)).expect("exact failure is not an ingestion error");

    // identical text: nothing changed for the term index, but c2 is still owed to tier 1
    assert_eq!(engine.ingest_chunks(&[DocumentChunk { id: "c2".into(), content: "beta".into(), metadata: meta("b", 0, 1) }]).unwrap(), 0);
    engine.ingest("c3", "gamma", meta("c", 0, 1)).unwrap();

    let batches = flaky.batches.lock().clone();
    assert_eq!(batches, vec![vec!["c1".to_string()], vec!["c2".to_string()], vec!["c2".to_string()], vec!["c3".to_string()]]);
}

#[test]
fn huge_top_k_is_served_by_the_tantivy_tier() {
    let engine = fox_engine(SearchSettings::default());
    let response = engine.search_detailed("fox", usize::MAX).unwrap();
    assert_eq!(response.tier, Some(TierKind::Exact));
    assert_eq!(response.results.len(), 2);
    assert_eq!(engine.search("qu", usize::MAX).unwrap().len(), 2);
}

#[test]
fn racing_ingests_of_one_chunk_leave_store_and_terms_in_agreement() {
    let engine = SearchEngine::new(settings_without_exact()).unwrap();
    for _ in 0..20 {
        std::thread::scope(|s| {
            for text in ["alpha shared", "omega shared"] {
                let engine = &engine;
                s.spawn(move || {
                    for _ in 0..50 {
                        engine.ingest("c1", text, meta("a", 0, 1)).unwrap();
                    }
                });
            }
        });
        let stored = engine.get_chunk("c1").expect("stored").content;
        let (kept, gone) = if stored.starts_with("alpha") { ("alpha", "omega") } else { ("omega", "alpha") };
        assert_eq!(ids(&engine.search(kept, 5).unwrap()), ["c1"]);
        assert!(engine.search(gone, 5).unwrap().is_empty(), "term index holds text the store replaced");
    }
}

#[test]
fn invalid_queries_are_rejected() {
    let engine = fox_engine(settings_without_exact());
    assert_eq!(engine.search("quick", 0), Err(InvalidQueryError::ZeroTopK));
    assert!(matches!(engine.search("  ?! a ", 3), Err(InvalidQueryError::NoTerms(_))));
    assert!(matches!(engine.search("", 3), Err(InvalidQueryError::NoTerms(_))));
}

#[test]
fn malformed_ingestion_is_rejected_without_side_effects() {
    let engine = SearchEngine::new(settings_without_exact()).unwrap();
    assert_eq!(engine.ingest("", "text", ChunkMetadata::default()), Err(IngestionError::EmptyChunkId));
    assert_eq!(engine.ingest("   ", "text", ChunkMetadata::default()), Err(IngestionError::EmptyChunkId));
    assert!(matches!(engine.ingest("c1", "text", meta("a", 3, 3)), Err(IngestionError::InvalidMetadata { .. })));

    let batch = vec![
        DocumentChunk { id: "ok".into(), content: "valid words".into(), metadata: meta("a", 0, 1) },
        DocumentChunk { id: "".into(), content: "words".into(), metadata: meta("a", 0, 1) },
    ];
    assert!(engine.ingest_chunks(&batch).is_err());
    assert_eq!(engine.chunk_count(), 0);
}

#[test]
fn empty_text_is_stored_but_never_matches() {
    let engine = SearchEngine::new(settings_without_exact()).unwrap();
    engine.ingest("blank", "", meta("a", 0, 1)).unwrap();
    assert_eq!(engine.chunk_count(), 1);
    assert!(engine.search("anything", 5).unwrap().is_empty());
}

#[test]
fn repeated_ingestion_is_idempotent() {
    let fake = FakeExact::returning(vec![]);
    let engine = SearchEngine::with_exact_index(SearchSettings::default(), Some(fake.clone())).unwrap();
    engine.ingest("c1", "the quick brown fox", meta("a", 0, 2)).unwrap();
    let before = engine.search("quick fox", 5).unwrap();
    let vocabulary = engine.vocabulary_size();

    engine.ingest("c1", "the quick brown fox", meta("a", 1, 2)).unwrap();
    let after = engine.search("quick fox", 5).unwrap();

    assert_eq!(ids(&before), ids(&after));
    assert_eq!(before[0].score, after[0].score);
    assert_eq!(engine.vocabulary_size(), vocabulary);
    assert_eq!(after[0].metadata.chunk_index, 1, "metadata is refreshed");
    assert_eq!(*fake.batches.lock(), vec![1], "unchanged text is not re-sent to the exact index");
}

#[test]
fn reingestion_replaces_previous_terms() {
    let engine = SearchEngine::new(settings_without_exact()).unwrap();
    engine.ingest("c1", "alpha beta", meta("a", 0, 1)).unwrap();
    engine.ingest("c1", "gamma delta", meta("a", 0, 1)).unwrap();

    assert!(engine.search("alpha", 5).unwrap().is_empty());
    assert_eq!(ids(&engine.search("gamma", 5).unwrap()), ["c1"]);
    assert_eq!(engine.get_chunk("c1").map(|c| c.content), Some("gamma delta".to_string()));
}

#[test]
fn batch_ingestion_uses_one_exact_commit() {
    let fake = FakeExact::returning(vec![]);
    let engine = SearchEngine::with_exact_index(SearchSettings::default(), Some(fake.clone())).unwrap();
    let batch: Vec<DocumentChunk> = (0..4)
        .map(|i| DocumentChunk { id: format!("doc:{i}"), content: format!("shared words number{i}"), metadata: meta("doc", i, 4) })
        .collect();
    assert_eq!(engine.ingest_chunks(&batch).unwrap(), 4);
    assert_eq!(engine.ingest_chunks(&batch).unwrap(), 0);
    assert_eq!(*fake.batches.lock(), vec![4]);
    assert_eq!(engine.chunk_count(), 4);
}

#[test]
fn top_k_larger_than_matches_returns_all_matches() {
    let engine = fox_engine(settings_without_exact());
    let results = engine.search("fox", 50).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(engine.search("fox", 1).unwrap().len(), 1);
}

#[test]
fn unmatchable_query_returns_empty() {
    let engine = fox_engine(SearchSettings::default());
    let response = engine.search_detailed("zz xylophone", 5).unwrap();
    assert!(response.results.is_empty());
    assert_eq!(response.tier, None);
    assert_eq!(response.attempts.len(), 3);
}

#[test]
fn equal_scores_are_ordered_by_chunk_id() {
    let engine = SearchEngine::new(settings_without_exact()).unwrap();
    for id in ["b", "c", "a"] {
        engine.ingest(id, "same text here", meta(id, 0, 1)).unwrap();
    }
    assert_eq!(ids(&engine.search("same text", 5).unwrap()), ["a", "b", "c"]);
}

#[test]
fn context_blocks_follow_rank_order() {
    let engine = fox_engine(settings_without_exact());
    let results = engine.search("quick fox", 2).unwrap();
    let context = build_context(&engine, &results);
    assert_eq!(context, "[Document: /docs/two.llm]\nquick quick fox fox fox\n\n[Document: /docs/one.llm]\nthe quick brown fox\n");
    assert_eq!(format_reference(&results[0].metadata), "/docs/two.llm (chunk 1/1)");
}

#[test]
fn concurrent_ingest_and_search() {
    let engine = SearchEngine::new(SearchSettings::default()).unwrap();
    std::thread::scope(|s| {
        for worker in 0..4 {
            let engine = &engine;
            s.spawn(move || {
                for i in 0..25 {
                    let id = format!("w{worker}:{i}");
                    engine.ingest(&id, &format!("common token worker{worker}"), meta(&id, 0, 1)).unwrap();
                }
            });
        }
        let engine = &engine;
        s.spawn(move || {
            for _ in 0..50 {
                let results = engine.search("common token", 10).unwrap();
                assert!(results.len() <= 10);
                assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
            }
        });
    });
    assert_eq!(engine.chunk_count(), 100);
    assert_eq!(engine.search("common", 200).unwrap().len(), 100);
}

#[test]
fn invalid_settings_are_refused() {
    let mut settings = settings_without_exact();
    settings.weights.frequency = settings.weights.coverage;
    assert!(SearchEngine::new(settings).is_err());
}
