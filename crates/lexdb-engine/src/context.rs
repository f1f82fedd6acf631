//! Turning ranked results into text for a downstream reader.

use lexdb_core::types::{ChunkMetadata, RankedResult};

use crate::engine::SearchEngine;

fn source_label(metadata: &ChunkMetadata) -> &str {
    if metadata.source.is_empty() { "unknown" } else { &metadata.source }
}

/// One `[Document: <source>]` block per result, in rank order. Results whose
/// chunk is no longer stored are skipped.
pub fn build_context(engine: &SearchEngine, results: &[RankedResult]) -> String {
    results
        .iter()
        .filter_map(|r| {
            let chunk = engine.get_chunk(&r.chunk_id)?;
            Some(format!("[Document: {}]\n{}\n", source_label(&r.metadata), chunk.content))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `"<source> (chunk 2/5)"`, numbered from one.
pub fn format_reference(metadata: &ChunkMetadata) -> String {
    format!("{} (chunk {}/{})", source_label(metadata), metadata.chunk_index + 1, metadata.total_chunks.max(1))
}
