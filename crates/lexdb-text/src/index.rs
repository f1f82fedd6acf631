use anyhow::{Context, Result};
use parking_lot::Mutex;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Value};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};

use lexdb_core::config::ExactIndexSettings;
use lexdb_core::error::IndexUnavailableError;
use lexdb_core::traits::ExactIndexer;
use lexdb_core::types::{DocumentChunk, SearchHit, TierKind};

use crate::tantivy_utils::{build_schema, register_tokenizer, ID_FIELD, TEXT_FIELD};

/// Readers only see what the last `commit` + `reload` published.
pub struct TantivyExactIndex {
	reader: IndexReader,
	writer: Mutex<IndexWriter>,
	id_field: Field,
	text_field: Field,
}

impl TantivyExactIndex {
	/// Startup capability check. Any failure here disables the exact tier for
	/// the life of the process; it is never retried per query.
	pub fn open(settings: &ExactIndexSettings) -> Result<Self, IndexUnavailableError> {
		if !settings.enabled { return Err(IndexUnavailableError::new("disabled by configuration")); }
		Self::create(settings).map_err(|e| IndexUnavailableError::new(format!("{e:#}")))
	}

	fn create(settings: &ExactIndexSettings) -> Result<Self> {
		let schema = build_schema();
		let index = match settings.resolved_index_dir() {
			Some(index_dir) => {
				if index_dir.exists() { std::fs::remove_dir_all(&index_dir).with_context(|| format!("clearing {}", index_dir.display()))?; }
				std::fs::create_dir_all(&index_dir).with_context(|| format!("creating {}", index_dir.display()))?;
				Index::create_in_dir(&index_dir, schema.clone())?
			}
			None => Index::create_in_ram(schema.clone()),
		};
		register_tokenizer(&index);
		let id_field = schema.get_field(ID_FIELD)?;
		let text_field = schema.get_field(TEXT_FIELD)?;
		let writer: IndexWriter = index.writer_with_num_threads(1, settings.writer_memory_bytes)?;
		let reader: IndexReader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
		Ok(Self { reader, writer: Mutex::new(writer), id_field, text_field })
	}

	pub fn num_docs(&self) -> u64 { self.reader.searcher().num_docs() }

	fn stage(&self, writer: &IndexWriter, chunks: &[DocumentChunk]) -> Result<()> {
		for c in chunks {
			writer.delete_term(Term::from_field_text(self.id_field, &c.id));
			writer.add_document(doc!(
				self.id_field => c.id.clone(),
				self.text_field => c.content.clone(),
			))?;
		}
		Ok(())
	}
}

impl ExactIndexer for TantivyExactIndex {
	fn index(&self, chunks: &[DocumentChunk]) -> anyhow::Result<()> {
		if chunks.is_empty() { return Ok(()); }
		let mut writer = self.writer.lock();
		if let Err(e) = self.stage(&writer, chunks) {
			if let Err(rollback) = writer.rollback() { tracing::warn!(error = %rollback, "exact index rollback failed"); }
			return Err(e);
		}
		writer.commit()?;
		self.reader.reload()?;
		Ok(())
	}

	fn query(&self, terms: &[String], k: usize) -> anyhow::Result<Vec<SearchHit>> {
		let searcher = self.reader.searcher();
		// tantivy sizes its heap from the limit, which must stay below the corpus size
		let k = k.min(usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX));
		if terms.is_empty() || k == 0 { return Ok(vec![]); }
		let clauses: Vec<(Occur, Box<dyn Query>)> = terms
			.iter()
			.map(|t| {
				let term = Term::from_field_text(self.text_field, t);
				(Occur::Should, Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs)) as Box<dyn Query>)
			})
			.collect();
		let q = BooleanQuery::new(clauses);
		let top_docs = searcher.search(&q, &TopDocs::with_limit(k))?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr)?;
			let Some(id) = doc.get_first(self.id_field).and_then(|v| v.as_str()) else { continue };
			hits.push(SearchHit { id: id.to_string(), score: score.max(0.0), source: TierKind::Exact });
		}
		Ok(hits)
	}
}
