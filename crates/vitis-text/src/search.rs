use anyhow::Result;
use std::path::Path;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::Value;
use tantivy::{Index, IndexReader, TantivyDocument};
use tracing::{debug, warn};

use vitis_core::error::Error;
use vitis_core::traits::LexicalRetriever;
use vitis_core::types::{DocumentChunk, Meta, RetrievalHit, SourceKind};

use crate::index::LexicalIndexer;
use crate::tantivy_utils::{register_tokenizer, ChunkFields};

/// Read-only BM25 search over a built lexical index.
pub struct Bm25Retriever {
	index: Index,
	reader: IndexReader,
	fields: ChunkFields,
}

impl Bm25Retriever {
	/// Open a persisted index. A missing directory is `ConfigurationUnavailable`.
	pub fn open(index_dir: &Path) -> Result<Self> {
		if !index_dir.exists() {
			return Err(Error::ConfigurationUnavailable(format!("lexical index not found at {}", index_dir.display())).into());
		}
		let index = Index::open_in_dir(index_dir)?;
		Self::from_index(index)
	}

	/// Build a RAM index straight from the corpus.
	pub fn in_memory(chunks: &[DocumentChunk]) -> Result<Self> {
		let indexer = LexicalIndexer::in_memory()?;
		indexer.index(chunks)?;
		Self::from_index(indexer.into_index())
	}

	pub fn from_index(index: Index) -> Result<Self> {
		register_tokenizer(&index);
		let fields = ChunkFields::from_schema(&index.schema())?;
		let reader = index.reader()?;
		Ok(Self { index, reader, fields })
	}

	pub fn num_chunks(&self) -> u64 { self.reader.searcher().num_docs() }

	fn to_chunk(&self, doc: &TantivyDocument) -> DocumentChunk {
		let text_of = |field| doc.get_first(field).and_then(|v| v.as_str()).unwrap_or("").to_string();
		let id = text_of(self.fields.id);
		let raw_meta = text_of(self.fields.metadata);
		let metadata: Meta = if raw_meta.is_empty() {
			Meta::new()
		} else {
			serde_json::from_str(&raw_meta).unwrap_or_else(|e| {
				warn!(chunk = %id, error = %e, "unreadable stored metadata");
				Meta::new()
			})
		};
		DocumentChunk { id, text: text_of(self.fields.text), metadata }
	}
}

impl LexicalRetriever for Bm25Retriever {
	fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievalHit>> {
		if k == 0 || query.trim().is_empty() { return Ok(vec![]); }
		let searcher = self.reader.searcher();
		if searcher.num_docs() == 0 { return Ok(vec![]); }
		let qp = QueryParser::for_index(&self.index, vec![self.fields.text]);
		// Lenient parsing: raw user text may contain query syntax characters.
		let (q, errors) = qp.parse_query_lenient(query);
		if !errors.is_empty() { debug!(?errors, "lenient query parse dropped some terms"); }
		let top_docs = searcher.search(&q, &TopDocs::with_limit(k)).map_err(|e| Error::RetrievalFailure(format!("bm25 search: {e}")))?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr)?;
			hits.push(RetrievalHit { chunk: self.to_chunk(&doc), score, source: SourceKind::Lexical });
		}
		Ok(hits)
	}
}
