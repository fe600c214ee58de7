use anyhow::Result;
use std::path::{Path, PathBuf};
use tantivy::{doc, Index, IndexWriter};
use tracing::info;

use vitis_core::manifest::CorpusManifest;
use vitis_core::types::DocumentChunk;

use crate::tantivy_utils::{build_schema, register_tokenizer, ChunkFields};

/// Builds the lexical index from the corpus. Writing happens once, offline.
pub struct LexicalIndexer {
	index: Index,
	fields: ChunkFields,
	index_dir: Option<PathBuf>,
}

impl LexicalIndexer {
	/// Create a fresh on-disk index, replacing whatever was in `index_dir`.
	pub fn create(index_dir: &Path) -> Result<Self> {
		let schema = build_schema();
		if index_dir.exists() { std::fs::remove_dir_all(index_dir)?; }
		std::fs::create_dir_all(index_dir)?;
		let index = Index::create_in_dir(index_dir, schema.clone())?;
		register_tokenizer(&index);
		let fields = ChunkFields::from_schema(&schema)?;
		Ok(Self { index, fields, index_dir: Some(index_dir.to_path_buf()) })
	}

	pub fn in_memory() -> Result<Self> {
		let schema = build_schema();
		let index = Index::create_in_ram(schema.clone());
		register_tokenizer(&index);
		let fields = ChunkFields::from_schema(&schema)?;
		Ok(Self { index, fields, index_dir: None })
	}

	/// Add every chunk, commit, and write the corpus manifest next to the index.
	pub fn index(&self, chunks: &[DocumentChunk]) -> Result<usize> {
		// Single writer thread keeps one segment, so doc order follows corpus order.
		let mut index_writer: IndexWriter = self.index.writer_with_num_threads(1, 50_000_000)?;
		for c in chunks {
			let metadata = serde_json::to_string(&c.metadata)?;
			index_writer.add_document(doc!(
				self.fields.id => c.id.clone(),
				self.fields.text => c.text.clone(),
				self.fields.metadata => metadata,
			))?;
		}
		index_writer.commit()?;
		if let Some(dir) = &self.index_dir {
			CorpusManifest::from_chunks(chunks).write_to(dir)?;
			info!(dir = %dir.display(), chunks = chunks.len(), "lexical index written");
		}
		Ok(chunks.len())
	}

	pub fn into_index(self) -> Index { self.index }
}
