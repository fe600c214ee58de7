use anyhow::{bail, Result};
use arrow_array::{FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray};
use indicatif::{ProgressBar, ProgressStyle};
use lancedb::{connect, Connection};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use vitis_core::manifest::CorpusManifest;
use vitis_core::types::DocumentChunk;

use crate::schema::build_arrow_schema;

const BATCH_SIZE: usize = 1000;

/// Offline writer for the persisted vector index.
pub struct LanceDbIndexer {
	db: Connection,
	db_path: PathBuf,
	table_name: String,
}

impl LanceDbIndexer {
	/// Open a fresh database at `db_path`, replacing any previous index there.
	pub async fn create(db_path: &Path, table_name: &str) -> Result<Self> {
		if db_path.exists() { std::fs::remove_dir_all(db_path)?; }
		std::fs::create_dir_all(db_path)?;
		let db = connect(db_path.to_string_lossy().as_ref()).execute().await?;
		Ok(Self { db, db_path: db_path.to_path_buf(), table_name: table_name.to_string() })
	}

	/// Write all chunks with their embeddings, then the corpus manifest.
	///
	/// An empty corpus still produces an (empty) table so the index loads.
	pub async fn index(&self, chunks: &[DocumentChunk], embeddings: &[Vec<f32>], dim: usize) -> Result<()> {
		if chunks.len() != embeddings.len() { bail!("chunks ({}) and embeddings ({}) length must match", chunks.len(), embeddings.len()); }
		if let Some(bad) = embeddings.iter().find(|e| e.len() != dim) { bail!("embedding dim mismatch: got {} expected {}", bad.len(), dim); }
		let dim = i32::try_from(dim)?;
		let schema = build_arrow_schema(dim);
		if chunks.is_empty() {
			self.db.create_empty_table(&self.table_name, schema).execute().await?;
		} else {
			info!(chunks = chunks.len(), table = %self.table_name, "indexing chunks into LanceDB");
			let pb = ProgressBar::new(chunks.len() as u64);
			pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%)")?.progress_chars("#>-"));
			let mut created = false;
			for (chunk_batch, emb_batch) in chunks.chunks(BATCH_SIZE).zip(embeddings.chunks(BATCH_SIZE)) {
				let batch = to_record_batch(chunk_batch, emb_batch, dim)?;
				let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema.clone()));
				if created {
					self.db.open_table(&self.table_name).execute().await?.add(reader).execute().await?;
				} else {
					self.db.create_table(&self.table_name, reader).execute().await?;
					created = true;
				}
				pb.inc(chunk_batch.len() as u64);
			}
			pb.finish_and_clear();
		}
		CorpusManifest::from_chunks(chunks).write_to(&self.db_path)?;
		info!(chunks = chunks.len(), dir = %self.db_path.display(), "vector index written");
		Ok(())
	}
}

fn to_record_batch(chunks: &[DocumentChunk], embeddings: &[Vec<f32>], dim: i32) -> Result<RecordBatch> {
	let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
	let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
	let metadata = chunks.iter().map(|c| serde_json::to_string(&c.metadata)).collect::<Result<Vec<_>, _>>()?;
	let vectors = embeddings.iter().map(|v| Some(v.iter().map(|&x| Some(x)).collect::<Vec<_>>()));
	let batch = RecordBatch::try_new(build_arrow_schema(dim), vec![
		Arc::new(StringArray::from(ids)),
		Arc::new(StringArray::from(texts)),
		Arc::new(StringArray::from(metadata)),
		Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors, dim)),
	])?;
	Ok(batch)
}
