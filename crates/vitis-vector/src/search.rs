use anyhow::{anyhow, bail, Result};
use arrow_array::{Array, Float32Array, RecordBatch, StringArray};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, DistanceType, Table};
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::info;

use vitis_core::error::Error;
use vitis_core::traits::{Embedder, VectorRetriever};
use vitis_core::types::{DocumentChunk, Meta, RetrievalHit, SourceKind};

use crate::schema::vector_dim;

/// Read-only nearest-neighbour search over a persisted LanceDB table.
///
/// The retriever owns a small tokio runtime and blocks on each query, so
/// callers stay synchronous.
pub struct LanceVectorRetriever {
	rt: Runtime,
	table: Table,
	embedder: Arc<dyn Embedder>,
	rows: usize,
}

impl LanceVectorRetriever {
	/// A missing directory or table is `ConfigurationUnavailable`.
	pub fn open(db_path: &Path, table_name: &str, embedder: Arc<dyn Embedder>) -> Result<Self> {
		if !db_path.exists() {
			return Err(Error::ConfigurationUnavailable(format!("vector index not found at {}", db_path.display())).into());
		}
		let rt = tokio::runtime::Builder::new_multi_thread().worker_threads(2).enable_all().build()?;
		let (table, rows, dim) = rt.block_on(async {
			let db = connect(db_path.to_string_lossy().as_ref()).execute().await?;
			if !db.table_names().execute().await?.iter().any(|n| n == table_name) {
				return Err(anyhow::Error::from(Error::ConfigurationUnavailable(format!("table '{}' not found in {}", table_name, db_path.display()))));
			}
			let table = db.open_table(table_name).execute().await?;
			let rows = table.count_rows(None).await?;
			let schema = table.schema().await?;
			let dim = vector_dim(&schema);
			Ok::<_, anyhow::Error>((table, rows, dim))
		})?;
		match dim {
			Some(d) if usize::try_from(d).ok() == Some(embedder.dim()) => {}
			Some(d) => bail!("vector index dim {} does not match embedder dim {}", d, embedder.dim()),
			None => bail!("table '{}' has no vector column", table_name),
		}
		info!(table = table_name, rows, "vector index loaded");
		Ok(Self { rt, table, embedder, rows })
	}

	pub fn num_chunks(&self) -> usize { self.rows }
}

impl VectorRetriever for LanceVectorRetriever {
	fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievalHit>> {
		if k == 0 || self.rows == 0 { return Ok(vec![]); }
		let query_embedding = self.embedder.embed_query(query)?;
		self.rt.block_on(async {
			let mut stream = self.table.vector_search(query_embedding)?.distance_type(DistanceType::Cosine).limit(k).execute().await?;
			let mut hits = Vec::with_capacity(k);
			while let Some(batch) = stream.try_next().await? {
				collect_hits(&batch, &mut hits)?;
			}
			Ok::<_, anyhow::Error>(hits)
		})
		.map_err(|e| Error::RetrievalFailure(format!("lance search: {e:#}")).into())
	}
}

fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
	batch.column_by_name(name).and_then(|c| c.as_any().downcast_ref::<StringArray>()).ok_or_else(|| anyhow!("missing {} column", name))
}

fn collect_hits(batch: &RecordBatch, hits: &mut Vec<RetrievalHit>) -> Result<()> {
	let ids = string_col(batch, "id")?;
	let texts = string_col(batch, "text")?;
	let metas = string_col(batch, "metadata")?;
	let distances = batch.column_by_name("_distance").and_then(|c| c.as_any().downcast_ref::<Float32Array>()).ok_or_else(|| anyhow!("missing _distance column"))?;
	for i in 0..batch.num_rows() {
		let metadata: Meta = serde_json::from_str(metas.value(i))?;
		let chunk = DocumentChunk { id: ids.value(i).to_string(), text: texts.value(i).to_string(), metadata };
		// Cosine distance is 1 - similarity.
		let score = if distances.is_null(i) { 0.0 } else { 1.0 - distances.value(i) };
		hits.push(RetrievalHit { chunk, score, source: SourceKind::Vector });
	}
	Ok(())
}
