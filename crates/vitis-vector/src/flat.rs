use anyhow::{bail, Result};
use std::sync::Arc;

use vitis_core::traits::{Embedder, VectorRetriever};
use vitis_core::types::{DocumentChunk, RetrievalHit, SourceKind};

/// Exact in-memory cosine search. Suits small corpora and tests.
pub struct FlatVectorIndex {
	chunks: Vec<DocumentChunk>,
	vectors: Vec<Vec<f32>>,
	embedder: Arc<dyn Embedder>,
}

impl FlatVectorIndex {
	/// Embed every chunk with `embedder`.
	pub fn build(chunks: Vec<DocumentChunk>, embedder: Arc<dyn Embedder>) -> Result<Self> {
		let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
		let vectors = embedder.embed_batch(&texts)?;
		Self::from_parts(chunks, vectors, embedder)
	}

	pub fn from_parts(chunks: Vec<DocumentChunk>, vectors: Vec<Vec<f32>>, embedder: Arc<dyn Embedder>) -> Result<Self> {
		if chunks.len() != vectors.len() { bail!("chunks ({}) and vectors ({}) length must match", chunks.len(), vectors.len()); }
		if let Some(v) = vectors.iter().find(|v| v.len() != embedder.dim()) { bail!("vector dim {} does not match embedder dim {}", v.len(), embedder.dim()); }
		Ok(Self { chunks, vectors, embedder })
	}

	pub fn len(&self) -> usize { self.chunks.len() }

	pub fn is_empty(&self) -> bool { self.chunks.is_empty() }
}

impl VectorRetriever for FlatVectorIndex {
	fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievalHit>> {
		if k == 0 || self.chunks.is_empty() { return Ok(vec![]); }
		let q = self.embedder.embed_query(query)?;
		let mut scored: Vec<(usize, f32)> = self.vectors.iter().enumerate().map(|(i, v)| (i, dot(&q, v))).collect();
		// Stable sort: equal scores keep corpus order.
		scored.sort_by(|a, b| b.1.total_cmp(&a.1));
		Ok(scored
			.into_iter()
			.take(k)
			.map(|(i, score)| RetrievalHit { chunk: self.chunks[i].clone(), score, source: SourceKind::Vector })
			.collect())
	}
}

fn dot(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() }
