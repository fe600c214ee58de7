use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, warn};

use vitis_core::config::RetrievalSettings;
use vitis_core::traits::{LexicalRetriever, VectorRetriever};
use vitis_core::types::{DocumentChunk, RetrievalHit};

use crate::fusion::{weighted_rank_fusion, FusedChunk, FusionParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalMode {
    Hybrid,
    /// Lexical index missing or unusable; results are the vector ranking as-is.
    VectorOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FusedResults {
    pub chunks: Vec<FusedChunk>,
    pub mode: RetrievalMode,
}

impl FusedResults {
    pub fn is_empty(&self) -> bool { self.chunks.is_empty() }

    pub fn len(&self) -> usize { self.chunks.len() }

    pub fn ids(&self) -> Vec<&str> { self.chunks.iter().map(|c| c.chunk.id.as_str()).collect() }

    pub fn documents(&self) -> impl Iterator<Item = &DocumentChunk> { self.chunks.iter().map(|c| &c.chunk) }
}

pub struct HybridRetriever {
    vector: Arc<dyn VectorRetriever>,
    lexical: Option<Arc<dyn LexicalRetriever>>,
    k_vector: usize,
    k_lexical: usize,
    params: FusionParams,
}

impl HybridRetriever {
    /// `lexical = None` selects the vector-only degraded mode.
    pub fn new(vector: Arc<dyn VectorRetriever>, lexical: Option<Arc<dyn LexicalRetriever>>, settings: &RetrievalSettings) -> Result<Self> {
        settings.validate()?;
        if lexical.is_none() {
            warn!("lexical retriever unavailable; hybrid retrieval degraded to vector-only");
        }
        Ok(Self { vector, lexical, k_vector: settings.k_vector, k_lexical: settings.k_lexical, params: FusionParams::from(settings) })
    }

    pub fn mode(&self) -> RetrievalMode {
        if self.lexical.is_some() { RetrievalMode::Hybrid } else { RetrievalMode::VectorOnly }
    }

    pub fn params(&self) -> FusionParams { self.params }

    /// Never fails: a retriever error is logged and contributes nothing.
    pub fn retrieve(&self, query: &str) -> FusedResults {
        let vector_hits = run_search("vector", || self.vector.search(query, self.k_vector));
        let Some(lexical) = &self.lexical else {
            debug!(hits = vector_hits.len(), "vector-only retrieval");
            return FusedResults { chunks: passthrough(vector_hits), mode: RetrievalMode::VectorOnly };
        };
        let lexical_hits = run_search("lexical", || lexical.search(query, self.k_lexical));
        debug!(vector = vector_hits.len(), lexical = lexical_hits.len(), "fusing rankings");
        FusedResults { chunks: weighted_rank_fusion(vector_hits, lexical_hits, &self.params), mode: RetrievalMode::Hybrid }
    }
}

fn run_search(name: &str, search: impl FnOnce() -> Result<Vec<RetrievalHit>>) -> Vec<RetrievalHit> {
    match search() {
        Ok(hits) => hits,
        Err(e) => {
            error!(retriever = name, error = %format!("{e:#}"), "retrieval failed; contributing no results");
            Vec::new()
        }
    }
}

/// Vector results in order with raw similarity as score. A repeated id keeps its first occurrence.
fn passthrough(hits: Vec<RetrievalHit>) -> Vec<FusedChunk> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|h| seen.insert(h.chunk.id.clone()))
        .enumerate()
        .map(|(i, h)| FusedChunk { chunk: h.chunk, score: f64::from(h.score), vector_rank: Some(i + 1), lexical_rank: None })
        .collect()
}
