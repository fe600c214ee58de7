use crate::types::RetrievalHit;

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    /// Embeddings are L2-normalized, so dot product equals cosine similarity.
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed_query(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector for query"))
    }
}

/// Keyword ranking over the corpus (BM25).
pub trait LexicalRetriever: Send + Sync {
    fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<RetrievalHit>>;
}

/// Nearest-neighbour search over dense embeddings of the corpus.
pub trait VectorRetriever: Send + Sync {
    fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<RetrievalHit>>;
}
