use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use vitis_core::config::{DataSettings, EmbedSettings};
use vitis_core::error::Error;
use vitis_core::manifest::CorpusManifest;
use vitis_core::traits::{Embedder, LexicalRetriever, VectorRetriever};
use vitis_embed::get_default_embedder;
use vitis_text::Bm25Retriever;
use vitis_vector::LanceVectorRetriever;

use crate::service::RetrieverLoader;

/// Opens the persisted LanceDB and tantivy indexes named in `DataSettings`.
pub struct DiskLoader {
    data: DataSettings,
    embed: EmbedSettings,
    embedder: Option<Arc<dyn Embedder>>,
}

impl DiskLoader {
    pub fn new(data: DataSettings, embed: EmbedSettings) -> Self { Self { data, embed, embedder: None } }

    /// Use an already loaded embedder instead of resolving one from settings.
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    fn embedder(&self) -> Result<Arc<dyn Embedder>> {
        match &self.embedder {
            Some(e) => Ok(e.clone()),
            None => Ok(Arc::from(get_default_embedder(&self.embed)?)),
        }
    }
}

impl RetrieverLoader for DiskLoader {
    fn load_vector(&self) -> Result<Arc<dyn VectorRetriever>> {
        let dir = self.data.vector_path();
        if !dir.exists() {
            return Err(Error::ConfigurationUnavailable(format!("vector index not found at {}", dir.display())).into());
        }
        let retriever = LanceVectorRetriever::open(&dir, &self.data.table_name, self.embedder()?)?;
        Ok(Arc::new(retriever))
    }

    /// Refuses an index whose corpus fingerprint differs from the vector index.
    fn load_lexical(&self) -> Result<Arc<dyn LexicalRetriever>> {
        let dir = self.data.lexical_path();
        let retriever = Bm25Retriever::open(&dir)?;
        match (CorpusManifest::read_from(&dir)?, CorpusManifest::read_from(&self.data.vector_path())?) {
            (Some(lexical), Some(vector)) if lexical != vector => {
                return Err(Error::ConfigurationUnavailable(format!(
                    "lexical index ({} chunks) and vector index ({} chunks) were built from different corpora",
                    lexical.chunk_count, vector.chunk_count
                ))
                .into());
            }
            (Some(m), Some(_)) => info!(chunks = m.chunk_count, "lexical and vector indexes share one corpus"),
            _ => warn!("corpus manifest missing; cannot verify both indexes share one corpus"),
        }
        Ok(Arc::new(retriever))
    }
}
