#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use vitis_core::config::RetrievalSettings;
use vitis_core::traits::{Embedder, LexicalRetriever, VectorRetriever};
use vitis_core::types::DocumentChunk;
use vitis_embed::FakeEmbedder;
use vitis_rag::{GenerationError, Generator, RagService, RetrieverLoader};
use vitis_text::Bm25Retriever;
use vitis_vector::FlatVectorIndex;

pub fn grape_corpus() -> Vec<DocumentChunk> {
    vec![
        DocumentChunk::new("c1", "Black rot causes brown lesions on grape leaves").with_meta("category", "penyakit"),
        DocumentChunk::new("c2", "Downy mildew menyebabkan bercak kuning berminyak pada permukaan atas daun anggur"),
        DocumentChunk::new("c3", "Esca menimbulkan pola garis harimau pada daun dan buah mengerut"),
        DocumentChunk::new("c4", "Pemangkasan anggur dilakukan setelah panen untuk merangsang tunas baru"),
    ]
}

/// In-memory retrievers over a fixed corpus, counting each load.
pub struct MemoryLoader {
    pub corpus: Vec<DocumentChunk>,
    pub vector_fails: bool,
    pub lexical_fails: bool,
    pub loads: Arc<AtomicUsize>,
}

impl MemoryLoader {
    pub fn new(corpus: Vec<DocumentChunk>) -> Self {
        Self { corpus, vector_fails: false, lexical_fails: false, loads: Arc::new(AtomicUsize::new(0)) }
    }
}

impl RetrieverLoader for MemoryLoader {
    fn load_vector(&self) -> anyhow::Result<Arc<dyn VectorRetriever>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.vector_fails { anyhow::bail!("vector index not found"); }
        let embedder: Arc<dyn Embedder> = Arc::new(FakeEmbedder::new(512));
        Ok(Arc::new(FlatVectorIndex::build(self.corpus.clone(), embedder)?))
    }

    fn load_lexical(&self) -> anyhow::Result<Arc<dyn LexicalRetriever>> {
        if self.lexical_fails { anyhow::bail!("lexical index not found"); }
        Ok(Arc::new(Bm25Retriever::in_memory(&self.corpus)?))
    }
}

/// Records every prompt and replies with a fixed answer.
#[derive(Default)]
pub struct RecordingGenerator {
    pub prompts: Mutex<Vec<String>>,
}

impl RecordingGenerator {
    pub fn last_prompt(&self) -> String { self.prompts.lock().unwrap().last().cloned().unwrap_or_default() }
}

impl Generator for RecordingGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("Black rot adalah penyakit jamur pada daun anggur.".to_string())
    }
}

pub struct FailingGenerator;

impl Generator for FailingGenerator {
    fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::Status { status: 503, body: "overloaded".into() })
    }
}

pub fn service(loader: MemoryLoader, generator: Arc<dyn Generator>) -> RagService {
    RagService::new(Box::new(loader), generator, RetrievalSettings::default())
}
