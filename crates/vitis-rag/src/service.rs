//! Process-wide answering service with one-shot lazy initialization.
//!
//! The first call that needs retrieval loads both indexes; every later call
//! (and every concurrent caller waiting on the first) shares that result.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{error, info, warn};

use vitis_core::config::RetrievalSettings;
use vitis_core::error::Error;
use vitis_core::traits::{LexicalRetriever, VectorRetriever};
use vitis_core::types::ConversationTurn;
use vitis_hybrid::{FusedResults, HybridRetriever};

use crate::generation::Generator;
use crate::prompt::{image_question, render_prompt, PromptKind};
use crate::{APOLOGY_MESSAGE, RAG_UNAVAILABLE_MESSAGE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    Uninitialized,
    Initializing,
    Ready,
    /// Lexical index unusable; answering from vector retrieval alone.
    Degraded,
    /// No usable corpus; every answer is the unavailable notice.
    Unavailable,
}

/// Source of the two retrievers. Called at most once per `RagService`.
pub trait RetrieverLoader: Send + Sync {
    fn load_vector(&self) -> Result<Arc<dyn VectorRetriever>>;
    fn load_lexical(&self) -> Result<Arc<dyn LexicalRetriever>>;
}

enum Loaded {
    Ready(HybridRetriever),
    Degraded(HybridRetriever),
    Unavailable,
}

pub struct RagService {
    loader: Box<dyn RetrieverLoader>,
    generator: Arc<dyn Generator>,
    settings: RetrievalSettings,
    loaded: OnceLock<Loaded>,
    initializing: AtomicBool,
}

impl RagService {
    pub fn new(loader: Box<dyn RetrieverLoader>, generator: Arc<dyn Generator>, settings: RetrievalSettings) -> Self {
        Self { loader, generator, settings, loaded: OnceLock::new(), initializing: AtomicBool::new(false) }
    }

    pub fn status(&self) -> InitState {
        match self.loaded.get() {
            Some(Loaded::Ready(_)) => InitState::Ready,
            Some(Loaded::Degraded(_)) => InitState::Degraded,
            Some(Loaded::Unavailable) => InitState::Unavailable,
            None if self.initializing.load(Ordering::Acquire) => InitState::Initializing,
            None => InitState::Uninitialized,
        }
    }

    /// Idempotent. Concurrent callers block until the single load finishes.
    pub fn ensure_initialized(&self) -> InitState {
        self.loaded.get_or_init(|| {
            self.initializing.store(true, Ordering::Release);
            let loaded = self.load();
            self.initializing.store(false, Ordering::Release);
            loaded
        });
        self.status()
    }

    fn load(&self) -> Loaded {
        info!("initializing retrieval");
        let vector = match self.loader.load_vector() {
            Ok(v) => v,
            Err(e) => {
                error!(error = %format!("{e:#}"), "vector index unavailable; answers disabled");
                return Loaded::Unavailable;
            }
        };
        let lexical = match self.loader.load_lexical() {
            Ok(l) => Some(l),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "lexical index unavailable");
                None
            }
        };
        let degraded = lexical.is_none();
        match HybridRetriever::new(vector, lexical, &self.settings) {
            Ok(r) if degraded => Loaded::Degraded(r),
            Ok(r) => {
                info!(k_vector = self.settings.k_vector, k_lexical = self.settings.k_lexical, "hybrid retrieval ready");
                Loaded::Ready(r)
            }
            Err(e) => {
                error!(error = %format!("{e:#}"), "invalid retrieval settings");
                Loaded::Unavailable
            }
        }
    }

    fn retriever(&self) -> Option<&HybridRetriever> {
        self.ensure_initialized();
        match self.loaded.get()? {
            Loaded::Ready(r) | Loaded::Degraded(r) => Some(r),
            Loaded::Unavailable => None,
        }
    }

    /// `None` when the service is unavailable.
    pub fn retrieve(&self, query: &str) -> Option<FusedResults> { self.retriever().map(|r| r.retrieve(query)) }

    /// Answer a typed question. Never fails: problems become a fixed apology.
    pub fn answer_text(&self, question: &str, history: &[ConversationTurn]) -> String {
        self.answer(PromptKind::Text, question, history)
    }

    /// Answer about a disease label produced by the image classifier.
    pub fn answer_image(&self, disease: &str, history: &[ConversationTurn]) -> String {
        self.answer(PromptKind::Image { disease }, &image_question(disease), history)
    }

    fn answer(&self, kind: PromptKind<'_>, question: &str, history: &[ConversationTurn]) -> String {
        let Some(retriever) = self.retriever() else {
            return RAG_UNAVAILABLE_MESSAGE.to_string();
        };
        let results = retriever.retrieve(question);
        info!(hits = results.len(), mode = ?results.mode, "context retrieved");
        let prompt = render_prompt(kind, results.documents(), question, history);
        match self.generator.generate(&prompt) {
            Ok(answer) => answer,
            Err(e) => {
                error!(error = %Error::from(e), "answer replaced with apology");
                APOLOGY_MESSAGE.to_string()
            }
        }
    }
}
