//! vitis-rag
//!
//! Answer generation on top of hybrid retrieval: prompt assembly, the hosted
//! model client, the lazily initialized `RagService`, and the conversation
//! flow that threads chat history through it.

pub mod chat_log;
pub mod conversation;
pub mod generation;
pub mod loader;
pub mod prompt;
pub mod service;

pub use chat_log::{ChatLog, InMemoryChatLog};
pub use conversation::{classification_summary, Conversation, ImageReply};
pub use generation::{GeminiClient, GenerationError, Generator};
pub use loader::DiskLoader;
pub use prompt::{image_question, render_prompt, PromptKind, REFUSAL_SENTENCE};
pub use service::{InitState, RagService, RetrieverLoader};

/// Reply for any failure while answering a question.
pub const APOLOGY_MESSAGE: &str = "Maaf, terjadi kesalahan saat memproses pertanyaan Anda. Silakan coba lagi.";

/// Reply when the corpus could not be loaded at all.
pub const RAG_UNAVAILABLE_MESSAGE: &str = "Maaf, sistem RAG belum tersedia. Silakan coba lagi nanti.";
