//! vitis-text
//!
//! Lexical retrieval: BM25 ranking over a Tantivy index built once from the
//! corpus. `index` builds the persisted (or in-RAM) index, `search` serves
//! read-only queries through the `LexicalRetriever` trait.

pub mod tantivy_utils;
pub mod index;
pub mod search;

pub use index::LexicalIndexer;
pub use search::Bm25Retriever;
