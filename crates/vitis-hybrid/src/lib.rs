//! vitis-hybrid
//!
//! Fuses the dense and lexical rankings into one evidence list using
//! weighted reciprocal rank, with a vector-only degraded mode when the
//! lexical index is unavailable.

pub mod fusion;
pub mod retriever;

pub use fusion::{weighted_rank_fusion, FusedChunk, FusionParams};
pub use retriever::{FusedResults, HybridRetriever, RetrievalMode};
