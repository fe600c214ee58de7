//! vitis-vector
//!
//! Dense retrieval. `LanceDbIndexer` writes the persisted index offline,
//! `LanceVectorRetriever` serves it read-only, and `FlatVectorIndex` is an
//! exact in-memory alternative behind the same `VectorRetriever` trait.

pub mod flat;
pub mod schema;
pub mod search;
pub mod writer;

pub use flat::FlatVectorIndex;
pub use search::LanceVectorRetriever;
pub use writer::LanceDbIndexer;
