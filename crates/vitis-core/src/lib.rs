#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]
//! vitis-core
//!
//! Shared domain types, retriever traits, error taxonomy, configuration and
//! the knowledge-base ingestion boundary used by every other `vitis-*` crate.

pub mod config;
pub mod data_processor;
pub mod error;
pub mod manifest;
pub mod traits;
pub mod types;
