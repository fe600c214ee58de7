//! Corpus fingerprint written next to each persisted index.
//!
//! The lexical and vector indexes must be built from the identical chunk set.
//! Ingestion writes the same manifest into both index directories and the
//! loader compares them before enabling fusion.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::DocumentChunk;

pub const MANIFEST_FILE: &str = "corpus_manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusManifest {
    pub chunk_count: usize,
    /// blake3 over `id \0 text \xff` for every chunk, in corpus order.
    pub fingerprint: String,
}

impl CorpusManifest {
    pub fn from_chunks(chunks: &[DocumentChunk]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for c in chunks {
            hasher.update(c.id.as_bytes());
            hasher.update(&[0u8]);
            hasher.update(c.text.as_bytes());
            hasher.update(&[0xffu8]);
        }
        Self { chunk_count: chunks.len(), fingerprint: hasher.finalize().to_hex().to_string() }
    }

    pub fn write_to(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        std::fs::write(dir.join(MANIFEST_FILE), serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    /// `Ok(None)` when the directory carries no manifest (index built elsewhere).
    pub fn read_from(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(MANIFEST_FILE);
        if !path.exists() { return Ok(None); }
        let bytes = std::fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}
