use std::collections::{HashMap, HashSet};

use vitis_core::config::RetrievalSettings;
use vitis_core::error::Error;
use vitis_core::types::{DocumentChunk, RetrievalHit};

/// Weights and smoothing for `w / (rank + c)` fusion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionParams {
    pub weight_vector: f32,
    pub weight_lexical: f32,
    pub rank_constant: f32,
}

impl Default for FusionParams {
    fn default() -> Self { Self::from(&RetrievalSettings::default()) }
}

impl From<&RetrievalSettings> for FusionParams {
    fn from(s: &RetrievalSettings) -> Self {
        Self { weight_vector: s.weight_vector, weight_lexical: s.weight_lexical, rank_constant: s.rank_constant }
    }
}

impl FusionParams {
    pub fn validate(&self) -> Result<(), Error> {
        let settings = RetrievalSettings {
            weight_vector: self.weight_vector,
            weight_lexical: self.weight_lexical,
            rank_constant: self.rank_constant,
            ..RetrievalSettings::default()
        };
        settings.validate()
    }
}

/// One entry of the fused ranking. Ranks are 1-based; `None` means the chunk
/// was absent from that retriever's list.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedChunk {
    pub chunk: DocumentChunk,
    pub score: f64,
    pub vector_rank: Option<usize>,
    pub lexical_rank: Option<usize>,
}

/// Merge two ranked lists by weighted reciprocal rank.
///
/// Raw scores are ignored: BM25 and cosine are not on comparable scales.
/// Output holds each chunk id once, sorted by fused score descending; ties
/// keep first-observed order (vector list first, then lexical).
pub fn weighted_rank_fusion(vector: Vec<RetrievalHit>, lexical: Vec<RetrievalHit>, params: &FusionParams) -> Vec<FusedChunk> {
    let c = f64::from(params.rank_constant);
    let mut fused: Vec<FusedChunk> = Vec::with_capacity(vector.len() + lexical.len());
    let mut position: HashMap<String, usize> = HashMap::new();

    let lists = [(vector, f64::from(params.weight_vector), true), (lexical, f64::from(params.weight_lexical), false)];
    for (hits, weight, is_vector) in lists {
        let mut rank = 0usize;
        let mut seen_here: HashSet<String> = HashSet::new();
        for hit in hits {
            // A retriever listing the same chunk twice only counts its best rank.
            if !seen_here.insert(hit.chunk.id.clone()) { continue; }
            rank += 1;
            #[allow(clippy::cast_precision_loss)]
            let contribution = weight / (rank as f64 + c);
            let idx = *position.entry(hit.chunk.id.clone()).or_insert_with(|| {
                fused.push(FusedChunk { chunk: hit.chunk, score: 0.0, vector_rank: None, lexical_rank: None });
                fused.len() - 1
            });
            let entry = &mut fused[idx];
            entry.score += contribution;
            if is_vector { entry.vector_rank = Some(rank); } else { entry.lexical_rank = Some(rank); }
        }
    }

    // Stable sort preserves first-observed order among equal scores.
    fused.sort_by(|a, b| b.score.total_cmp(&a.score));
    fused
}
