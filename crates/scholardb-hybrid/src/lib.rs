//! scholardb-hybrid
//!
//! Hybrid retrieval over one chunk set: queries the BM25 index and the
//! vector store independently, fuses the ranked lists with Reciprocal
//! Rank Fusion, and optionally reranks the fused list for relevance and
//! diversity.

pub mod rerank;

pub use rerank::{RerankConfig, Reranker};

use scholardb_core::error::{Error, Result};
use scholardb_core::types::{Chunk, ChunkId, RetrievalResult, RetrievalSource};
use scholardb_text::Bm25Index;
use scholardb_vector::VectorStoreAdapter;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Configuration for hybrid retrieval.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HybridConfig {
    pub bm25_weight: f64,
    pub vector_weight: f64,
    pub top_k_bm25: usize,
    pub top_k_vector: usize,
    pub final_top_k: usize,
    /// RRF smoothing constant; higher values flatten rank influence.
    pub rrf_k: u32,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            bm25_weight: 0.3,
            vector_weight: 0.7,
            top_k_bm25: 20,
            top_k_vector: 20,
            final_top_k: 10,
            rrf_k: 60,
        }
    }
}

impl HybridConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, weight) in [("bm25_weight", self.bm25_weight), ("vector_weight", self.vector_weight)] {
            if !weight.is_finite() || weight <= 0.0 {
                return Err(Error::InvalidConfig(format!("{name} must be > 0, got {weight}")));
            }
        }
        if self.top_k_bm25 == 0 || self.top_k_vector == 0 || self.final_top_k == 0 {
            return Err(Error::InvalidConfig("top-k values must be >= 1".into()));
        }
        if self.rrf_k == 0 {
            return Err(Error::InvalidConfig("rrf_k must be >= 1".into()));
        }
        Ok(())
    }
}

/// Fuse ranked lists with Reciprocal Rank Fusion.
///
/// Each list contributes `weight / (rrf_k + rank + 1)` per entry, with
/// 0-based ranks; an id absent from a list simply receives no
/// contribution from it. The emitted text/metadata come from whichever
/// list first supplied the id, ties break by first-seen order, and every
/// result is tagged `Hybrid`.
pub fn rrf_fusion(lists: &[(&[RetrievalResult], f64)], rrf_k: u32) -> Vec<RetrievalResult> {
    let mut scores: HashMap<ChunkId, f64> = HashMap::new();
    let mut order: Vec<ChunkId> = Vec::new();
    let mut carriers: HashMap<ChunkId, RetrievalResult> = HashMap::new();

    for (list, weight) in lists {
        for (rank, result) in list.iter().enumerate() {
            if !scores.contains_key(&result.chunk_id) {
                order.push(result.chunk_id.clone());
                carriers.insert(result.chunk_id.clone(), result.clone());
            }
            *scores.entry(result.chunk_id.clone()).or_default() +=
                weight / (f64::from(rrf_k) + rank as f64 + 1.0);
        }
    }

    let mut fused: Vec<RetrievalResult> = order
        .into_iter()
        .filter_map(|id| {
            let mut result = carriers.remove(&id)?;
            result.score = scores.get(&id).copied().unwrap_or_default();
            result.source = RetrievalSource::Hybrid;
            Some(result)
        })
        .collect();

    // Stable sort: equal fused scores keep first-seen order.
    fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    fused
}

/// Hybrid retriever over one chunk set.
///
/// Owns both engines; `index` rebuilds them wholesale, `retrieve` fans a
/// query out to both and fuses the rankings. A failed vector call
/// degrades to lexical-only results rather than failing the query.
pub struct HybridRetriever {
    bm25: Bm25Index,
    vector: VectorStoreAdapter,
    config: HybridConfig,
}

impl HybridRetriever {
    pub fn new(bm25: Bm25Index, vector: VectorStoreAdapter, config: HybridConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { bm25, vector, config })
    }

    /// Index `chunks` into both engines, replacing prior contents.
    pub fn index(&mut self, chunks: &[Chunk]) -> anyhow::Result<()> {
        self.bm25.build(chunks);
        self.vector.index(chunks)
    }

    /// Retrieve the fused top results for `query`; `top_k` overrides the
    /// configured `final_top_k`.
    pub fn retrieve(&self, query: &str, top_k: Option<usize>) -> Vec<RetrievalResult> {
        let final_k = top_k.unwrap_or(self.config.final_top_k);

        let bm25_results = self.bm25.search(query, self.config.top_k_bm25);
        let vector_results = match self.vector.search(query, self.config.top_k_vector) {
            Ok(results) => results,
            Err(error) => {
                warn!(%error, "vector search failed, continuing with lexical results only");
                Vec::new()
            }
        };

        debug!(
            bm25 = bm25_results.len(),
            vector = vector_results.len(),
            "hybrid search gathered candidates"
        );

        let mut fused = rrf_fusion(
            &[
                (bm25_results.as_slice(), self.config.bm25_weight),
                (vector_results.as_slice(), self.config.vector_weight),
            ],
            self.config.rrf_k,
        );
        fused.truncate(final_k);
        fused
    }
}
