//! Adapter between chunk sets and the similarity-search collaborator.

use anyhow::{anyhow, ensure};
use scholardb_core::traits::{Embedder, VectorEntry, VectorSearch};
use scholardb_core::types::{Chunk, RetrievalResult, RetrievalSource};
use tracing::debug;

/// Owns the embedding and similarity-search collaborators and converts
/// between chunks, vectors, and retrieval results.
///
/// Scores are derived from distances as `1 / (1 + distance)`, so a lower
/// distance means a higher score, bounded in (0, 1].
pub struct VectorStoreAdapter {
    store: Box<dyn VectorSearch>,
    embedder: Box<dyn Embedder>,
}

impl VectorStoreAdapter {
    pub fn new(store: Box<dyn VectorSearch>, embedder: Box<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Embed `chunks` and replace the collection contents wholesale.
    pub fn index(&self, chunks: &[Chunk]) -> anyhow::Result<()> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts)?;
        ensure!(embeddings.len() == chunks.len(), "embedder returned {} vectors for {} chunks", embeddings.len(), chunks.len());
        for embedding in &embeddings {
            ensure!(
                embedding.len() == self.embedder.dim(),
                "embedding dim {} does not match embedder dim {}",
                embedding.len(),
                self.embedder.dim()
            );
        }

        let entries = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, vector)| VectorEntry {
                id: chunk.id.clone(),
                text: chunk.text.clone(),
                metadata: chunk.metadata.clone(),
                vector,
            })
            .collect();

        debug!(chunks = chunks.len(), "rebuilt vector collection");
        self.store.rebuild(entries)
    }

    /// Embed `query` and return the k nearest chunks as retrieval results.
    pub fn search(&self, query: &str, top_k: usize) -> anyhow::Result<Vec<RetrievalResult>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query_vec = self
            .embedder
            .embed_batch(&[query.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("embedder returned no vector for the query"))?;

        let hits = self.store.query(&query_vec, top_k)?;
        Ok(hits
            .into_iter()
            .map(|hit| RetrievalResult {
                chunk_id: hit.id,
                text: hit.text,
                score: 1.0 / (1.0 + hit.distance),
                source: RetrievalSource::Vector,
                metadata: hit.metadata,
                degraded: false,
            })
            .collect())
    }
}
