//! Collaborator boundaries: embedding, similarity search, completion.
//!
//! External implementations return `anyhow::Result` so they are free to
//! surface whatever error type their backend produces. The retrieval core
//! recovers from collaborator failures with documented defaults instead
//! of propagating them.

use async_trait::async_trait;

use crate::types::{ChunkId, ChunkMetadata};

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// An entry handed to the similarity collection at index time.
#[derive(Debug, Clone)]
pub struct VectorEntry {
    pub id: ChunkId,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub vector: Vec<f32>,
}

/// One nearest-neighbor hit. Lower `distance` means closer.
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub id: ChunkId,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub distance: f64,
}

pub trait VectorSearch: Send + Sync {
    /// Replace the collection contents wholesale.
    fn rebuild(&self, entries: Vec<VectorEntry>) -> anyhow::Result<()>;
    fn query(&self, vector: &[f32], top_k: usize) -> anyhow::Result<Vec<VectorHit>>;
}

/// Free-text completion collaborator, used only for relevance scoring and
/// semantic tagging. Callers must tolerate it being unavailable.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}
