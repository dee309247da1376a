//! End-to-end: chunk a document, enrich it, index both engines, query,
//! and rerank with a scripted completion collaborator.

use async_trait::async_trait;
use scholardb_chunk::{ChunkerConfig, EnricherConfig, MetadataEnricher, SemanticChunker};
use scholardb_core::traits::CompletionClient;
use scholardb_core::types::{CancelToken, RetrievalSource};
use scholardb_hybrid::{HybridConfig, HybridRetriever, RerankConfig, Reranker};
use scholardb_text::{Bm25Config, Bm25Index};
use scholardb_vector::{HashEmbedder, InMemoryVectorStore, VectorStoreAdapter};
use std::sync::Arc;

fn paper() -> String {
    let chunking = "Semantic chunking splits long papers into overlapping segments so the index \
                    sees coherent spans of text";
    let fusion = "Reciprocal rank fusion combines keyword and vector rankings into a single \
                  ordering without score normalization";
    let citations = "Gardening advice for tomato seedlings belongs in a different corpus \
                     entirely and should rank last";
    format!(
        "Hybrid Retrieval over Scholarly Text\n\n\
         Abstract\n{chunking}. {fusion}.\n\n\
         1. Introduction\n{}. {fusion}.\n\n\
         3. Results\n{citations}.\n",
        vec![chunking; 25].join(". ")
    )
}

/// Rates excerpts by their topic keywords. The query text appears in
/// every prompt, so the markers are words unique to the chunk excerpts.
struct TopicClient;

#[async_trait]
impl CompletionClient for TopicClient {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        if prompt.contains("tomato") {
            Ok("2".to_string())
        } else if prompt.contains("Reciprocal") {
            Ok("9".to_string())
        } else {
            Ok("6".to_string())
        }
    }
}

#[tokio::test]
async fn chunk_enrich_index_retrieve_rerank() {
    let chunker = SemanticChunker::new(ChunkerConfig::default()).expect("chunker config");
    let enricher = MetadataEnricher::new(EnricherConfig::default()).expect("enricher config");

    let chunks = chunker.chunk(&paper(), "hybrid-paper");
    let chunks = enricher.enrich(&chunks, None);
    assert!(chunks.len() >= 3, "the paper spans several chunks");

    let bm25 = Bm25Index::new(Bm25Config::default()).expect("bm25 config");
    let vector = VectorStoreAdapter::new(
        Box::new(InMemoryVectorStore::new()),
        Box::new(HashEmbedder::new(256)),
    );
    let mut retriever =
        HybridRetriever::new(bm25, vector, HybridConfig::default()).expect("hybrid config");
    retriever.index(&chunks).expect("index");

    let retrieved = retriever.retrieve("rank fusion of keyword and vector results", None);
    assert!(!retrieved.is_empty());
    assert!(retrieved.iter().all(|r| r.source == RetrievalSource::Hybrid));
    let top_texts: Vec<&str> = retrieved.iter().take(3).map(|r| r.text.as_str()).collect();
    assert!(
        top_texts.iter().any(|t| t.contains("rank fusion")),
        "a fusion chunk reaches the top of the fused ranking"
    );

    let reranker = Reranker::new(Arc::new(TopicClient), RerankConfig::default()).expect("config");
    let reranked = reranker
        .rerank(retrieved, "rank fusion of keyword and vector results", Some(3), &CancelToken::new())
        .await;

    assert!(!reranked.is_empty());
    assert!(reranked.len() <= 3);
    assert!(
        reranked[0].text.contains("fusion"),
        "the collaborator-scored fusion chunk leads after reranking"
    );
    assert!(reranked.iter().all(|r| !r.degraded));
    assert!(
        !reranked.iter().any(|r| r.text.contains("tomato")),
        "the off-topic chunk does not survive reranking"
    );
}
