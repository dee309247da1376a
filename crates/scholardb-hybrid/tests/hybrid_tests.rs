use scholardb_core::traits::{VectorEntry, VectorHit, VectorSearch};
use scholardb_core::types::{Chunk, ChunkMetadata, RetrievalResult, RetrievalSource, Section};
use scholardb_hybrid::{rrf_fusion, HybridConfig, HybridRetriever};
use scholardb_text::{Bm25Config, Bm25Index};
use scholardb_vector::{HashEmbedder, InMemoryVectorStore, VectorStoreAdapter};

fn chunk(id: &str, text: &str, index: usize) -> Chunk {
    Chunk::new(id, text, ChunkMetadata::new("doc", Section::Body, index))
}

fn result(id: &str, score: f64, source: RetrievalSource) -> RetrievalResult {
    RetrievalResult {
        chunk_id: id.to_string(),
        text: format!("text of {id}"),
        score,
        source,
        metadata: ChunkMetadata::new("doc", Section::Body, 0),
        degraded: false,
    }
}

fn retriever(config: HybridConfig) -> HybridRetriever {
    let bm25 = Bm25Index::new(Bm25Config::default()).expect("bm25 config");
    let vector = VectorStoreAdapter::new(
        Box::new(InMemoryVectorStore::new()),
        Box::new(HashEmbedder::new(128)),
    );
    HybridRetriever::new(bm25, vector, config).expect("hybrid config")
}

#[test]
fn rank_zero_in_both_lists_beats_rank_zero_in_one() {
    for (bm25_w, vector_w, rrf_k) in [(0.3, 0.7, 60), (1.0, 1.0, 10), (0.5, 2.0, 1)] {
        let x = result("X", 3.0, RetrievalSource::Bm25);
        let both = rrf_fusion(
            &[(std::slice::from_ref(&x), bm25_w), (std::slice::from_ref(&x), vector_w)],
            rrf_k,
        );
        let z = result("Z", 3.0, RetrievalSource::Bm25);
        let single = rrf_fusion(&[(std::slice::from_ref(&z), bm25_w)], rrf_k);

        assert!(
            both[0].score > single[0].score,
            "presence in both lists must dominate (weights {bm25_w}/{vector_w}, k {rrf_k})"
        );
    }
}

#[test]
fn fusion_sums_weighted_rank_contributions() {
    let list_a = vec![result("X", 2.0, RetrievalSource::Bm25), result("Y", 1.0, RetrievalSource::Bm25)];
    let list_b = vec![result("Y", 0.9, RetrievalSource::Vector), result("X", 0.8, RetrievalSource::Vector)];

    let fused = rrf_fusion(&[(list_a.as_slice(), 0.3), (list_b.as_slice(), 0.7)], 60);
    assert_eq!(fused.len(), 2);
    assert!(fused.iter().all(|r| r.source == RetrievalSource::Hybrid));

    // Y: 0.3/62 + 0.7/61 outranks X: 0.3/61 + 0.7/62.
    assert_eq!(fused[0].chunk_id, "Y");
    let expected_y = 0.3 / 62.0 + 0.7 / 61.0;
    assert!((fused[0].score - expected_y).abs() < 1e-12);
}

#[test]
fn ids_absent_from_a_list_get_no_contribution_from_it() {
    let list_a = vec![result("X", 2.0, RetrievalSource::Bm25)];
    let fused = rrf_fusion(&[(list_a.as_slice(), 0.3), (&[], 0.7)], 60);
    assert_eq!(fused.len(), 1);
    assert!((fused[0].score - 0.3 / 61.0).abs() < 1e-12);
}

#[test]
fn retrieve_ranks_the_queried_topic_first() {
    let mut r = retriever(HybridConfig::default());
    r.index(&[
        chunk("A", "The cat sat on the mat", 0),
        chunk("B", "Dogs bark at night", 1),
        chunk("C", "Compilers translate source code", 2),
    ])
    .expect("index");

    let results = r.retrieve("cat", None);
    assert!(!results.is_empty());
    assert_eq!(results[0].chunk_id, "A");
    assert!(results.iter().all(|h| h.source == RetrievalSource::Hybrid));
    assert!(results.len() <= HybridConfig::default().final_top_k);
}

#[test]
fn retrieve_is_idempotent_for_an_unchanged_index() {
    let mut r = retriever(HybridConfig::default());
    r.index(&[
        chunk("A", "hybrid retrieval fuses rankings", 0),
        chunk("B", "semantic chunking splits documents", 1),
        chunk("C", "rankings and chunking both matter", 2),
    ])
    .expect("index");

    let first = r.retrieve("chunking rankings", None);
    let second = r.retrieve("chunking rankings", None);

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.chunk_id, b.chunk_id);
        assert!((a.score - b.score).abs() < 1e-15);
    }
}

#[test]
fn top_k_override_truncates() {
    let mut r = retriever(HybridConfig::default());
    r.index(&[
        chunk("A", "retrieval retrieval retrieval", 0),
        chunk("B", "retrieval of documents", 1),
        chunk("C", "document retrieval engine", 2),
    ])
    .expect("index");

    assert_eq!(r.retrieve("retrieval", Some(1)).len(), 1);
}

struct FailingStore;

impl VectorSearch for FailingStore {
    fn rebuild(&self, _entries: Vec<VectorEntry>) -> anyhow::Result<()> {
        Ok(())
    }
    fn query(&self, _vector: &[f32], _top_k: usize) -> anyhow::Result<Vec<VectorHit>> {
        Err(anyhow::anyhow!("similarity backend unavailable"))
    }
}

#[test]
fn vector_failure_degrades_to_lexical_results() {
    let bm25 = Bm25Index::new(Bm25Config::default()).expect("bm25 config");
    let vector = VectorStoreAdapter::new(Box::new(FailingStore), Box::new(HashEmbedder::new(64)));
    let mut r = HybridRetriever::new(bm25, vector, HybridConfig::default()).expect("config");

    r.index(&[chunk("A", "the cat sat on the mat", 0)]).expect("index");
    let results = r.retrieve("cat", None);

    assert_eq!(results.len(), 1, "lexical hits still come through");
    assert_eq!(results[0].chunk_id, "A");
    assert_eq!(results[0].source, RetrievalSource::Hybrid);
}

#[test]
fn out_of_range_configs_are_rejected() {
    let bad = [
        HybridConfig { bm25_weight: 0.0, ..Default::default() },
        HybridConfig { vector_weight: -0.5, ..Default::default() },
        HybridConfig { bm25_weight: f64::NAN, ..Default::default() },
        HybridConfig { final_top_k: 0, ..Default::default() },
        HybridConfig { rrf_k: 0, ..Default::default() },
    ];
    for config in bad {
        assert!(config.validate().is_err());
    }
}
