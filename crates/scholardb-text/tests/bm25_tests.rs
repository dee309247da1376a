use scholardb_core::types::{Chunk, ChunkMetadata, Section};
use scholardb_text::{Bm25Config, Bm25Index};

fn chunk(id: &str, text: &str, index: usize) -> Chunk {
    Chunk::new(id, text, ChunkMetadata::new("doc", Section::Body, index))
}

fn build(chunks: &[Chunk]) -> Bm25Index {
    let mut index = Bm25Index::new(Bm25Config::default()).expect("config");
    index.build(chunks);
    index
}

#[test]
fn keyword_query_ranks_the_matching_chunk_first() {
    let index = build(&[
        chunk("A", "The cat sat on the mat", 0),
        chunk("B", "Dogs bark at night", 1),
    ]);

    let results = index.search("cat", 10);
    assert!(!results.is_empty());
    assert_eq!(results[0].chunk_id, "A");
    assert!(results[0].score > 0.0);
    assert!(
        results.iter().all(|r| r.chunk_id != "B"),
        "chunks without a positive score are not returned"
    );
}

#[test]
fn empty_index_returns_no_results() {
    let index = Bm25Index::new(Bm25Config::default()).expect("config");
    assert!(index.search("cat", 10).is_empty());

    let rebuilt = build(&[]);
    assert!(rebuilt.search("cat", 10).is_empty());
}

#[test]
fn stopwords_short_tokens_and_numbers_never_match() {
    let index = build(&[chunk("A", "the cat and 42 others", 0)]);
    assert!(index.search("the", 10).is_empty());
    assert!(index.search("a", 10).is_empty());
    assert!(index.search("42", 10).is_empty());
    assert!(!index.search("others", 10).is_empty());
}

#[test]
fn higher_term_frequency_scores_higher_at_equal_length() {
    let index = build(&[
        chunk("sparse", "cat dog bird fish worm", 0),
        chunk("dense", "cat cat cat sat mat", 1),
    ]);

    let results = index.search("cat", 10);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].chunk_id, "dense");
    assert!(results[0].score > results[1].score);
}

#[test]
fn equal_scores_preserve_original_chunk_order() {
    let index = build(&[
        chunk("first", "identical retrieval text", 0),
        chunk("second", "identical retrieval text", 1),
    ]);

    let results = index.search("retrieval", 10);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].chunk_id, "first");
    assert_eq!(results[1].chunk_id, "second");
    assert!((results[0].score - results[1].score).abs() < 1e-12);
}

#[test]
fn hyphenated_terms_are_single_tokens() {
    let index = build(&[chunk("A", "a state-of-the-art reranking model", 0)]);
    assert!(!index.search("state-of-the-art", 10).is_empty());
}

#[test]
fn rebuild_replaces_the_previous_corpus() {
    let mut index = Bm25Index::new(Bm25Config::default()).expect("config");
    index.build(&[chunk("A", "ferrets are mustelids", 0)]);
    assert!(!index.search("ferrets", 10).is_empty());

    index.build(&[chunk("B", "entirely different subject", 0)]);
    assert!(index.search("ferrets", 10).is_empty(), "old entries are gone after rebuild");
    assert!(!index.search("subject", 10).is_empty());
}

#[test]
fn top_k_truncates_the_ranking() {
    let chunks: Vec<Chunk> = (0..5)
        .map(|i| chunk(&format!("c{i}"), "shared keyword corpus", i))
        .collect();
    let index = build(&chunks);
    assert_eq!(index.search("keyword", 3).len(), 3);
}

#[test]
fn stats_reflect_the_indexed_corpus() {
    let index = build(&[
        chunk("A", "cat mat hat", 0),
        chunk("B", "dog fog log bog", 1),
    ]);
    let stats = index.stats();
    assert_eq!(stats.num_documents, 2);
    assert_eq!(stats.total_tokens, 7);
    assert!((stats.avg_doc_len - 3.5).abs() < 1e-12);
}

#[test]
fn out_of_range_parameters_are_rejected() {
    assert!(Bm25Index::new(Bm25Config { k1: 0.0, b: 0.75 }).is_err());
    assert!(Bm25Index::new(Bm25Config { k1: -1.0, b: 0.75 }).is_err());
    assert!(Bm25Index::new(Bm25Config { k1: 1.5, b: 1.5 }).is_err());
    assert!(Bm25Index::new(Bm25Config { k1: 1.5, b: -0.1 }).is_err());
}
