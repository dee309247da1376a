use scholardb_core::types::{CancelToken, Chunk, ChunkMetadata, Section};

#[test]
fn chunk_updates_are_copy_on_write() {
    let meta = ChunkMetadata::new("paper.pdf", Section::Body, 0);
    let chunk = Chunk::new("c0", "some text", meta);

    let mut corrected_meta = chunk.metadata.clone();
    corrected_meta.section = Section::Introduction;
    let corrected = chunk.with_metadata(corrected_meta);

    assert_eq!(chunk.metadata.section, Section::Body, "original untouched");
    assert_eq!(corrected.metadata.section, Section::Introduction);
    assert_eq!(corrected.id, chunk.id);
    assert_eq!(corrected.text, chunk.text);

    let renamed = chunk.with_id("c0_new");
    assert_eq!(chunk.id, "c0");
    assert_eq!(renamed.id, "c0_new");
}

#[test]
fn section_labels_and_placeholders() {
    assert_eq!(Section::Preamble.label(), "preamble");
    assert_eq!(Section::Methods.label(), "methods");
    assert!(Section::Body.is_placeholder());
    assert!(Section::Unknown.is_placeholder());
    assert!(!Section::Abstract.is_placeholder());
}

#[test]
fn chunks_round_trip_through_json() {
    let mut meta = ChunkMetadata::new("paper.pdf", Section::Methods, 3);
    meta.page = 4;
    meta.parent_chunk_id = Some("parent".to_string());
    meta.semantic_tags = vec!["retrieval".to_string()];
    let chunk = Chunk::new("c3", "methods text", meta);

    let json = serde_json::to_string(&chunk).expect("serialize");
    assert!(json.contains("\"section\":\"methods\""), "sections serialize as snake_case labels");
    let back: Chunk = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, chunk);
}

#[test]
fn cancel_token_is_shared_across_clones() {
    let token = CancelToken::new();
    let clone = token.clone();
    assert!(!clone.is_cancelled());
    token.cancel();
    assert!(clone.is_cancelled());
}
