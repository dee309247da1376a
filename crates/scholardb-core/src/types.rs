//! Domain types shared by the chunking and retrieval engines.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub type ChunkId = String;

/// Logical section of a source document.
///
/// Detected from heading lines at chunking time; `Preamble` covers text
/// before the first heading, `Body` is the placeholder when no headings
/// were found, `Unknown` when a correction pass could not decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Preamble,
    Abstract,
    Introduction,
    Methods,
    Results,
    Discussion,
    Conclusion,
    References,
    Body,
    Unknown,
}

impl Section {
    pub fn label(self) -> &'static str {
        match self {
            Section::Preamble => "preamble",
            Section::Abstract => "abstract",
            Section::Introduction => "introduction",
            Section::Methods => "methods",
            Section::Results => "results",
            Section::Discussion => "discussion",
            Section::Conclusion => "conclusion",
            Section::References => "references",
            Section::Body => "body",
            Section::Unknown => "unknown",
        }
    }

    /// True for the placeholder labels a correction pass may overwrite.
    pub fn is_placeholder(self) -> bool {
        matches!(self, Section::Body | Section::Unknown)
    }
}

/// Metadata carried by every chunk.
///
/// - `source`: document identifier (filename, URL, external id)
/// - `page`: 1-based page number, 0 when unknown
/// - `section`: the section this chunk belongs to
/// - `chunk_index`: 0-based position within the document, gapless
/// - `parent_chunk_id`: id of the first chunk of the same section; `None`
///   on the section parent itself. A weak back-reference, not ownership.
/// - `overlap_with_prev`/`overlap_with_next`: characters shared with the
///   adjoining chunks, never more than half of either chunk's length
/// - `semantic_tags`: optional topic tags, empty until enrichment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub page: u32,
    pub section: Section,
    pub chunk_index: usize,
    pub parent_chunk_id: Option<ChunkId>,
    pub overlap_with_prev: usize,
    pub overlap_with_next: usize,
    pub semantic_tags: Vec<String>,
}

impl ChunkMetadata {
    pub fn new(source: impl Into<String>, section: Section, chunk_index: usize) -> Self {
        Self {
            source: source.into(),
            page: 0,
            section,
            chunk_index,
            parent_chunk_id: None,
            overlap_with_prev: 0,
            overlap_with_next: 0,
            semantic_tags: Vec::new(),
        }
    }
}

/// A bounded span of document text plus its metadata.
///
/// Chunks are value types: once indexed they are never edited in place.
/// Corrections go through the `with_*` helpers, which return new values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn new(id: impl Into<ChunkId>, text: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self { id: id.into(), text: text.into(), metadata }
    }

    pub fn with_id(&self, id: impl Into<ChunkId>) -> Self {
        Self { id: id.into(), text: self.text.clone(), metadata: self.metadata.clone() }
    }

    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self { id: self.id.clone(), text: text.into(), metadata: self.metadata.clone() }
    }

    pub fn with_metadata(&self, metadata: ChunkMetadata) -> Self {
        Self { id: self.id.clone(), text: self.text.clone(), metadata }
    }
}

/// Which engine produced a retrieval result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalSource {
    Bm25,
    Vector,
    Hybrid,
}

/// One ranked hit, produced per query and discarded after use.
///
/// `score` semantics depend on `source`: raw BM25 mass, `1/(1+distance)`
/// similarity, fused RRF mass, or a 0..1 relevance after reranking.
/// `degraded` marks scores substituted by a fallback path (collaborator
/// failure), so a default 0.5 can be told apart from a genuine 0.5.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub chunk_id: ChunkId,
    pub text: String,
    pub score: f64,
    pub source: RetrievalSource,
    pub metadata: ChunkMetadata,
    pub degraded: bool,
}

impl RetrievalResult {
    pub fn from_chunk(chunk: &Chunk, score: f64, source: RetrievalSource) -> Self {
        Self {
            chunk_id: chunk.id.clone(),
            text: chunk.text.clone(),
            score,
            source,
            metadata: chunk.metadata.clone(),
            degraded: false,
        }
    }
}

/// Sidecar metadata supplied by the document loader.
///
/// `page_map` maps character offsets to the page starting there;
/// `chunk_offsets` records each chunk's start offset in the source text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub page_map: BTreeMap<usize, u32>,
    pub chunk_offsets: HashMap<ChunkId, usize>,
}

/// Cooperative cancellation flag for long collaborator loops.
///
/// Cloning shares the flag. Checked between per-item collaborator calls;
/// work finished before cancellation is kept.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
