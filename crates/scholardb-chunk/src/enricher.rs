//! Chunk metadata enrichment: page numbers, section correction,
//! hierarchical ids, parent linkage, and optional semantic tagging.

use regex::Regex;
use scholardb_core::error::{Error, Result};
use scholardb_core::traits::CompletionClient;
use scholardb_core::types::{CancelToken, Chunk, ChunkId, DocumentMetadata, Section};
use serde::Deserialize;
use std::collections::HashMap;
use std::hash::Hasher;
use std::sync::OnceLock;
use tracing::{debug, warn};
use twox_hash::XxHash64;

use crate::chunker::section_patterns;

/// Configuration for metadata enrichment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnricherConfig {
    /// Collaborator-based topic tagging (expensive, off by default).
    pub semantic_tagging: bool,
    /// Replace random chunk ids with stable hierarchical ids.
    pub hierarchical_ids: bool,
    /// Resolve page numbers from document metadata or in-text markers.
    pub extract_page_numbers: bool,
    /// Chunks per tagging prompt.
    pub tag_batch_size: usize,
}

impl Default for EnricherConfig {
    fn default() -> Self {
        Self {
            semantic_tagging: false,
            hierarchical_ids: true,
            extract_page_numbers: true,
            tag_batch_size: 5,
        }
    }
}

impl EnricherConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tag_batch_size == 0 {
            return Err(Error::InvalidConfig("tag_batch_size must be >= 1".into()));
        }
        Ok(())
    }
}

fn page_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bpage\s*(\d+)\b").expect("static page pattern"))
}

fn tag_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^chunk\s*(\d+):\s*(.+)$").expect("static tag pattern"))
}

/// Enriches chunk metadata after chunking.
///
/// All corrections are copy-on-write: the input chunks are never edited
/// in place, and the tagging step degrades to empty tag lists instead of
/// failing the batch.
pub struct MetadataEnricher {
    config: EnricherConfig,
}

impl MetadataEnricher {
    pub fn new(config: EnricherConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Enrich `chunks` with pages, corrected sections, hierarchical ids,
    /// and parent linkage. Pure over its inputs.
    pub fn enrich(&self, chunks: &[Chunk], doc_meta: Option<&DocumentMetadata>) -> Vec<Chunk> {
        if chunks.is_empty() {
            return Vec::new();
        }

        let mut enriched: Vec<Chunk> = chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| self.enrich_chunk(chunk, i, doc_meta))
            .collect();

        if self.config.hierarchical_ids {
            enriched = assign_parent_links(enriched);
        }

        enriched
    }

    fn enrich_chunk(&self, chunk: &Chunk, index: usize, doc_meta: Option<&DocumentMetadata>) -> Chunk {
        let mut metadata = chunk.metadata.clone();

        if self.config.extract_page_numbers {
            metadata.page = self.resolve_page(chunk, doc_meta).unwrap_or(metadata.page);
        }

        if metadata.section.is_placeholder() {
            if let Some(section) = detect_section(&chunk.text) {
                metadata.section = section;
            }
        }

        let id = if self.config.hierarchical_ids {
            hierarchical_id(&metadata.source, metadata.section, index, &chunk.text)
        } else {
            chunk.id.clone()
        };

        chunk.with_metadata(metadata).with_id(id)
    }

    /// Page for a chunk: the highest page boundary not past the chunk's
    /// recorded start offset, falling back to an in-text "page N" marker.
    fn resolve_page(&self, chunk: &Chunk, doc_meta: Option<&DocumentMetadata>) -> Option<u32> {
        if let Some(meta) = doc_meta {
            if !meta.page_map.is_empty() {
                let offset = meta.chunk_offsets.get(&chunk.id).copied().unwrap_or(0);
                return meta
                    .page_map
                    .range(..=offset)
                    .next_back()
                    .map(|(_, page)| *page)
                    .or(Some(0));
            }
        }

        page_marker_re()
            .captures(&chunk.text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    /// Tag chunks with collaborator-generated topic labels, one prompt per
    /// batch. Call or parse failures leave the affected chunks with empty
    /// tag lists; a cancel signal stops remaining batches. Never errors.
    pub async fn apply_semantic_tags(
        &self,
        chunks: &[Chunk],
        client: &dyn CompletionClient,
        cancel: &CancelToken,
    ) -> Vec<Chunk> {
        if !self.config.semantic_tagging || chunks.is_empty() {
            return chunks.to_vec();
        }

        let mut result = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(self.config.tag_batch_size) {
            if cancel.is_cancelled() {
                debug!(remaining = chunks.len() - result.len(), "semantic tagging cancelled");
                result.extend(batch.iter().cloned());
                continue;
            }

            let prompt = build_tagging_prompt(batch);
            let tags = match client.generate(&prompt).await {
                Ok(response) => parse_tags_response(&response, batch.len()),
                Err(error) => {
                    warn!(%error, batch = batch.len(), "semantic tagging call failed, leaving batch untagged");
                    vec![Vec::new(); batch.len()]
                }
            };

            for (chunk, chunk_tags) in batch.iter().zip(tags) {
                let mut metadata = chunk.metadata.clone();
                metadata.semantic_tags = chunk_tags;
                result.push(chunk.with_metadata(metadata));
            }
        }

        result
    }
}

/// Stable id: source hash, section label, zero-padded index, content hash.
/// Identical input and configuration always produce identical ids.
fn hierarchical_id(source: &str, section: Section, index: usize, text: &str) -> ChunkId {
    let source_hash = xxhash(source.as_bytes()) & 0xffff_ffff;
    let content_hash = xxhash(text.as_bytes()) & 0x00ff_ffff;
    format!("{source_hash:08x}_{}_{index:04}_{content_hash:06x}", section.label())
}

fn xxhash(bytes: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(bytes);
    hasher.finish()
}

/// The first chunk seen for a section is its parent; later chunks in the
/// same section point back at it. The parent itself carries `None`.
fn assign_parent_links(chunks: Vec<Chunk>) -> Vec<Chunk> {
    let mut section_parent: HashMap<Section, ChunkId> = HashMap::new();

    chunks
        .into_iter()
        .map(|chunk| {
            let parent = match section_parent.get(&chunk.metadata.section) {
                Some(parent_id) => Some(parent_id.clone()),
                None => {
                    section_parent.insert(chunk.metadata.section, chunk.id.clone());
                    None
                }
            };
            let mut metadata = chunk.metadata.clone();
            metadata.parent_chunk_id = parent;
            chunk.with_metadata(metadata)
        })
        .collect()
}

/// Guess a section from chunk text: heading lines first, then content
/// keywords.
fn detect_section(text: &str) -> Option<Section> {
    for line in text.split('\n').take(5) {
        let trimmed = line.trim();
        for (section, pattern) in section_patterns() {
            if pattern.is_match(trimmed) {
                return Some(*section);
            }
        }
    }

    let lower = text.to_lowercase();
    let any = |keywords: &[&str]| keywords.iter().any(|kw| lower.contains(kw));

    if any(&["we propose", "this paper", "we present", "in this work"]) {
        return Some(Section::Introduction);
    }
    if any(&["experiment", "dataset", "training", "evaluation"]) {
        return Some(Section::Methods);
    }
    if any(&["accuracy", "performance", "table", "figure", "results show"]) {
        return Some(Section::Results);
    }
    if any(&["limitation", "future work", "in conclusion", "we have shown"]) {
        return Some(Section::Conclusion);
    }
    None
}

fn build_tagging_prompt(batch: &[Chunk]) -> String {
    let listing = batch
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("[Chunk {i}]\n{}...", excerpt(&chunk.text, 500)))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Analyze the following text chunks from an academic paper and generate 2-4 semantic tags for each chunk.\n\
         Tags should capture the main topics, concepts, or themes discussed.\n\n\
         {listing}\n\n\
         Respond in this exact format for each chunk:\n\
         Chunk 0: tag1, tag2, tag3\n\
         Chunk 1: tag1, tag2\n"
    )
}

/// Parse a line-oriented `Chunk <i>: tag1, tag2` response. Missing or
/// malformed lines yield empty tag lists for their chunks.
fn parse_tags_response(response: &str, batch_len: usize) -> Vec<Vec<String>> {
    let mut tags = vec![Vec::new(); batch_len];

    for line in response.lines() {
        if let Some(caps) = tag_line_re().captures(line.trim()) {
            let idx: usize = match caps[1].parse() {
                Ok(idx) => idx,
                Err(_) => continue,
            };
            if idx < batch_len {
                tags[idx] = caps[2]
                    .split(',')
                    .map(|tag| tag.trim().to_string())
                    .filter(|tag| !tag.is_empty())
                    .collect();
            }
        }
    }

    tags
}

/// Char-boundary-safe prefix of at most `max_bytes`.
fn excerpt(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
