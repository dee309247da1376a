//! Section-aware chunker with recursive splitting and configurable overlap.

use regex::Regex;
use scholardb_core::error::{Error, Result};
use scholardb_core::types::{Chunk, ChunkMetadata, Section};
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::debug;

use crate::overlap::tail_on_word_boundary;

/// Separator hierarchy tried in priority order during recursive splitting.
const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", ", ", " "];

/// Configuration for semantic chunking.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks, as a percentage of `chunk_size`.
    pub overlap_percent: usize,
    /// Chunks below this size are folded into their predecessor.
    pub min_chunk_size: usize,
    /// Detect document sections from heading lines.
    pub section_detection: bool,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self { chunk_size: 1000, overlap_percent: 20, min_chunk_size: 100, section_detection: true }
    }
}

impl ChunkerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be >= 1".into()));
        }
        if self.min_chunk_size == 0 || self.min_chunk_size > self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "min_chunk_size must be in 1..={}, got {}",
                self.chunk_size, self.min_chunk_size
            )));
        }
        if self.overlap_percent > 50 {
            return Err(Error::InvalidConfig(format!(
                "overlap_percent must be <= 50, got {}",
                self.overlap_percent
            )));
        }
        Ok(())
    }
}

/// Compiled-once heading matchers, anchored at the start of a trimmed line.
pub(crate) fn section_patterns() -> &'static [(Section, Regex)] {
    static PATTERNS: OnceLock<Vec<(Section, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (Section::Abstract, r"^abstract\s*$|^summary\s*$"),
            (Section::Introduction, r"^1\.?\s*introduction|^introduction\s*$"),
            (Section::Methods, r"^2\.?\s*method|^materials?\s+and\s+methods?|^methodology"),
            (Section::Results, r"^3\.?\s*results?|^findings"),
            (Section::Discussion, r"^4\.?\s*discussion|^analysis"),
            (Section::Conclusion, r"^5\.?\s*conclusion|^concluding"),
            (Section::References, r"^references?\s*$|^bibliography"),
        ]
        .into_iter()
        .map(|(section, pattern)| {
            let re = Regex::new(&format!("(?i){pattern}")).expect("static section pattern");
            (section, re)
        })
        .collect()
    })
}

/// Section-aware chunker for long documents.
///
/// Detects document structure (abstract, methods, results, ...) and
/// splits recursively within each section, stitching a configurable
/// overlap between consecutive chunks.
pub struct SemanticChunker {
    config: ChunkerConfig,
}

impl SemanticChunker {
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Split `text` into ordered, overlap-stitched, section-tagged chunks.
    ///
    /// Deterministic for identical input and configuration, except for the
    /// random fragment in each chunk id (replaced by the enricher when
    /// hierarchical ids are enabled). Empty or whitespace-only input
    /// yields an empty vec.
    pub fn chunk(&self, text: &str, source: &str) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let sections = if self.config.section_detection {
            self.detect_sections(text)
        } else {
            Vec::new()
        };

        let raw = if sections.is_empty() {
            self.recursive_split(text.trim(), Section::Body, 0)
        } else {
            self.split_with_sections(text, &sections)
        };

        let stitched = self.apply_overlap(raw);
        let chunks = self.materialize(stitched, source);
        debug!(source, sections = sections.len(), chunks = chunks.len(), "chunked document");
        chunks
    }

    /// Detect section boundaries as `(section, start, end)` byte ranges.
    ///
    /// A heading line opens a section running until the next heading or
    /// end of text. Returns an empty vec when no headings are found.
    pub fn detect_sections(&self, text: &str) -> Vec<(Section, usize, usize)> {
        let lines: Vec<&str> = text.split('\n').collect();

        let mut line_starts = Vec::with_capacity(lines.len());
        let mut pos = 0;
        for line in &lines {
            line_starts.push(pos);
            pos += line.len() + 1;
        }

        let mut headings: Vec<(Section, usize)> = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            let trimmed = line.trim();
            for (section, pattern) in section_patterns() {
                if pattern.is_match(trimmed) {
                    headings.push((*section, i));
                    break;
                }
            }
        }

        let mut result = Vec::with_capacity(headings.len());
        for (i, (section, line_idx)) in headings.iter().enumerate() {
            let start = line_starts[*line_idx];
            let end = match headings.get(i + 1) {
                Some((_, next_idx)) => line_starts[*next_idx],
                None => text.len(),
            };
            result.push((*section, start, end));
        }
        result
    }

    fn split_with_sections(
        &self,
        text: &str,
        sections: &[(Section, usize, usize)],
    ) -> Vec<(String, Section)> {
        let mut chunks = Vec::new();

        // Text before the first heading is the preamble.
        if let Some((_, first_start, _)) = sections.first() {
            let preamble = text[..*first_start].trim();
            if !preamble.is_empty() {
                chunks.extend(self.recursive_split(preamble, Section::Preamble, 0));
            }
        }

        for (section, start, end) in sections {
            let section_text = text[*start..*end].trim();
            if !section_text.is_empty() {
                chunks.extend(self.recursive_split(section_text, *section, 0));
            }
        }

        chunks
    }

    /// Split `text` into chunks of at most `chunk_size`, starting at
    /// separator `sep_idx` in the hierarchy. An oversized single part
    /// recurses with the next separator; a text no separator can split
    /// falls back to a hard cut.
    fn recursive_split(&self, text: &str, section: Section, sep_idx: usize) -> Vec<(String, Section)> {
        if text.len() <= self.config.chunk_size {
            return if text.trim().is_empty() {
                Vec::new()
            } else {
                vec![(text.to_string(), section)]
            };
        }

        for (i, separator) in SEPARATORS.iter().enumerate().skip(sep_idx) {
            let parts: Vec<&str> = text.split(separator).collect();
            if parts.len() > 1 {
                let chunks = self.merge_splits(&parts, separator, section, i);
                if !chunks.is_empty() {
                    return chunks;
                }
            }
        }

        self.hard_split(text, section)
    }

    /// Greedily merge split parts back up to the target chunk size.
    fn merge_splits(
        &self,
        parts: &[&str],
        separator: &str,
        section: Section,
        sep_idx: usize,
    ) -> Vec<(String, Section)> {
        let mut chunks: Vec<(String, Section)> = Vec::new();
        let mut current = String::new();

        for part in parts {
            let candidate_len = if current.is_empty() {
                part.len()
            } else {
                current.len() + separator.len() + part.len()
            };

            if candidate_len <= self.config.chunk_size {
                if !current.is_empty() {
                    current.push_str(separator);
                }
                current.push_str(part);
            } else {
                if !current.trim().is_empty() {
                    self.flush(&mut chunks, current.trim(), separator, section);
                }
                current.clear();

                if part.len() > self.config.chunk_size {
                    chunks.extend(self.recursive_split(part, section, sep_idx + 1));
                } else {
                    current.push_str(part);
                }
            }
        }

        if !current.trim().is_empty() {
            self.flush(&mut chunks, current.trim(), separator, section);
        }

        chunks
    }

    /// Emit a merged chunk, folding an undersized one into its predecessor
    /// unless it would be the only chunk.
    fn flush(&self, chunks: &mut Vec<(String, Section)>, text: &str, separator: &str, section: Section) {
        if text.len() < self.config.min_chunk_size {
            if let Some((prev, _)) = chunks.last_mut() {
                prev.push_str(separator);
                prev.push_str(text);
                return;
            }
        }
        chunks.push((text.to_string(), section));
    }

    /// Last resort: fixed-width cuts at `chunk_size`, snapped to char
    /// boundaries.
    fn hard_split(&self, text: &str, section: Section) -> Vec<(String, Section)> {
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < text.len() {
            let mut end = (start + self.config.chunk_size).min(text.len());
            while end > start && !text.is_char_boundary(end) {
                end -= 1;
            }
            if end == start {
                end = start + 1;
                while end < text.len() && !text.is_char_boundary(end) {
                    end += 1;
                }
            }
            let piece = text[start..end].trim();
            if !piece.is_empty() {
                chunks.push((piece.to_string(), section));
            }
            start = end;
        }
        chunks
    }

    /// Prepend to each chunk (except the first) the word-trimmed tail of
    /// its predecessor's original text. Returns
    /// `(text, section, overlap_prev, overlap_next)`.
    fn apply_overlap(&self, raw: Vec<(String, Section)>) -> Vec<(String, Section, usize, usize)> {
        if raw.is_empty() {
            return Vec::new();
        }

        let overlap_chars = self.config.chunk_size * self.config.overlap_percent / 100;
        let mut result = Vec::with_capacity(raw.len());

        for i in 0..raw.len() {
            let (text, section) = &raw[i];
            let mut overlap_prev = 0;
            let mut overlap_next = 0;
            let mut new_text = text.clone();

            if i > 0 {
                let prev = &raw[i - 1].0;
                let content = tail_on_word_boundary(prev, self.overlap_budget(overlap_chars, prev, text));
                // Guard against stacking the overlay on repeated passes.
                if !content.is_empty() && !new_text.starts_with(content) {
                    new_text = format!("{content} {text}");
                    overlap_prev = content.len();
                }
            }

            if i + 1 < raw.len() {
                let next = &raw[i + 1].0;
                let content = tail_on_word_boundary(text, self.overlap_budget(overlap_chars, text, next));
                overlap_next = content.len();
            }

            result.push((new_text, *section, overlap_prev, overlap_next));
        }

        result
    }

    /// Overlap never exceeds half of either adjoining chunk's length.
    fn overlap_budget(&self, overlap_chars: usize, a: &str, b: &str) -> usize {
        overlap_chars.min(a.len().min(b.len()) / 2)
    }

    fn materialize(
        &self,
        stitched: Vec<(String, Section, usize, usize)>,
        source: &str,
    ) -> Vec<Chunk> {
        stitched
            .into_iter()
            .enumerate()
            .map(|(i, (text, section, overlap_prev, overlap_next))| {
                let token = uuid::Uuid::new_v4().simple().to_string();
                let id = format!("{}_{}_{}_{}", source, section.label(), i, &token[..8]);
                let mut metadata = ChunkMetadata::new(source, section, i);
                metadata.overlap_with_prev = overlap_prev;
                metadata.overlap_with_next = overlap_next;
                Chunk::new(id, text, metadata)
            })
            .collect()
    }
}
