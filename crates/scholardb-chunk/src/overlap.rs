//! Overlap calculation and re-stitching between consecutive chunks.
//!
//! The chunker stitches overlap as part of its pipeline; this module is
//! the standalone surface for recomputing overlap on an existing chunk
//! list (e.g. after a metadata correction pass rebuilt the chunks).

use scholardb_core::error::{Error, Result};
use scholardb_core::types::Chunk;
use serde::Deserialize;

/// Configuration for overlap management.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OverlapConfig {
    /// Overlap as a percentage of the average adjoining chunk size.
    pub overlap_percent: usize,
    pub min_overlap_chars: usize,
    pub max_overlap_chars: usize,
}

impl Default for OverlapConfig {
    fn default() -> Self {
        Self { overlap_percent: 20, min_overlap_chars: 50, max_overlap_chars: 500 }
    }
}

impl OverlapConfig {
    pub fn validate(&self) -> Result<()> {
        if self.overlap_percent > 100 {
            return Err(Error::InvalidConfig(format!(
                "overlap_percent must be <= 100, got {}",
                self.overlap_percent
            )));
        }
        if self.min_overlap_chars > self.max_overlap_chars {
            return Err(Error::InvalidConfig(format!(
                "min_overlap_chars ({}) exceeds max_overlap_chars ({})",
                self.min_overlap_chars, self.max_overlap_chars
            )));
        }
        Ok(())
    }
}

/// Aggregate overlap numbers for a chunk list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlapStats {
    pub total_chunks: usize,
    pub avg_overlap_prev: f64,
    pub avg_overlap_next: f64,
    pub total_overlap_chars: usize,
}

/// Extract a tail slice of roughly `size` bytes, preferring to start at a
/// word boundary. Always a suffix of `text`.
pub fn tail_on_word_boundary(text: &str, size: usize) -> &str {
    if size == 0 || text.is_empty() {
        return "";
    }
    if size >= text.len() {
        return text;
    }
    let mut start = text.len() - size;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    let raw = &text[start..];
    match raw.find(' ') {
        Some(idx) if idx > 0 && idx < raw.len() / 2 => &raw[idx + 1..],
        _ => raw,
    }
}

/// Recomputes and re-applies overlap between consecutive chunks.
pub struct OverlapManager {
    config: OverlapConfig,
}

impl OverlapManager {
    pub fn new(config: OverlapConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Overlap size between two consecutive chunks: a percentage of their
    /// average length, bounded by the configured min/max and by half of
    /// the smaller chunk.
    pub fn calculate_overlap(&self, a: &Chunk, b: &Chunk) -> usize {
        self.overlap_size(&a.text, &b.text, self.config.overlap_percent)
    }

    /// Re-stitch overlap across `chunks`, returning new chunk values with
    /// updated text and overlap metadata. Prepending is skipped when the
    /// chunk already starts with the overlay (idempotence guard).
    pub fn apply_overlap(&self, chunks: &[Chunk], overlap_percent: Option<usize>) -> Vec<Chunk> {
        if chunks.is_empty() {
            return Vec::new();
        }
        if chunks.len() == 1 {
            return vec![self.copy_with_overlap(&chunks[0], 0, 0, None)];
        }

        let percent = overlap_percent.unwrap_or(self.config.overlap_percent);
        let mut result = Vec::with_capacity(chunks.len());

        for (i, chunk) in chunks.iter().enumerate() {
            let mut overlap_prev = 0;
            let mut overlap_next = 0;
            let mut new_text = None;

            if i > 0 {
                let prev = &chunks[i - 1];
                let size = self.overlap_size(&prev.text, &chunk.text, percent);
                let content = tail_on_word_boundary(&prev.text, size);
                let trimmed = content.trim_end();
                if !trimmed.is_empty() && !chunk.text.starts_with(trimmed) {
                    new_text = Some(format!("{trimmed} {}", chunk.text));
                    overlap_prev = trimmed.len();
                }
            }

            if i + 1 < chunks.len() {
                let next = &chunks[i + 1];
                overlap_next = self.overlap_size(&chunk.text, &next.text, percent);
            }

            result.push(self.copy_with_overlap(chunk, overlap_prev, overlap_next, new_text));
        }

        result
    }

    pub fn overlap_stats(&self, chunks: &[Chunk]) -> OverlapStats {
        if chunks.is_empty() {
            return OverlapStats::default();
        }
        let total_prev: usize = chunks.iter().map(|c| c.metadata.overlap_with_prev).sum();
        let total_next: usize = chunks.iter().map(|c| c.metadata.overlap_with_next).sum();
        let n = chunks.len();
        OverlapStats {
            total_chunks: n,
            avg_overlap_prev: total_prev as f64 / n as f64,
            avg_overlap_next: total_next as f64 / n as f64,
            total_overlap_chars: total_prev + total_next,
        }
    }

    fn overlap_size(&self, a: &str, b: &str, percent: usize) -> usize {
        let avg = (a.len() + b.len()) / 2;
        let overlap = avg * percent / 100;
        let overlap = overlap.max(self.config.min_overlap_chars);
        let overlap = overlap.min(self.config.max_overlap_chars);
        overlap.min(a.len().min(b.len()) / 2)
    }

    fn copy_with_overlap(
        &self,
        chunk: &Chunk,
        overlap_prev: usize,
        overlap_next: usize,
        new_text: Option<String>,
    ) -> Chunk {
        let mut metadata = chunk.metadata.clone();
        metadata.overlap_with_prev = overlap_prev;
        metadata.overlap_with_next = overlap_next;
        let updated = chunk.with_metadata(metadata);
        match new_text {
            Some(text) => updated.with_text(text),
            None => updated,
        }
    }
}
