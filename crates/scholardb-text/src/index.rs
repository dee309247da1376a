//! BM25 keyword index.
//!
//! Scoring follows the documented formula rather than any library's
//! internals: `idf(t) = ln(1 + (N - df + 0.5) / (df + 0.5))` and
//! `score(d) = Σ idf(t) · tf·(k1+1) / (tf + k1·(1 − b + b·|d|/avgdl))`.

use regex::Regex;
use scholardb_core::error::{Error, Result};
use scholardb_core::types::{Chunk, RetrievalResult, RetrievalSource};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;
use tracing::debug;

/// Common English stopwords dropped at tokenization time.
const STOPWORDS: [&str; 48] = [
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "as", "is", "was", "are", "were", "been", "be", "have", "has", "had", "do", "does",
    "did", "will", "would", "could", "should", "may", "might", "must", "this", "that", "these",
    "those", "it", "its", "we", "our", "they", "their", "which", "who", "whom",
];

fn stopwords() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOPWORDS.into_iter().collect())
}

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[\w-]+\b").expect("static token pattern"))
}

/// Lowercase, extract word-like tokens (alphanumerics plus internal
/// hyphens/underscores), drop single characters, pure numbers, and
/// stopwords.
fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    token_re()
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|t| t.chars().count() > 1)
        .filter(|t| !t.chars().all(char::is_numeric))
        .filter(|t| !stopwords().contains(t))
        .map(str::to_string)
        .collect()
}

/// Configuration for the BM25 index.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Bm25Config {
    /// Term-frequency saturation.
    pub k1: f64,
    /// Length normalization.
    pub b: f64,
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

impl Bm25Config {
    pub fn validate(&self) -> Result<()> {
        if !self.k1.is_finite() || self.k1 <= 0.0 {
            return Err(Error::InvalidConfig(format!("k1 must be > 0, got {}", self.k1)));
        }
        if !self.b.is_finite() || !(0.0..=1.0).contains(&self.b) {
            return Err(Error::InvalidConfig(format!("b must be in [0, 1], got {}", self.b)));
        }
        Ok(())
    }
}

/// Index statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bm25Stats {
    pub num_documents: usize,
    pub avg_doc_len: f64,
    pub total_tokens: usize,
}

/// In-memory BM25 keyword index over a chunk set.
///
/// `build` replaces all prior state; the index is read-only afterwards.
/// Process-lifetime only, nothing is persisted.
pub struct Bm25Index {
    config: Bm25Config,
    chunks: Vec<Chunk>,
    doc_lens: Vec<usize>,
    postings: HashMap<String, Vec<(usize, usize)>>,
    total_tokens: usize,
}

impl Bm25Index {
    pub fn new(config: Bm25Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            chunks: Vec::new(),
            doc_lens: Vec::new(),
            postings: HashMap::new(),
            total_tokens: 0,
        })
    }

    /// Build the index from `chunks`, replacing any prior contents.
    pub fn build(&mut self, chunks: &[Chunk]) {
        self.chunks = chunks.to_vec();
        self.doc_lens.clear();
        self.postings.clear();
        self.total_tokens = 0;

        for (doc, chunk) in chunks.iter().enumerate() {
            let tokens = tokenize(&chunk.text);
            self.doc_lens.push(tokens.len());
            self.total_tokens += tokens.len();

            let mut term_freq: HashMap<String, usize> = HashMap::new();
            for token in tokens {
                *term_freq.entry(token).or_default() += 1;
            }
            for (term, tf) in term_freq {
                self.postings.entry(term).or_default().push((doc, tf));
            }
        }

        debug!(documents = self.chunks.len(), terms = self.postings.len(), "built bm25 index");
    }

    /// Top-k keyword matches for `query`, strictly positive scores only,
    /// descending, ties in original chunk order. Empty if the index is
    /// unbuilt or the query has no indexable tokens.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<RetrievalResult> {
        if self.chunks.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let n = self.chunks.len() as f64;
        let avgdl = self.total_tokens as f64 / n;
        let mut scores = vec![0.0f64; self.chunks.len()];

        for term in tokenize(query) {
            let Some(postings) = self.postings.get(&term) else {
                continue;
            };
            let df = postings.len() as f64;
            let idf = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();

            for &(doc, tf) in postings {
                let tf = tf as f64;
                let norm = 1.0 - self.config.b + self.config.b * self.doc_lens[doc] as f64 / avgdl;
                scores[doc] += idf * tf * (self.config.k1 + 1.0) / (tf + self.config.k1 * norm);
            }
        }

        let mut ranked: Vec<(usize, f64)> = scores
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, score)| *score > 0.0)
            .collect();
        // Stable sort: equal scores keep original chunk order.
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(top_k);

        ranked
            .into_iter()
            .map(|(doc, score)| {
                RetrievalResult::from_chunk(&self.chunks[doc], score, RetrievalSource::Bm25)
            })
            .collect()
    }

    pub fn stats(&self) -> Bm25Stats {
        if self.chunks.is_empty() {
            return Bm25Stats::default();
        }
        Bm25Stats {
            num_documents: self.chunks.len(),
            avg_doc_len: self.total_tokens as f64 / self.chunks.len() as f64,
            total_tokens: self.total_tokens,
        }
    }
}
