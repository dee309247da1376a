//! Relevance reranking and diversity filtering of retrieved results.

use anyhow::anyhow;
use scholardb_core::error::{Error, Result};
use scholardb_core::traits::CompletionClient;
use scholardb_core::types::{CancelToken, RetrievalResult};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Relevance assigned when a scoring call or parse fails.
const FALLBACK_RELEVANCE: f64 = 0.5;
/// Rough token estimate: characters per token.
const CHARS_PER_TOKEN: usize = 4;
/// Excerpt length sent to the scoring prompt.
const EXCERPT_BYTES: usize = 500;

/// Configuration for reranking.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    pub enabled: bool,
    /// Results scoring below this are dropped.
    pub relevance_threshold: f64,
    /// Candidates whose word-set Jaccard similarity against any kept
    /// result exceeds this are dropped.
    pub diversity_threshold: f64,
    /// Token budget for the final context set.
    pub max_context_tokens: usize,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            relevance_threshold: 0.5,
            diversity_threshold: 0.7,
            max_context_tokens: 4000,
        }
    }
}

impl RerankConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("relevance_threshold", self.relevance_threshold),
            ("diversity_threshold", self.diversity_threshold),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidConfig(format!("{name} must be in [0, 1], got {value}")));
            }
        }
        if self.max_context_tokens == 0 {
            return Err(Error::InvalidConfig("max_context_tokens must be >= 1".into()));
        }
        Ok(())
    }
}

/// Reranks retrieved results by collaborator-scored relevance, then
/// filters for diversity and fits the survivors into a token budget.
///
/// Individual scoring failures fall back to 0.5 with `degraded` set, so
/// one bad call never poisons the batch. Disabled reranking is a
/// passthrough (subject to truncation).
pub struct Reranker {
    client: Arc<dyn CompletionClient>,
    config: RerankConfig,
}

impl Reranker {
    pub fn new(client: Arc<dyn CompletionClient>, config: RerankConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { client, config })
    }

    /// Rerank `results` against `query`. Cancellation aborts the scoring
    /// loop; candidates scored so far continue through the filters.
    pub async fn rerank(
        &self,
        results: Vec<RetrievalResult>,
        query: &str,
        top_k: Option<usize>,
        cancel: &CancelToken,
    ) -> Vec<RetrievalResult> {
        if !self.config.enabled || results.is_empty() {
            return truncate(results, top_k);
        }

        let scored = self.score_relevance(results, query, cancel).await;
        let filtered: Vec<RetrievalResult> = scored
            .into_iter()
            .filter(|r| r.score >= self.config.relevance_threshold)
            .collect();
        let diverse = self.filter_diversity(filtered);
        let limited = self.limit_context(diverse);
        truncate(limited, top_k)
    }

    /// Score each candidate 0..1 via the completion collaborator and
    /// re-sort descending (stable, so equal scores keep their order).
    async fn score_relevance(
        &self,
        results: Vec<RetrievalResult>,
        query: &str,
        cancel: &CancelToken,
    ) -> Vec<RetrievalResult> {
        let total = results.len();
        let mut scored = Vec::with_capacity(total);

        for mut result in results {
            if cancel.is_cancelled() {
                debug!(scored = scored.len(), total, "relevance scoring cancelled");
                break;
            }
            match self.relevance_score(&result.text, query).await {
                Ok(score) => {
                    result.score = score;
                    result.degraded = false;
                }
                Err(error) => {
                    warn!(%error, chunk = %result.chunk_id, "relevance scoring failed, using fallback");
                    result.score = FALLBACK_RELEVANCE;
                    result.degraded = true;
                }
            }
            scored.push(result);
        }

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored
    }

    async fn relevance_score(&self, text: &str, query: &str) -> anyhow::Result<f64> {
        let prompt = format!(
            "Rate the relevance of this text to the query on a scale of 0-10.\n\n\
             Query: {query}\n\n\
             Text: {}...\n\n\
             Respond with only a number between 0 and 10.",
            excerpt(text, EXCERPT_BYTES)
        );

        let response = self.client.generate(&prompt).await?;
        let rating: f64 = response
            .trim()
            .parse()
            .map_err(|_| anyhow!("non-numeric relevance response: {:?}", response.trim()))?;
        Ok((rating / 10.0).clamp(0.0, 1.0))
    }

    /// Greedy diversity pass: always keep the first result, then keep a
    /// candidate only if its word overlap with every kept result stays at
    /// or below the threshold. Order-dependent by construction, not a
    /// globally optimal subset.
    fn filter_diversity(&self, results: Vec<RetrievalResult>) -> Vec<RetrievalResult> {
        let mut kept: Vec<RetrievalResult> = Vec::new();
        let mut kept_words: Vec<HashSet<String>> = Vec::new();

        for result in results {
            let words = word_set(&result.text);
            let redundant = kept_words
                .iter()
                .any(|selected| jaccard(&words, selected) > self.config.diversity_threshold);
            if !redundant {
                kept.push(result);
                kept_words.push(words);
            }
        }

        kept
    }

    /// Keep results in order until the running token estimate would pass
    /// the budget; everything after the first overflow is discarded.
    fn limit_context(&self, results: Vec<RetrievalResult>) -> Vec<RetrievalResult> {
        let mut limited = Vec::with_capacity(results.len());
        let mut total_tokens = 0;

        for result in results {
            let tokens = result.text.len() / CHARS_PER_TOKEN;
            if total_tokens + tokens > self.config.max_context_tokens {
                break;
            }
            total_tokens += tokens;
            limited.push(result);
        }

        limited
    }
}

fn truncate(mut results: Vec<RetrievalResult>, top_k: Option<usize>) -> Vec<RetrievalResult> {
    if let Some(k) = top_k {
        results.truncate(k);
    }
    results
}

fn word_set(text: &str) -> HashSet<String> {
    text.to_lowercase().split_whitespace().map(str::to_string).collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
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
