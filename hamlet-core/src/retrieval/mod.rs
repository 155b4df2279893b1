//! Memory retrieval: keyword + recency relevance, weighted by importance.
//!
//! Given a context string, the engine extracts up to `max_keywords`
//! keywords, scores every candidate memory (see [`scoring`]) and returns the
//! top `limit` by `relevance x importance`, descending. Equal ranks keep the
//! candidates' input order.

pub mod scoring;

use chrono::{DateTime, Utc};

use crate::config::MemoryConfig;
use crate::memory::StoredMemory;
use crate::types::RetrievalScore;

/// A ranked memory.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    /// The memory.
    pub memory: StoredMemory,
    /// `relevance x importance`.
    pub score: RetrievalScore,
    /// Per-factor breakdown.
    pub breakdown: ScoreBreakdown,
}

/// Breakdown of a retrieval score.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreBreakdown {
    /// Context keywords found in the memory.
    pub keyword_hits: usize,
    /// Recency bonus.
    pub recency: f64,
    /// `keyword_hits + recency`.
    pub relevance: f64,
    /// The memory's importance.
    pub importance: f64,
}

/// Ranks memories against a context string.
#[derive(Debug, Clone)]
pub struct RetrievalEngine {
    max_keywords: usize,
}

impl RetrievalEngine {
    /// Create an engine using the keyword cap from `config`.
    #[must_use]
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            max_keywords: config.max_keywords,
        }
    }

    /// The top `limit` memories for `context` as of `now`.
    #[must_use]
    pub fn rank(
        &self,
        context: &str,
        memories: &[StoredMemory],
        now: DateTime<Utc>,
        limit: usize,
    ) -> Vec<RetrievalResult> {
        let keywords = scoring::extract_keywords(context, self.max_keywords);
        let mut results: Vec<RetrievalResult> = memories
            .iter()
            .map(|memory| {
                let breakdown = scoring::compute_breakdown(memory, &keywords, now);
                RetrievalResult {
                    memory: memory.clone(),
                    score: RetrievalScore::new(breakdown.relevance * breakdown.importance),
                    breakdown,
                }
            })
            .collect();

        results.sort_by(|a, b| b.score.cmp(&a.score));
        results.truncate(limit);
        results
    }
}

impl Default for RetrievalEngine {
    fn default() -> Self {
        Self::new(&MemoryConfig::default())
    }
}
