//! Per-factor scoring for memory retrieval.
//!
//! Relevance(m) = KeywordHits(m) + RecencyBonus(m)
//! Rank(m)      = Relevance(m) x Importance(m)
//!
//! KeywordHits counts context keywords that occur anywhere in the memory's
//! content or summary (substring match, case-insensitive). RecencyBonus is a
//! step function of age.

use chrono::{DateTime, Utc};

use crate::memory::StoredMemory;
use crate::retrieval::ScoreBreakdown;

/// Words that never count as keywords.
pub const STOP_WORDS: [&str; 28] = [
    "bir", "bu", "şu", "o", "ve", "ile", "için", "da", "de", "ki", "mi", "mu", "mı", "mü", "the",
    "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
];

/// Lowercase whitespace-separated words longer than two characters that are
/// not stop words, in order of appearance, capped at `max`.
#[must_use]
pub fn extract_keywords(text: &str, max: usize) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
        .take(max)
        .map(str::to_string)
        .collect()
}

/// 0.5 under an hour old, 0.3 under a day, 0.1 under a week, else 0.
#[must_use]
pub fn recency_bonus(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let hours = (now - created_at).num_seconds().max(0) as f64 / 3600.0;
    if hours < 1.0 {
        0.5
    } else if hours < 24.0 {
        0.3
    } else if hours < 168.0 {
        0.1
    } else {
        0.0
    }
}

/// Number of `keywords` present in the memory text.
#[must_use]
pub fn keyword_hits(memory: &StoredMemory, keywords: &[String]) -> usize {
    let text = memory.searchable_text();
    keywords.iter().filter(|k| text.contains(k.as_str())).count()
}

/// Full breakdown for one memory.
#[must_use]
pub fn compute_breakdown(
    memory: &StoredMemory,
    keywords: &[String],
    now: DateTime<Utc>,
) -> ScoreBreakdown {
    let hits = keyword_hits(memory, keywords);
    let recency = recency_bonus(memory.created_at, now);
    let relevance = hits as f64 + recency;
    ScoreBreakdown {
        keyword_hits: hits,
        recency,
        relevance,
        importance: f64::from(memory.importance),
    }
}
