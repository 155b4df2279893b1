//! Durable memory service: summarise, store, rank.
//!
//! Writes go to the persistence store (best effort) and to an in-process
//! index of recent memories per character. Retrieval ranks the store's
//! candidates, or the index when the store has nothing to offer.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use hamlet_core::config::MemoryConfig;
use hamlet_core::memory::{MemoryKind, MemoryRecord, StoredMemory};
use hamlet_core::persistence::{EventRecord, PersistenceStore};
use hamlet_core::retrieval::RetrievalEngine;
use hamlet_core::CharacterId;
use tracing::{debug, warn};

use crate::error::GeneratorError;
use crate::generator::UtteranceGenerator;

/// Summarising, persisting and ranking memory service.
pub struct MemoryStore<G> {
    store: Arc<dyn PersistenceStore>,
    generator: Arc<G>,
    engine: RetrievalEngine,
    config: MemoryConfig,
    summary_timeout: Duration,
    index: DashMap<CharacterId, VecDeque<StoredMemory>>,
}

impl<G: UtteranceGenerator> MemoryStore<G> {
    /// Create a service. Summaries taking longer than `summary_timeout` fall
    /// back to truncation.
    pub fn new(
        store: Arc<dyn PersistenceStore>,
        generator: Arc<G>,
        config: MemoryConfig,
        summary_timeout: Duration,
    ) -> Self {
        Self {
            store,
            generator,
            engine: RetrievalEngine::new(&config),
            config,
            summary_timeout,
            index: DashMap::new(),
        }
    }

    /// Store a memory for `character`, summarising long content first.
    ///
    /// Never fails: a generator failure falls back to a truncated prefix and
    /// a persistence failure is logged.
    pub async fn record(&self, character: CharacterId, record: &MemoryRecord) -> StoredMemory {
        let mut memory = StoredMemory::from_record(character, record);
        if memory.content.chars().count() > self.config.summary_threshold_chars {
            let summary = self.summarize(&memory.content).await;
            memory = memory.with_summary(summary);
        }

        if let Err(e) = self.store.save_memory(&memory) {
            warn!(character = %character, error = %e, "Failed to persist memory");
        }

        let cap = self.config.retrieval_candidates.max(1);
        let mut recent = self.index.entry(character).or_default();
        recent.push_back(memory.clone());
        while recent.len() > cap {
            recent.pop_front();
        }
        memory
    }

    /// Log an event and remember it as an event memory with the event's
    /// importance.
    pub async fn record_event(&self, event: &EventRecord) -> StoredMemory {
        if let Err(e) = self.store.log_event(event) {
            warn!(character = %event.character_id, error = %e, "Failed to log event");
        }
        let record = MemoryRecord::at(
            MemoryKind::Event,
            event.description.clone(),
            event.importance,
            event.timestamp,
        );
        self.record(event.character_id, &record).await
    }

    /// The `limit` memories of `character` most relevant to `context`.
    #[must_use]
    pub fn get_relevant_memories(
        &self,
        character: CharacterId,
        context: &str,
        limit: usize,
    ) -> Vec<StoredMemory> {
        let candidates = match self
            .store
            .get_memories(character, self.config.retrieval_candidates)
        {
            Ok(memories) if !memories.is_empty() => memories,
            Ok(_) => self.cached(character),
            Err(e) => {
                warn!(character = %character, error = %e, "Failed to load memories, using cache");
                self.cached(character)
            }
        };

        self.engine
            .rank(context, &candidates, Utc::now(), limit)
            .into_iter()
            .map(|result| result.memory)
            .collect()
    }

    /// The generator used for summaries.
    #[must_use]
    pub fn generator(&self) -> &Arc<G> {
        &self.generator
    }

    /// The persistence backend.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn PersistenceStore> {
        &self.store
    }

    /// Memory settings.
    #[must_use]
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Number of memories held in the in-process index for `character`.
    #[must_use]
    pub fn cached_len(&self, character: CharacterId) -> usize {
        self.index.get(&character).map_or(0, |m| m.len())
    }

    fn cached(&self, character: CharacterId) -> Vec<StoredMemory> {
        self.index
            .get(&character)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default()
    }

    async fn summarize(&self, content: &str) -> String {
        let ms = u64::try_from(self.summary_timeout.as_millis()).unwrap_or(u64::MAX);
        let call = self.generator.summarize(content);
        let result = match tokio::time::timeout(self.summary_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(GeneratorError::Timeout { ms }),
        };
        match result {
            Ok(summary) => summary,
            Err(e) => {
                debug!(error = %e, "Summary failed, truncating");
                truncate_with_ellipsis(content, self.config.summary_fallback_chars)
            }
        }
    }
}

/// The first `max_chars` characters of `text` followed by `...`.
#[must_use]
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use hamlet_core::persistence::NullStore;

    use super::*;
    use crate::generator::UtteranceRequest;

    struct Failing;

    impl UtteranceGenerator for Failing {
        async fn generate(&self, _request: UtteranceRequest) -> Result<String, GeneratorError> {
            Err(GeneratorError::Unavailable("offline".into()))
        }

        async fn summarize(&self, _text: &str) -> Result<String, GeneratorError> {
            Err(GeneratorError::Unavailable("offline".into()))
        }
    }

    struct Fixed;

    impl UtteranceGenerator for Fixed {
        async fn generate(&self, _request: UtteranceRequest) -> Result<String, GeneratorError> {
            Ok("merhaba".into())
        }

        async fn summarize(&self, _text: &str) -> Result<String, GeneratorError> {
            Ok("kısa özet".into())
        }
    }

    fn service<G: UtteranceGenerator>(generator: G) -> MemoryStore<G> {
        MemoryStore::new(
            Arc::new(NullStore),
            Arc::new(generator),
            MemoryConfig::default(),
            Duration::from_millis(200),
        )
    }

    #[tokio::test]
    async fn long_content_falls_back_to_truncation() {
        let store = service(Failing);
        let id = CharacterId::new();
        let long = "ç".repeat(250);
        let record = MemoryRecord::new(MemoryKind::Observation, long, 5);

        let stored = store.record(id, &record).await;
        let summary = stored.summary.expect("summary");
        assert_eq!(summary.chars().count(), 103);
        assert!(summary.ends_with("..."));
    }

    #[tokio::test]
    async fn long_content_is_summarised() {
        let store = service(Fixed);
        let id = CharacterId::new();
        let record = MemoryRecord::new(MemoryKind::Observation, "a".repeat(201), 5);
        let stored = store.record(id, &record).await;
        assert_eq!(stored.summary.as_deref(), Some("kısa özet"));

        let short = store
            .record(id, &MemoryRecord::new(MemoryKind::Observation, "a".repeat(200), 5))
            .await;
        assert!(short.summary.is_none());
    }

    #[tokio::test]
    async fn retrieval_uses_cache_without_store() {
        let store = service(Fixed);
        let id = CharacterId::new();
        store
            .record(id, &MemoryRecord::new(MemoryKind::Observation, "dağ yolu karanlık", 5))
            .await;
        store
            .record(id, &MemoryRecord::new(MemoryKind::Observation, "göl kenarında su kaynağı", 5))
            .await;

        let top = store.get_relevant_memories(id, "yeni su kaynağı bul", 1);
        assert_eq!(top.len(), 1);
        assert!(top[0].content.contains("su kaynağı"));
        assert_eq!(store.cached_len(id), 2);
    }
}
