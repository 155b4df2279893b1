//! Memory records as held by the ranked memory store and the persistence layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MAX_IMPORTANCE, MemoryKind, MemoryRecord};
use crate::types::{CharacterId, MemoryId};

/// A memory owned by a character, with an optional summary of long content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMemory {
    /// Unique ID.
    pub id: MemoryId,
    /// Owning character.
    pub character_id: CharacterId,
    /// Category.
    pub kind: MemoryKind,
    /// Full text.
    pub content: String,
    /// Condensed text, present when the content was long.
    pub summary: Option<String>,
    /// Importance in `[0, 10]`.
    pub importance: u8,
    /// When it was recorded.
    pub created_at: DateTime<Utc>,
}

impl StoredMemory {
    /// Create a memory stamped now.
    #[must_use]
    pub fn new(
        character_id: CharacterId,
        kind: MemoryKind,
        content: impl Into<String>,
        importance: u8,
    ) -> Self {
        Self {
            id: MemoryId::new(),
            character_id,
            kind,
            content: content.into(),
            summary: None,
            importance: importance.min(MAX_IMPORTANCE),
            created_at: Utc::now(),
        }
    }

    /// Override the creation time.
    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Attach a summary.
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Build from a character's in-memory record.
    #[must_use]
    pub fn from_record(character_id: CharacterId, record: &MemoryRecord) -> Self {
        Self {
            id: record.id,
            character_id,
            kind: record.kind,
            content: record.content.clone(),
            summary: None,
            importance: record.importance,
            created_at: record.timestamp,
        }
    }

    /// Content and summary joined, lowercased, for keyword matching.
    #[must_use]
    pub fn searchable_text(&self) -> String {
        match &self.summary {
            Some(summary) => format!("{} {}", self.content, summary).to_lowercase(),
            None => self.content.to_lowercase(),
        }
    }
}
