//! Per-character memory.
//!
//! A [`CharacterMemory`] has two halves:
//!
//! - a bounded short-term FIFO of ordinary records (oldest evicted first),
//! - a long-term store holding records above the importance threshold,
//!   remembered resource locations keyed by `"x,y"`, an append-only log of
//!   knowledge shared by others, and an append-only discovery log.
//!
//! Resource locations live in an [`IndexMap`], so iteration (and therefore
//! nearest-resource tie-breaking) follows insertion order.

pub mod resources;
pub mod stored;

pub use resources::{Discovery, Quality, ResourceLocation, SharedInformation, SharedPayload};
pub use stored::StoredMemory;

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::MemoryConfig;
use crate::types::{MemoryId, Position, ResourceKind};

/// Highest importance a record can carry.
pub const MAX_IMPORTANCE: u8 = 10;

/// What a memory record is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    /// Something that happened.
    Event,
    /// Something said in a conversation.
    Conversation,
    /// Something seen.
    Observation,
    /// A step taken.
    Movement,
    /// Something done.
    Action,
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Event => "event",
            Self::Conversation => "conversation",
            Self::Observation => "observation",
            Self::Movement => "movement",
            Self::Action => "action",
        };
        f.write_str(s)
    }
}

/// A single remembered record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique ID.
    pub id: MemoryId,
    /// Category.
    pub kind: MemoryKind,
    /// Free text.
    pub content: String,
    /// Importance in `[0, 10]`.
    pub importance: u8,
    /// When it was recorded.
    pub timestamp: DateTime<Utc>,
}

impl MemoryRecord {
    /// Create a record stamped now. Importance is capped at 10.
    #[must_use]
    pub fn new(kind: MemoryKind, content: impl Into<String>, importance: u8) -> Self {
        Self::at(kind, content, importance, Utc::now())
    }

    /// Create a record with an explicit timestamp.
    #[must_use]
    pub fn at(
        kind: MemoryKind,
        content: impl Into<String>,
        importance: u8,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MemoryId::new(),
            kind,
            content: content.into(),
            importance: importance.min(MAX_IMPORTANCE),
            timestamp,
        }
    }
}

/// Capacity and routing limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryLimits {
    /// Short-term FIFO capacity.
    pub short_term_capacity: usize,
    /// Records strictly above this importance go to long-term memory.
    pub important_threshold: u8,
}

impl Default for MemoryLimits {
    fn default() -> Self {
        Self {
            short_term_capacity: 10,
            important_threshold: 7,
        }
    }
}

impl From<&MemoryConfig> for MemoryLimits {
    fn from(config: &MemoryConfig) -> Self {
        Self {
            short_term_capacity: config.short_term_capacity.max(1),
            important_threshold: config.important_threshold,
        }
    }
}

/// The long-term half of a character's memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LongTermMemory {
    /// Records above the importance threshold.
    pub important: Vec<MemoryRecord>,
    /// Remembered resources keyed by `"x,y"`.
    pub resource_locations: IndexMap<String, ResourceLocation>,
    /// Knowledge heard from others.
    pub shared_information: Vec<SharedInformation>,
    /// First-hand resource finds.
    pub discoveries: Vec<Discovery>,
}

/// Everything one character remembers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterMemory {
    #[serde(default)]
    limits: MemoryLimits,
    short_term: VecDeque<MemoryRecord>,
    long_term: LongTermMemory,
}

impl CharacterMemory {
    /// Empty memory with the given limits.
    #[must_use]
    pub fn with_limits(limits: MemoryLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    /// Record something. Important records go to long-term memory, the rest
    /// to the short-term FIFO. Returns the stored record.
    pub fn add_memory(
        &mut self,
        kind: MemoryKind,
        content: impl Into<String>,
        importance: u8,
    ) -> MemoryRecord {
        let record = MemoryRecord::new(kind, content, importance);
        self.push(record.clone());
        record
    }

    /// Store a prebuilt record following the same routing as [`Self::add_memory`].
    pub fn push(&mut self, record: MemoryRecord) {
        if record.importance > self.limits.important_threshold {
            self.long_term.important.push(record);
            return;
        }
        self.short_term.push_back(record);
        while self.short_term.len() > self.limits.short_term_capacity {
            self.short_term.pop_front();
        }
    }

    /// Remember a resource seen first-hand.
    ///
    /// An existing entry of the same kind has its visit count incremented
    /// (a shared entry is promoted to first-hand); an entry of a different
    /// kind is replaced. A discovery is always appended.
    pub fn remember_resource_location(
        &mut self,
        kind: ResourceKind,
        at: Position,
        quality: Quality,
    ) -> &ResourceLocation {
        let now = Utc::now();
        self.long_term.discoveries.push(Discovery {
            kind,
            position: at,
            timestamp: now,
        });

        let entry = self
            .long_term
            .resource_locations
            .entry(at.key())
            .and_modify(|loc| {
                if loc.kind == kind {
                    loc.times_visited = loc.times_visited.saturating_add(1);
                    loc.source = None;
                    loc.quality = quality;
                } else {
                    *loc = first_hand(kind, at, quality, now);
                }
            })
            .or_insert_with(|| first_hand(kind, at, quality, now));
        &*entry
    }

    /// Take in knowledge from `source`.
    ///
    /// The information is always appended to the shared log. A resource
    /// payload is also remembered with `times_visited == 0`, unless the
    /// coordinate already holds a first-hand entry, which is left untouched.
    /// Returns `true` if a resource location was written.
    pub fn learn_from_other(&mut self, source: &str, payload: SharedPayload) -> bool {
        let now = Utc::now();
        let mut learned = false;
        if let SharedPayload::Resource { kind, x, y, .. } = &payload {
            let at = Position::new(*x, *y);
            let key = at.key();
            let keep_existing = self
                .long_term
                .resource_locations
                .get(&key)
                .is_some_and(ResourceLocation::is_self_discovered);
            if !keep_existing {
                self.long_term.resource_locations.insert(
                    key,
                    ResourceLocation {
                        kind: *kind,
                        x: at.x,
                        y: at.y,
                        quality: Quality::Shared,
                        discovered_at: now,
                        source: Some(source.to_string()),
                        times_visited: 0,
                    },
                );
                learned = true;
            }
        }
        self.long_term.shared_information.push(SharedInformation {
            source: source.to_string(),
            payload,
            timestamp: now,
        });
        learned
    }

    /// Drop the entry at `at`, returning it. Order of the remaining entries
    /// is kept.
    pub fn forget_resource_location(&mut self, at: Position) -> Option<ResourceLocation> {
        self.long_term.resource_locations.shift_remove(&at.key())
    }

    /// Known resources, optionally filtered by kind, in insertion order.
    #[must_use]
    pub fn known_resources(&self, kind: Option<ResourceKind>) -> Vec<&ResourceLocation> {
        self.long_term
            .resource_locations
            .values()
            .filter(|loc| kind.is_none_or(|k| loc.kind == k))
            .collect()
    }

    /// The known resource of `kind` closest to `from` (Euclidean). Ties go to
    /// the earliest inserted entry.
    #[must_use]
    pub fn nearest_known_resource(
        &self,
        kind: ResourceKind,
        from: Position,
    ) -> Option<&ResourceLocation> {
        let mut best: Option<(&ResourceLocation, f64)> = None;
        for loc in self.long_term.resource_locations.values() {
            if loc.kind != kind {
                continue;
            }
            let d = from.distance(loc.position());
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((loc, d));
            }
        }
        best.map(|(loc, _)| loc)
    }

    /// Short-term records, oldest first.
    pub fn short_term(&self) -> impl Iterator<Item = &MemoryRecord> {
        self.short_term.iter()
    }

    /// Number of short-term records.
    #[must_use]
    pub fn short_term_len(&self) -> usize {
        self.short_term.len()
    }

    /// The long-term half.
    #[must_use]
    pub fn long_term(&self) -> &LongTermMemory {
        &self.long_term
    }

    /// The most recent short-term records, newest last.
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<&MemoryRecord> {
        let skip = self.short_term.len().saturating_sub(n);
        self.short_term.iter().skip(skip).collect()
    }

    /// Active limits.
    #[must_use]
    pub fn limits(&self) -> MemoryLimits {
        self.limits
    }
}

fn first_hand(
    kind: ResourceKind,
    at: Position,
    quality: Quality,
    now: DateTime<Utc>,
) -> ResourceLocation {
    ResourceLocation {
        kind,
        x: at.x,
        y: at.y,
        quality,
        discovered_at: now,
        source: None,
        times_visited: 1,
    }
}
