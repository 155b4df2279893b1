//! A character: personality, needs, position, conversation lock and memory.
//!
//! Position and the conversation lock fields are only writable through
//! [`crate::World`], which validates moves and performs the atomic pair claim.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::NeedsConfig;
use crate::memory::{CharacterMemory, MemoryKind, MemoryLimits, MemoryRecord};
use crate::needs::Needs;
use crate::personality::Personality;
use crate::types::{CharacterId, Position};

/// Activity label of a freshly created character.
pub const IDLE_ACTIVITY: &str = "idle";

/// One autonomous villager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Unique ID.
    pub id: CharacterId,
    /// Display name.
    pub name: String,
    /// Age in years.
    pub age: u32,
    /// Fixed personality.
    pub personality: Personality,
    /// Current needs.
    pub needs: Needs,
    /// Human-readable description of what the character is doing.
    pub current_activity: String,
    /// Carried items, in pickup order.
    pub inventory: Vec<String>,
    /// Everything the character remembers.
    pub memory: CharacterMemory,
    /// Last time the character's state changed.
    pub last_update: DateTime<Utc>,
    pub(crate) position: Position,
    pub(crate) in_conversation: bool,
    pub(crate) conversation_target: Option<CharacterId>,
}

impl Character {
    /// Create a character with a random age in 18..=47, hunger, thirst and
    /// energy in `[60, 100)` and social in `[20, 50)`.
    pub fn new<R: Rng>(name: impl Into<String>, personality: Personality, rng: &mut R) -> Self {
        let needs = Needs::new(
            rng.gen_range(60.0..100.0),
            rng.gen_range(60.0..100.0),
            rng.gen_range(60.0..100.0),
            rng.gen_range(20.0..50.0),
        );
        Self {
            id: CharacterId::new(),
            name: name.into(),
            age: rng.gen_range(18..=47),
            personality,
            needs,
            current_activity: IDLE_ACTIVITY.to_string(),
            inventory: Vec::new(),
            memory: CharacterMemory::default(),
            last_update: Utc::now(),
            position: Position::default(),
            in_conversation: false,
            conversation_target: None,
        }
    }

    /// Replace the memory limits, keeping nothing else. Used right after creation.
    #[must_use]
    pub fn with_memory_limits(mut self, limits: MemoryLimits) -> Self {
        self.memory = CharacterMemory::with_limits(limits);
        self
    }

    /// Override the starting needs.
    #[must_use]
    pub fn with_needs(mut self, needs: Needs) -> Self {
        self.needs = needs;
        self
    }

    /// Current cell.
    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    /// Whether the character is claimed by a conversation.
    #[must_use]
    pub fn in_conversation(&self) -> bool {
        self.in_conversation
    }

    /// The conversation partner, while claimed.
    #[must_use]
    pub fn conversation_target(&self) -> Option<CharacterId> {
        self.conversation_target
    }

    /// Apply need decay for `elapsed` simulated time.
    pub fn decay(&mut self, elapsed: Duration, rates: &NeedsConfig) {
        self.needs.decay(elapsed, rates);
        self.last_update = Utc::now();
    }

    /// Record a memory. See [`CharacterMemory::add_memory`].
    pub fn add_memory(
        &mut self,
        kind: MemoryKind,
        content: impl Into<String>,
        importance: u8,
    ) -> MemoryRecord {
        self.memory.add_memory(kind, content, importance)
    }

    /// Set the activity label.
    pub fn set_activity(&mut self, activity: impl Into<String>) {
        self.current_activity = activity.into();
        self.last_update = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn new_character_ranges() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..50 {
            let c = Character::new("Deniz", Personality::default(), &mut rng);
            assert!((18..=47).contains(&c.age));
            assert!((60.0..100.0).contains(&c.needs.hunger()));
            assert!((20.0..50.0).contains(&c.needs.social()));
            assert!(!c.in_conversation());
            assert!(c.conversation_target().is_none());
        }
    }

    #[test]
    fn serde_keeps_lock_fields() {
        let mut rng = StdRng::seed_from_u64(1);
        let c = Character::new("Ayşe", Personality::random(&mut rng), &mut rng);
        let json = serde_json::to_string(&c).expect("serialize");
        let back: Character = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, c);
    }
}
