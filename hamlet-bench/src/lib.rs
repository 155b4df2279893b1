//! Fixtures shared by the hamlet benchmarks.

use chrono::{Duration, Utc};
use hamlet_core::config::WorldConfig;
use hamlet_core::memory::{MemoryKind, StoredMemory};
use hamlet_core::{Character, CharacterId, Personality, World};
use rand::SeedableRng;
use rand::rngs::StdRng;

const TOPICS: [&str; 5] = [
    "göl kenarında su kaynağı buldu",
    "çiftlikte yemek topladı",
    "ormanda yürüyüş yaptı",
    "evde dinlendi",
    "Ayşe ile sohbet etti",
];

/// The `i`-th synthetic memory of `owner`: rotating topics, importance
/// 1..=10, each 37 minutes older than the previous one.
#[must_use]
pub fn make_memory(owner: CharacterId, i: u32) -> StoredMemory {
    let topic = TOPICS[i as usize % TOPICS.len()];
    let importance = u8::try_from(i % 10 + 1).unwrap_or(5);
    StoredMemory::new(owner, MemoryKind::Observation, format!("{topic} #{i}"), importance)
        .with_created_at(Utc::now() - Duration::minutes(i64::from(i) * 37))
}

/// A generated default-size world holding `count` random villagers.
#[must_use]
pub fn populated_world(count: usize, seed: u64) -> World {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut world = World::generate(&WorldConfig::default(), &mut rng);
    for i in 0..count {
        let character = Character::new(format!("Köylü {i}"), Personality::random(&mut rng), &mut rng);
        if let Some(at) = world.random_walkable_position(&mut rng, None) {
            let _ = world.add_character(character, at);
        }
    }
    world
}
