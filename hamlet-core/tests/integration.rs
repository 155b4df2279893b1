//! Integration tests: state-model flows that cross module boundaries.

use chrono::{Duration, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;

use hamlet_core::config::{HamletConfig, MemoryConfig, PersistenceConfig};
use hamlet_core::memory::{MemoryKind, MemoryLimits, Quality, SharedPayload, StoredMemory};
use hamlet_core::persistence::{PersistenceStore, SqliteStore};
use hamlet_core::retrieval::RetrievalEngine;
use hamlet_core::types::{Position, ResourceKind};
use hamlet_core::world::Terrain;
use hamlet_core::{Character, Personality, Trait, World};

fn open_world() -> World {
    World::from_grid(10, 10, vec![Terrain::Grass; 100], 12.0)
}

// ---------------------------------------------------------------------------
// Knowledge travels from one character to another and survives a restart
// ---------------------------------------------------------------------------

#[test]
fn shared_resource_knowledge_survives_persistence() {
    let mut rng = StdRng::seed_from_u64(8);
    let mut world = open_world();
    let store = SqliteStore::open_in_memory(&PersistenceConfig::default()).expect("open");

    let ahmet = Character::new(
        "Ahmet",
        Personality::new([Trait::Curious, Trait::Brave], ["keşif"], ["karanlık"], ["keşif yapma"]),
        &mut rng,
    );
    let ayse = Character::new("Ayşe", Personality::random(&mut rng), &mut rng);
    let a = world.add_character(ahmet, Position::new(1, 1)).expect("spawn");
    let b = world.add_character(ayse, Position::new(2, 1)).expect("spawn");

    world
        .character_mut(a)
        .expect("ahmet")
        .memory
        .remember_resource_location(ResourceKind::Water, Position::new(7, 7), Quality::Good);
    world.character_mut(b).expect("ayşe").memory.learn_from_other(
        "Ahmet",
        SharedPayload::Resource {
            kind: ResourceKind::Water,
            x: 7,
            y: 7,
            content: "(7,7) civarında su var".into(),
        },
    );

    for c in world.characters() {
        store.save_character(c).expect("save");
    }
    let restored = store.get_all_characters().expect("load");
    assert_eq!(restored.len(), 2);
    let ayse = restored.iter().find(|c| c.name == "Ayşe").expect("ayşe");
    let loc = ayse
        .memory
        .nearest_known_resource(ResourceKind::Water, ayse.position())
        .expect("learned");
    assert_eq!(loc.source.as_deref(), Some("Ahmet"));
    assert_eq!(loc.times_visited, 0);
    assert_eq!(ayse.position(), Position::new(2, 1));
}

// ---------------------------------------------------------------------------
// Stored memories rank against a context
// ---------------------------------------------------------------------------

#[test]
fn stored_memories_rank_by_context() {
    let store = SqliteStore::open_in_memory(&PersistenceConfig::default()).expect("open");
    let mut rng = StdRng::seed_from_u64(2);
    let c = Character::new("Mehmet", Personality::default(), &mut rng);
    let now = Utc::now();

    let relevant = StoredMemory::new(c.id, MemoryKind::Observation, "göl kenarında su kaynağı", 5)
        .with_created_at(now - Duration::minutes(20));
    let irrelevant = StoredMemory::new(c.id, MemoryKind::Event, "pazarda kavga", 9)
        .with_created_at(now - Duration::days(12));
    store.save_memory(&relevant).expect("save");
    store.save_memory(&irrelevant).expect("save");

    let candidates = store.get_memories(c.id, 50).expect("load");
    assert_eq!(candidates[0].id, irrelevant.id, "store orders by importance");

    let engine = RetrievalEngine::new(&MemoryConfig::default());
    let ranked = engine.rank("su kaynağı nerede", &candidates, now, 1);
    assert_eq!(ranked[0].memory.id, relevant.id);
}

// ---------------------------------------------------------------------------
// Config drives limits
// ---------------------------------------------------------------------------

#[test]
fn config_limits_flow_into_memory() {
    let config = HamletConfig::from_toml(
        r"
        [memory]
        short_term_capacity = 3
        important_threshold = 5
        ",
    )
    .expect("parse");
    let mut rng = StdRng::seed_from_u64(4);
    let mut c = Character::new("Fatma", Personality::default(), &mut rng)
        .with_memory_limits(MemoryLimits::from(&config.memory));
    for i in 0..5 {
        c.add_memory(MemoryKind::Event, format!("olay {i}"), 2);
    }
    c.add_memory(MemoryKind::Event, "önemli", 6);
    assert_eq!(c.memory.short_term_len(), 3);
    assert_eq!(c.memory.long_term().important.len(), 1);
}
