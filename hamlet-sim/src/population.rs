//! The starting villagers.

use hamlet_core::memory::MemoryLimits;
use hamlet_core::persistence::PersistenceStore;
use hamlet_core::world::Region;
use hamlet_core::{Character, CharacterId, HamletError, Personality, Position, Result, Trait, World};
use rand::Rng;
use tracing::{info, warn};

/// Where new villagers are placed.
pub const SPAWN_REGION: Region = Region {
    min: Position::new(10, 10),
    max: Position::new(39, 24),
};

struct Villager {
    name: &'static str,
    traits: [Trait; 3],
    interests: [&'static str; 2],
    fear: &'static str,
    goals: [&'static str; 2],
}

const VILLAGERS: [Villager; 4] = [
    Villager {
        name: "Ahmet",
        traits: [Trait::Curious, Trait::Social, Trait::Brave],
        interests: ["keşif", "teknoloji"],
        fear: "yalnızlık",
        goals: ["arkadaş edinme", "keşif yapma"],
    },
    Villager {
        name: "Ayşe",
        traits: [Trait::Creative, Trait::Emotional, Trait::Practical],
        interests: ["sanat", "müzik"],
        fear: "karanlık",
        goals: ["yaratıcı olma", "bilgi toplama"],
    },
    Villager {
        name: "Mehmet",
        traits: [Trait::Cautious, Trait::Logical, Trait::Brave],
        interests: ["okuma", "spor"],
        fear: "yükseklik",
        goals: ["güvenli alan bulma", "bilgi toplama"],
    },
    Villager {
        name: "Fatma",
        traits: [Trait::Social, Trait::Emotional, Trait::Creative],
        interests: ["yemek", "doğa"],
        fear: "bilinmeyen",
        goals: ["arkadaş edinme", "yaratıcı olma"],
    },
];

/// Spawn the four default villagers at random walkable cells of
/// [`SPAWN_REGION`].
///
/// # Errors
/// Returns `HamletError::InvalidMove` if the world has no walkable cell.
pub fn spawn_default<R: Rng>(
    world: &mut World,
    limits: MemoryLimits,
    rng: &mut R,
) -> Result<Vec<CharacterId>> {
    let mut ids = Vec::with_capacity(VILLAGERS.len());
    for v in &VILLAGERS {
        let personality = Personality::new(v.traits, v.interests, [v.fear], v.goals);
        let character = Character::new(v.name, personality, rng).with_memory_limits(limits);
        let at = spawn_point(world, rng)?;
        ids.push(world.add_character(character, at)?);
    }
    info!(count = ids.len(), "Spawned default villagers");
    Ok(ids)
}

/// Restore the stored characters, or spawn the defaults when there are none.
///
/// A stored position that is no longer walkable is replaced by a fresh spawn
/// point. A failing store is treated as empty.
///
/// # Errors
/// Returns `HamletError::InvalidMove` if the world has no walkable cell.
pub fn restore_or_spawn<R: Rng>(
    world: &mut World,
    store: &dyn PersistenceStore,
    limits: MemoryLimits,
    rng: &mut R,
) -> Result<Vec<CharacterId>> {
    let stored = store.get_all_characters().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load characters, starting fresh");
        Vec::new()
    });
    if stored.is_empty() {
        return spawn_default(world, limits, rng);
    }

    let mut ids = Vec::with_capacity(stored.len());
    for character in stored {
        let at = if world.is_walkable(character.position()) {
            character.position()
        } else {
            spawn_point(world, rng)?
        };
        ids.push(world.add_character(character, at)?);
    }
    info!(count = ids.len(), "Restored characters");
    Ok(ids)
}

fn spawn_point<R: Rng>(world: &World, rng: &mut R) -> Result<Position> {
    world
        .random_walkable_position(rng, Some(SPAWN_REGION))
        .ok_or_else(|| HamletError::InvalidMove {
            x: SPAWN_REGION.min.x,
            y: SPAWN_REGION.min.y,
            reason: "no walkable cell to spawn on".to_string(),
        })
}
