//! Property-based tests for the hamlet state model.
//!
//! Needs stay in range under arbitrary decay and satisfaction, the
//! short-term queue never outgrows its capacity, and moves never land a
//! character on blocked or out-of-bounds cells.

use std::time::Duration;

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

use hamlet_core::config::{NeedsConfig, WorldConfig};
use hamlet_core::memory::{CharacterMemory, MemoryKind};
use hamlet_core::needs::{NeedKind, Needs};
use hamlet_core::personality::Personality;
use hamlet_core::types::Position;
use hamlet_core::{Character, World};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_needs() -> impl Strategy<Value = Needs> {
    (
        -50.0..150.0f32,
        -50.0..150.0f32,
        -50.0..150.0f32,
        -50.0..150.0f32,
    )
        .prop_map(|(h, t, e, s)| Needs::new(h, t, e, s))
}

fn arb_need_kind() -> impl Strategy<Value = NeedKind> {
    prop_oneof![
        Just(NeedKind::Hunger),
        Just(NeedKind::Thirst),
        Just(NeedKind::Energy),
        Just(NeedKind::Social),
    ]
}

fn in_range(needs: &Needs) -> bool {
    needs.iter().iter().all(|(_, v)| (0.0..=100.0).contains(v))
}

// ---------------------------------------------------------------------------
// Needs
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn decay_keeps_needs_in_range(needs in arb_needs(), secs in 0u64..1_000_000) {
        let mut needs = needs;
        needs.decay(Duration::from_secs(secs), &NeedsConfig::default());
        prop_assert!(in_range(&needs));
    }

    #[test]
    fn repeated_decay_is_non_increasing(needs in arb_needs(), steps in prop::collection::vec(0u64..20_000, 1..20)) {
        let mut needs = needs;
        let rates = NeedsConfig::default();
        for secs in steps {
            let before = needs;
            needs.decay(Duration::from_secs(secs), &rates);
            for kind in NeedKind::ALL {
                prop_assert!(needs.get(kind) <= before.get(kind));
            }
        }
    }

    #[test]
    fn satisfy_never_exceeds_hundred(needs in arb_needs(), kind in arb_need_kind(), amount in -100.0..500.0f32) {
        let mut needs = needs;
        needs.satisfy(kind, amount);
        prop_assert!(in_range(&needs));
    }

    #[test]
    fn priority_is_a_minimum(needs in arb_needs()) {
        let (_, value) = needs.priority();
        for (_, v) in needs.iter() {
            prop_assert!(value <= v);
        }
    }
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn short_term_never_exceeds_capacity(importances in prop::collection::vec(0u8..=10, 0..60)) {
        let mut mem = CharacterMemory::default();
        for (i, importance) in importances.iter().enumerate() {
            mem.add_memory(MemoryKind::Event, format!("olay {i}"), *importance);
            prop_assert!(mem.short_term_len() <= 10);
        }
        let ordinary = importances.iter().filter(|i| **i <= 7).count();
        prop_assert_eq!(mem.short_term_len(), ordinary.min(10));
        prop_assert_eq!(
            mem.long_term().important.len(),
            importances.len() - ordinary
        );
    }
}

// ---------------------------------------------------------------------------
// Movement
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn moves_never_land_on_blocked_cells(
        seed in any::<u64>(),
        targets in prop::collection::vec((-5i32..30, -5i32..25), 1..40),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let config = WorldConfig { width: 24, height: 18, ..WorldConfig::default() };
        let mut world = World::generate(&config, &mut rng);
        let Some(start) = world.random_walkable_position(&mut rng, None) else {
            return Ok(());
        };
        let c = Character::new("Test", Personality::default(), &mut rng);
        let id = world.add_character(c, start).expect("walkable start");

        for (x, y) in targets {
            let before = world.character(id).expect("exists").position();
            let target = Position::new(x, y);
            let result = world.move_character(id, target);
            let after = world.character(id).expect("exists").position();
            if result.is_ok() {
                prop_assert_eq!(after, target);
            } else {
                prop_assert_eq!(after, before);
            }
            prop_assert!(world.is_walkable(after));
            prop_assert!(after.x >= 0 && after.x < 24 && after.y >= 0 && after.y < 18);
        }
    }
}
