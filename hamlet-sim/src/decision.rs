//! Per-character, per-tick action selection.
//!
//! The policy, in order:
//!
//! 1. A claimed character waits.
//! 2. A need below the urgent threshold is addressed directly.
//! 3. With company nearby, a chat is attempted with a probability set by
//!    the social need and the social trait.
//! 4. A lonely character walks toward the nearest free character when they
//!    are too far away.
//! 5. Otherwise an action is drawn from a personality and need weighted pool.

use std::fmt;

use chrono::{DateTime, Utc};
use hamlet_core::config::DecisionConfig;
use hamlet_core::rng::{chance, roll};
use hamlet_core::{Character, CharacterId, NeedKind, World};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

/// What a character does this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Stay put.
    Wait,
    /// Move one or two cells in one of eight directions.
    Explore,
    /// Move one or two cells in one of four directions.
    Wander,
    /// Look for food.
    SeekFood,
    /// Look for water.
    SeekWater,
    /// Recover energy.
    Rest,
    /// Start a conversation with a nearby character.
    Socialize {
        /// Partner.
        target: CharacterId,
    },
    /// Walk toward a character.
    SeekSocial {
        /// Who to approach.
        target: CharacterId,
    },
}

impl Action {
    /// Short machine-readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Wait => "wait",
            Self::Explore => "explore",
            Self::Wander => "wander",
            Self::SeekFood => "seek_food",
            Self::SeekWater => "seek_water",
            Self::Rest => "rest",
            Self::Socialize { .. } => "socialize",
            Self::SeekSocial { .. } => "seek_social",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An action and the human-readable reason behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    /// The chosen action.
    pub action: Action,
    /// Why, shown as the character's activity.
    pub reason: String,
}

impl Decision {
    fn new(action: Action, reason: impl Into<String>) -> Self {
        Self {
            action,
            reason: reason.into(),
        }
    }
}

const WAIT_REASONS: [&str; 4] = [
    "Durmayı tercih ediyor",
    "Çevreyi gözlemliyor",
    "Dinleniyor",
    "Düşünüyor",
];
const EXPLORE_REASONS: [&str; 4] = [
    "Meraklı bir ruh hali",
    "Keşfetmek istiyor",
    "Yeni yerler arıyor",
    "Macera peşinde",
];
const WANDER_REASONS: [&str; 4] = [
    "Biraz gezinmek istiyor",
    "Rastgele dolaşıyor",
    "Hafif aktivite",
    "Çevreye bakıyor",
];

/// Selects one action per character per tick.
#[derive(Debug, Clone, Default)]
pub struct DecisionEngine {
    config: DecisionConfig,
}

impl DecisionEngine {
    /// Create an engine with the given constants.
    #[must_use]
    pub fn new(config: DecisionConfig) -> Self {
        Self { config }
    }

    /// Active constants.
    #[must_use]
    pub fn config(&self) -> &DecisionConfig {
        &self.config
    }

    /// Decide what `character` does.
    ///
    /// `last_conversation` is when the character last finished talking; all
    /// randomness is drawn from `rng`.
    pub fn decide<R: Rng>(
        &self,
        character: &Character,
        world: &World,
        last_conversation: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Decision {
        if character.in_conversation() {
            let reason = match character
                .conversation_target()
                .and_then(|id| world.character(id))
            {
                Some(partner) => format!("{} ile konuşuyor", partner.name),
                None => "Konuşma halinde".to_string(),
            };
            return Decision::new(Action::Wait, reason);
        }

        let cfg = &self.config;
        let (need, value) = character.needs.priority();
        let nearby: Vec<CharacterId> = world
            .characters_near(character.position(), cfg.nearby_radius)
            .into_iter()
            .filter(|c| c.id != character.id && !c.in_conversation())
            .map(|c| c.id)
            .collect();

        if value < cfg.urgent_threshold {
            return self.urgent(character, world, need, &nearby);
        }

        let social = character.needs.social();

        if let Some(&target) = nearby.first() {
            let mut chat_chance = if social < 30.0 {
                cfg.chat_chance_lonely
            } else if social < 50.0 {
                cfg.chat_chance_low
            } else if social < 70.0 {
                cfg.chat_chance_moderate
            } else {
                0.0
            };
            if character.personality.is_social() {
                chat_chance += cfg.social_trait_bonus;
            }
            let rested = last_conversation.is_none_or(|at| {
                now.signed_duration_since(at) >= chrono::Duration::seconds(cfg.chat_cooldown_secs)
            });
            if rested && chance(rng, chat_chance) {
                return Decision::new(
                    Action::Socialize { target },
                    format!("Sosyallik: {}/100 - Konuşmak istiyor", social.round()),
                );
            }
        }

        if social < cfg.seek_social_below {
            if let Some(nearest) = world.nearest_free_character(character.id) {
                let distance = nearest.position().distance(character.position());
                let tolerance = if social < cfg.urgent_threshold {
                    cfg.proximity_lonely
                } else if social < 45.0 {
                    cfg.proximity_low
                } else {
                    cfg.proximity_default
                };
                if distance > tolerance {
                    return Decision::new(
                        Action::SeekSocial { target: nearest.id },
                        format!(
                            "{}'e yaklaşmak istiyor (sosyal: {})",
                            nearest.name,
                            social.round()
                        ),
                    );
                }
            }
        }

        self.weighted(character, world, rng)
    }

    fn urgent(
        &self,
        character: &Character,
        world: &World,
        need: NeedKind,
        nearby: &[CharacterId],
    ) -> Decision {
        match need {
            NeedKind::Hunger => Decision::new(Action::SeekFood, "Çok aç"),
            NeedKind::Thirst => Decision::new(Action::SeekWater, "Çok susuz"),
            NeedKind::Energy => Decision::new(Action::Rest, "Çok yorgun"),
            NeedKind::Social => {
                if let Some(&target) = nearby.first() {
                    Decision::new(Action::Socialize { target }, "Çok yalnız - acil sosyalleşme")
                } else if let Some(nearest) = world.nearest_free_character(character.id) {
                    Decision::new(
                        Action::SeekSocial { target: nearest.id },
                        "Çok yalnız - birine yaklaşmalı",
                    )
                } else {
                    Decision::new(Action::Explore, "Yalnız - birilerini arıyor")
                }
            }
        }
    }

    fn weighted<R: Rng>(&self, character: &Character, world: &World, rng: &mut R) -> Decision {
        let cfg = &self.config;
        let personality = &character.personality;
        let mut pool = vec![Action::Wait];

        if personality.is_active() {
            pool.extend([Action::Explore, Action::Wander, Action::Explore]);
        } else {
            pool.extend([Action::Wait, Action::Wait]);
        }
        if personality.is_cautious() {
            pool.extend([Action::Wait, Action::Wait, Action::Wait]);
        }

        let ceiling = f64::from(cfg.urgency_ceiling);
        for (need, value) in character.needs.iter() {
            if value >= cfg.urgency_ceiling {
                continue;
            }
            let urgency = (ceiling - f64::from(value)) / ceiling;
            match need {
                NeedKind::Hunger => {
                    if roll(rng) < urgency + cfg.hunger_offset {
                        pool.extend([Action::SeekFood, Action::SeekFood]);
                    }
                }
                NeedKind::Thirst => {
                    if roll(rng) < urgency + cfg.thirst_offset {
                        pool.extend([Action::SeekWater, Action::SeekWater]);
                    }
                }
                NeedKind::Energy => {
                    if roll(rng) < urgency + cfg.energy_offset {
                        pool.extend([Action::Rest, Action::Rest]);
                    }
                }
                NeedKind::Social => {
                    if roll(rng) < urgency + cfg.social_offset {
                        if let Some(target) = world.nearest_free_character(character.id) {
                            let seek = Action::SeekSocial { target: target.id };
                            pool.extend([seek, seek, seek]);
                        }
                    }
                }
            }
        }

        let action = pool.choose(rng).copied().unwrap_or(Action::Wait);
        Decision::new(action, self.reason_for(character, world, action, rng))
    }

    fn reason_for<R: Rng>(
        &self,
        character: &Character,
        world: &World,
        action: Action,
        rng: &mut R,
    ) -> String {
        let pick = |pool: &[&str], rng: &mut R| pool.choose(rng).copied().unwrap_or_default().to_string();
        match action {
            Action::Wait => {
                if chance(rng, 0.2) {
                    format!("{} kendini rahat hissediyor", character.name)
                } else {
                    pick(&WAIT_REASONS[..], rng)
                }
            }
            Action::Explore => pick(&EXPLORE_REASONS[..], rng),
            Action::Wander => pick(&WANDER_REASONS[..], rng),
            Action::SeekFood => format!("Açlık hissi {}/100", character.needs.hunger().round()),
            Action::SeekWater => format!("Susuzluk hissi {}/100", character.needs.thirst().round()),
            Action::Rest => format!("Yorgunluk hissi {}/100", character.needs.energy().round()),
            Action::SeekSocial { target } | Action::Socialize { target } => {
                let name = world.character(target).map_or("birine", |c| c.name.as_str());
                format!("{name} ile vakit geçirmek istiyor")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use hamlet_core::{Needs, Personality, Position, Terrain, Trait};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn open_world() -> World {
        World::from_grid(30, 30, vec![Terrain::Grass; 900], 12.0)
    }

    fn spawn(world: &mut World, traits: &[Trait], needs: Needs, at: Position) -> CharacterId {
        let mut rng = StdRng::seed_from_u64(1);
        let personality = Personality::new(traits.iter().copied(), ["x"], ["y"], ["z"]);
        let c = Character::new("c", personality, &mut rng).with_needs(needs);
        world.add_character(c, at).expect("spawn")
    }

    fn decide(world: &World, id: CharacterId, seed: u64) -> Decision {
        let engine = DecisionEngine::default();
        let mut rng = StdRng::seed_from_u64(seed);
        let c = world.character(id).expect("character");
        engine.decide(c, world, None, Utc::now(), &mut rng)
    }

    #[test]
    fn hungry_loner_seeks_food() {
        let mut world = open_world();
        let id = spawn(
            &mut world,
            &[Trait::Curious],
            Needs::new(25.0, 80.0, 80.0, 80.0),
            Position::new(5, 5),
        );
        for seed in 0..50 {
            let d = decide(&world, id, seed);
            assert_eq!(d.action, Action::SeekFood, "seed {seed}");
        }
    }

    #[test]
    fn claimed_character_waits() {
        let mut world = open_world();
        let a = spawn(&mut world, &[], Needs::new(10.0, 10.0, 10.0, 10.0), Position::new(1, 1));
        let b = spawn(&mut world, &[], Needs::default(), Position::new(2, 2));
        world.try_claim_conversation(a, b).expect("claim");
        assert_eq!(decide(&world, a, 3).action, Action::Wait);
    }

    #[test]
    fn urgent_social_prefers_nearby() {
        let mut world = open_world();
        let a = spawn(&mut world, &[], Needs::new(90.0, 90.0, 90.0, 10.0), Position::new(5, 5));
        let near = spawn(&mut world, &[], Needs::default(), Position::new(7, 5));
        spawn(&mut world, &[], Needs::default(), Position::new(20, 20));
        assert_eq!(decide(&world, a, 0).action, Action::Socialize { target: near });
    }

    #[test]
    fn urgent_social_walks_to_nearest_free() {
        let mut world = open_world();
        let a = spawn(&mut world, &[], Needs::new(90.0, 90.0, 90.0, 10.0), Position::new(0, 0));
        let far = spawn(&mut world, &[], Needs::default(), Position::new(10, 10));
        spawn(&mut world, &[], Needs::default(), Position::new(25, 25));
        assert_eq!(decide(&world, a, 0).action, Action::SeekSocial { target: far });
    }

    #[test]
    fn alone_and_lonely_explores() {
        let mut world = open_world();
        let a = spawn(&mut world, &[], Needs::new(90.0, 90.0, 90.0, 10.0), Position::new(0, 0));
        assert_eq!(decide(&world, a, 0).action, Action::Explore);
    }

    #[test]
    fn social_trait_makes_chat_certain_when_lonely() {
        // 0.5 base + 0.3 bonus is not certain, but 0.8 + 0.3 is.
        let mut world = open_world();
        let a = spawn(
            &mut world,
            &[Trait::Social],
            Needs::new(90.0, 90.0, 90.0, 31.0),
            Position::new(5, 5),
        );
        let b = spawn(&mut world, &[], Needs::default(), Position::new(6, 6));
        let engine = DecisionEngine::new(DecisionConfig {
            chat_chance_low: 0.8,
            ..DecisionConfig::default()
        });
        for seed in 0..30 {
            let mut rng = StdRng::seed_from_u64(seed);
            let c = world.character(a).expect("a");
            let d = engine.decide(c, &world, None, Utc::now(), &mut rng);
            assert_eq!(d.action, Action::Socialize { target: b });
        }
    }

    #[test]
    fn chat_respects_cooldown() {
        let mut world = open_world();
        let a = spawn(
            &mut world,
            &[Trait::Social],
            Needs::new(90.0, 90.0, 90.0, 40.0),
            Position::new(5, 5),
        );
        spawn(&mut world, &[], Needs::default(), Position::new(6, 6));
        let engine = DecisionEngine::new(DecisionConfig {
            chat_chance_low: 1.0,
            ..DecisionConfig::default()
        });
        let now = Utc::now();
        let c = world.character(a).expect("a");
        for seed in 0..30 {
            let mut rng = StdRng::seed_from_u64(seed);
            let d = engine.decide(c, &world, Some(now), now, &mut rng);
            assert!(!matches!(d.action, Action::Socialize { .. }));
        }
    }

    #[test]
    fn distant_company_is_sought() {
        let mut world = open_world();
        let a = spawn(&mut world, &[], Needs::new(90.0, 90.0, 90.0, 40.0), Position::new(0, 0));
        let b = spawn(&mut world, &[], Needs::default(), Position::new(6, 0));
        // social 40 tolerates 5 cells; b is 6 away.
        assert_eq!(decide(&world, a, 0).action, Action::SeekSocial { target: b });
    }

    #[test]
    fn content_cautious_character_mostly_waits() {
        let mut world = open_world();
        let a = spawn(
            &mut world,
            &[Trait::Cautious],
            Needs::new(100.0, 100.0, 100.0, 100.0),
            Position::new(5, 5),
        );
        for seed in 0..30 {
            assert_eq!(decide(&world, a, seed).action, Action::Wait);
        }
    }

    #[test]
    fn active_character_sometimes_moves() {
        let mut world = open_world();
        let a = spawn(
            &mut world,
            &[Trait::Brave],
            Needs::new(100.0, 100.0, 100.0, 100.0),
            Position::new(5, 5),
        );
        let moved = (0..100)
            .map(|seed| decide(&world, a, seed).action)
            .filter(|a| matches!(a, Action::Explore | Action::Wander))
            .count();
        assert!(moved > 40, "moved {moved}/100");
    }

    #[test]
    fn same_seed_same_decision() {
        let mut world = open_world();
        let a = spawn(
            &mut world,
            &[Trait::Curious],
            Needs::new(50.0, 45.0, 55.0, 65.0),
            Position::new(5, 5),
        );
        assert_eq!(decide(&world, a, 42), decide(&world, a, 42));
    }
}
