//! Turning a [`Decision`] into world changes.
//!
//! Execution runs under the world write lock and never awaits. Anything that
//! must be persisted afterwards (memories, events) or started asynchronously
//! (a conversation) is returned in an [`ActionOutcome`].

use chrono::{DateTime, Utc};
use hamlet_core::config::DecisionConfig;
use hamlet_core::memory::{MemoryKind, MemoryRecord, Quality};
use hamlet_core::persistence::{EventKind, EventRecord};
use hamlet_core::rng::chance;
use hamlet_core::{
    CharacterId, HamletError, NeedKind, ResourceKind, Result, Terrain, World,
};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::cooldown::Cooldowns;
use crate::decision::{Action, Decision};

const EIGHT_WAY: [(i32, i32); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (1, 1),
    (-1, 1),
    (1, -1),
];
const FOUR_WAY: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// What executing an action produced.
#[derive(Debug, Default)]
pub struct ActionOutcome {
    /// Memories added to the character, to be persisted.
    pub memories: Vec<MemoryRecord>,
    /// Events to log.
    pub events: Vec<EventRecord>,
    /// A conversation to start: `(initiator, target)`.
    pub conversation: Option<(CharacterId, CharacterId)>,
}

/// Applies decisions to the world.
#[derive(Debug, Clone, Default)]
pub struct ActionExecutor {
    config: DecisionConfig,
}

impl ActionExecutor {
    /// Create an executor.
    #[must_use]
    pub fn new(config: DecisionConfig) -> Self {
        Self { config }
    }

    /// Execute `decision` for character `id`.
    ///
    /// Invalid moves are not errors: the character just stays where it is.
    ///
    /// # Errors
    /// Returns `HamletError::CharacterNotFound` if `id` is not registered.
    pub fn execute<R: Rng>(
        &self,
        world: &mut World,
        id: CharacterId,
        decision: &Decision,
        cooldowns: &Cooldowns,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<ActionOutcome> {
        world
            .character_mut(id)
            .ok_or(HamletError::CharacterNotFound(id))?
            .set_activity(decision.reason.clone());

        let mut out = ActionOutcome::default();
        match decision.action {
            Action::Wait => {}
            Action::Explore => self.step_random(world, id, &EIGHT_WAY, 2, true, rng, &mut out),
            Action::Wander => self.step_random(world, id, &FOUR_WAY, 1, false, rng, &mut out),
            Action::SeekFood => self.seek_resource(world, id, ResourceKind::Food, rng, &mut out),
            Action::SeekWater => self.seek_resource(world, id, ResourceKind::Water, rng, &mut out),
            Action::Rest => self.rest(world, id, rng, &mut out),
            Action::Socialize { target } => out.conversation = Some((id, target)),
            Action::SeekSocial { target } => {
                self.approach(world, id, target, cooldowns, now, &mut out);
            }
        }

        if let Some(c) = world.character(id) {
            out.events.push(EventRecord::new(
                id,
                EventKind::Action,
                format!("{} {}", c.name, decision.reason),
                c.position(),
            ));
        }
        Ok(out)
    }

    fn step_random<R: Rng>(
        &self,
        world: &mut World,
        id: CharacterId,
        directions: &[(i32, i32)],
        stride: i32,
        observe: bool,
        rng: &mut R,
        out: &mut ActionOutcome,
    ) {
        let Some(from) = world.character(id).map(|c| c.position()) else {
            return;
        };
        let Some(&(dx, dy)) = directions.choose(rng) else {
            return;
        };
        let to = from.offset(dx * stride, dy * stride);
        match world.move_character(id, to) {
            Ok(at) => {
                if observe {
                    if let Some(terrain) = world.terrain_at(at) {
                        remember(
                            world,
                            id,
                            MemoryKind::Observation,
                            format!("{terrain} arazisini keşfetti"),
                            5,
                            out,
                        );
                    }
                }
            }
            Err(e) => debug!(character = %id, error = %e, "Step refused"),
        }
    }

    fn seek_resource<R: Rng>(
        &self,
        world: &mut World,
        id: CharacterId,
        kind: ResourceKind,
        rng: &mut R,
        out: &mut ActionOutcome,
    ) {
        let Some(character) = world.character(id) else {
            return;
        };
        let from = character.position();
        let known = character
            .memory
            .nearest_known_resource(kind, from)
            .map(|loc| loc.position());

        if let Some(target) = known {
            let arrived = from.chebyshev(target) <= 1;
            if world.in_bounds(target) && !arrived {
                match world.move_character(id, from.step_toward(target)) {
                    Ok(_) => remember(
                        world,
                        id,
                        MemoryKind::Movement,
                        format!("{kind} kaynağına doğru hareket etti"),
                        3,
                        out,
                    ),
                    Err(e) => {
                        debug!(character = %id, error = %e, "Path to known resource blocked");
                        self.step_random(world, id, &FOUR_WAY, 1, false, rng, out);
                    }
                }
                return;
            }
            if world.terrain_at(target).is_some_and(|t| t.provides(kind)) {
                if let Some(c) = world.character_mut(id) {
                    c.memory.remember_resource_location(kind, target, Quality::Good);
                }
                self.maybe_satisfy(world, id, kind, rng, out);
                return;
            }
            // Nothing there: forget it and search nearby.
            debug!(character = %id, at = %target, %kind, "Remembered resource is not there");
            if let Some(c) = world.character_mut(id) {
                c.memory.forget_resource_location(target);
            }
        }

        let site = world
            .find_resource_site(from, kind, self.config.search_radius)
            .filter(|_| chance(rng, self.config.travel_chance));
        let Some(site) = site else {
            if chance(rng, self.config.idle_wander_chance) {
                self.step_random(world, id, &FOUR_WAY, 1, false, rng, out);
            }
            return;
        };
        if let Err(e) = world.move_character(id, site.stand) {
            debug!(character = %id, error = %e, "Resource site unreachable");
            return;
        }
        if let Some(c) = world.character_mut(id) {
            c.memory
                .remember_resource_location(kind, site.resource, Quality::Good);
            out.events.push(EventRecord::new(
                id,
                EventKind::Discovery,
                format!(
                    "{} {} konumunda yeni {kind} kaynağı keşfetti",
                    c.name, site.resource
                ),
                site.stand,
            ));
        }
        self.maybe_satisfy(world, id, kind, rng, out);
    }

    fn maybe_satisfy<R: Rng>(
        &self,
        world: &mut World,
        id: CharacterId,
        kind: ResourceKind,
        rng: &mut R,
        out: &mut ActionOutcome,
    ) {
        let need = match kind {
            ResourceKind::Food => NeedKind::Hunger,
            ResourceKind::Water => NeedKind::Thirst,
            ResourceKind::Shelter => return,
        };
        if !chance(rng, self.config.satisfy_chance) {
            return;
        }
        let (min, max) = (self.config.satisfy_min, self.config.satisfy_max);
        let amount = if max > min { rng.gen_range(min..max) } else { min };
        let Some(c) = world.character_mut(id) else {
            return;
        };
        c.needs.satisfy(need, amount);
        let position = c.position();
        out.events.push(EventRecord::new(
            id,
            EventKind::NeedFulfilled,
            format!("{} {kind} ile {need} ihtiyacını giderdi", c.name),
            position,
        ));
        remember(
            world,
            id,
            MemoryKind::Event,
            format!("{kind} buldu ve biraz rahatlattı"),
            5,
            out,
        );
    }

    fn rest<R: Rng>(&self, world: &mut World, id: CharacterId, rng: &mut R, out: &mut ActionOutcome) {
        let Some(at) = world.character(id).map(|c| c.position()) else {
            return;
        };
        let terrain = world.terrain_at(at).unwrap_or(Terrain::Grass);
        let base = match terrain {
            Terrain::House => self.config.rest_house,
            Terrain::Grass => self.config.rest_grass,
            _ => self.config.rest_default,
        };
        let jitter = self.config.rest_jitter.abs();
        let amount = if jitter > 0.0 {
            base + rng.gen_range(-jitter..=jitter)
        } else {
            base
        };
        if let Some(c) = world.character_mut(id) {
            c.needs.satisfy(NeedKind::Energy, amount.max(0.0));
        }
        remember(
            world,
            id,
            MemoryKind::Event,
            format!("{terrain} arazisinde dinlendi"),
            3,
            out,
        );
    }

    fn approach(
        &self,
        world: &mut World,
        id: CharacterId,
        target: CharacterId,
        cooldowns: &Cooldowns,
        now: DateTime<Utc>,
        out: &mut ActionOutcome,
    ) {
        let (Some(me), Some(other)) = (world.character(id), world.character(target)) else {
            return;
        };
        let (from, goal, name) = (me.position(), other.position(), other.name.clone());
        if from != goal {
            match world.move_character(id, from.step_toward(goal)) {
                Ok(_) => remember(
                    world,
                    id,
                    MemoryKind::Movement,
                    format!("{name}'e doğru hareket etti"),
                    3,
                    out,
                ),
                Err(e) => debug!(character = %id, error = %e, "Approach step refused"),
            }
        }

        let (Some(me), Some(other)) = (world.character(id), world.character(target)) else {
            return;
        };
        let close = me.position().distance(other.position()) <= self.config.approach_start_distance;
        if close
            && !me.in_conversation()
            && !other.in_conversation()
            && cooldowns.ready(id, now, self.config.approach_cooldown_secs)
        {
            debug!(character = %id, target = %target, "Reached partner, starting conversation");
            out.conversation = Some((id, target));
        }
    }
}

fn remember(
    world: &mut World,
    id: CharacterId,
    kind: MemoryKind,
    content: String,
    importance: u8,
    out: &mut ActionOutcome,
) {
    if let Some(c) = world.character_mut(id) {
        out.memories.push(c.add_memory(kind, content, importance));
    }
}
