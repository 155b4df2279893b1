//! The world model: terrain grid, character registry and day/night clock.
//!
//! The [`World`] exclusively owns every [`Character`]. Positions change only
//! through [`World::move_character`], which refuses non-walkable or
//! out-of-bounds targets without side effects, and the conversation lock
//! fields change only through [`World::try_claim_conversation`] and
//! [`World::release_conversation`]. Callers that share a world across tasks
//! wrap it in a lock and perform each claim under a single write guard,
//! which makes the pair claim one indivisible check-and-set.

pub mod terrain;

pub use terrain::{Terrain, generate_grid};

use std::time::Duration;

use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::character::Character;
use crate::config::WorldConfig;
use crate::error::{HamletError, Result};
use crate::types::{CharacterId, Position, ResourceKind, TimeOfDay};

/// Where a resource was found and where to stand to use it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceSite {
    /// The cell holding the resource.
    pub resource: Position,
    /// A walkable cell at or next to `resource`.
    pub stand: Position,
}

/// An axis-aligned inclusive cell rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Top-left corner.
    pub min: Position,
    /// Bottom-right corner.
    pub max: Position,
}

/// The shared grid world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    width: i32,
    height: i32,
    grid: Vec<Terrain>,
    characters: IndexMap<CharacterId, Character>,
    time_of_day: TimeOfDay,
    hours_into_phase: f64,
    hours_per_phase: f64,
}

impl World {
    /// Generate a fresh world from `config`.
    pub fn generate<R: Rng>(config: &WorldConfig, rng: &mut R) -> Self {
        let width = i32::try_from(config.width).unwrap_or(i32::MAX).max(1);
        let height = i32::try_from(config.height).unwrap_or(i32::MAX).max(1);
        let grid = generate_grid(width, height, config.border_width, rng);
        debug!(width, height, "Generated terrain grid");
        Self::from_grid(width, height, grid, config.hours_per_phase)
    }

    /// Build a world around an existing row-major grid.
    ///
    /// A grid shorter than `width * height` is padded with mountain.
    #[must_use]
    pub fn from_grid(width: i32, height: i32, mut grid: Vec<Terrain>, hours_per_phase: f64) -> Self {
        let cells = usize::try_from(width.max(0) * height.max(0)).unwrap_or(0);
        grid.resize(cells, Terrain::Mountain);
        Self {
            width: width.max(0),
            height: height.max(0),
            grid,
            characters: IndexMap::new(),
            time_of_day: TimeOfDay::Day,
            hours_into_phase: 0.0,
            hours_per_phase: if hours_per_phase > 0.0 { hours_per_phase } else { 12.0 },
        }
    }

    /// Grid width.
    #[must_use]
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Grid height.
    #[must_use]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Row-major terrain cells.
    #[must_use]
    pub fn grid(&self) -> &[Terrain] {
        &self.grid
    }

    /// Current phase.
    #[must_use]
    pub fn time_of_day(&self) -> TimeOfDay {
        self.time_of_day
    }

    // -----------------------------------------------------------------------
    // Terrain queries
    // -----------------------------------------------------------------------

    /// Whether `pos` lies in `[0, width) x [0, height)`.
    #[must_use]
    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    /// Terrain at `pos`, or `None` when out of bounds.
    #[must_use]
    pub fn terrain_at(&self, pos: Position) -> Option<Terrain> {
        if !self.in_bounds(pos) {
            return None;
        }
        let idx = usize::try_from(pos.y * self.width + pos.x).ok()?;
        self.grid.get(idx).copied()
    }

    /// Whether a character may stand on `pos`.
    #[must_use]
    pub fn is_walkable(&self, pos: Position) -> bool {
        self.terrain_at(pos).is_some_and(Terrain::is_walkable)
    }

    /// Search outward ring by ring (Chebyshev radius 1 to `radius`) for the
    /// first cell that provides `kind`. Walkable matches are stood on
    /// directly; non-walkable ones (water) are used from the walkable
    /// neighbour closest to `from`.
    #[must_use]
    pub fn find_resource_site(
        &self,
        from: Position,
        kind: ResourceKind,
        radius: i32,
    ) -> Option<ResourceSite> {
        for r in 1..=radius.max(0) {
            for dx in -r..=r {
                for dy in -r..=r {
                    if dx.abs() != r && dy.abs() != r {
                        continue;
                    }
                    let cell = from.offset(dx, dy);
                    let Some(terrain) = self.terrain_at(cell) else {
                        continue;
                    };
                    if !terrain.provides(kind) {
                        continue;
                    }
                    if terrain.is_walkable() {
                        return Some(ResourceSite {
                            resource: cell,
                            stand: cell,
                        });
                    }
                    if let Some(stand) = self.walkable_neighbour(cell, from) {
                        return Some(ResourceSite {
                            resource: cell,
                            stand,
                        });
                    }
                }
            }
        }
        None
    }

    /// The walkable cell adjacent to `cell` that is closest to `toward`.
    #[must_use]
    pub fn walkable_neighbour(&self, cell: Position, toward: Position) -> Option<Position> {
        let mut best: Option<(Position, f64)> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let n = cell.offset(dx, dy);
                if !self.is_walkable(n) {
                    continue;
                }
                let d = n.distance(toward);
                if best.is_none_or(|(_, bd)| d < bd) {
                    best = Some((n, d));
                }
            }
        }
        best.map(|(p, _)| p)
    }

    /// A uniformly drawn walkable cell inside `region` (clipped to the grid),
    /// or anywhere on the grid when the region holds none.
    pub fn random_walkable_position<R: Rng>(
        &self,
        rng: &mut R,
        region: Option<Region>,
    ) -> Option<Position> {
        let full = Region {
            min: Position::new(0, 0),
            max: Position::new(self.width - 1, self.height - 1),
        };
        if let Some(r) = region {
            let cells = self.walkable_cells(r);
            if !cells.is_empty() {
                return Some(cells[rng.gen_range(0..cells.len())]);
            }
        }
        let cells = self.walkable_cells(full);
        if cells.is_empty() {
            None
        } else {
            Some(cells[rng.gen_range(0..cells.len())])
        }
    }

    fn walkable_cells(&self, region: Region) -> Vec<Position> {
        let (x0, x1) = (region.min.x.max(0), region.max.x.min(self.width - 1));
        let (y0, y1) = (region.min.y.max(0), region.max.y.min(self.height - 1));
        (y0..=y1)
            .flat_map(|y| (x0..=x1).map(move |x| Position::new(x, y)))
            .filter(|p| self.is_walkable(*p))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Character registry
    // -----------------------------------------------------------------------

    /// Register `character` at `at`.
    ///
    /// # Errors
    /// Returns `HamletError::InvalidMove` if `at` is not walkable.
    pub fn add_character(&mut self, mut character: Character, at: Position) -> Result<CharacterId> {
        self.validate_target(at)?;
        character.position = at;
        character.in_conversation = false;
        character.conversation_target = None;
        let id = character.id;
        self.characters.insert(id, character);
        Ok(id)
    }

    /// Look up a character.
    #[must_use]
    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.characters.get(&id)
    }

    /// Look up a character for mutation of its needs, memory or activity.
    pub fn character_mut(&mut self, id: CharacterId) -> Option<&mut Character> {
        self.characters.get_mut(&id)
    }

    /// All characters in registration order.
    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    /// All characters, mutably, in registration order.
    pub fn characters_mut(&mut self) -> impl Iterator<Item = &mut Character> {
        self.characters.values_mut()
    }

    /// All character IDs in registration order.
    #[must_use]
    pub fn character_ids(&self) -> Vec<CharacterId> {
        self.characters.keys().copied().collect()
    }

    /// Number of registered characters.
    #[must_use]
    pub fn character_count(&self) -> usize {
        self.characters.len()
    }

    /// Every character within Euclidean `radius` of `pos`, inclusive.
    #[must_use]
    pub fn characters_near(&self, pos: Position, radius: f64) -> Vec<&Character> {
        self.characters
            .values()
            .filter(|c| c.position.distance(pos) <= radius)
            .collect()
    }

    /// The character nearest to `id` that is not in a conversation.
    #[must_use]
    pub fn nearest_free_character(&self, id: CharacterId) -> Option<&Character> {
        let origin = self.characters.get(&id)?.position;
        let mut best: Option<(&Character, f64)> = None;
        for c in self.characters.values() {
            if c.id == id || c.in_conversation {
                continue;
            }
            let d = c.position.distance(origin);
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((c, d));
            }
        }
        best.map(|(c, _)| c)
    }

    // -----------------------------------------------------------------------
    // Movement
    // -----------------------------------------------------------------------

    /// Move a character to `to`. On failure nothing changes.
    ///
    /// # Errors
    /// Returns `HamletError::CharacterNotFound` for an unknown ID and
    /// `HamletError::InvalidMove` for an out-of-bounds or blocked target.
    pub fn move_character(&mut self, id: CharacterId, to: Position) -> Result<Position> {
        self.validate_target(to)?;
        let character = self
            .characters
            .get_mut(&id)
            .ok_or(HamletError::CharacterNotFound(id))?;
        character.position = to;
        Ok(to)
    }

    fn validate_target(&self, to: Position) -> Result<()> {
        match self.terrain_at(to) {
            None => Err(HamletError::InvalidMove {
                x: to.x,
                y: to.y,
                reason: "out of bounds".to_string(),
            }),
            Some(t) if !t.is_walkable() => Err(HamletError::InvalidMove {
                x: to.x,
                y: to.y,
                reason: format!("{t} is not walkable"),
            }),
            Some(_) => Ok(()),
        }
    }

    // -----------------------------------------------------------------------
    // Clock
    // -----------------------------------------------------------------------

    /// Advance the in-world clock. The phase toggles once per
    /// `hours_per_phase` accumulated hours. Returns `true` if it toggled.
    pub fn advance_clock(&mut self, elapsed: Duration) -> bool {
        self.hours_into_phase += elapsed.as_secs_f64() / 3600.0;
        let mut toggled = false;
        while self.hours_into_phase >= self.hours_per_phase {
            self.hours_into_phase -= self.hours_per_phase;
            self.time_of_day = self.time_of_day.toggled();
            toggled = !toggled;
        }
        if toggled {
            debug!(time_of_day = %self.time_of_day, "Day/night phase changed");
        }
        toggled
    }

    // -----------------------------------------------------------------------
    // Conversation claim
    // -----------------------------------------------------------------------

    /// Claim `initiator` and `target` for a conversation with each other.
    ///
    /// The check and the set happen in one `&mut self` call: either both
    /// lock fields are set (mutually pointing at each other) or nothing
    /// changes.
    ///
    /// # Errors
    /// Returns `HamletError::CharacterNotFound` if either is unknown and
    /// `HamletError::ConversationClaim` if they are the same character or
    /// either is already claimed.
    pub fn try_claim_conversation(
        &mut self,
        initiator: CharacterId,
        target: CharacterId,
    ) -> Result<()> {
        if initiator == target {
            return Err(HamletError::ConversationClaim {
                character: target,
                reason: "cannot converse with oneself".to_string(),
            });
        }
        for id in [initiator, target] {
            let c = self
                .characters
                .get(&id)
                .ok_or(HamletError::CharacterNotFound(id))?;
            if c.in_conversation {
                return Err(HamletError::ConversationClaim {
                    character: id,
                    reason: format!("{} is already in a conversation", c.name),
                });
            }
        }
        for (id, partner) in [(initiator, target), (target, initiator)] {
            if let Some(c) = self.characters.get_mut(&id) {
                c.in_conversation = true;
                c.conversation_target = Some(partner);
            }
        }
        Ok(())
    }

    /// Release a claim taken by [`Self::try_claim_conversation`]. Each side
    /// is cleared only if it still points at the other, so releasing twice
    /// is harmless.
    pub fn release_conversation(&mut self, a: CharacterId, b: CharacterId) {
        for (id, partner) in [(a, b), (b, a)] {
            if let Some(c) = self.characters.get_mut(&id) {
                if c.conversation_target == Some(partner) {
                    c.in_conversation = false;
                    c.conversation_target = None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::personality::Personality;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// 5x5 grass with a mountain at (2,2) and water at (4,4).
    fn small_world() -> World {
        let mut grid = vec![Terrain::Grass; 25];
        grid[2 * 5 + 2] = Terrain::Mountain;
        grid[4 * 5 + 4] = Terrain::Water;
        World::from_grid(5, 5, grid, 12.0)
    }

    fn spawn(world: &mut World, name: &str, at: Position) -> CharacterId {
        let mut rng = StdRng::seed_from_u64(0);
        let c = Character::new(name, Personality::default(), &mut rng);
        world.add_character(c, at).expect("walkable spawn")
    }

    #[test]
    fn terrain_queries() {
        let world = small_world();
        assert_eq!(world.terrain_at(Position::new(2, 2)), Some(Terrain::Mountain));
        assert_eq!(world.terrain_at(Position::new(-1, 0)), None);
        assert_eq!(world.terrain_at(Position::new(5, 0)), None);
        assert!(!world.is_walkable(Position::new(4, 4)));
        assert!(world.is_walkable(Position::new(0, 0)));
    }

    #[test]
    fn failed_move_leaves_position() {
        let mut world = small_world();
        let id = spawn(&mut world, "Ahmet", Position::new(1, 1));

        assert!(world.move_character(id, Position::new(2, 2)).is_err());
        assert!(world.move_character(id, Position::new(9, 9)).is_err());
        assert_eq!(world.character(id).expect("exists").position(), Position::new(1, 1));

        world.move_character(id, Position::new(1, 2)).expect("grass");
        assert_eq!(world.character(id).expect("exists").position(), Position::new(1, 2));
    }

    #[test]
    fn spawn_on_blocked_cell_is_refused() {
        let mut world = small_world();
        let mut rng = StdRng::seed_from_u64(0);
        let c = Character::new("Fatma", Personality::default(), &mut rng);
        assert!(matches!(
            world.add_character(c, Position::new(2, 2)),
            Err(HamletError::InvalidMove { .. })
        ));
        assert_eq!(world.character_count(), 0);
    }

    #[test]
    fn near_is_inclusive() {
        let mut world = small_world();
        spawn(&mut world, "A", Position::new(0, 0));
        spawn(&mut world, "B", Position::new(3, 0));
        spawn(&mut world, "C", Position::new(4, 0));
        assert_eq!(world.characters_near(Position::new(0, 0), 3.0).len(), 2);
    }

    #[test]
    fn clock_toggles_every_twelve_hours() {
        let mut world = small_world();
        assert!(!world.advance_clock(Duration::from_secs(11 * 3600)));
        assert_eq!(world.time_of_day(), TimeOfDay::Day);
        assert!(world.advance_clock(Duration::from_secs(2 * 3600)));
        assert_eq!(world.time_of_day(), TimeOfDay::Night);
        world.advance_clock(Duration::from_secs(24 * 3600));
        assert_eq!(world.time_of_day(), TimeOfDay::Night);
    }

    #[test]
    fn claim_is_exclusive_and_symmetric() {
        let mut world = small_world();
        let a = spawn(&mut world, "A", Position::new(0, 0));
        let b = spawn(&mut world, "B", Position::new(1, 0));
        let c = spawn(&mut world, "C", Position::new(0, 1));

        world.try_claim_conversation(a, b).expect("both free");
        assert_eq!(world.character(a).expect("a").conversation_target(), Some(b));
        assert_eq!(world.character(b).expect("b").conversation_target(), Some(a));

        assert!(world.try_claim_conversation(c, b).is_err());
        assert!(!world.character(c).expect("c").in_conversation());

        world.release_conversation(a, b);
        world.release_conversation(a, b);
        assert!(!world.character(a).expect("a").in_conversation());
        world.try_claim_conversation(c, b).expect("b released");
    }

    #[test]
    fn self_claim_refused() {
        let mut world = small_world();
        let a = spawn(&mut world, "A", Position::new(0, 0));
        assert!(world.try_claim_conversation(a, a).is_err());
        assert!(!world.character(a).expect("a").in_conversation());
    }

    #[test]
    fn water_is_used_from_a_neighbour() {
        let world = small_world();
        let site = world
            .find_resource_site(Position::new(2, 4), ResourceKind::Water, 5)
            .expect("water nearby");
        assert_eq!(site.resource, Position::new(4, 4));
        assert!(world.is_walkable(site.stand));
        assert_eq!(site.stand.chebyshev(site.resource), 1);
    }

    #[test]
    fn nearest_free_skips_busy() {
        let mut world = small_world();
        let a = spawn(&mut world, "A", Position::new(0, 0));
        let b = spawn(&mut world, "B", Position::new(1, 0));
        let c = spawn(&mut world, "C", Position::new(3, 3));
        let d = spawn(&mut world, "D", Position::new(1, 1));
        world.try_claim_conversation(b, d).expect("claim");
        assert_eq!(world.nearest_free_character(a).map(|ch| ch.id), Some(c));
    }
}
