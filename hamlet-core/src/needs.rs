//! Physiological and social needs of a character.
//!
//! Each need lives in `[0, 100]`: 100 is fully satisfied, 0 is desperate.
//! Needs decay linearly with simulated time and are restored by actions.
//! Every mutation goes through a clamping setter, so out-of-range values are
//! unreachable.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::NeedsConfig;

/// Upper bound of every need.
pub const NEED_MAX: f32 = 100.0;

/// One of the four needs. The declaration order is the tie-break order for
/// [`Needs::priority`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeedKind {
    /// Food.
    Hunger,
    /// Water.
    Thirst,
    /// Rest.
    Energy,
    /// Company.
    Social,
}

impl NeedKind {
    /// All needs in tie-break order.
    pub const ALL: [Self; 4] = [Self::Hunger, Self::Thirst, Self::Energy, Self::Social];
}

impl fmt::Display for NeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hunger => write!(f, "hunger"),
            Self::Thirst => write!(f, "thirst"),
            Self::Energy => write!(f, "energy"),
            Self::Social => write!(f, "social"),
        }
    }
}

/// The four need values of a character.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Needs {
    hunger: f32,
    thirst: f32,
    energy: f32,
    social: f32,
}

impl Needs {
    /// Create needs, clamping every value into `[0, 100]`.
    #[must_use]
    pub fn new(hunger: f32, thirst: f32, energy: f32, social: f32) -> Self {
        Self {
            hunger: clamp_need(hunger),
            thirst: clamp_need(thirst),
            energy: clamp_need(energy),
            social: clamp_need(social),
        }
    }

    /// Current value of `kind`.
    #[must_use]
    pub fn get(&self, kind: NeedKind) -> f32 {
        match kind {
            NeedKind::Hunger => self.hunger,
            NeedKind::Thirst => self.thirst,
            NeedKind::Energy => self.energy,
            NeedKind::Social => self.social,
        }
    }

    /// Set `kind` to `value`, clamped into `[0, 100]`.
    pub fn set(&mut self, kind: NeedKind, value: f32) {
        let value = clamp_need(value);
        match kind {
            NeedKind::Hunger => self.hunger = value,
            NeedKind::Thirst => self.thirst = value,
            NeedKind::Energy => self.energy = value,
            NeedKind::Social => self.social = value,
        }
    }

    /// Add `amount` to `kind`, capped at 100.
    pub fn satisfy(&mut self, kind: NeedKind, amount: f32) {
        self.set(kind, self.get(kind) + amount.max(0.0));
    }

    /// Hunger value.
    #[must_use]
    pub fn hunger(&self) -> f32 {
        self.hunger
    }

    /// Thirst value.
    #[must_use]
    pub fn thirst(&self) -> f32 {
        self.thirst
    }

    /// Energy value.
    #[must_use]
    pub fn energy(&self) -> f32 {
        self.energy
    }

    /// Social value.
    #[must_use]
    pub fn social(&self) -> f32 {
        self.social
    }

    /// Apply `elapsed` simulated time of decay. Never raises a value and never
    /// drops one below zero.
    pub fn decay(&mut self, elapsed: Duration, rates: &NeedsConfig) {
        let hours = elapsed.as_secs_f64() / 3600.0;
        #[allow(clippy::cast_possible_truncation)]
        let h = hours as f32;
        self.hunger = (self.hunger - rates.hunger_per_hour.max(0.0) * h).max(0.0);
        self.thirst = (self.thirst - rates.thirst_per_hour.max(0.0) * h).max(0.0);
        self.energy = (self.energy - rates.energy_per_hour.max(0.0) * h).max(0.0);
        self.social = (self.social - rates.social_per_hour.max(0.0) * h).max(0.0);
    }

    /// The most pressing need: the minimum value, ties broken by
    /// hunger, thirst, energy, social.
    #[must_use]
    pub fn priority(&self) -> (NeedKind, f32) {
        let mut best = (NeedKind::Hunger, self.hunger);
        for kind in &NeedKind::ALL[1..] {
            let value = self.get(*kind);
            if value < best.1 {
                best = (*kind, value);
            }
        }
        best
    }

    /// All needs with their values, in tie-break order.
    #[must_use]
    pub fn iter(&self) -> [(NeedKind, f32); 4] {
        NeedKind::ALL.map(|kind| (kind, self.get(kind)))
    }
}

impl Default for Needs {
    fn default() -> Self {
        Self::new(NEED_MAX, NEED_MAX, NEED_MAX, NEED_MAX)
    }
}

fn clamp_need(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, NEED_MAX)
    }
}
