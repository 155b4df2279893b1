//! Personality profile: trait flags plus free-form interests, fears and goals.
//!
//! Traits are a closed set. Decisions branch on capability flags
//! ([`Personality::is_active`], [`Personality::is_social`],
//! [`Personality::is_cautious`]), never on string matching. The serialized
//! form keeps the village's own Turkish labels.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::HamletError;

/// A personality trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trait {
    /// Meraklı.
    #[serde(rename = "meraklı", alias = "curious")]
    Curious,
    /// Sosyal.
    #[serde(rename = "sosyal", alias = "social")]
    Social,
    /// Temkinli.
    #[serde(rename = "temkinli", alias = "cautious")]
    Cautious,
    /// Cesur.
    #[serde(rename = "cesur", alias = "brave")]
    Brave,
    /// Yaratıcı.
    #[serde(rename = "yaratıcı", alias = "creative")]
    Creative,
    /// Pratik.
    #[serde(rename = "pratik", alias = "practical")]
    Practical,
    /// Duygusal.
    #[serde(rename = "duygusal", alias = "emotional")]
    Emotional,
    /// Mantıklı.
    #[serde(rename = "mantıklı", alias = "logical")]
    Logical,
}

impl Trait {
    /// Every trait, in pool order.
    pub const ALL: [Self; 8] = [
        Self::Curious,
        Self::Social,
        Self::Cautious,
        Self::Brave,
        Self::Creative,
        Self::Practical,
        Self::Emotional,
        Self::Logical,
    ];

    /// The label used in prompts and persisted documents.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Curious => "meraklı",
            Self::Social => "sosyal",
            Self::Cautious => "temkinli",
            Self::Brave => "cesur",
            Self::Creative => "yaratıcı",
            Self::Practical => "pratik",
            Self::Emotional => "duygusal",
            Self::Logical => "mantıklı",
        }
    }

    fn english(self) -> &'static str {
        match self {
            Self::Curious => "curious",
            Self::Social => "social",
            Self::Cautious => "cautious",
            Self::Brave => "brave",
            Self::Creative => "creative",
            Self::Practical => "practical",
            Self::Emotional => "emotional",
            Self::Logical => "logical",
        }
    }
}

impl fmt::Display for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Trait {
    type Err = HamletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.label() == needle || t.english() == needle)
            .ok_or_else(|| HamletError::Config(format!("unknown personality trait: {s}")))
    }
}

/// Interests a random character may draw.
pub const INTEREST_POOL: [&str; 8] = [
    "keşif", "sanat", "teknoloji", "doğa", "müzik", "yemek", "spor", "okuma",
];

/// Fears a random character may draw.
pub const FEAR_POOL: [&str; 5] = ["karanlık", "yalnızlık", "yükseklik", "su", "bilinmeyen"];

/// Goals a random character may draw.
pub const GOAL_POOL: [&str; 5] = [
    "arkadaş edinme",
    "keşif yapma",
    "yaratıcı olma",
    "bilgi toplama",
    "güvenli alan bulma",
];

/// Fixed-at-creation personality of a character.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Personality {
    /// Trait flags.
    pub traits: Vec<Trait>,
    /// Topics the character likes to talk about.
    pub interests: Vec<String>,
    /// Things the character avoids.
    pub fears: Vec<String>,
    /// Long-running aims.
    pub goals: Vec<String>,
}

impl Personality {
    /// Build a personality from its parts.
    #[must_use]
    pub fn new(
        traits: impl IntoIterator<Item = Trait>,
        interests: impl IntoIterator<Item = impl Into<String>>,
        fears: impl IntoIterator<Item = impl Into<String>>,
        goals: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut unique = Vec::new();
        for t in traits {
            if !unique.contains(&t) {
                unique.push(t);
            }
        }
        Self {
            traits: unique,
            interests: interests.into_iter().map(Into::into).collect(),
            fears: fears.into_iter().map(Into::into).collect(),
            goals: goals.into_iter().map(Into::into).collect(),
        }
    }

    /// Draw three traits, two interests, one fear and two goals from the pools.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let traits = Trait::ALL.choose_multiple(rng, 3).copied().collect::<Vec<_>>();
        let interests = INTEREST_POOL.choose_multiple(rng, 2).copied().collect::<Vec<_>>();
        let fears = FEAR_POOL.choose_multiple(rng, 1).copied().collect::<Vec<_>>();
        let goals = GOAL_POOL.choose_multiple(rng, 2).copied().collect::<Vec<_>>();
        Self::new(traits, interests, fears, goals)
    }

    /// Whether the trait is present.
    #[must_use]
    pub fn has(&self, t: Trait) -> bool {
        self.traits.contains(&t)
    }

    /// Curious or brave characters prefer moving around to idling.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.has(Trait::Curious) || self.has(Trait::Brave)
    }

    /// Social characters are more eager to start conversations.
    #[must_use]
    pub fn is_social(&self) -> bool {
        self.has(Trait::Social)
    }

    /// Cautious characters idle more.
    #[must_use]
    pub fn is_cautious(&self) -> bool {
        self.has(Trait::Cautious)
    }

    /// Comma-separated trait labels, for prompts.
    #[must_use]
    pub fn trait_labels(&self) -> String {
        self.traits
            .iter()
            .map(|t| t.label())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn flags_follow_traits() {
        let p = Personality::new(
            [Trait::Brave, Trait::Cautious],
            ["doğa"],
            Vec::<String>::new(),
            Vec::<String>::new(),
        );
        assert!(p.is_active());
        assert!(p.is_cautious());
        assert!(!p.is_social());
    }

    #[test]
    fn parses_both_label_sets() {
        assert_eq!("meraklı".parse::<Trait>().expect("turkish"), Trait::Curious);
        assert_eq!("Brave".parse::<Trait>().expect("english"), Trait::Brave);
        assert!("grumpy".parse::<Trait>().is_err());
    }

    #[test]
    fn serializes_with_village_labels() {
        let json = serde_json::to_string(&Trait::Social).expect("serialize");
        assert_eq!(json, "\"sosyal\"");
        let back: Trait = serde_json::from_str("\"cautious\"").expect("alias");
        assert_eq!(back, Trait::Cautious);
    }

    #[test]
    fn random_draws_pool_sizes() {
        let mut rng = StdRng::seed_from_u64(3);
        let p = Personality::random(&mut rng);
        assert_eq!(p.traits.len(), 3);
        assert_eq!(p.interests.len(), 2);
        assert_eq!(p.fears.len(), 1);
        assert_eq!(p.goals.len(), 2);
    }

    #[test]
    fn duplicate_traits_collapse() {
        let p = Personality::new(
            [Trait::Social, Trait::Social],
            Vec::<String>::new(),
            Vec::<String>::new(),
            Vec::<String>::new(),
        );
        assert_eq!(p.traits, vec![Trait::Social]);
    }
}
