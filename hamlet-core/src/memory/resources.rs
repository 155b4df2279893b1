//! Remembered resource locations and knowledge learned from other characters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Position, ResourceKind};

/// How trustworthy a remembered resource location is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    /// Seen first-hand.
    Good,
    /// Heard from another character.
    Shared,
    /// Not assessed.
    Unknown,
}

/// A remembered coordinate of a consumable resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLocation {
    /// What can be found there.
    pub kind: ResourceKind,
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
    /// Trustworthiness.
    pub quality: Quality,
    /// When the entry was first created.
    pub discovered_at: DateTime<Utc>,
    /// Name of the character this was learned from. `None` for self-discovery.
    pub source: Option<String>,
    /// Number of first-hand visits. Zero for hearsay.
    pub times_visited: u32,
}

impl ResourceLocation {
    /// The remembered cell.
    #[must_use]
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    /// `true` if this entry came from the character's own visit.
    #[must_use]
    pub fn is_self_discovered(&self) -> bool {
        self.source.is_none()
    }
}

/// Payload of a piece of shared knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SharedPayload {
    /// A resource at a coordinate.
    Resource {
        /// Resource kind.
        kind: ResourceKind,
        /// Column.
        x: i32,
        /// Row.
        y: i32,
        /// The utterance it was extracted from.
        content: String,
    },
    /// Anything else worth remembering that was said.
    General {
        /// The utterance.
        content: String,
    },
}

/// One entry of the append-only shared-information log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedInformation {
    /// Who said it.
    pub source: String,
    /// What was learned.
    pub payload: SharedPayload,
    /// When it was heard.
    pub timestamp: DateTime<Utc>,
}

/// One entry of the append-only discovery log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discovery {
    /// What was found.
    pub kind: ResourceKind,
    /// Where.
    pub position: Position,
    /// When.
    pub timestamp: DateTime<Utc>,
}
