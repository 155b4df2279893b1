//! Error types for the hamlet core library.

use thiserror::Error;

use crate::types::{CharacterId, ConversationId};

/// Top-level error type for all hamlet state operations.
#[derive(Error, Debug)]
pub enum HamletError {
    /// No character with the given ID is registered in the world.
    #[error("Character not found: {0}")]
    CharacterNotFound(CharacterId),

    /// A move targeted a cell that is out of bounds or not walkable.
    /// No state was mutated.
    #[error("Invalid move to ({x}, {y}): {reason}")]
    InvalidMove {
        /// Target column.
        x: i32,
        /// Target row.
        y: i32,
        /// Why the move was refused.
        reason: String,
    },

    /// A conversation claim was refused because a participant is unavailable.
    #[error("Conversation claim refused for {character}: {reason}")]
    ConversationClaim {
        /// The participant that could not be claimed.
        character: CharacterId,
        /// Why the claim was refused.
        reason: String,
    },

    /// No conversation with the given ID exists.
    #[error("Conversation not found: {0}")]
    ConversationNotFound(ConversationId),

    /// The conversation has finished its turn loop and no longer accepts messages.
    #[error("Conversation closed: {0}")]
    ConversationClosed(ConversationId),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, HamletError>;
