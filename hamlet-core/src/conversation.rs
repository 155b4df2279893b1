//! Conversation records and their lifecycle phases.
//!
//! A conversation is created when the orchestrator claims a pair, grows by
//! one message per turn and is frozen once the turn loop ends. Finished
//! conversations stay around for history.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{HamletError, Result};
use crate::types::{CharacterId, ConversationId};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// A participant.
    Character,
    /// A human observer.
    User,
    /// The simulation itself.
    System,
}

/// One line of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The speaking participant. `None` for user and system messages.
    pub speaker_id: Option<CharacterId>,
    /// Display name of the speaker.
    pub speaker_name: String,
    /// Text.
    pub content: String,
    /// When it was said.
    pub timestamp: DateTime<Utc>,
    /// Origin.
    pub kind: MessageKind,
}

/// Where a conversation is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ConversationPhase {
    /// Not started.
    Idle,
    /// Claiming the participants.
    Initiating,
    /// Exchanging turns.
    TurnLoop {
        /// Zero-based index of the running turn.
        turn: u32,
    },
    /// Releasing the claim.
    Releasing,
    /// Finished normally.
    Done,
    /// Aborted after a generator failure.
    Failed,
}

impl ConversationPhase {
    /// Whether the conversation can still change.
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::Idle | Self::Initiating | Self::TurnLoop { .. })
    }

    /// Whether the lifecycle has ended.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for ConversationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Initiating => write!(f, "initiating"),
            Self::TurnLoop { turn } => write!(f, "turn {turn}"),
            Self::Releasing => write!(f, "releasing"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A two-party conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique ID.
    pub id: ConversationId,
    /// Initiator first, then the target.
    pub participants: [CharacterId; 2],
    /// Messages in order.
    pub messages: Vec<Message>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time of the latest message.
    pub last_message: Option<DateTime<Utc>>,
    /// Lifecycle phase.
    pub phase: ConversationPhase,
}

impl Conversation {
    /// A fresh conversation in the `Initiating` phase.
    #[must_use]
    pub fn new(initiator: CharacterId, target: CharacterId) -> Self {
        Self {
            id: ConversationId::new(),
            participants: [initiator, target],
            messages: Vec::new(),
            created_at: Utc::now(),
            last_message: None,
            phase: ConversationPhase::Initiating,
        }
    }

    /// Whether `id` takes part.
    #[must_use]
    pub fn involves(&self, id: CharacterId) -> bool {
        self.participants.contains(&id)
    }

    /// Append a message.
    ///
    /// # Errors
    /// Returns `HamletError::ConversationClosed` once the turn loop has ended.
    pub fn push(
        &mut self,
        speaker_id: Option<CharacterId>,
        speaker_name: impl Into<String>,
        content: impl Into<String>,
        kind: MessageKind,
    ) -> Result<&Message> {
        if !self.phase.is_open() {
            return Err(HamletError::ConversationClosed(self.id));
        }
        let now = Utc::now();
        self.messages.push(Message {
            speaker_id,
            speaker_name: speaker_name.into(),
            content: content.into(),
            timestamp: now,
            kind,
        });
        self.last_message = Some(now);
        self.messages
            .last()
            .ok_or(HamletError::ConversationClosed(self.id))
    }

    /// Move to `phase`. A terminal phase is never left.
    pub fn transition(&mut self, phase: ConversationPhase) {
        if !self.phase.is_terminal() {
            self.phase = phase;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_conversation_rejects_messages() {
        let a = CharacterId::new();
        let b = CharacterId::new();
        let mut convo = Conversation::new(a, b);
        convo
            .push(Some(a), "Ahmet", "Merhaba!", MessageKind::Character)
            .expect("open");
        assert!(convo.last_message.is_some());

        convo.transition(ConversationPhase::Releasing);
        let err = convo
            .push(None, "user", "hello?", MessageKind::User)
            .expect_err("closed");
        assert!(matches!(err, HamletError::ConversationClosed(id) if id == convo.id));
        assert_eq!(convo.messages.len(), 1);
    }

    #[test]
    fn terminal_phase_is_sticky() {
        let mut convo = Conversation::new(CharacterId::new(), CharacterId::new());
        convo.transition(ConversationPhase::Failed);
        convo.transition(ConversationPhase::Done);
        assert_eq!(convo.phase, ConversationPhase::Failed);
    }
}
