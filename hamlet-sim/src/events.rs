//! Outbound events for UIs and transports.
//!
//! Everything is serialisable as JSON with a `type` tag, so a transport can
//! forward events without knowing their shape.

use hamlet_core::{
    Character, CharacterId, Conversation, ConversationId, ConversationPhase, Message, Needs,
    Personality, Position, TimeOfDay, World,
};
use serde::Serialize;

/// A change a subscriber may want to render.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    /// The full world state after a tick.
    WorldUpdate(WorldSnapshot),
    /// A single character changed outside the tick (a user move).
    CharacterUpdate(CharacterSnapshot),
    /// A conversation was claimed and created.
    ConversationStarted {
        /// The new conversation.
        conversation: Conversation,
    },
    /// A message was appended to a conversation.
    NewMessage {
        /// Which conversation.
        conversation_id: ConversationId,
        /// The message.
        message: Message,
    },
    /// A conversation reached a terminal phase.
    ConversationEnded {
        /// Which conversation.
        conversation_id: ConversationId,
        /// `Done` or `Failed`.
        phase: ConversationPhase,
    },
    /// The pause flag changed.
    SimulationStateChanged {
        /// New pause flag.
        paused: bool,
    },
    /// The speed multiplier changed.
    SpeedChanged {
        /// New multiplier.
        speed: f32,
    },
}

/// Public view of one character.
#[derive(Debug, Clone, Serialize)]
pub struct CharacterSnapshot {
    /// ID.
    pub id: CharacterId,
    /// Name.
    pub name: String,
    /// Age.
    pub age: u32,
    /// Current cell.
    pub position: Position,
    /// Needs.
    pub needs: Needs,
    /// Personality.
    pub personality: Personality,
    /// What the character is doing, in words.
    pub current_activity: String,
    /// Whether the character is claimed by a conversation.
    pub in_conversation: bool,
    /// The partner while claimed.
    pub conversation_target: Option<CharacterId>,
    /// Number of remembered resource locations.
    pub known_resources: usize,
}

impl From<&Character> for CharacterSnapshot {
    fn from(c: &Character) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            age: c.age,
            position: c.position(),
            needs: c.needs,
            personality: c.personality.clone(),
            current_activity: c.current_activity.clone(),
            in_conversation: c.in_conversation(),
            conversation_target: c.conversation_target(),
            known_resources: c.memory.long_term().resource_locations.len(),
        }
    }
}

/// The world as broadcast after every unpaused tick.
#[derive(Debug, Clone, Serialize)]
pub struct WorldSnapshot {
    /// Ticks processed so far.
    pub tick: u64,
    /// Accumulated in-world minutes.
    pub game_minutes: f64,
    /// Day or night.
    pub time_of_day: TimeOfDay,
    /// Pause flag at the time of the tick.
    pub paused: bool,
    /// Speed multiplier at the time of the tick.
    pub speed: f32,
    /// Grid width.
    pub width: i32,
    /// Grid height.
    pub height: i32,
    /// Every character, in registry order.
    pub characters: Vec<CharacterSnapshot>,
    /// Conversations not yet finished.
    pub active_conversations: usize,
}

/// Clock and control state copied into a snapshot.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotMeta {
    /// Ticks processed so far.
    pub tick: u64,
    /// Accumulated in-world minutes.
    pub game_minutes: f64,
    /// Pause flag.
    pub paused: bool,
    /// Speed multiplier.
    pub speed: f32,
    /// Open conversations.
    pub active_conversations: usize,
}

impl WorldSnapshot {
    /// Capture `world` together with the scheduler's clock state.
    #[must_use]
    pub fn capture(world: &World, meta: SnapshotMeta) -> Self {
        Self {
            tick: meta.tick,
            game_minutes: meta.game_minutes,
            time_of_day: world.time_of_day(),
            paused: meta.paused,
            speed: meta.speed,
            width: world.width(),
            height: world.height(),
            characters: world.characters().map(CharacterSnapshot::from).collect(),
            active_conversations: meta.active_conversations,
        }
    }
}
