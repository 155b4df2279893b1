//! Conversation orchestration.
//!
//! A conversation moves through `Initiating -> TurnLoop -> Releasing -> Done`.
//! A generator failure at any turn applies a small fallback and goes through
//! `Releasing` to `Failed`. The claim on both participants is held by a
//! [`ClaimGuard`], so it is released on every path, including a panicking or
//! aborted task.
//!
//! Each conversation runs as its own tokio task. The world lock is only taken
//! for short synchronous sections between generator calls, never across an
//! `.await`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use hamlet_core::config::ConversationConfig;
use hamlet_core::memory::{MemoryKind, MemoryRecord, SharedPayload};
use hamlet_core::persistence::PersistenceStore;
use hamlet_core::rng::SimRng;
use hamlet_core::{
    CharacterId, Conversation, ConversationId, ConversationPhase, HamletError, Message,
    MessageKind, NeedKind, Position, ResourceKind, Result,
};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::SharedWorld;
use crate::cooldown::Cooldowns;
use crate::error::GeneratorError;
use crate::events::SimEvent;
use crate::generator::{CharacterProfile, UtteranceGenerator, UtteranceRequest};
use crate::memory_store::MemoryStore;

/// Speaker name used for messages typed by a human observer.
pub const USER_SPEAKER: &str = "Kullanıcı";

const WATER_WORDS: [&str; 6] = ["su", "suyu", "water", "çeşme", "göl", "nehir"];
const FOOD_WORDS: [&str; 7] = ["gıda", "yemek", "food", "çiftlik", "farmland", "grass", "meyve"];
const SHELTER_WORDS: [&str; 5] = ["barınak", "ev", "house", "sığınak", "korunma"];
const KNOWLEDGE_WORDS: [&str; 2] = ["biliyorum", "buldum"];

#[derive(Debug, thiserror::Error)]
enum TurnError {
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error(transparent)]
    State(#[from] HamletError),
}

/// A conversation that was claimed and spawned.
#[derive(Debug)]
pub struct StartedConversation {
    /// Registry ID.
    pub id: ConversationId,
    /// The running task; resolves to the terminal phase.
    pub task: JoinHandle<ConversationPhase>,
}

/// Holds a conversation's claim. Dropping it closes the conversation,
/// whether the task finished, failed or was aborted: the pair is released
/// and stamped for cooldown, the terminal phase is recorded and persisted,
/// and `ConversationEnded` is broadcast.
struct ClaimGuard<G> {
    inner: Arc<Inner<G>>,
    id: ConversationId,
    pair: (CharacterId, CharacterId),
    outcome: ConversationPhase,
}

impl<G> Drop for ClaimGuard<G> {
    fn drop(&mut self) {
        let (a, b) = self.pair;
        let (id, phase) = (self.id, self.outcome);
        let inner = &self.inner;

        inner.set_phase(id, ConversationPhase::Releasing);
        inner.world.write().release_conversation(a, b);
        debug!(a = %a, b = %b, "Conversation claim released");
        let now = Utc::now();
        inner.cooldowns.stamp(a, now);
        inner.cooldowns.stamp(b, now);

        let finished = inner.registry.write().get_mut(&id).map(|convo| {
            convo.transition(phase);
            convo.clone()
        });
        if let Some(finished) = finished {
            if let Err(e) = inner.store.save_conversation(&finished) {
                warn!(conversation = %id, error = %e, "Failed to persist conversation");
            }
            info!(conversation = %id, messages = finished.messages.len(), phase = %phase, "Conversation ended");
        }
        let _ = inner.events.send(SimEvent::ConversationEnded {
            conversation_id: id,
            phase,
        });
    }
}

/// Runs conversations between characters. Cheap to clone.
pub struct ConversationOrchestrator<G> {
    inner: Arc<Inner<G>>,
}

impl<G> Clone for ConversationOrchestrator<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<G> {
    world: SharedWorld,
    memory: Arc<MemoryStore<G>>,
    generator: Arc<G>,
    store: Arc<dyn PersistenceStore>,
    events: broadcast::Sender<SimEvent>,
    cooldowns: Arc<Cooldowns>,
    config: ConversationConfig,
    registry: RwLock<IndexMap<ConversationId, Conversation>>,
    rng: Mutex<SimRng>,
}

impl<G> Inner<G> {
    fn set_phase(&self, id: ConversationId, phase: ConversationPhase) {
        if let Some(convo) = self.registry.write().get_mut(&id) {
            convo.transition(phase);
            debug!(conversation = %id, phase = %convo.phase, "Conversation phase");
        }
    }
}

impl<G: UtteranceGenerator> ConversationOrchestrator<G> {
    /// Create an orchestrator. The generator and persistence backend are
    /// shared with `memory`.
    pub fn new(
        world: SharedWorld,
        memory: Arc<MemoryStore<G>>,
        events: broadcast::Sender<SimEvent>,
        cooldowns: Arc<Cooldowns>,
        config: ConversationConfig,
        rng: SimRng,
    ) -> Self {
        let generator = Arc::clone(memory.generator());
        let store = Arc::clone(memory.store());
        Self {
            inner: Arc::new(Inner {
                world,
                memory,
                generator,
                store,
                events,
                cooldowns,
                config,
                registry: RwLock::new(IndexMap::new()),
                rng: Mutex::new(rng),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Claim `initiator` and `target` and run a conversation in the
    /// background.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns `HamletError::ConversationClaim` if either side is cooling
    /// down or already claimed, and `HamletError::CharacterNotFound` for an
    /// unknown ID. Nothing is claimed on error.
    pub fn start(
        &self,
        initiator: CharacterId,
        target: CharacterId,
    ) -> Result<StartedConversation> {
        let now = Utc::now();
        for id in [initiator, target] {
            if !self.inner.cooldowns.ready(id, now, self.inner.config.cooldown_secs) {
                return Err(HamletError::ConversationClaim {
                    character: id,
                    reason: "cooling down after a conversation".to_string(),
                });
            }
        }

        self.inner
            .world
            .write()
            .try_claim_conversation(initiator, target)?;
        let conversation = Conversation::new(initiator, target);
        let id = conversation.id;
        let guard = ClaimGuard {
            inner: Arc::clone(&self.inner),
            id,
            pair: (initiator, target),
            outcome: ConversationPhase::Failed,
        };

        let turns = {
            let (lo, hi) = (self.inner.config.min_turns, self.inner.config.max_turns);
            let mut rng = self.inner.rng.lock();
            rng.gen_range(lo.min(hi)..=hi.max(lo))
        };

        self.inner.registry.write().insert(id, conversation.clone());
        info!(conversation = %id, initiator = %initiator, target = %target, turns, "Conversation started");
        let _ = self
            .inner
            .events
            .send(SimEvent::ConversationStarted { conversation });

        let this = self.clone();
        let task = tokio::spawn(async move { this.run(id, initiator, target, turns, guard).await });
        Ok(StartedConversation { id, task })
    }

    async fn run(
        self,
        id: ConversationId,
        a: CharacterId,
        b: CharacterId,
        turns: u32,
        mut guard: ClaimGuard<G>,
    ) -> ConversationPhase {
        let phase = match self.turn_loop(id, a, b, turns).await {
            Ok(()) => ConversationPhase::Done,
            Err(e) => {
                warn!(conversation = %id, error = %e, "Conversation failed, applying fallback");
                self.fallback(a, b).await;
                ConversationPhase::Failed
            }
        };
        guard.outcome = phase;
        drop(guard);
        phase
    }

    async fn turn_loop(
        &self,
        id: ConversationId,
        a: CharacterId,
        b: CharacterId,
        turns: u32,
    ) -> std::result::Result<(), TurnError> {
        let delay = Duration::from_millis(self.inner.config.turn_delay_ms);
        for turn in 0..turns {
            let (speaker_id, listener_id) = if turn % 2 == 0 { (a, b) } else { (b, a) };
            self.set_phase(id, ConversationPhase::TurnLoop { turn });

            let (speaker, listener) = {
                let world = self.inner.world.read();
                let s = world
                    .character(speaker_id)
                    .ok_or(HamletError::CharacterNotFound(speaker_id))?;
                let l = world
                    .character(listener_id)
                    .ok_or(HamletError::CharacterNotFound(listener_id))?;
                (CharacterProfile::from_character(s), CharacterProfile::from_character(l))
            };

            let context = if turn == 0 {
                format!("{} ile {} karşılaştı ve konuşmaya başladı", speaker.name, listener.name)
            } else {
                format!("{} ile {} sohbet ediyor", speaker.name, listener.name)
            };
            let memories = self.inner.memory.get_relevant_memories(
                speaker_id,
                &context,
                self.inner.memory.config().top_k,
            );
            let prior_turns = self
                .conversation(id)
                .map(|c| c.messages)
                .unwrap_or_default();

            let (speaker_name, listener_name) = (speaker.name.clone(), listener.name.clone());
            let request = UtteranceRequest {
                speaker,
                listener,
                context,
                memories,
                prior_turns,
            };
            let text = self.generate(request).await?;

            let message = {
                let mut registry = self.inner.registry.write();
                let convo = registry
                    .get_mut(&id)
                    .ok_or(HamletError::ConversationNotFound(id))?;
                convo
                    .push(Some(speaker_id), &speaker_name, &text, MessageKind::Character)?
                    .clone()
            };
            debug!(conversation = %id, turn, speaker = %speaker_name, "Turn complete");
            let _ = self.inner.events.send(SimEvent::NewMessage {
                conversation_id: id,
                message,
            });

            let records = self.apply_turn(
                (speaker_id, &speaker_name),
                (listener_id, &listener_name),
                &text,
            );
            for (owner, record) in &records {
                self.inner.memory.record(*owner, record).await;
            }

            if turn + 1 < turns && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
        Ok(())
    }

    async fn generate(
        &self,
        request: UtteranceRequest,
    ) -> std::result::Result<String, GeneratorError> {
        let ms = self.inner.config.generator_timeout_ms;
        let call = self.inner.generator.generate(request);
        let text = match tokio::time::timeout(Duration::from_millis(ms), call).await {
            Ok(result) => result?,
            Err(_) => return Err(GeneratorError::Timeout { ms }),
        };
        let text = text.trim();
        if text.is_empty() {
            return Err(GeneratorError::Unavailable("empty utterance".into()));
        }
        Ok(text.to_string())
    }

    /// Social gain, memories and shared knowledge for one exchange.
    fn apply_turn(
        &self,
        (speaker_id, speaker_name): (CharacterId, &str),
        (listener_id, listener_name): (CharacterId, &str),
        text: &str,
    ) -> Vec<(CharacterId, MemoryRecord)> {
        let mut records = Vec::with_capacity(2);
        let mut world = self.inner.world.write();

        if let Some(speaker) = world.character_mut(speaker_id) {
            let record = speaker.add_memory(
                MemoryKind::Conversation,
                format!("{listener_name} ile sohbet etti: \"{text}\""),
                6,
            );
            records.push((speaker_id, record));
        }

        let shared: Vec<SharedPayload> = extract_shared(speaker_name, text)
            .into_iter()
            .filter(|payload| match payload {
                SharedPayload::Resource { x, y, .. } => world.in_bounds(Position::new(*x, *y)),
                SharedPayload::General { .. } => true,
            })
            .collect();

        if let Some(listener) = world.character_mut(listener_id) {
            listener
                .needs
                .satisfy(NeedKind::Social, self.inner.config.social_gain_per_turn);
            let record = listener.add_memory(
                MemoryKind::Conversation,
                format!("{speaker_name}: \"{text}\" dedi"),
                5,
            );
            records.push((listener_id, record));

            for payload in shared {
                if listener.memory.learn_from_other(speaker_name, payload) {
                    debug!(listener = %listener_name, source = %speaker_name, "Learned a resource location");
                }
            }
        }
        records
    }

    async fn fallback(&self, a: CharacterId, b: CharacterId) {
        let records = {
            let mut world = self.inner.world.write();
            let name_a = world.character(a).map(|c| c.name.clone()).unwrap_or_default();
            let name_b = world.character(b).map(|c| c.name.clone()).unwrap_or_default();
            let mut records = Vec::with_capacity(2);
            for (id, other) in [(a, name_b), (b, name_a)] {
                if let Some(c) = world.character_mut(id) {
                    c.needs
                        .satisfy(NeedKind::Social, self.inner.config.fallback_social_gain);
                    let record = c.add_memory(
                        MemoryKind::Conversation,
                        format!("{other} ile kısa bir etkileşim"),
                        3,
                    );
                    records.push((id, record));
                }
            }
            records
        };
        for (owner, record) in &records {
            self.inner.memory.record(*owner, record).await;
        }
    }

    fn set_phase(&self, id: ConversationId, phase: ConversationPhase) {
        self.inner.set_phase(id, phase);
    }

    // -----------------------------------------------------------------------
    // Queries and commands
    // -----------------------------------------------------------------------

    /// Append a message typed by a human observer.
    ///
    /// # Errors
    /// Returns `HamletError::ConversationNotFound` for an unknown ID and
    /// `HamletError::ConversationClosed` once the turn loop has ended.
    pub fn send_user_message(&self, id: ConversationId, text: &str) -> Result<Message> {
        let (message, snapshot) = {
            let mut registry = self.inner.registry.write();
            let convo = registry
                .get_mut(&id)
                .ok_or(HamletError::ConversationNotFound(id))?;
            let message = convo.push(None, USER_SPEAKER, text, MessageKind::User)?.clone();
            (message, convo.clone())
        };
        if let Err(e) = self.inner.store.save_conversation(&snapshot) {
            warn!(conversation = %id, error = %e, "Failed to persist conversation");
        }
        let _ = self.inner.events.send(SimEvent::NewMessage {
            conversation_id: id,
            message: message.clone(),
        });
        Ok(message)
    }

    /// A copy of the conversation, active or finished.
    #[must_use]
    pub fn conversation(&self, id: ConversationId) -> Option<Conversation> {
        self.inner.registry.read().get(&id).cloned()
    }

    /// Conversations that have not reached a terminal phase, oldest first.
    #[must_use]
    pub fn active_conversations(&self) -> Vec<Conversation> {
        self.inner
            .registry
            .read()
            .values()
            .filter(|c| !c.phase.is_terminal())
            .cloned()
            .collect()
    }

    /// Number of conversations not yet finished.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner
            .registry
            .read()
            .values()
            .filter(|c| !c.phase.is_terminal())
            .count()
    }

    /// Every conversation ever started, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<Conversation> {
        self.inner.registry.read().values().cloned().collect()
    }

    /// The cooldown table stamped on release.
    #[must_use]
    pub fn cooldowns(&self) -> &Arc<Cooldowns> {
        &self.inner.cooldowns
    }
}

// ---------------------------------------------------------------------------
// Knowledge extraction
// ---------------------------------------------------------------------------

/// Knowledge a listener picks up from `text` said by `speaker`.
///
/// Every `(x, y)` coordinate becomes a resource payload when the text names a
/// resource (water words win over food words, food over shelter). Text
/// containing "biliyorum" or "buldum" is also kept as general information.
#[must_use]
pub fn extract_shared(speaker: &str, text: &str) -> Vec<SharedPayload> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let mentions = |keywords: &[&str]| {
        words.iter().any(|w| {
            keywords
                .iter()
                .any(|k| *w == *k || (k.chars().count() > 2 && w.starts_with(k)))
        })
    };

    let mut out = Vec::new();
    let kind = if mentions(&WATER_WORDS) {
        Some(ResourceKind::Water)
    } else if mentions(&FOOD_WORDS) {
        Some(ResourceKind::Food)
    } else if mentions(&SHELTER_WORDS) {
        Some(ResourceKind::Shelter)
    } else {
        None
    };
    if let Some(kind) = kind {
        for (x, y) in find_coordinates(text) {
            out.push(SharedPayload::Resource {
                kind,
                x,
                y,
                content: format!("{speaker} ({x}, {y}) koordinatında {kind} kaynağı olduğunu söyledi"),
            });
        }
    }
    if KNOWLEDGE_WORDS.iter().any(|k| lower.contains(k)) {
        out.push(SharedPayload::General {
            content: text.to_string(),
        });
    }
    out
}

/// Every `(x, y)` integer pair in `text`, in order of appearance.
#[must_use]
pub fn find_coordinates(text: &str) -> Vec<(i32, i32)> {
    let mut found = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find('(') {
        rest = &rest[open + 1..];
        let Some(close) = rest.find(')') else {
            break;
        };
        let inner = &rest[..close];
        if let Some((x, y)) = inner.split_once(',') {
            if let (Ok(x), Ok(y)) = (x.trim().parse::<i32>(), y.trim().parse::<i32>()) {
                found.push((x, y));
                rest = &rest[close + 1..];
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_are_found_in_order() {
        let text = "Göl (12, 7) civarında, bir de (3,4) var. (a, b) değil.";
        assert_eq!(find_coordinates(text), vec![(12, 7), (3, 4)]);
        assert!(find_coordinates("koordinat yok").is_empty());
        assert!(find_coordinates("yarım (1, 2").is_empty());
    }

    #[test]
    fn nested_parenthesis_does_not_hide_a_pair() {
        assert_eq!(find_coordinates("((5, 6))"), vec![(5, 6)]);
    }

    #[test]
    fn water_mention_shares_location() {
        let shared = extract_shared("Ayşe", "Nehir kenarında (10, 4) su var!");
        assert_eq!(shared.len(), 1);
        match &shared[0] {
            SharedPayload::Resource { kind, x, y, content } => {
                assert_eq!(*kind, ResourceKind::Water);
                assert_eq!((*x, *y), (10, 4));
                assert!(content.starts_with("Ayşe (10, 4)"));
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn water_wins_over_food() {
        let shared = extract_shared("Ali", "Yemek ve su (1, 1) noktasında");
        assert!(matches!(
            shared[0],
            SharedPayload::Resource {
                kind: ResourceKind::Water,
                ..
            }
        ));
    }

    #[test]
    fn coordinates_without_resource_word_are_ignored() {
        assert!(extract_shared("Ali", "Dün (3, 3) noktasındaydım").is_empty());
    }

    #[test]
    fn knowledge_words_share_general_information() {
        let shared = extract_shared("Fatma", "Güzel bir yer buldum, sana göstereyim");
        assert_eq!(shared.len(), 1);
        assert!(matches!(shared[0], SharedPayload::General { .. }));
    }

    #[test]
    fn short_keyword_needs_whole_word() {
        // "sus" must not count as water.
        assert!(extract_shared("Ali", "Sus artık (2, 2)").is_empty());
    }
}
