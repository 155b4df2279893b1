//! The utterance generator seam.
//!
//! The orchestrator decides *when* a character speaks and with what inputs;
//! an [`UtteranceGenerator`] decides *what* is said. [`LlmGenerator`] is the
//! production implementation. Tests plug in scripted generators.

use std::future::Future;

use hamlet_core::config::LlmConfig;
use hamlet_core::memory::{ResourceLocation, SharedInformation, SharedPayload, StoredMemory};
use hamlet_core::{Character, CharacterId, Message, MessageKind, NeedKind, Position, Trait};
use hamlet_llm::prompt::{self, format_needs, format_section, render_template};
use hamlet_llm::{LlmClient, LlmProvider, LlmRequest};
use serde::Serialize;
use tracing::debug;

use crate::error::GeneratorError;

/// Shared-information entries shown to the speaker.
const RECENT_SHARED: usize = 3;

/// Token budget for summaries.
const SUMMARY_MAX_TOKENS: u32 = 100;

/// Temperature for summaries.
const SUMMARY_TEMPERATURE: f32 = 0.5;

/// A point-in-time copy of what a generator may know about a character.
///
/// Taken under the world lock and handed to the generator after the lock is
/// released, so generation never blocks the world.
#[derive(Debug, Clone, Serialize)]
pub struct CharacterProfile {
    /// ID.
    pub id: CharacterId,
    /// Name.
    pub name: String,
    /// Age.
    pub age: u32,
    /// Personality traits.
    pub traits: Vec<Trait>,
    /// Interests.
    pub interests: Vec<String>,
    /// Fears.
    pub fears: Vec<String>,
    /// Goals.
    pub goals: Vec<String>,
    /// Needs as `(kind, value)` pairs.
    pub needs: [(NeedKind, f32); 4],
    /// Current cell.
    pub position: Position,
    /// Known resource locations, in insertion order.
    pub known_resources: Vec<ResourceLocation>,
    /// The latest pieces of shared information.
    pub recent_shared: Vec<SharedInformation>,
}

impl CharacterProfile {
    /// Snapshot `character`.
    #[must_use]
    pub fn from_character(character: &Character) -> Self {
        let long_term = character.memory.long_term();
        let shared = &long_term.shared_information;
        Self {
            id: character.id,
            name: character.name.clone(),
            age: character.age,
            traits: character.personality.traits.clone(),
            interests: character.personality.interests.clone(),
            fears: character.personality.fears.clone(),
            goals: character.personality.goals.clone(),
            needs: character.needs.iter(),
            position: character.position(),
            known_resources: character
                .memory
                .known_resources(None)
                .into_iter()
                .cloned()
                .collect(),
            recent_shared: shared[shared.len().saturating_sub(RECENT_SHARED)..].to_vec(),
        }
    }

    fn trait_labels(&self) -> String {
        self.traits
            .iter()
            .map(|t| t.label())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn needs_text(&self) -> String {
        let labelled: Vec<(String, f32)> = self
            .needs
            .iter()
            .map(|(kind, value)| (kind.to_string(), *value))
            .collect();
        let borrowed: Vec<(&str, f32)> = labelled.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        format_needs(&borrowed)
    }
}

/// Everything a generator gets for one conversation turn.
#[derive(Debug, Clone, Serialize)]
pub struct UtteranceRequest {
    /// Who speaks.
    pub speaker: CharacterProfile,
    /// Who listens.
    pub listener: CharacterProfile,
    /// Short description of the situation.
    pub context: String,
    /// The speaker's memories most relevant to the context.
    pub memories: Vec<StoredMemory>,
    /// Messages exchanged so far.
    pub prior_turns: Vec<Message>,
}

/// Produces utterances and summaries. Calls may fail or hang; every caller
/// bounds them with a timeout and has a fallback.
pub trait UtteranceGenerator: Send + Sync + 'static {
    /// The next line for `request.speaker`.
    fn generate(
        &self,
        request: UtteranceRequest,
    ) -> impl Future<Output = Result<String, GeneratorError>> + Send;

    /// A one or two sentence summary of `text`.
    fn summarize(&self, text: &str) -> impl Future<Output = Result<String, GeneratorError>> + Send;
}

/// Generator backed by an [`LlmClient`] and the built-in Turkish prompts.
#[derive(Debug, Clone)]
pub struct LlmGenerator {
    client: LlmClient,
    temperature: f32,
    max_tokens: u32,
    timeout_ms: u64,
}

impl LlmGenerator {
    /// Wrap a client.
    #[must_use]
    pub fn new(client: LlmClient, temperature: f32, max_tokens: u32, timeout_ms: u64) -> Self {
        Self {
            client,
            temperature,
            max_tokens,
            timeout_ms,
        }
    }

    /// Build from the `[llm]` config section.
    ///
    /// # Errors
    /// Returns `GeneratorError::Llm` for an unknown provider or missing key.
    pub fn from_config(config: &LlmConfig) -> Result<Self, GeneratorError> {
        let provider =
            LlmProvider::from_name(&config.provider, &config.base_url, config.api_key.as_deref())?;
        let client = LlmClient::new(provider, config.model.clone(), config.max_retries);
        Ok(Self::new(
            client,
            config.temperature,
            config.max_tokens,
            config.request_timeout_ms,
        ))
    }

    /// Whether a backend is configured at all.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.client.is_available()
    }

    async fn complete(&self, request: LlmRequest) -> Result<String, GeneratorError> {
        let response = self.client.generate(&request).await?;
        debug!(
            model = %response.model,
            tokens = response.tokens_generated,
            latency_ms = response.latency_ms,
            "Generated text"
        );
        if response.text.is_empty() {
            return Err(GeneratorError::Unavailable("empty response".into()));
        }
        Ok(response.text)
    }
}

impl UtteranceGenerator for LlmGenerator {
    async fn generate(&self, request: UtteranceRequest) -> Result<String, GeneratorError> {
        let (system, user) = build_utterance_prompt(&request);
        let request = LlmRequest::new(system, user)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
            .with_timeout(self.timeout_ms);
        self.complete(request).await
    }

    async fn summarize(&self, text: &str) -> Result<String, GeneratorError> {
        let user = render_template(prompt::SUMMARY_USER, &[("text", text)]);
        let request = LlmRequest::new(prompt::SUMMARY_SYSTEM, user)
            .with_temperature(SUMMARY_TEMPERATURE)
            .with_max_tokens(SUMMARY_MAX_TOKENS)
            .with_timeout(self.timeout_ms);
        self.complete(request).await
    }
}

/// Render the system and user prompts for one turn.
#[must_use]
pub fn build_utterance_prompt(request: &UtteranceRequest) -> (String, String) {
    let speaker = &request.speaker;
    let listener = &request.listener;

    let speaker_traits = speaker.trait_labels();
    let system = render_template(
        prompt::UTTERANCE_SYSTEM,
        &[
            ("speaker_name", speaker.name.as_str()),
            ("speaker_age", speaker.age.to_string().as_str()),
            ("speaker_traits", speaker_traits.as_str()),
            ("speaker_interests", speaker.interests.join(", ").as_str()),
            ("speaker_fears", speaker.fears.join(", ").as_str()),
            ("speaker_goals", speaker.goals.join(", ").as_str()),
            ("speaker_needs", speaker.needs_text().as_str()),
        ],
    );

    let memories: Vec<String> = request
        .memories
        .iter()
        .map(|m| m.summary.clone().unwrap_or_else(|| m.content.clone()))
        .collect();
    let resources: Vec<String> = speaker
        .known_resources
        .iter()
        .map(|r| match &r.source {
            Some(source) => format!("{} kaynağı ({}, {}), {source} söyledi", r.kind, r.x, r.y),
            None => format!("{} kaynağı ({}, {}), sen keşfettin", r.kind, r.x, r.y),
        })
        .collect();
    let shared: Vec<String> = speaker
        .recent_shared
        .iter()
        .map(|info| {
            let content = match &info.payload {
                SharedPayload::Resource { content, .. } | SharedPayload::General { content } => {
                    content
                }
            };
            format!("{}: {content}", info.source)
        })
        .collect();
    let history: Vec<String> = request
        .prior_turns
        .iter()
        .map(|m| {
            let who = match (m.kind, m.speaker_id) {
                (MessageKind::Character, Some(id)) if id == speaker.id => "Sen".to_string(),
                _ => m.speaker_name.clone(),
            };
            format!("{who}: \"{}\"", m.content)
        })
        .collect();

    let instruction = match request.prior_turns.last() {
        None => render_template(
            prompt::OPENING_INSTRUCTION,
            &[("listener_name", listener.name.as_str())],
        ),
        Some(last) => render_template(
            prompt::REPLY_INSTRUCTION,
            &[
                ("listener_name", listener.name.as_str()),
                ("last_line", last.content.as_str()),
            ],
        ),
    };

    let user = render_template(
        prompt::UTTERANCE_USER,
        &[
            ("listener_name", listener.name.as_str()),
            ("listener_age", listener.age.to_string().as_str()),
            ("listener_traits", listener.trait_labels().as_str()),
            ("listener_interests", listener.interests.join(", ").as_str()),
            ("listener_needs", listener.needs_text().as_str()),
            ("speaker_position", speaker.position.to_string().as_str()),
            ("context", request.context.as_str()),
            ("memories", format_section("ÖNEMLİ ANILAR", &memories, "").as_str()),
            (
                "resources",
                format_section(
                    "BİLDİĞİN KAYNAK KONUMLARI",
                    &resources,
                    "\nHenüz kaynak konumu bilmiyorsun.\n",
                )
                .as_str(),
            ),
            ("shared", format_section("BAŞKALARINDAN ÖĞRENDİKLERİN", &shared, "").as_str()),
            ("history", format_section("KONUŞMA GEÇMİŞİ", &history, "").as_str()),
            ("instruction", instruction.as_str()),
        ],
    );

    (system, user)
}
