//! Configuration for the hamlet simulation.
//!
//! Maps directly to `hamlet.toml`. Every field has a default, so an empty
//! file (or no file at all) yields a runnable simulation. The decision and
//! conversation constants are tuning knobs, not invariants.

use serde::{Deserialize, Serialize};

/// Top-level hamlet configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HamletConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// World grid dimensions and clock.
    #[serde(default)]
    pub world: WorldConfig,
    /// Need decay rates.
    #[serde(default)]
    pub needs: NeedsConfig,
    /// Per-character memory limits and retrieval settings.
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Decision policy constants.
    #[serde(default)]
    pub decision: DecisionConfig,
    /// Conversation orchestration settings.
    #[serde(default)]
    pub conversation: ConversationConfig,
    /// Tick scheduler settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// LLM integration settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Persistence settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl HamletConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `HamletError::Config` if the TOML is invalid or fails
    /// [`Self::validate`].
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| crate::HamletError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings the runtime relies on.
    ///
    /// # Errors
    /// Returns `HamletError::Config` naming the first offending field.
    pub fn validate(&self) -> crate::error::Result<()> {
        self.scheduler
            .validate()
            .map_err(|e| crate::HamletError::Config(format!("scheduler: {e}")))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Seed for the simulation random source. `None` seeds from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            seed: None,
        }
    }
}

/// World grid dimensions and clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Grid width in cells.
    #[serde(default = "default_width")]
    pub width: u32,
    /// Grid height in cells.
    #[serde(default = "default_height")]
    pub height: u32,
    /// Cells within this distance of an edge use the border terrain mix.
    #[serde(default = "default_3_i32")]
    pub border_width: i32,
    /// In-world hours between day/night toggles.
    #[serde(default = "default_12_0")]
    pub hours_per_phase: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 50,
            height: 35,
            border_width: 3,
            hours_per_phase: 12.0,
        }
    }
}

/// Need decay rates, in points per in-world hour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeedsConfig {
    /// Hunger decay per hour.
    #[serde(default = "default_2_0")]
    pub hunger_per_hour: f32,
    /// Thirst decay per hour.
    #[serde(default = "default_3_0")]
    pub thirst_per_hour: f32,
    /// Energy decay per hour.
    #[serde(default = "default_1_5")]
    pub energy_per_hour: f32,
    /// Social decay per hour.
    #[serde(default = "default_2_5")]
    pub social_per_hour: f32,
}

impl Default for NeedsConfig {
    fn default() -> Self {
        Self {
            hunger_per_hour: 2.0,
            thirst_per_hour: 3.0,
            energy_per_hour: 1.5,
            social_per_hour: 2.5,
        }
    }
}

/// Per-character memory limits and retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Short-term FIFO capacity.
    #[serde(default = "default_10_usize")]
    pub short_term_capacity: usize,
    /// Records with importance strictly above this go to long-term memory.
    #[serde(default = "default_7_u8")]
    pub important_threshold: u8,
    /// Content longer than this (in characters) is summarised before storage.
    #[serde(default = "default_200")]
    pub summary_threshold_chars: usize,
    /// Prefix length used when summarisation fails.
    #[serde(default = "default_100")]
    pub summary_fallback_chars: usize,
    /// How many stored memories are considered per retrieval.
    #[serde(default = "default_50")]
    pub retrieval_candidates: usize,
    /// Keyword cap for the retrieval context.
    #[serde(default = "default_10_usize")]
    pub max_keywords: usize,
    /// Memories returned to the utterance generator per turn.
    #[serde(default = "default_5_usize")]
    pub top_k: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            short_term_capacity: 10,
            important_threshold: 7,
            summary_threshold_chars: 200,
            summary_fallback_chars: 100,
            retrieval_candidates: 50,
            max_keywords: 10,
            top_k: 5,
        }
    }
}

/// Decision policy constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionConfig {
    /// A need below this value triggers the urgent branch.
    #[serde(default = "default_30_0")]
    pub urgent_threshold: f32,
    /// Radius within which other characters count as "nearby".
    #[serde(default = "default_3_0_f64")]
    pub nearby_radius: f64,
    /// Chat chance when social is in `[0, 30)`.
    #[serde(default = "default_0_8")]
    pub chat_chance_lonely: f64,
    /// Chat chance when social is in `[30, 50)`.
    #[serde(default = "default_0_5")]
    pub chat_chance_low: f64,
    /// Chat chance when social is in `[50, 70)`.
    #[serde(default = "default_0_2")]
    pub chat_chance_moderate: f64,
    /// Added to the chat chance for characters with the social trait.
    #[serde(default = "default_0_3")]
    pub social_trait_bonus: f64,
    /// Minimum seconds since the character's last conversation before chatting again.
    #[serde(default = "default_5_i64")]
    pub chat_cooldown_secs: i64,
    /// Below this social value, characters walk toward the nearest free character.
    #[serde(default = "default_60_0")]
    pub seek_social_below: f32,
    /// Proximity tolerance when social is below the urgent threshold.
    #[serde(default = "default_8_0")]
    pub proximity_lonely: f64,
    /// Proximity tolerance when social is below 45.
    #[serde(default = "default_5_0_f64")]
    pub proximity_low: f64,
    /// Proximity tolerance otherwise.
    #[serde(default = "default_3_0_f64")]
    pub proximity_default: f64,
    /// Needs below this value add weighted seek entries to the action pool.
    #[serde(default = "default_60_0")]
    pub urgency_ceiling: f32,
    /// Urgency offset for hunger.
    #[serde(default = "default_0_3")]
    pub hunger_offset: f64,
    /// Urgency offset for thirst.
    #[serde(default = "default_0_3")]
    pub thirst_offset: f64,
    /// Urgency offset for energy.
    #[serde(default = "default_0_2")]
    pub energy_offset: f64,
    /// Urgency offset for social.
    #[serde(default = "default_0_4")]
    pub social_offset: f64,
    /// Ring radius searched for unknown resources.
    #[serde(default = "default_5_i32")]
    pub search_radius: i32,
    /// Probability of travelling to a freshly spotted resource.
    #[serde(default = "default_0_7")]
    pub travel_chance: f64,
    /// Probability that reaching a resource restores the matching need.
    #[serde(default = "default_0_5")]
    pub satisfy_chance: f64,
    /// Probability of wandering when no resource is found or travel is skipped.
    #[serde(default = "default_0_5")]
    pub idle_wander_chance: f64,
    /// Minimum need restored by a resource.
    #[serde(default = "default_20_0")]
    pub satisfy_min: f32,
    /// Maximum need restored by a resource.
    #[serde(default = "default_60_0")]
    pub satisfy_max: f32,
    /// Energy restored when resting in a house.
    #[serde(default = "default_35_0")]
    pub rest_house: f32,
    /// Energy restored when resting on grass.
    #[serde(default = "default_25_0")]
    pub rest_grass: f32,
    /// Energy restored when resting anywhere else.
    #[serde(default = "default_15_0")]
    pub rest_default: f32,
    /// Uniform jitter applied to rest, in both directions.
    #[serde(default = "default_5_0")]
    pub rest_jitter: f32,
    /// A seek-social walker starts a conversation once within this distance.
    #[serde(default = "default_3_0_f64")]
    pub approach_start_distance: f64,
    /// Seconds since the walker's last conversation before an approach may start one.
    #[serde(default = "default_3_i64")]
    pub approach_cooldown_secs: i64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            urgent_threshold: 30.0,
            nearby_radius: 3.0,
            chat_chance_lonely: 0.8,
            chat_chance_low: 0.5,
            chat_chance_moderate: 0.2,
            social_trait_bonus: 0.3,
            chat_cooldown_secs: 5,
            seek_social_below: 60.0,
            proximity_lonely: 8.0,
            proximity_low: 5.0,
            proximity_default: 3.0,
            urgency_ceiling: 60.0,
            hunger_offset: 0.3,
            thirst_offset: 0.3,
            energy_offset: 0.2,
            social_offset: 0.4,
            search_radius: 5,
            travel_chance: 0.7,
            satisfy_chance: 0.5,
            idle_wander_chance: 0.5,
            satisfy_min: 20.0,
            satisfy_max: 60.0,
            rest_house: 35.0,
            rest_grass: 25.0,
            rest_default: 15.0,
            rest_jitter: 5.0,
            approach_start_distance: 3.0,
            approach_cooldown_secs: 3,
        }
    }
}

/// Conversation orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Minimum number of turns (inclusive).
    #[serde(default = "default_3_u32")]
    pub min_turns: u32,
    /// Maximum number of turns (inclusive).
    #[serde(default = "default_5_u32")]
    pub max_turns: u32,
    /// Social gained by both participants per turn.
    #[serde(default = "default_5_0")]
    pub social_gain_per_turn: f32,
    /// Social gained by both participants when the conversation fails.
    #[serde(default = "default_3_0")]
    pub fallback_social_gain: f32,
    /// Seconds a character is blocked from new conversations after one ends.
    #[serde(default = "default_5_i64")]
    pub cooldown_secs: i64,
    /// Hard timeout for one generator call, in milliseconds.
    #[serde(default = "default_30000")]
    pub generator_timeout_ms: u64,
    /// Pause between turns, in milliseconds.
    #[serde(default = "default_1000")]
    pub turn_delay_ms: u64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            min_turns: 3,
            max_turns: 5,
            social_gain_per_turn: 5.0,
            fallback_social_gain: 3.0,
            cooldown_secs: 5,
            generator_timeout_ms: 30_000,
            turn_delay_ms: 1000,
        }
    }
}

/// Tick scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Real-time interval between ticks, in milliseconds.
    #[serde(default = "default_3000")]
    pub tick_interval_ms: u64,
    /// Speed multiplier at start-up.
    #[serde(default = "default_1_0")]
    pub initial_speed: f32,
    /// Lowest allowed speed multiplier.
    #[serde(default = "default_0_1_f32")]
    pub min_speed: f32,
    /// Highest allowed speed multiplier.
    #[serde(default = "default_10_0")]
    pub max_speed: f32,
    /// Capacity of the broadcast event channel.
    #[serde(default = "default_256")]
    pub event_buffer: usize,
}

impl SchedulerConfig {
    /// Speed bounds must be finite with `0 < min_speed <= max_speed`, the
    /// initial speed finite, and the tick interval and event buffer non-zero.
    ///
    /// # Errors
    /// Returns a description of the first violation.
    pub fn validate(&self) -> Result<(), String> {
        if !self.min_speed.is_finite() || self.min_speed <= 0.0 {
            return Err(format!("min_speed ({}) must be positive", self.min_speed));
        }
        if !self.max_speed.is_finite() || self.max_speed < self.min_speed {
            return Err(format!(
                "max_speed ({}) must be >= min_speed ({})",
                self.max_speed, self.min_speed
            ));
        }
        if !self.initial_speed.is_finite() {
            return Err(format!("initial_speed ({}) must be finite", self.initial_speed));
        }
        if self.tick_interval_ms == 0 {
            return Err("tick_interval_ms must be non-zero".into());
        }
        if self.event_buffer == 0 {
            return Err("event_buffer must be non-zero".into());
        }
        Ok(())
    }

    /// Bound `speed` to `min_speed..=max_speed`. Never panics and never
    /// returns a negative value, even for bounds that fail [`Self::validate`].
    #[must_use]
    pub fn clamp_speed(&self, speed: f32) -> f32 {
        speed.max(self.min_speed).min(self.max_speed).max(0.0)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 3000,
            initial_speed: 1.0,
            min_speed: 0.1,
            max_speed: 10.0,
            event_buffer: 256,
        }
    }
}

/// LLM integration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider: "ollama", "openai", "none".
    #[serde(default = "default_ollama")]
    pub provider: String,
    /// Base URL for the LLM API.
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key for OpenAI-compatible providers.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Per-request HTTP timeout in milliseconds.
    #[serde(default = "default_30000")]
    pub request_timeout_ms: u64,
    /// Max retries before the caller falls back.
    #[serde(default = "default_1_u32")]
    pub max_retries: u32,
    /// Sampling temperature for utterances.
    #[serde(default = "default_0_9_f32")]
    pub temperature: f32,
    /// Token cap for utterances.
    #[serde(default = "default_120")]
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2:3b".to_string(),
            api_key: None,
            request_timeout_ms: 30_000,
            max_retries: 1,
            temperature: 0.9,
            max_tokens: 120,
        }
    }
}

/// Persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Backend: "sqlite" or "none".
    #[serde(default = "default_sqlite")]
    pub backend: String,
    /// Database path for the SQLite backend.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Use WAL mode for concurrent reads.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Store a CRC-32 of each character document.
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            path: "hamlet.db".to_string(),
            wal_mode: true,
            checksum_enabled: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_ollama() -> String { "ollama".to_string() }
fn default_ollama_url() -> String { "http://localhost:11434".to_string() }
fn default_model() -> String { "llama3.2:3b".to_string() }
fn default_sqlite() -> String { "sqlite".to_string() }
fn default_db_path() -> String { "hamlet.db".to_string() }
fn default_0_1_f32() -> f32 { 0.1 }
fn default_0_9_f32() -> f32 { 0.9 }
fn default_1_0() -> f32 { 1.0 }
fn default_1_5() -> f32 { 1.5 }
fn default_2_0() -> f32 { 2.0 }
fn default_2_5() -> f32 { 2.5 }
fn default_3_0() -> f32 { 3.0 }
fn default_5_0() -> f32 { 5.0 }
fn default_10_0() -> f32 { 10.0 }
fn default_15_0() -> f32 { 15.0 }
fn default_20_0() -> f32 { 20.0 }
fn default_25_0() -> f32 { 25.0 }
fn default_30_0() -> f32 { 30.0 }
fn default_35_0() -> f32 { 35.0 }
fn default_60_0() -> f32 { 60.0 }
fn default_0_2() -> f64 { 0.2 }
fn default_0_3() -> f64 { 0.3 }
fn default_0_4() -> f64 { 0.4 }
fn default_0_5() -> f64 { 0.5 }
fn default_0_7() -> f64 { 0.7 }
fn default_0_8() -> f64 { 0.8 }
fn default_3_0_f64() -> f64 { 3.0 }
fn default_5_0_f64() -> f64 { 5.0 }
fn default_8_0() -> f64 { 8.0 }
fn default_12_0() -> f64 { 12.0 }
fn default_3_i32() -> i32 { 3 }
fn default_5_i32() -> i32 { 5 }
fn default_3_i64() -> i64 { 3 }
fn default_5_i64() -> i64 { 5 }
fn default_7_u8() -> u8 { 7 }
fn default_1_u32() -> u32 { 1 }
fn default_3_u32() -> u32 { 3 }
fn default_5_u32() -> u32 { 5 }
fn default_120() -> u32 { 120 }
fn default_width() -> u32 { 50 }
fn default_height() -> u32 { 35 }
fn default_5_usize() -> usize { 5 }
fn default_10_usize() -> usize { 10 }
fn default_50() -> usize { 50 }
fn default_100() -> usize { 100 }
fn default_200() -> usize { 200 }
fn default_256() -> usize { 256 }
fn default_1000() -> u64 { 1000 }
fn default_3000() -> u64 { 3000 }
fn default_30000() -> u64 { 30_000 }
