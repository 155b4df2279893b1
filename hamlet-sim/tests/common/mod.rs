//! Shared fixtures for the runtime integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use hamlet_core::config::{ConversationConfig, MemoryConfig};
use hamlet_core::persistence::NullStore;
use hamlet_core::{Character, CharacterId, Needs, Personality, Position, Terrain, World};
use hamlet_sim::{
    ConversationOrchestrator, Cooldowns, GeneratorError, MemoryStore, SimEvent,
    UtteranceGenerator, UtteranceRequest,
};
use parking_lot::RwLock;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::broadcast;

/// Replays fixed lines, then falls back to "<speaker> konuşuyor".
pub struct Scripted {
    lines: Vec<String>,
    next: AtomicUsize,
}

impl Scripted {
    pub fn new(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|l| (*l).to_string()).collect(),
            next: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.next.load(Ordering::SeqCst)
    }
}

impl UtteranceGenerator for Scripted {
    async fn generate(&self, request: UtteranceRequest) -> Result<String, GeneratorError> {
        let i = self.next.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .lines
            .get(i)
            .cloned()
            .unwrap_or_else(|| format!("{} konuşuyor", request.speaker.name)))
    }

    async fn summarize(&self, text: &str) -> Result<String, GeneratorError> {
        Ok(text.chars().take(40).collect())
    }
}

/// Always fails.
pub struct Broken;

impl UtteranceGenerator for Broken {
    async fn generate(&self, _request: UtteranceRequest) -> Result<String, GeneratorError> {
        Err(GeneratorError::Unavailable("backend down".into()))
    }

    async fn summarize(&self, _text: &str) -> Result<String, GeneratorError> {
        Err(GeneratorError::Unavailable("backend down".into()))
    }
}

/// Never answers within any sane timeout.
pub struct Stalled;

impl UtteranceGenerator for Stalled {
    async fn generate(&self, _request: UtteranceRequest) -> Result<String, GeneratorError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok("geç kaldım".into())
    }

    async fn summarize(&self, _text: &str) -> Result<String, GeneratorError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(String::new())
    }
}

pub fn meadow(width: i32, height: i32) -> World {
    let cells = usize::try_from(width * height).expect("size");
    World::from_grid(width, height, vec![Terrain::Grass; cells], 12.0)
}

pub fn villager(world: &mut World, name: &str, needs: Needs, at: Position) -> CharacterId {
    let mut rng = StdRng::seed_from_u64(42);
    let character = Character::new(name, Personality::default(), &mut rng).with_needs(needs);
    world.add_character(character, at).expect("spawn")
}

pub fn quick_conversations(turns: u32) -> ConversationConfig {
    ConversationConfig {
        min_turns: turns,
        max_turns: turns,
        turn_delay_ms: 0,
        generator_timeout_ms: 500,
        ..ConversationConfig::default()
    }
}

pub struct Harness<G> {
    pub world: Arc<RwLock<World>>,
    pub orchestrator: ConversationOrchestrator<G>,
    pub events: broadcast::Receiver<SimEvent>,
}

pub fn harness<G: UtteranceGenerator>(world: World, generator: G, config: ConversationConfig) -> Harness<G> {
    let world = Arc::new(RwLock::new(world));
    let memory = Arc::new(MemoryStore::new(
        Arc::new(NullStore),
        Arc::new(generator),
        MemoryConfig::default(),
        Duration::from_millis(100),
    ));
    let (tx, rx) = broadcast::channel(256);
    let orchestrator = ConversationOrchestrator::new(
        Arc::clone(&world),
        memory,
        tx,
        Arc::new(Cooldowns::new()),
        config,
        StdRng::seed_from_u64(1),
    );
    Harness {
        world,
        orchestrator,
        events: rx,
    }
}
