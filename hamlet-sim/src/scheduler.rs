//! The tick loop and the inbound command surface.
//!
//! A tick runs in two halves. The synchronous half holds the world write lock
//! and does everything that mutates characters: clock, decay, decisions and
//! action execution. The asynchronous half runs with no lock held: it starts
//! the conversations requested during the tick, persists memories, events
//! and characters, and broadcasts the snapshot.
//!
//! Pause and speed live behind their own lock and are read once at the start
//! of a tick, so a change never lands mid-tick.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use hamlet_core::config::{HamletConfig, NeedsConfig, SchedulerConfig};
use hamlet_core::memory::{MemoryLimits, MemoryRecord};
use hamlet_core::persistence::{EventKind, EventRecord, PersistenceStore};
use hamlet_core::rng::{SimRng, sim_rng};
use hamlet_core::{CharacterId, ConversationId, HamletError, Message, Position, Result, World};
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::SharedWorld;
use crate::actions::ActionExecutor;
use crate::conversation::ConversationOrchestrator;
use crate::cooldown::Cooldowns;
use crate::decision::DecisionEngine;
use crate::events::{CharacterSnapshot, SimEvent, SnapshotMeta, WorldSnapshot};
use crate::generator::UtteranceGenerator;
use crate::memory_store::MemoryStore;
use crate::population;

/// Externally controlled run state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Control {
    /// When set, ticks do nothing.
    pub paused: bool,
    /// Real-to-simulated time multiplier.
    pub speed: f32,
}

#[derive(Debug, Default)]
struct Clock {
    tick: u64,
    game_minutes: f64,
}

/// What the locked half of a tick leaves for the unlocked half.
#[derive(Debug, Default)]
struct TickWork {
    memories: Vec<(CharacterId, MemoryRecord)>,
    events: Vec<EventRecord>,
    conversations: Vec<(CharacterId, CharacterId)>,
}

/// Drives the simulation. Cheap to clone; every clone controls the same
/// world.
pub struct Scheduler<G> {
    inner: Arc<Inner<G>>,
}

impl<G> Clone for Scheduler<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<G> {
    world: SharedWorld,
    orchestrator: ConversationOrchestrator<G>,
    memory: Arc<MemoryStore<G>>,
    store: Arc<dyn PersistenceStore>,
    decisions: DecisionEngine,
    executor: ActionExecutor,
    needs: NeedsConfig,
    config: SchedulerConfig,
    control: Mutex<Control>,
    clock: Mutex<Clock>,
    rng: Mutex<SimRng>,
    events: broadcast::Sender<SimEvent>,
    cooldowns: Arc<Cooldowns>,
}

impl<G: UtteranceGenerator> Scheduler<G> {
    /// Wire up a simulation around `world`.
    ///
    /// With `general.seed` set, decisions, actions and turn counts are
    /// reproducible.
    pub fn new(
        config: &HamletConfig,
        world: World,
        generator: G,
        store: Arc<dyn PersistenceStore>,
    ) -> Self {
        let seed = config.general.seed;
        let world: SharedWorld = Arc::new(RwLock::new(world));
        let (events, _) = broadcast::channel(config.scheduler.event_buffer.max(1));
        let cooldowns = Arc::new(Cooldowns::new());
        let memory = Arc::new(MemoryStore::new(
            Arc::clone(&store),
            Arc::new(generator),
            config.memory.clone(),
            Duration::from_millis(config.conversation.generator_timeout_ms),
        ));
        let orchestrator = ConversationOrchestrator::new(
            Arc::clone(&world),
            Arc::clone(&memory),
            events.clone(),
            Arc::clone(&cooldowns),
            config.conversation.clone(),
            sim_rng(seed.map(|s| s.wrapping_add(1))),
        );
        if let Err(e) = config.scheduler.validate() {
            warn!(error = %e, "Scheduler settings out of range");
        }
        let speed = config.scheduler.clamp_speed(config.scheduler.initial_speed);

        Self {
            inner: Arc::new(Inner {
                world,
                orchestrator,
                memory,
                store,
                decisions: DecisionEngine::new(config.decision.clone()),
                executor: ActionExecutor::new(config.decision.clone()),
                needs: config.needs.clone(),
                config: config.scheduler.clone(),
                control: Mutex::new(Control {
                    paused: false,
                    speed,
                }),
                clock: Mutex::new(Clock::default()),
                rng: Mutex::new(sim_rng(seed)),
                events,
                cooldowns,
            }),
        }
    }

    /// Restore characters from the store, or spawn the default villagers.
    ///
    /// # Errors
    /// Returns an error if the world has nowhere to place them.
    pub fn populate(&self, limits: MemoryLimits) -> Result<Vec<CharacterId>> {
        let mut world = self.inner.world.write();
        let mut rng = self.inner.rng.lock();
        population::restore_or_spawn(&mut world, self.inner.store.as_ref(), limits, &mut *rng)
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Run until `shutdown` resolves, ticking every `tick_interval_ms` of
    /// real time.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let period = Duration::from_millis(self.inner.config.tick_interval_ms.max(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        interval.tick().await;
        let mut last = Instant::now();
        info!(period_ms = self.inner.config.tick_interval_ms, "Scheduler started");
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                _ = interval.tick() => {
                    let now = Instant::now();
                    let elapsed = now.duration_since(last);
                    // Reset even while paused so resuming does not replay the pause.
                    last = now;
                    self.tick(elapsed).await;
                }
            }
        }
        info!("Scheduler stopped");
    }

    /// One tick covering `elapsed` real time. Returns the broadcast snapshot,
    /// or `None` while paused.
    pub async fn tick(&self, elapsed: Duration) -> Option<WorldSnapshot> {
        let control = *self.inner.control.lock();
        if control.paused {
            return None;
        }
        let dt = elapsed.mul_f32(control.speed);
        let (work, tick) = self.step(dt);

        for (initiator, target) in work.conversations {
            match self.inner.orchestrator.start(initiator, target) {
                Ok(started) => debug!(conversation = %started.id, "Conversation spawned"),
                Err(e) => debug!(initiator = %initiator, target = %target, reason = %e, "Conversation not started"),
            }
        }
        for (owner, record) in &work.memories {
            self.inner.memory.record(*owner, record).await;
        }
        for event in &work.events {
            if event.kind == EventKind::Action {
                if let Err(e) = self.inner.store.log_event(event) {
                    warn!(character = %event.character_id, error = %e, "Failed to log event");
                }
            } else {
                self.inner.memory.record_event(event).await;
            }
        }

        let snapshot = {
            let world = self.inner.world.read();
            for character in world.characters() {
                if let Err(e) = self.inner.store.save_character(character) {
                    warn!(character = %character.id, error = %e, "Failed to persist character");
                }
            }
            let clock = self.inner.clock.lock();
            WorldSnapshot::capture(
                &world,
                SnapshotMeta {
                    tick,
                    game_minutes: clock.game_minutes,
                    paused: control.paused,
                    speed: control.speed,
                    active_conversations: self.inner.orchestrator.active_count(),
                },
            )
        };
        debug!(tick, characters = snapshot.characters.len(), "Tick complete");
        let _ = self.inner.events.send(SimEvent::WorldUpdate(snapshot.clone()));
        Some(snapshot)
    }

    fn step(&self, dt: Duration) -> (TickWork, u64) {
        let now = Utc::now();
        let tick = {
            let mut clock = self.inner.clock.lock();
            clock.tick += 1;
            clock.game_minutes += dt.as_secs_f64() / 60.0;
            clock.tick
        };

        let mut work = TickWork::default();
        let mut world = self.inner.world.write();
        world.advance_clock(dt);
        for character in world.characters_mut() {
            character.decay(dt, &self.inner.needs);
        }

        let mut rng = self.inner.rng.lock();
        for id in world.character_ids() {
            let Some(character) = world.character(id) else {
                continue;
            };
            let last = self.inner.cooldowns.last(id);
            let decision = self
                .inner
                .decisions
                .decide(character, &world, last, now, &mut *rng);
            debug!(character = %character.name, action = %decision.action, reason = %decision.reason, "Decided");

            match self.inner.executor.execute(
                &mut world,
                id,
                &decision,
                &self.inner.cooldowns,
                now,
                &mut *rng,
            ) {
                Ok(outcome) => {
                    work.memories
                        .extend(outcome.memories.into_iter().map(|m| (id, m)));
                    work.events.extend(outcome.events);
                    work.conversations.extend(outcome.conversation);
                }
                Err(e) => warn!(character = %id, error = %e, "Action failed"),
            }
        }
        (work, tick)
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Set the speed multiplier, clamped to the configured range. Returns the
    /// value applied.
    pub fn set_speed(&self, speed: f32) -> f32 {
        let applied = {
            let mut control = self.inner.control.lock();
            if !speed.is_nan() {
                control.speed = self.inner.config.clamp_speed(speed);
            }
            control.speed
        };
        info!(speed = applied, "Simulation speed set");
        let _ = self.inner.events.send(SimEvent::SpeedChanged { speed: applied });
        applied
    }

    /// Flip the pause flag. Returns the new value.
    pub fn toggle_pause(&self) -> bool {
        let paused = {
            let mut control = self.inner.control.lock();
            control.paused = !control.paused;
            control.paused
        };
        info!(paused, "Simulation pause toggled");
        let _ = self
            .inner
            .events
            .send(SimEvent::SimulationStateChanged { paused });
        paused
    }

    /// Move a character on behalf of a user.
    ///
    /// # Errors
    /// Returns `HamletError::CharacterNotFound` or `HamletError::InvalidMove`;
    /// nothing changes on error.
    pub fn move_character(&self, id: CharacterId, to: Position) -> Result<Position> {
        let snapshot = {
            let mut world = self.inner.world.write();
            world.move_character(id, to)?;
            world
                .character(id)
                .map(CharacterSnapshot::from)
                .ok_or(HamletError::CharacterNotFound(id))?
        };
        let _ = self.inner.events.send(SimEvent::CharacterUpdate(snapshot));
        Ok(to)
    }

    /// Forward a user message to a running conversation.
    ///
    /// # Errors
    /// See [`ConversationOrchestrator::send_user_message`].
    pub fn send_user_message(&self, conversation: ConversationId, text: &str) -> Result<Message> {
        self.inner.orchestrator.send_user_message(conversation, text)
    }

    /// Subscribe to outbound events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SimEvent> {
        self.inner.events.subscribe()
    }

    /// The current world state without ticking.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        let control = *self.inner.control.lock();
        let world = self.inner.world.read();
        let clock = self.inner.clock.lock();
        WorldSnapshot::capture(
            &world,
            SnapshotMeta {
                tick: clock.tick,
                game_minutes: clock.game_minutes,
                paused: control.paused,
                speed: control.speed,
                active_conversations: self.inner.orchestrator.active_count(),
            },
        )
    }

    /// Current pause flag and speed.
    #[must_use]
    pub fn control(&self) -> Control {
        *self.inner.control.lock()
    }

    /// The shared world.
    #[must_use]
    pub fn world(&self) -> &SharedWorld {
        &self.inner.world
    }

    /// The conversation orchestrator.
    #[must_use]
    pub fn orchestrator(&self) -> &ConversationOrchestrator<G> {
        &self.inner.orchestrator
    }

    /// The memory service.
    #[must_use]
    pub fn memory(&self) -> &Arc<MemoryStore<G>> {
        &self.inner.memory
    }
}
