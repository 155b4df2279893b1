//! # Hamlet Simulation Runtime
//!
//! Runs the village: a [`Scheduler`] ticks the shared [`World`], a
//! [`DecisionEngine`] picks one action per character per tick, actions are
//! applied to the world, and a [`ConversationOrchestrator`] runs
//! conversations as background tasks that call an [`UtteranceGenerator`].
//!
//! ## Locking
//!
//! The world sits behind a single `parking_lot::RwLock` ([`SharedWorld`]).
//! Guards are never held across an `.await`: every async path copies what it
//! needs out of the world, releases the lock, and takes it again to write
//! results back. The conversation claim is one call under the write lock, so
//! two concurrent initiators can never both claim the same partner.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::sync::Arc;

use hamlet_core::World;
use parking_lot::RwLock;

pub mod actions;
pub mod conversation;
pub mod cooldown;
pub mod decision;
pub mod error;
pub mod events;
pub mod generator;
pub mod memory_store;
pub mod population;
pub mod scheduler;

pub use actions::{ActionExecutor, ActionOutcome};
pub use conversation::{ConversationOrchestrator, StartedConversation};
pub use cooldown::Cooldowns;
pub use decision::{Action, Decision, DecisionEngine};
pub use error::GeneratorError;
pub use events::{CharacterSnapshot, SimEvent, WorldSnapshot};
pub use generator::{CharacterProfile, LlmGenerator, UtteranceGenerator, UtteranceRequest};
pub use memory_store::MemoryStore;
pub use scheduler::{Control, Scheduler};

/// The world shared between the scheduler, the orchestrator and callers.
pub type SharedWorld = Arc<RwLock<World>>;
