//! # Hamlet Core Library
//!
//! Game-agnostic state model for a village of autonomous characters living
//! on a shared grid world.
//!
//! Every character owns:
//!
//! - **Needs**: hunger, thirst, energy and social, each in `[0, 100]`, decaying
//!   with simulated time ([`Needs`]).
//! - **Personality**: a fixed set of trait flags plus interests, fears and goals
//!   ([`Personality`]).
//! - **Memory**: a bounded short-term queue and a long-term store of important
//!   records, remembered resource locations, shared knowledge and discoveries
//!   ([`CharacterMemory`]).
//!
//! The [`World`] owns the terrain grid and the character registry, validates
//! movement and holds the conversation claim protocol. Nothing in this crate
//! is async; the runtime lives in `hamlet-sim`.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod character;
pub mod config;
pub mod conversation;
pub mod error;
pub mod memory;
pub mod needs;
pub mod persistence;
pub mod personality;
pub mod retrieval;
pub mod rng;
pub mod types;
pub mod world;

pub use character::Character;
pub use config::HamletConfig;
pub use conversation::{Conversation, ConversationPhase, Message, MessageKind};
pub use error::{HamletError, Result};
pub use memory::{CharacterMemory, MemoryKind, MemoryRecord, ResourceLocation};
pub use needs::{NeedKind, Needs};
pub use personality::{Personality, Trait};
pub use types::*;
pub use world::{Terrain, World};
