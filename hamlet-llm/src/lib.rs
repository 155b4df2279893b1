//! # hamlet-llm
//!
//! LLM access for the hamlet simulation. One client speaks to:
//!
//! - **Ollama** (local, the default)
//! - any **OpenAI-compatible** chat completions API
//! - **none**, where every call fails fast so callers take their fallback
//!
//! Every call is bounded by a per-attempt timeout and retried a configurable
//! number of times. The simulation never depends on a call succeeding.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]

pub mod client;
pub mod error;
pub mod prompt;
pub mod types;

pub use client::{LlmClient, LlmProvider};
pub use error::LlmError;
pub use types::{LlmRequest, LlmResponse};
