//! Request and response types.

use serde::{Deserialize, Serialize};

/// A completion request.
#[derive(Debug, Clone, Serialize)]
pub struct LlmRequest {
    /// System prompt (persona, rules).
    pub system: String,
    /// User prompt (situation, history).
    pub user: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
}

impl LlmRequest {
    /// A request with dialogue-friendly defaults (120 tokens, temperature 0.9).
    #[must_use]
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens: 120,
            temperature: 0.9,
            timeout_ms: 30_000,
        }
    }

    /// Set the token budget.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// A completion response.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmResponse {
    /// Generated text, trimmed.
    pub text: String,
    /// Tokens generated, when the provider reports it.
    pub tokens_generated: u32,
    /// Round-trip latency.
    pub latency_ms: u64,
    /// Model that answered.
    pub model: String,
}
