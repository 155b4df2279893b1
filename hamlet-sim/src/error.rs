//! Error types for the runtime.

use hamlet_llm::LlmError;

/// Failure of an utterance or summary generator.
///
/// Never propagated to the scheduler: the orchestrator and the memory store
/// each have a fallback path.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// The LLM backend failed.
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// The call did not finish within its budget.
    #[error("generator timed out after {ms}ms")]
    Timeout {
        /// The budget.
        ms: u64,
    },

    /// The generator produced nothing usable.
    #[error("generator unavailable: {0}")]
    Unavailable(String),
}
