//! LLM client: one interface over Ollama and OpenAI-compatible backends.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::types::{LlmRequest, LlmResponse};

/// Provider backend for LLM inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmProvider {
    /// Ollama running locally.
    Ollama {
        /// e.g. `http://localhost:11434`.
        base_url: String,
    },
    /// Any OpenAI-compatible chat completions API.
    OpenAiCompatible {
        /// API root without the `/v1` suffix.
        base_url: String,
        /// Bearer token.
        api_key: String,
    },
    /// No backend: every call fails with `Unavailable`, so callers take
    /// their fallback path.
    None,
}

impl LlmProvider {
    /// Resolve a provider from its configured name.
    ///
    /// # Errors
    /// Returns `LlmError::ConfigError` for an unknown name or an
    /// OpenAI-compatible provider without an API key.
    pub fn from_name(
        name: &str,
        base_url: &str,
        api_key: Option<&str>,
    ) -> Result<Self, LlmError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        match name {
            "ollama" => Ok(Self::Ollama { base_url }),
            "openai" => {
                let api_key = api_key
                    .filter(|k| !k.is_empty())
                    .ok_or_else(|| LlmError::ConfigError("openai provider needs api_key".into()))?;
                Ok(Self::OpenAiCompatible {
                    base_url,
                    api_key: api_key.to_string(),
                })
            }
            "none" => Ok(Self::None),
            other => Err(LlmError::ConfigError(format!("unknown LLM provider: {other}"))),
        }
    }
}

/// Routes completion requests to the configured backend, retrying failed
/// attempts up to `max_retries` times.
#[derive(Debug, Clone)]
pub struct LlmClient {
    provider: LlmProvider,
    http: Client,
    model: String,
    max_retries: u32,
}

impl LlmClient {
    /// Create a client.
    #[must_use]
    pub fn new(provider: LlmProvider, model: impl Into<String>, max_retries: u32) -> Self {
        Self {
            provider,
            http: Client::new(),
            model: model.into(),
            max_retries,
        }
    }

    /// A client with no backend.
    #[must_use]
    pub fn none() -> Self {
        Self::new(LlmProvider::None, String::new(), 0)
    }

    /// Whether a backend is configured.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self.provider, LlmProvider::None)
    }

    /// The model name sent with each request.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The configured provider.
    #[must_use]
    pub fn provider(&self) -> &LlmProvider {
        &self.provider
    }

    /// Generate a completion.
    ///
    /// # Errors
    /// `Unavailable` without a backend, `RetriesExhausted` when every attempt
    /// failed, `ParseError` when a successful response has no readable body.
    pub async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        match &self.provider {
            LlmProvider::None => Err(LlmError::Unavailable("No LLM provider configured".into())),
            LlmProvider::Ollama { base_url } => {
                let url = format!("{base_url}/api/generate");
                let body = json!({
                    "model": self.model,
                    "prompt": format!("{}\n\n{}", request.system, request.user),
                    "stream": false,
                    "options": {
                        "temperature": request.temperature,
                        "num_predict": request.max_tokens,
                        "top_p": 0.9,
                    }
                });
                let (json, latency_ms) =
                    self.post_with_retries("Ollama", &url, None, &body, request).await?;
                Ok(self.response(
                    json["response"].as_str().unwrap_or_default(),
                    json["eval_count"].as_u64(),
                    latency_ms,
                ))
            }
            LlmProvider::OpenAiCompatible { base_url, api_key } => {
                let url = format!("{base_url}/v1/chat/completions");
                let body = json!({
                    "model": self.model,
                    "messages": [
                        { "role": "system", "content": request.system },
                        { "role": "user", "content": request.user },
                    ],
                    "max_tokens": request.max_tokens,
                    "temperature": request.temperature,
                });
                let (json, latency_ms) = self
                    .post_with_retries("OpenAI", &url, Some(api_key), &body, request)
                    .await?;
                Ok(self.response(
                    json["choices"][0]["message"]["content"]
                        .as_str()
                        .unwrap_or_default(),
                    json["usage"]["completion_tokens"].as_u64(),
                    latency_ms,
                ))
            }
        }
    }

    fn response(&self, text: &str, tokens: Option<u64>, latency_ms: u64) -> LlmResponse {
        LlmResponse {
            text: text.trim().to_string(),
            tokens_generated: tokens.and_then(|t| u32::try_from(t).ok()).unwrap_or(0),
            latency_ms,
            model: self.model.clone(),
        }
    }

    async fn post_with_retries(
        &self,
        backend: &'static str,
        url: &str,
        bearer: Option<&str>,
        body: &Value,
        request: &LlmRequest,
    ) -> Result<(Value, u64), LlmError> {
        let mut last_error = String::new();
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                debug!(backend, attempt = attempt + 1, max = self.max_retries + 1, "Retrying LLM call");
            }

            let start = Instant::now();
            let mut builder = self
                .http
                .post(url)
                .json(body)
                .timeout(Duration::from_millis(request.timeout_ms));
            if let Some(token) = bearer {
                builder = builder.bearer_auth(token);
            }

            match builder.send().await {
                Ok(resp) if resp.status().is_success() => {
                    let json: Value = resp
                        .json()
                        .await
                        .map_err(|e| LlmError::ParseError(e.to_string()))?;
                    let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                    debug!(backend, latency_ms, "LLM call succeeded");
                    return Ok((json, latency_ms));
                }
                Ok(resp) => {
                    let status = resp.status();
                    last_error = format!("HTTP {status}: {}", resp.text().await.unwrap_or_default());
                    warn!(backend, error = %last_error, "LLM backend returned an error");
                }
                Err(e) => {
                    last_error = e.to_string();
                    if e.is_timeout() {
                        warn!(backend, timeout_ms = request.timeout_ms, "LLM request timed out");
                    } else {
                        warn!(backend, error = %last_error, "LLM request failed");
                    }
                }
            }
        }

        Err(LlmError::RetriesExhausted {
            attempts: self.max_retries + 1,
            last_error,
        })
    }
}
