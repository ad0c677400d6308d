//! Completion client: retries, backoff, and the structured-output shim
use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{is_retryable_status, is_schema_rejection, GatewayError};
use crate::extract::{bounded_snippet, extract_json};
use crate::request::CompletionRequest;
use crate::response::{ProviderResponse, TokenUsage};

/// Per-call knobs. Attempts and backoff are caller-overridable; the timeout
/// bounds every attempt so a hung provider cannot stall the pipeline.
#[derive(Debug, Clone)]
pub struct CallOptions {
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub timeout_ms: u64,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self { attempts: 3, base_delay_ms: 500, timeout_ms: 30_000 }
    }
}

impl CallOptions {
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_base_delay_ms(mut self, ms: u64) -> Self {
        self.base_delay_ms = ms;
        self
    }

    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }
}

/// Backoff before retry `attempt` (1-based): base × 2^(attempt−1).
pub fn backoff_delay_ms(base_delay_ms: u64, attempt: u32) -> u64 {
    base_delay_ms.saturating_mul(1u64 << (attempt.saturating_sub(1)).min(16))
}

/// Parsed completion plus the raw provider response for diagnostics.
#[derive(Debug, Clone)]
pub struct CompletionResult<T> {
    pub parsed: T,
    pub raw: ProviderResponse,
    pub usage: Option<TokenUsage>,
    /// True when the structured-output shim downgraded the format
    pub downgraded: bool,
}

impl CompletionResult<Value> {
    /// Re-type the parsed value into the caller's expected shape.
    pub fn parse_into<T: DeserializeOwned>(self) -> Result<CompletionResult<T>, GatewayError> {
        let parsed = serde_json::from_value(self.parsed)
            .map_err(|e| GatewayError::Parse(format!("shape mismatch: {}", e)))?;
        Ok(CompletionResult {
            parsed,
            raw: self.raw,
            usage: self.usage,
            downgraded: self.downgraded,
        })
    }
}

/// Seam over the concrete client so pipeline stages are testable with a
/// scripted backend.
pub trait CompletionBackend: Send + Sync {
    fn call_value(
        &self,
        request: CompletionRequest,
        options: CallOptions,
    ) -> impl Future<Output = Result<CompletionResult<Value>, GatewayError>> + Send;
}

/// Provider connection settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub default_model: String,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: std::env::var("CALCSMITH_LLM_ENDPOINT")
                .unwrap_or_else(|_| "https://api.openai.com/v1/responses".to_string()),
            api_key: std::env::var("CALCSMITH_LLM_API_KEY").ok(),
            default_model: std::env::var("CALCSMITH_LLM_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
        }
    }
}

/// HTTP completion client.
pub struct CompletionClient {
    http: reqwest::Client,
    config: GatewayConfig,
}

impl CompletionClient {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| GatewayError::Transport(format!("client init: {}", e)))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// One structured completion, parsed leniently to a JSON value.
    pub async fn call_value(
        &self,
        request: CompletionRequest,
        options: CallOptions,
    ) -> Result<CompletionResult<Value>, GatewayError> {
        let (raw, downgraded) = drive(&request, &options, |payload, _attempt| {
            self.execute(payload, options.timeout_ms)
        })
        .await?;
        let parsed = parse_response(&raw)?;
        Ok(CompletionResult { parsed, usage: raw.usage.clone(), raw, downgraded })
    }

    /// One structured completion, re-typed into `T`.
    pub async fn call<T: DeserializeOwned>(
        &self,
        request: CompletionRequest,
        options: CallOptions,
    ) -> Result<CompletionResult<T>, GatewayError> {
        self.call_value(request, options).await?.parse_into()
    }

    async fn execute(&self, payload: Value, timeout_ms: u64) -> Result<ProviderResponse, AttemptError> {
        let mut builder = self
            .http
            .post(&self.config.endpoint)
            .timeout(Duration::from_millis(timeout_ms))
            .json(&payload);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AttemptError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(AttemptError::Status { status, body });
        }
        response
            .json::<ProviderResponse>()
            .await
            .map_err(|e| AttemptError::Network(format!("response decode: {}", e)))
    }
}

impl CompletionBackend for CompletionClient {
    fn call_value(
        &self,
        request: CompletionRequest,
        options: CallOptions,
    ) -> impl Future<Output = Result<CompletionResult<Value>, GatewayError>> + Send {
        CompletionClient::call_value(self, request, options)
    }
}

/// One failed HTTP attempt, before taxonomy mapping.
#[derive(Debug)]
pub(crate) enum AttemptError {
    Status { status: u16, body: String },
    Network(String),
}

/// Retry loop shared by the real client and the tests.
///
/// Drives `attempt_fn` with the provider payload until success, the budget
/// runs out, or a non-retryable failure. A 400 that reads as a structured
/// output rejection downgrades the format once and grants one extra attempt;
/// this is a different request, not a retry of the same one, so no backoff
/// is applied before it.
pub(crate) async fn drive<F, Fut>(
    request: &CompletionRequest,
    options: &CallOptions,
    mut attempt_fn: F,
) -> Result<(ProviderResponse, bool), GatewayError>
where
    F: FnMut(Value, u32) -> Fut,
    Fut: Future<Output = Result<ProviderResponse, AttemptError>>,
{
    let mut format = request.output_format.clone();
    let mut budget = options.attempts.max(1);
    let mut downgraded = false;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let payload = request.to_payload(&format);
        match attempt_fn(payload, attempt).await {
            Ok(response) => return Ok((response, downgraded)),
            Err(AttemptError::Status { status, body }) => {
                if status == 400
                    && !downgraded
                    && format.is_strict_schema()
                    && is_schema_rejection(&body)
                {
                    debug!(attempt, "provider rejected json_schema output, downgrading to json_object");
                    format = format.downgraded();
                    downgraded = true;
                    budget += 1;
                    continue;
                }
                if is_retryable_status(status) && attempt < budget {
                    let delay = backoff_delay_ms(options.base_delay_ms, attempt);
                    warn!(status, attempt, delay_ms = delay, "provider error, retrying");
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    continue;
                }
                return Err(if status == 400 {
                    GatewayError::BadRequest(bounded_snippet(&body, 200))
                } else {
                    GatewayError::Transport(format!(
                        "provider status {} after {} attempt(s)",
                        status, attempt
                    ))
                });
            }
            Err(AttemptError::Network(message)) => {
                if attempt < budget {
                    let delay = backoff_delay_ms(options.base_delay_ms, attempt);
                    warn!(attempt, delay_ms = delay, "network failure, retrying: {}", message);
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    continue;
                }
                return Err(GatewayError::Transport(message));
            }
        }
    }
}

fn parse_response(raw: &ProviderResponse) -> Result<Value, GatewayError> {
    if let Some(object) = raw.inline_object() {
        return Ok(object.clone());
    }
    let text = raw
        .collected_text()
        .ok_or_else(|| GatewayError::Parse("provider returned no output text".to_string()))?;
    match extract_json(&text) {
        Some(value) => Ok(value),
        None => {
            warn!(
                snippet = %bounded_snippet(&text, 160),
                "model output contained no extractable JSON"
            );
            Err(GatewayError::Parse("no JSON object in model output".to_string()))
        }
    }
}
