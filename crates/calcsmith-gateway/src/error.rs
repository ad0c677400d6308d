//! Gateway error taxonomy
use thiserror::Error;

/// Substrings a provider uses when it rejects structured output. Heuristic
/// and provider-version dependent; kept in one place so new providers only
/// touch this list.
const SCHEMA_REJECTION_MARKERS: &[&str] = &["json_schema", "response_format", "structured output"];

#[derive(Error, Debug)]
pub enum GatewayError {
    /// Caller misconfiguration; never retried
    #[error("GATEWAY/BAD_REQUEST: {0}")]
    BadRequest(String),

    /// Model text could not be coerced to the expected JSON
    #[error("GATEWAY/PARSE: {0}")]
    Parse(String),

    /// Transport or provider failure after the retry budget
    #[error("GATEWAY/TRANSPORT: {0}")]
    Transport(String),
}

impl GatewayError {
    pub fn is_parse(&self) -> bool {
        matches!(self, GatewayError::Parse(_))
    }
}

/// Whether an HTTP status is worth another attempt.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Whether a 400 body looks like "this provider doesn't support structured
/// output", which triggers the one-shot downgrade to JSON-object mode.
pub fn is_schema_rejection(body: &str) -> bool {
    let lowered = body.to_ascii_lowercase();
    SCHEMA_REJECTION_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}
